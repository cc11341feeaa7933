//! Click and keyboard-command dispatch.
//!
//! Nothing here returns an error: every path ends in a notification, and
//! failures are logged where they happen.

use std::sync::Arc;

use crate::{
    activity::ActivityEntry,
    capture::CaptureOrchestrator,
    delivery::Delivery,
    domain::{Category, ClickContext, SendMode, TabMeta},
    menu::NodeId,
    payload::build_payload,
    ports::PageBridge,
    registration::Registration,
};

pub const QUICK_SEND_COMMAND: &str = "quick-send";
pub const QUICK_CAPTURE_COMMAND: &str = "quick-capture";

pub struct ClickRouter {
    delivery: Arc<Delivery>,
    capture: Arc<CaptureOrchestrator>,
    registration: Registration,
    bridge: Arc<dyn PageBridge>,
}

impl ClickRouter {
    pub fn new(
        delivery: Arc<Delivery>,
        capture: Arc<CaptureOrchestrator>,
        bridge: Arc<dyn PageBridge>,
    ) -> Self {
        Self {
            registration: Registration::new(delivery.clone()),
            delivery,
            capture,
            bridge,
        }
    }

    pub fn capture(&self) -> &Arc<CaptureOrchestrator> {
        &self.capture
    }

    pub async fn on_menu_click(&self, raw_id: &str, ctx: &ClickContext, tab: Option<&TabMeta>) {
        let Some(id) = NodeId::parse(raw_id) else {
            tracing::warn!(id = raw_id, "ignoring click on unknown menu item");
            return;
        };
        tracing::debug!(id = raw_id, "menu click");

        match id {
            NodeId::AddDestination(_) => self.registration.register_from_tab(tab).await,
            NodeId::SetupInbox(_) => self.open_inbox().await,
            NodeId::SetupRequired(_) => {
                self.delivery
                    .notify(
                        "Set up SwiftShift",
                        "Open the SwiftShift settings to add a bot token and destinations.",
                    )
                    .await
            }
            NodeId::Target {
                category: Category::Capture,
                destination_id,
                mode,
                ..
            } => {
                self.capture
                    .capture_to(&destination_id, mode, tab)
                    .await
            }
            NodeId::Target {
                category,
                destination_id,
                mode,
                ..
            } => {
                self.send_click(category, &destination_id, mode, ctx, tab)
                    .await
            }
            NodeId::Root(_) | NodeId::Group { .. } | NodeId::Separator(..) => {
                tracing::debug!(id = raw_id, "click on non-actionable node");
            }
        }
    }

    async fn send_click(
        &self,
        category: Category,
        destination_id: &str,
        mode: Option<SendMode>,
        ctx: &ClickContext,
        tab: Option<&TabMeta>,
    ) {
        let send_as_file = mode == Some(SendMode::File);
        let page_url = ctx
            .page_url
            .as_deref()
            .or(tab.map(|t| t.url.as_str()));

        let Some(payload) = build_payload(ctx, tab, Some(category), send_as_file) else {
            self.delivery
                .report_failure(
                    "send",
                    Some(destination_id),
                    "Nothing to send",
                    "Select text, right-click media or a link, or open a page first.",
                    page_url,
                )
                .await;
            return;
        };

        self.delivery
            .deliver(destination_id, &payload, send_as_file, page_url)
            .await;
    }

    /// Opens the bot's deep link so the user can start a private inbox chat.
    async fn open_inbox(&self) {
        let Some(profile) = self.delivery.sending_profile("setup_inbox", None).await else {
            return;
        };

        let username = match profile.bot_username.clone().filter(|u| !u.is_empty()) {
            Some(u) => Ok(u),
            None => self.delivery.sender().bot_username(&profile.bot_token).await,
        };
        let result = match username {
            Ok(u) => {
                let url = format!("https://t.me/{}?start=inbox", u.trim_start_matches('@'));
                self.bridge.open_url(&url).await
            }
            Err(e) => Err(e),
        };

        if let Err(e) = result {
            self.delivery
                .report_failure(
                    "setup_inbox",
                    None,
                    "❌ Could not open the bot",
                    &e.to_string(),
                    None,
                )
                .await;
        }
    }

    /// Keyboard shortcuts. Both target the most recent destination.
    pub async fn on_command(&self, command: &str, ctx: &ClickContext, tab: Option<&TabMeta>) {
        if command != QUICK_SEND_COMMAND && command != QUICK_CAPTURE_COMMAND {
            tracing::warn!(command, "ignoring unknown command");
            return;
        }

        let recent = match self.delivery.store().recency().await {
            Ok(list) => list.into_iter().next(),
            Err(e) => {
                tracing::warn!(error = %e, "failed to load recency");
                None
            }
        };

        let Some(destination_id) = recent else {
            self.delivery
                .notify(
                    "No recent destination",
                    "Send something from the context menu first.",
                )
                .await;
            self.delivery
                .activity()
                .record(ActivityEntry::failed(command, None, "no recent destination"));
            return;
        };

        if command == QUICK_CAPTURE_COMMAND {
            self.capture
                .capture_to(&destination_id, Some(SendMode::Photo), tab)
                .await;
            return;
        }

        let page_url = tab.map(|t| t.url.as_str());
        match build_payload(ctx, tab, None, false) {
            Some(payload) => {
                self.delivery
                    .deliver(&destination_id, &payload, false, page_url)
                    .await;
            }
            None => {
                self.delivery
                    .report_failure(
                        command,
                        Some(&destination_id),
                        "Nothing to send",
                        "Select text or open a page first.",
                        page_url,
                    )
                    .await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        delivery::testing::*,
        domain::{MediaKind, Profile},
    };

    fn router(h: &Harness) -> ClickRouter {
        let capture = Arc::new(CaptureOrchestrator::new(
            h.delivery.clone(),
            h.bridge.clone(),
        ));
        ClickRouter::new(h.delivery.clone(), capture, h.bridge.clone())
    }

    fn page_tab() -> TabMeta {
        TabMeta {
            id: Some(3),
            title: "Example".to_string(),
            url: "https://example.com/page".to_string(),
        }
    }

    fn image_in_link() -> ClickContext {
        ClickContext {
            link_url: Some("https://example.com/article".to_string()),
            src_url: Some("https://example.com/cat.png".to_string()),
            media_type: Some(MediaKind::Image),
            ..ClickContext::default()
        }
    }

    #[tokio::test]
    async fn image_file_mode_sends_a_document() {
        let h = Harness::new(
            MemoryStore::with_profile(news_profile()),
            RecordingSender::default(),
        );
        router(&h)
            .on_menu_click(
                "swiftshift-image-target--100111-file",
                &image_in_link(),
                Some(&page_tab()),
            )
            .await;

        assert_eq!(
            h.sender.calls(),
            vec!["document -100111 https://example.com/cat.png"]
        );
        assert_eq!(h.notifier.titles(), vec!["✅ Sent to News"]);
        assert_eq!(*h.store.recency.lock().unwrap(), vec!["-100111"]);
    }

    #[tokio::test]
    async fn category_decides_between_link_and_image() {
        let h = Harness::new(
            MemoryStore::with_profile(news_profile()),
            RecordingSender::default(),
        );
        let r = router(&h);
        let ctx = image_in_link();
        r.on_menu_click("swiftshift-link-target--100111", &ctx, Some(&page_tab()))
            .await;
        r.on_menu_click("swiftshift-image-target--100111-photo", &ctx, Some(&page_tab()))
            .await;

        assert_eq!(
            h.sender.calls(),
            vec![
                "text -100111 https://example.com/article",
                "photo -100111 https://example.com/cat.png",
            ]
        );
    }

    #[tokio::test]
    async fn nested_topic_target_keeps_its_thread() {
        let h = Harness::new(
            MemoryStore::with_profile(news_profile()),
            RecordingSender::default(),
        );
        let ctx = ClickContext {
            selection_text: Some("hello".to_string()),
            ..ClickContext::default()
        };
        router(&h)
            .on_menu_click(
                "swiftshift-text-parent--100111-target--100111:55",
                &ctx,
                Some(&page_tab()),
            )
            .await;

        assert_eq!(h.sender.calls(), vec!["text -100111#55 hello"]);
    }

    #[tokio::test]
    async fn unknown_destination_uses_raw_chat_id() {
        let h = Harness::new(
            MemoryStore::with_profile(news_profile()),
            RecordingSender::default(),
        );
        let ctx = ClickContext {
            selection_text: Some("hi".to_string()),
            ..ClickContext::default()
        };
        router(&h)
            .on_menu_click("swiftshift-text-target--100999:4", &ctx, None)
            .await;

        assert_eq!(h.sender.calls(), vec!["text -100999 hi"]);
        assert_eq!(h.notifier.titles(), vec!["✅ Sent to -100999:4"]);
    }

    #[tokio::test]
    async fn capture_targets_go_to_the_orchestrator() {
        let h = Harness::new(
            MemoryStore::with_profile(news_profile()),
            RecordingSender::default(),
        );
        router(&h)
            .on_menu_click(
                "swiftshift-capture-parent--100111-target--100111:55-region",
                &ClickContext::default(),
                Some(&page_tab()),
            )
            .await;

        assert_eq!(
            *h.bridge.calls.lock().unwrap(),
            vec![r#"region -100111:55 Some(55) Some("Sports")"#]
        );
        assert!(h.sender.calls().is_empty());
    }

    #[tokio::test]
    async fn send_failure_yields_exactly_one_notification() {
        let sender = RecordingSender {
            fail: Some("Forbidden: bot was kicked".to_string()),
            ..RecordingSender::default()
        };
        let h = Harness::new(MemoryStore::with_profile(news_profile()), sender);
        let ctx = ClickContext {
            selection_text: Some("x".to_string()),
            ..ClickContext::default()
        };
        router(&h)
            .on_menu_click("swiftshift-text-target--100111", &ctx, None)
            .await;

        assert_eq!(h.notifier.titles(), vec!["❌ Failed to send"]);
        assert_eq!(h.log_lines().len(), 1);
    }

    #[tokio::test]
    async fn setup_inbox_opens_bot_deep_link() {
        let profile = Profile {
            destinations: vec![],
            ..news_profile()
        };
        let h = Harness::new(MemoryStore::with_profile(profile), RecordingSender::default());
        router(&h)
            .on_menu_click("swiftshift-page-setup-inbox", &ClickContext::default(), None)
            .await;

        assert_eq!(
            *h.bridge.calls.lock().unwrap(),
            vec!["open https://t.me/swiftshift_bot?start=inbox"]
        );
    }

    #[tokio::test]
    async fn setup_required_only_notifies() {
        let h = Harness::new(MemoryStore::default(), RecordingSender::default());
        router(&h)
            .on_menu_click("swiftshift-text-setup-required", &ClickContext::default(), None)
            .await;

        assert_eq!(h.notifier.titles(), vec!["Set up SwiftShift"]);
        assert!(h.sender.calls().is_empty());
    }

    #[tokio::test]
    async fn quick_send_command_uses_most_recent_destination() {
        let h = Harness::new(
            MemoryStore::with_profile(news_profile()),
            RecordingSender::default(),
        );
        h.store.recency.lock().unwrap().push("-100111:55".to_string());

        router(&h)
            .on_command(QUICK_SEND_COMMAND, &ClickContext::default(), Some(&page_tab()))
            .await;

        assert_eq!(
            h.sender.calls(),
            vec!["text -100111#55 Example\nhttps://example.com/page"]
        );
    }

    #[tokio::test]
    async fn quick_command_without_recency_notifies() {
        let h = Harness::new(
            MemoryStore::with_profile(news_profile()),
            RecordingSender::default(),
        );
        router(&h)
            .on_command(QUICK_CAPTURE_COMMAND, &ClickContext::default(), Some(&page_tab()))
            .await;

        assert_eq!(h.notifier.titles(), vec!["No recent destination"]);
        assert!(h.bridge.calls.lock().unwrap().is_empty());
    }
}
