//! Send a built payload and run everything that follows a send.
//!
//! Shared by the click router, keyboard commands and the capture flows so that
//! each dispatched send ends the same way: one notification, one activity
//! entry and, on success, recency bookkeeping plus a menu rebuild.

use std::sync::Arc;

use crate::{
    activity::{iso_timestamp_utc, truncate_text, ActivityEntry, ActivityLog},
    domain::{Profile, RecentSend, SendTarget},
    menu::service::MenuService,
    payload::Payload,
    ports::{DestinationStore, Notifier},
    preview::LinkPreviewer,
    send::{dispatch_payload, port::SendService},
};

const NOTIFY_PREVIEW_CHARS: usize = 100;
const RECENT_PREVIEW_CHARS: usize = 200;

pub struct Delivery {
    store: Arc<dyn DestinationStore>,
    sender: Arc<dyn SendService>,
    notifier: Arc<dyn Notifier>,
    menu: Arc<MenuService>,
    activity: ActivityLog,
    previewer: Option<LinkPreviewer>,
}

impl Delivery {
    pub fn new(
        store: Arc<dyn DestinationStore>,
        sender: Arc<dyn SendService>,
        notifier: Arc<dyn Notifier>,
        menu: Arc<MenuService>,
        activity: ActivityLog,
    ) -> Self {
        Self {
            store,
            sender,
            notifier,
            menu,
            activity,
            previewer: None,
        }
    }

    pub fn with_previewer(mut self, previewer: LinkPreviewer) -> Self {
        self.previewer = Some(previewer);
        self
    }

    pub fn store(&self) -> &Arc<dyn DestinationStore> {
        &self.store
    }

    pub fn sender(&self) -> &Arc<dyn SendService> {
        &self.sender
    }

    pub fn menu(&self) -> &Arc<MenuService> {
        &self.menu
    }

    pub fn activity(&self) -> &ActivityLog {
        &self.activity
    }

    /// The active profile if it can send, otherwise notify and return `None`.
    pub async fn sending_profile(
        &self,
        event: &str,
        destination_id: Option<&str>,
    ) -> Option<Profile> {
        match self.store.active_profile().await {
            Ok(Some(profile)) if profile.is_configured() => Some(profile),
            Ok(_) => {
                self.report_failure(
                    event,
                    destination_id,
                    "SwiftShift is not set up",
                    "Add a bot token in the SwiftShift settings first.",
                    None,
                )
                .await;
                None
            }
            Err(e) => {
                self.report_failure(
                    event,
                    destination_id,
                    "SwiftShift could not load settings",
                    &e.to_string(),
                    None,
                )
                .await;
                None
            }
        }
    }

    /// Send `payload` to `destination_id`. Returns whether the send succeeded.
    pub async fn deliver(
        &self,
        destination_id: &str,
        payload: &Payload,
        send_as_file: bool,
        page_url: Option<&str>,
    ) -> bool {
        let Some(profile) = self.sending_profile("send", Some(destination_id)).await else {
            return false;
        };

        let target = SendTarget::resolve(&profile, destination_id);
        let name = profile
            .find(destination_id)
            .map(|d| d.name.clone())
            .unwrap_or_else(|| destination_id.to_string());

        tracing::info!(
            destination = destination_id,
            chat_id = %target.chat_id,
            thread_id = ?target.thread_id,
            kind = payload.kind(),
            "sending"
        );

        let result = dispatch_payload(
            self.sender.as_ref(),
            &profile.bot_token,
            &target,
            payload,
            send_as_file,
        )
        .await;

        if let Err(e) = result {
            tracing::warn!(destination = destination_id, error = %e, "send failed");
            self.notify("❌ Failed to send", &format!("{name}: {e}")).await;
            self.activity.record(
                ActivityEntry::failed("send", Some(destination_id), &e.to_string())
                    .with_name(&name)
                    .with_kind(payload.kind())
                    .with_page(page_url.unwrap_or_default()),
            );
            return false;
        }

        self.notify(
            &format!("✅ Sent to {name}"),
            &truncate_text(payload.preview(), NOTIFY_PREVIEW_CHARS),
        )
        .await;
        self.activity.record(
            ActivityEntry::sent(destination_id, &name, payload.kind(), payload.preview())
                .with_page(page_url.unwrap_or_default()),
        );

        if let Err(e) = self.store.push_recency(destination_id).await {
            tracing::warn!(error = %e, "failed to update recency");
        }
        self.menu.refresh().await;

        let link_title = match (&self.previewer, link_url(payload)) {
            (Some(previewer), Some(url)) => previewer.title(url).await,
            _ => None,
        };
        let record = RecentSend {
            destination_id: destination_id.to_string(),
            destination_name: name,
            kind: payload.kind().to_string(),
            preview: truncate_text(payload.preview(), RECENT_PREVIEW_CHARS),
            link_title,
            sent_at: iso_timestamp_utc(),
        };
        if let Err(e) = self.store.push_recent_send(record).await {
            tracing::warn!(error = %e, "failed to record recent send");
        }
        true
    }

    /// One notification plus one failed activity entry.
    pub async fn report_failure(
        &self,
        event: &str,
        destination_id: Option<&str>,
        title: &str,
        message: &str,
        page_url: Option<&str>,
    ) {
        tracing::warn!(event, destination = ?destination_id, page_url = ?page_url, message, "{title}");
        self.notify(title, message).await;
        self.activity.record(
            ActivityEntry::failed(event, destination_id, message)
                .with_page(page_url.unwrap_or_default()),
        );
    }

    pub async fn notify(&self, title: &str, message: &str) {
        if let Err(e) = self.notifier.notify(title, message).await {
            tracing::warn!(error = %e, title, "notification failed");
        }
    }
}

/// The URL of a bare-link text payload.
fn link_url(payload: &Payload) -> Option<&str> {
    let Payload::Text { text } = payload else {
        return None;
    };
    let text = text.trim();
    let is_url = (text.starts_with("http://") || text.starts_with("https://"))
        && !text.contains(char::is_whitespace);
    is_url.then_some(text)
}
