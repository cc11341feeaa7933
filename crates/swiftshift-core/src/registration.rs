//! "Add to SwiftShift": register the chat open in a Telegram Web tab.

use std::sync::Arc;

use regex::Regex;

use crate::{
    activity::ActivityEntry,
    delivery::Delivery,
    domain::{normalize_chat_id, ChatInfo, Destination, DestinationKind, TabMeta},
    menu::builder::is_on_origin,
};

/// Chat (and optional topic) addressed by a Telegram Web URL fragment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChatRef {
    pub chat: String,
    pub thread: Option<i32>,
}

impl ChatRef {
    pub fn destination_id(&self) -> String {
        match self.thread {
            Some(t) => format!("{}:{t}", self.chat),
            None => self.chat.clone(),
        }
    }
}

/// Parse `#<chat>`, `#<chat>_<thread>`, `#<chat>/<thread>` or `#@username`
/// from a URL on the Telegram Web origin.
pub fn parse_chat_url(url: &str, origin: &str) -> Option<ChatRef> {
    if !is_on_origin(url, origin) {
        return None;
    }
    let (_, fragment) = url.split_once('#')?;
    let re = Regex::new(r"^(-?\d+|@[A-Za-z0-9_]+)(?:[_/](\d+))?$").ok()?;
    let caps = re.captures(fragment.trim())?;
    let chat = caps.get(1)?.as_str().to_string();
    let thread = match caps.get(2) {
        Some(m) => Some(m.as_str().parse::<i32>().ok()?),
        None => None,
    };
    Some(ChatRef { chat, thread })
}

/// Tab title without Telegram Web decorations, `None` if nothing useful remains.
pub fn clean_tab_title(title: &str) -> Option<String> {
    let unread = Regex::new(r"^\(\d+\)\s*").ok()?;
    let suffix = Regex::new(r"(?i)\s*[-–—|]\s*telegram(?:\s+web)?(?:\s+[ak])?\s*$").ok()?;

    let t = unread.replace(title.trim(), "");
    let t = suffix.replace(&t, "");
    let t = t.trim();
    let generic = t.is_empty() || t.eq_ignore_ascii_case("telegram") || t.eq_ignore_ascii_case("telegram web");
    (!generic).then(|| t.to_string())
}

/// Best guess at the kind of a chat when `getChat` gave nothing.
pub fn infer_kind(chat: &str) -> DestinationKind {
    if chat.starts_with('@') {
        DestinationKind::Channel
    } else if chat.starts_with('-') {
        DestinationKind::Group
    } else {
        DestinationKind::Private
    }
}

pub struct Registration {
    delivery: Arc<Delivery>,
}

impl Registration {
    pub fn new(delivery: Arc<Delivery>) -> Self {
        Self { delivery }
    }

    pub async fn register_from_tab(&self, tab: Option<&TabMeta>) {
        let origin = self.delivery.menu().options().telegram_web_origin.clone();
        let url = tab.map(|t| t.url.as_str()).unwrap_or_default();
        let Some(chat_ref) = parse_chat_url(url, &origin) else {
            self.delivery
                .notify(
                    "Open a chat first",
                    "Open the chat or topic you want to add in Telegram Web, then try again.",
                )
                .await;
            return;
        };

        let Some(profile) = self.delivery.sending_profile("register", None).await else {
            return;
        };

        let existing = profile.destinations.iter().find(|d| {
            normalize_chat_id(d.chat_id()) == normalize_chat_id(&chat_ref.chat)
                && d.thread_id() == chat_ref.thread
        });
        if let Some(dest) = existing {
            self.delivery
                .notify("Already added", &format!("{} is already in SwiftShift.", dest.name))
                .await;
            return;
        }

        let info = match self
            .delivery
            .sender()
            .chat_info(&profile.bot_token, &chat_ref.chat)
            .await
        {
            Ok(info) => Some(info),
            Err(e) => {
                tracing::info!(chat = %chat_ref.chat, error = %e, "chat info unavailable");
                None
            }
        };
        let tab_title = tab.and_then(|t| clean_tab_title(&t.title));

        let mut destinations = profile.destinations.clone();
        let added = match chat_ref.thread {
            None => {
                let name = tab_title
                    .or_else(|| info.as_ref().and_then(|i| i.title.clone()))
                    .unwrap_or_else(|| format!("Chat {}", chat_ref.chat));
                let kind = chat_kind(info.as_ref(), &chat_ref.chat);
                Destination::new(chat_ref.chat.clone(), kind, name)
            }
            Some(thread) => {
                let parent = destinations
                    .iter()
                    .find(|d| {
                        !d.is_topic()
                            && normalize_chat_id(d.chat_id()) == normalize_chat_id(&chat_ref.chat)
                    })
                    .cloned();
                let parent = match parent {
                    Some(p) => p,
                    None => {
                        let placeholder = Destination::new(
                            chat_ref.chat.clone(),
                            chat_kind(info.as_ref(), &chat_ref.chat),
                            info.as_ref()
                                .and_then(|i| i.title.clone())
                                .unwrap_or_else(|| format!("Chat {}", chat_ref.chat)),
                        );
                        tracing::info!(parent = %placeholder.id, "created placeholder parent");
                        destinations.push(placeholder.clone());
                        placeholder
                    }
                };
                let name = tab_title
                    .filter(|t| *t != parent.name)
                    .unwrap_or_else(|| format!("Topic {thread}"));
                Destination::topic(format!("{}:{thread}", parent.id), parent.id.clone(), name)
            }
        };
        destinations.push(added.clone());

        if let Err(e) = self
            .delivery
            .store()
            .update_destinations(&profile.id, destinations)
            .await
        {
            self.delivery
                .report_failure(
                    "register",
                    Some(&added.id),
                    "❌ Could not add destination",
                    &e.to_string(),
                    Some(url),
                )
                .await;
            return;
        }

        self.delivery.menu().refresh().await;
        self.delivery
            .notify("➕ Added to SwiftShift", &added.name)
            .await;
        self.delivery
            .activity()
            .record(ActivityEntry::registered(&added.id, &added.name).with_page(url));
        tracing::info!(id = %added.id, name = %added.name, "destination registered");
    }
}

fn chat_kind(info: Option<&ChatInfo>, chat: &str) -> DestinationKind {
    info.and_then(|i| i.kind)
        .filter(|k| *k != DestinationKind::Topic)
        .unwrap_or_else(|| infer_kind(chat))
}
