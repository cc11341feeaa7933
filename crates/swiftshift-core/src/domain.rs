use serde::{Deserialize, Serialize};

/// Kind of Telegram destination.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DestinationKind {
    Channel,
    Group,
    Private,
    Topic,
}

/// A Telegram chat, channel, group or topic the user can send content to.
///
/// `id` is either a bare chat id (`-100...`, a positive private chat id, or
/// `@username`) or a composite `chatId:threadId` for forum topics.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Destination {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: DestinationKind,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub pinned: bool,
}

impl Destination {
    pub fn new(id: impl Into<String>, kind: DestinationKind, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            name: name.into(),
            parent_id: None,
            pinned: false,
        }
    }

    pub fn topic(
        id: impl Into<String>,
        parent_id: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            parent_id: Some(parent_id.into()),
            ..Self::new(id, DestinationKind::Topic, name)
        }
    }

    pub fn pinned(mut self) -> Self {
        self.pinned = true;
        self
    }

    pub fn is_topic(&self) -> bool {
        self.kind == DestinationKind::Topic
    }

    pub fn chat_id(&self) -> &str {
        chat_part(&self.id)
    }

    pub fn thread_id(&self) -> Option<i32> {
        thread_part(&self.id)
    }
}

/// Chat part of a (possibly composite) destination id.
pub fn chat_part(id: &str) -> &str {
    id.split_once(':').map(|(chat, _)| chat).unwrap_or(id)
}

/// Thread part of a composite `chatId:threadId` id.
pub fn thread_part(id: &str) -> Option<i32> {
    id.split_once(':')
        .and_then(|(_, thread)| thread.trim().parse::<i32>().ok())
}

/// Normalize a chat id for duplicate detection.
///
/// Telegram Web clients disagree on whether supergroup/channel ids carry the
/// `-100` prefix, so `-1001234`, `-1234` and `1234` all compare equal.
pub fn normalize_chat_id(id: &str) -> &str {
    let id = id.trim();
    if let Some(rest) = id.strip_prefix("-100") {
        if !rest.is_empty() {
            return rest;
        }
    }
    id.strip_prefix('-').unwrap_or(id)
}

/// A bot profile: a token plus the destinations reachable through it.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub bot_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bot_username: Option<String>,
    #[serde(default)]
    pub destinations: Vec<Destination>,
}

impl Profile {
    /// A profile is usable for sending only with a non-empty bot token.
    pub fn is_configured(&self) -> bool {
        !self.bot_token.trim().is_empty()
    }

    pub fn find(&self, id: &str) -> Option<&Destination> {
        self.destinations.iter().find(|d| d.id == id)
    }
}

/// Top-level menu category, keyed to a native trigger condition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Text,
    Link,
    Image,
    Video,
    Audio,
    Page,
    Capture,
}

impl Category {
    /// Build order of the root nodes.
    pub const ALL: [Category; 7] = [
        Category::Text,
        Category::Link,
        Category::Image,
        Category::Video,
        Category::Audio,
        Category::Page,
        Category::Capture,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Text => "text",
            Category::Link => "link",
            Category::Image => "image",
            Category::Video => "video",
            Category::Audio => "audio",
            Category::Page => "page",
            Category::Capture => "capture",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == s)
    }

    /// Send modes offered under each destination, empty for direct-send categories.
    pub fn modes(self) -> &'static [SendMode] {
        match self {
            Category::Image => &[SendMode::Photo, SendMode::File],
            Category::Capture => &[SendMode::Photo, SendMode::File, SendMode::Region],
            _ => &[],
        }
    }
}

/// Mode suffix carried by leaf nodes of image and capture menus.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SendMode {
    Photo,
    File,
    Region,
}

impl SendMode {
    pub const ALL: [SendMode; 3] = [SendMode::Photo, SendMode::File, SendMode::Region];

    pub fn as_str(self) -> &'static str {
        match self {
            SendMode::Photo => "photo",
            SendMode::File => "file",
            SendMode::Region => "region",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
    Audio,
}

/// What the browser reported about a right-click.
///
/// Only the fields relevant to the triggering context are populated.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClickContext {
    #[serde(default)]
    pub selection_text: Option<String>,
    #[serde(default)]
    pub link_url: Option<String>,
    #[serde(default)]
    pub src_url: Option<String>,
    #[serde(default)]
    pub media_type: Option<MediaKind>,
    #[serde(default)]
    pub page_url: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabMeta {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
}

/// Resolved chat/thread pair for a send call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SendTarget {
    pub chat_id: String,
    pub thread_id: Option<i32>,
}

impl SendTarget {
    /// Resolve a decoded destination id against the profile.
    ///
    /// An unknown id is still usable as a raw chat id; it just loses its thread.
    pub fn resolve(profile: &Profile, destination_id: &str) -> Self {
        match profile.find(destination_id) {
            Some(dest) => Self {
                chat_id: dest.chat_id().to_string(),
                thread_id: dest.thread_id(),
            },
            None => Self {
                chat_id: chat_part(destination_id).to_string(),
                thread_id: None,
            },
        }
    }
}

/// Chat metadata returned by the Bot API `getChat` call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChatInfo {
    pub title: Option<String>,
    pub kind: Option<DestinationKind>,
}

/// One successful send, kept for the popup's "recent" list.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentSend {
    pub destination_id: String,
    pub destination_name: String,
    pub kind: String,
    pub preview: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link_title: Option<String>,
    pub sent_at: String,
}
