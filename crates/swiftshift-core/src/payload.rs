//! Click context → send payload inference.

use crate::domain::{Category, ClickContext, MediaKind, TabMeta};

/// Normalized send request derived from a click.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Payload {
    Text {
        text: String,
    },
    Photo {
        photo: String,
        caption: Option<String>,
    },
    Document {
        document: String,
        caption: Option<String>,
    },
    Audio {
        audio: String,
        caption: Option<String>,
    },
}

impl Payload {
    pub fn kind(&self) -> &'static str {
        match self {
            Payload::Text { .. } => "text",
            Payload::Photo { .. } => "photo",
            Payload::Document { .. } => "document",
            Payload::Audio { .. } => "audio",
        }
    }

    /// Short human-readable summary for notifications and the recent list.
    pub fn preview(&self) -> &str {
        match self {
            Payload::Text { text } => text,
            Payload::Photo { photo, .. } => photo,
            Payload::Document { document, .. } => document,
            Payload::Audio { audio, .. } => audio,
        }
    }
}

/// Build the payload for a click.
///
/// A `priority` category whose precondition holds wins outright, so an image
/// inside a link goes wherever the user actually clicked. Otherwise the generic
/// precedence applies: selection, image, audio, video, link, page.
pub fn build_payload(
    ctx: &ClickContext,
    tab: Option<&TabMeta>,
    priority: Option<Category>,
    send_as_file: bool,
) -> Option<Payload> {
    if let Some(category) = priority {
        if let Some(p) = for_category(category, ctx, tab, send_as_file) {
            return Some(p);
        }
    }

    const FALLBACK: [Category; 6] = [
        Category::Text,
        Category::Image,
        Category::Audio,
        Category::Video,
        Category::Link,
        Category::Page,
    ];
    FALLBACK
        .into_iter()
        .find_map(|c| for_category(c, ctx, tab, send_as_file))
}

fn for_category(
    category: Category,
    ctx: &ClickContext,
    tab: Option<&TabMeta>,
    send_as_file: bool,
) -> Option<Payload> {
    let caption = tab.map(|t| t.url.clone()).filter(|u| !u.is_empty());
    match category {
        Category::Text => non_empty(&ctx.selection_text).map(|text| Payload::Text {
            text: text.to_string(),
        }),
        Category::Link => non_empty(&ctx.link_url).map(|url| Payload::Text {
            text: url.to_string(),
        }),
        Category::Image => media_src(ctx, MediaKind::Image).map(|src| {
            if send_as_file || is_svg(src) {
                Payload::Document {
                    document: src.to_string(),
                    caption,
                }
            } else {
                Payload::Photo {
                    photo: src.to_string(),
                    caption,
                }
            }
        }),
        Category::Audio => media_src(ctx, MediaKind::Audio).map(|src| Payload::Audio {
            audio: src.to_string(),
            caption,
        }),
        Category::Video => media_src(ctx, MediaKind::Video).map(|src| {
            let page = ctx
                .page_url
                .as_deref()
                .or(tab.map(|t| t.url.as_str()))
                .unwrap_or_default();
            Payload::Text {
                text: format!("🎬 Video: {src}\n\nFrom: {page}"),
            }
        }),
        Category::Page => tab.and_then(page_text),
        Category::Capture => None,
    }
}

fn page_text(tab: &TabMeta) -> Option<Payload> {
    let text = match (tab.title.trim(), tab.url.trim()) {
        ("", "") => return None,
        ("", url) => url.to_string(),
        (title, "") => title.to_string(),
        (title, url) => format!("{title}\n{url}"),
    };
    Some(Payload::Text { text })
}

fn media_src(ctx: &ClickContext, kind: MediaKind) -> Option<&str> {
    if ctx.media_type != Some(kind) {
        return None;
    }
    non_empty(&ctx.src_url)
}

fn non_empty(v: &Option<String>) -> Option<&str> {
    v.as_deref().filter(|s| !s.trim().is_empty())
}

/// SVGs are rejected by `sendPhoto`, so they always go out as documents.
pub fn is_svg(url: &str) -> bool {
    if url.starts_with("data:image/svg+xml") {
        return true;
    }
    let path = url.split(|c| c == '?' || c == '#').next().unwrap_or(url);
    path.to_ascii_lowercase().ends_with(".svg")
}
