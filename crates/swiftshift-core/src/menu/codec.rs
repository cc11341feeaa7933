//! Menu node identifiers and their string encoding.
//!
//! Native menus only carry a string id per item, so everything the click router
//! needs (category, destination, send mode) is encoded into it:
//!
//! ```text
//! swiftshift-<category>[-parent-<id>|-topic-menu-<id>|-more-<id>|-send-parent-<id>|-quick]*-target-<destinationId>[-photo|-file|-region]
//! ```
//!
//! Destination ids may contain `-` (negative chat ids) and `:` (topics), so
//! decoding anchors on the keyword vocabulary instead of splitting on hyphens.

use std::fmt;

use crate::domain::{Category, SendMode};

const PREFIX: &str = "swiftshift";
const TARGET: &str = "-target-";
const ADD_DESTINATION: &str = "-add-destination";
const SETUP_INBOX: &str = "-setup-inbox";
const SETUP_REQUIRED: &str = "-setup-required";
const SEPARATOR: &str = "-separator-";

/// One nesting step between a root and a leaf.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Scope {
    Parent(String),
    TopicMenu(String),
    More(String),
    SendParent(String),
    Quick,
}

impl Scope {
    fn keyword(&self) -> &'static str {
        match self {
            Scope::Parent(_) => "-parent-",
            Scope::TopicMenu(_) => "-topic-menu-",
            Scope::More(_) => "-more-",
            Scope::SendParent(_) => "-send-parent-",
            Scope::Quick => "-quick",
        }
    }

    fn write(&self, out: &mut String) {
        out.push_str(self.keyword());
        match self {
            Scope::Parent(id) | Scope::TopicMenu(id) | Scope::More(id) | Scope::SendParent(id) => {
                out.push_str(id)
            }
            Scope::Quick => {}
        }
    }
}

/// Typed menu node identifier.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum NodeId {
    Root(Category),
    SetupRequired(Category),
    SetupInbox(Category),
    AddDestination(Category),
    Separator(Category, u32),
    Group {
        category: Category,
        path: Vec<Scope>,
    },
    Target {
        category: Category,
        path: Vec<Scope>,
        destination_id: String,
        mode: Option<SendMode>,
    },
}

impl NodeId {
    pub fn category(&self) -> Category {
        match self {
            NodeId::Root(c)
            | NodeId::SetupRequired(c)
            | NodeId::SetupInbox(c)
            | NodeId::AddDestination(c)
            | NodeId::Separator(c, _) => *c,
            NodeId::Group { category, .. } | NodeId::Target { category, .. } => *category,
        }
    }

    /// Nesting path of a root, group or target; empty for fixed nodes.
    pub fn path(&self) -> &[Scope] {
        match self {
            NodeId::Group { path, .. } | NodeId::Target { path, .. } => path,
            _ => &[],
        }
    }

    /// Group id one level below this node.
    pub fn nest(&self, scope: Scope) -> NodeId {
        let mut path = self.path().to_vec();
        path.push(scope);
        NodeId::Group {
            category: self.category(),
            path,
        }
    }

    /// Leaf id below this node.
    pub fn target(&self, destination_id: &str, mode: Option<SendMode>) -> NodeId {
        NodeId::Target {
            category: self.category(),
            path: self.path().to_vec(),
            destination_id: destination_id.to_string(),
            mode,
        }
    }

    pub fn encode(&self) -> String {
        let mut out = format!("{PREFIX}-{}", self.category().as_str());
        match self {
            NodeId::Root(_) => {}
            NodeId::SetupRequired(_) => out.push_str(SETUP_REQUIRED),
            NodeId::SetupInbox(_) => out.push_str(SETUP_INBOX),
            NodeId::AddDestination(_) => out.push_str(ADD_DESTINATION),
            NodeId::Separator(_, n) => {
                out.push_str(SEPARATOR);
                out.push_str(&n.to_string());
            }
            NodeId::Group { path, .. } => path.iter().for_each(|s| s.write(&mut out)),
            NodeId::Target {
                path,
                destination_id,
                mode,
                ..
            } => {
                path.iter().for_each(|s| s.write(&mut out));
                out.push_str(TARGET);
                out.push_str(destination_id);
                if let Some(m) = mode {
                    out.push('-');
                    out.push_str(m.as_str());
                }
            }
        }
        out
    }

    /// Decode a native menu id. Returns `None` for ids this engine did not emit.
    pub fn parse(raw: &str) -> Option<NodeId> {
        let rest = raw.strip_prefix(PREFIX)?.strip_prefix('-')?;
        let cat_end = rest.find('-').unwrap_or(rest.len());
        let category = Category::parse(&rest[..cat_end])?;
        let tail = &rest[cat_end..];

        if tail.is_empty() {
            return Some(NodeId::Root(category));
        }
        if raw.ends_with(ADD_DESTINATION) {
            return Some(NodeId::AddDestination(category));
        }
        if raw.ends_with(SETUP_INBOX) {
            return Some(NodeId::SetupInbox(category));
        }
        if raw.ends_with(SETUP_REQUIRED) {
            return Some(NodeId::SetupRequired(category));
        }
        if let Some(n) = tail.strip_prefix(SEPARATOR) {
            return n.parse().ok().map(|n| NodeId::Separator(category, n));
        }

        if let Some(at) = tail.find(TARGET) {
            let path = parse_path(&tail[..at])?;
            let (destination_id, mode) = split_mode(&tail[at + TARGET.len()..]);
            if destination_id.is_empty() {
                return None;
            }
            return Some(NodeId::Target {
                category,
                path,
                destination_id: destination_id.to_string(),
                mode,
            });
        }

        let path = parse_path(tail)?;
        if path.is_empty() {
            return None;
        }
        Some(NodeId::Group { category, path })
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

const KEYWORDS: [&str; 5] = [
    "-send-parent-",
    "-topic-menu-",
    "-parent-",
    "-more-",
    "-quick",
];

fn parse_path(mut s: &str) -> Option<Vec<Scope>> {
    let mut path = Vec::new();
    while !s.is_empty() {
        if let Some(after) = s.strip_prefix("-quick") {
            if after.is_empty() || after.starts_with('-') {
                path.push(Scope::Quick);
                s = after;
                continue;
            }
        }

        let (keyword, after) = KEYWORDS[..4]
            .iter()
            .find_map(|k| s.strip_prefix(k).map(|after| (*k, after)))?;
        let end = next_keyword(after).unwrap_or(after.len());
        let id = &after[..end];
        if id.is_empty() {
            return None;
        }
        let id = id.to_string();
        path.push(match keyword {
            "-send-parent-" => Scope::SendParent(id),
            "-topic-menu-" => Scope::TopicMenu(id),
            "-parent-" => Scope::Parent(id),
            _ => Scope::More(id),
        });
        s = &after[end..];
    }
    Some(path)
}

/// Earliest keyword boundary in `s`, skipping the first byte so a leading `-`
/// of a negative chat id never ends the id early.
fn next_keyword(s: &str) -> Option<usize> {
    KEYWORDS
        .iter()
        .filter_map(|k| {
            s.match_indices(k)
                .map(|(i, _)| i)
                .find(|&i| i > 0 && (*k != "-quick" || is_quick_boundary(&s[i + k.len()..])))
        })
        .min()
}

fn is_quick_boundary(after: &str) -> bool {
    after.is_empty() || after.starts_with('-')
}

fn split_mode(s: &str) -> (&str, Option<SendMode>) {
    for mode in SendMode::ALL {
        if let Some(id) = s
            .strip_suffix(mode.as_str())
            .and_then(|rest| rest.strip_suffix('-'))
        {
            if !id.is_empty() {
                return (id, Some(mode));
            }
        }
    }
    (s, None)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(raw: &str) -> (Category, String, Option<SendMode>) {
        match NodeId::parse(raw) {
            Some(NodeId::Target {
                category,
                destination_id,
                mode,
                ..
            }) => (category, destination_id, mode),
            other => panic!("expected target for {raw}, got {other:?}"),
        }
    }

    #[test]
    fn decodes_image_file_target_with_negative_id() {
        let (category, id, mode) = target("swiftshift-image-target--100111-file");
        assert_eq!(category, Category::Image);
        assert_eq!(id, "-100111");
        assert_eq!(mode, Some(SendMode::File));
    }

    #[test]
    fn decodes_topic_ids_with_colons() {
        let (category, id, mode) =
            target("swiftshift-text-parent--100111-target--100111:55");
        assert_eq!(category, Category::Text);
        assert_eq!(id, "-100111:55");
        assert_eq!(mode, None);
    }

    #[test]
    fn decodes_capture_targets() {
        let (category, id, mode) = target("swiftshift-capture-target--100222:9-region");
        assert_eq!(category, Category::Capture);
        assert_eq!(id, "-100222:9");
        assert_eq!(mode, Some(SendMode::Region));
    }

    #[test]
    fn fixed_suffixes_win() {
        assert_eq!(
            NodeId::parse("swiftshift-link-add-destination"),
            Some(NodeId::AddDestination(Category::Link))
        );
        assert_eq!(
            NodeId::parse("swiftshift-page-setup-inbox"),
            Some(NodeId::SetupInbox(Category::Page))
        );
        assert_eq!(
            NodeId::parse("swiftshift-audio-setup-required"),
            Some(NodeId::SetupRequired(Category::Audio))
        );
        assert_eq!(
            NodeId::parse("swiftshift-video"),
            Some(NodeId::Root(Category::Video))
        );
    }

    #[test]
    fn rejects_foreign_ids() {
        assert_eq!(NodeId::parse("other-text-target-1"), None);
        assert_eq!(NodeId::parse("swiftshift-bogus-target-1"), None);
        assert_eq!(NodeId::parse("swiftshift-text-target-"), None);
        assert_eq!(NodeId::parse("swiftshift-text-parent-"), None);
    }

    #[test]
    fn nested_paths_round_trip() {
        let root = NodeId::Root(Category::Capture);
        let more = root
            .nest(Scope::Parent("-100111".to_string()))
            .nest(Scope::More("-100111".to_string()))
            .nest(Scope::TopicMenu("-100111:42".to_string()));
        for mode in SendMode::ALL {
            let leaf = more.target("-100111:42", Some(mode));
            let raw = leaf.encode();
            assert_eq!(NodeId::parse(&raw), Some(leaf.clone()));
            assert_eq!(NodeId::parse(&raw).map(|n| n.encode()), Some(raw));
        }

        let group = more.encode();
        assert_eq!(NodeId::parse(&group), Some(more));
    }

    #[test]
    fn quick_send_round_trips() {
        let leaf = NodeId::Root(Category::Text)
            .nest(Scope::Quick)
            .target("@news_channel", None);
        assert_eq!(leaf.encode(), "swiftshift-text-quick-target-@news_channel");
        assert_eq!(NodeId::parse(&leaf.encode()), Some(leaf));
    }

    #[test]
    fn send_parent_is_not_confused_with_parent() {
        let node = NodeId::Root(Category::Image)
            .nest(Scope::Parent("-100111".to_string()))
            .nest(Scope::SendParent("-100111".to_string()));
        let raw = node.encode();
        assert_eq!(raw, "swiftshift-image-parent--100111-send-parent--100111");
        assert_eq!(NodeId::parse(&raw), Some(node));
    }
}
