//! Pure menu tree construction.
//!
//! The whole tree is regenerated on every change; nothing is patched in place.
//! The output is a command buffer starting with [`MenuCommand::Clear`], which the
//! adapter replays against the native registrar.

use std::collections::HashMap;

use crate::{
    domain::{Category, Destination, Profile, SendMode},
    menu::{
        codec::{NodeId, Scope},
        ranking::{rank_topics, TOP_TOPICS},
        MenuCommand, MenuContext, MenuNode, NodeKind,
    },
};

pub const DEFAULT_TELEGRAM_WEB_ORIGIN: &str = "https://web.telegram.org";

/// True when `url` is on `origin` itself, not on a host that merely starts
/// with the same characters.
pub fn is_on_origin(url: &str, origin: &str) -> bool {
    let origin = origin.trim_end_matches('/');
    match url.strip_prefix(origin) {
        Some(rest) => rest.is_empty() || rest.starts_with(|c: char| matches!(c, '/' | '#' | '?')),
        None => false,
    }
}

#[derive(Clone, Debug)]
pub struct MenuOptions {
    pub top_topics: usize,
    pub telegram_web_origin: String,
}

impl Default for MenuOptions {
    fn default() -> Self {
        Self {
            top_topics: TOP_TOPICS,
            telegram_web_origin: DEFAULT_TELEGRAM_WEB_ORIGIN.to_string(),
        }
    }
}

/// Everything the tree depends on.
#[derive(Clone, Copy, Debug)]
pub struct MenuInput<'a> {
    pub profile: Option<&'a Profile>,
    pub recency: &'a [String],
    pub active_tab_url: Option<&'a str>,
    pub options: &'a MenuOptions,
}

pub fn root_title(category: Category) -> &'static str {
    match category {
        Category::Text => "Send text to Telegram",
        Category::Link => "Send link to Telegram",
        Category::Image => "Send image to Telegram",
        Category::Video => "Send video to Telegram",
        Category::Audio => "Send audio to Telegram",
        Category::Page => "Send page to Telegram",
        Category::Capture => "Capture screenshot to Telegram",
    }
}

fn mode_title(mode: SendMode) -> &'static str {
    match mode {
        SendMode::Photo => "🖼️ Send as Photo",
        SendMode::File => "📄 Send as File",
        SendMode::Region => "✂️ Select Region",
    }
}

fn destination_title(dest: &Destination) -> String {
    if dest.pinned {
        format!("📌 {}", dest.name)
    } else {
        dest.name.clone()
    }
}

/// Build the full command buffer for the given state.
pub fn build_menu(input: &MenuInput<'_>) -> Vec<MenuCommand> {
    let mut out = vec![MenuCommand::Clear];

    let profile = input.profile.filter(|p| p.is_configured());
    let topology = profile.map(|p| Topology::new(&p.destinations));
    let on_telegram_web = input
        .active_tab_url
        .is_some_and(|url| is_on_origin(url, &input.options.telegram_web_origin));

    for category in Category::ALL {
        let mut tree = TreeWriter::new(category, &mut out);
        let root = tree.root();

        let (Some(profile), Some(topology)) = (profile, topology.as_ref()) else {
            tree.push(
                NodeId::SetupRequired(category),
                Some(&root),
                "⚠️ Set up SwiftShift to start sending",
                NodeKind::Placeholder,
                false,
            );
            continue;
        };

        if profile.destinations.is_empty() {
            tree.push(
                NodeId::SetupInbox(category),
                Some(&root),
                "📥 Set up your inbox",
                NodeKind::Leaf,
                true,
            );
        }

        for parent in &topology.parents {
            match topology.children.get(parent.id.as_str()) {
                Some(topics) if !topics.is_empty() => {
                    tree.parent_group(&root, parent, topics, input);
                }
                _ => tree.entry(&root, parent, Scope::SendParent(parent.id.clone())),
            }
        }

        for orphan in &topology.orphans {
            tree.entry(&root, orphan, Scope::TopicMenu(orphan.id.clone()));
        }

        if let Some(recent) = input.recency.first() {
            let title = profile
                .find(recent)
                .map(|d| d.name.clone())
                .unwrap_or_else(|| recent.clone());
            tree.separator(&root);
            tree.push(
                root.nest(Scope::Quick).target(recent, None),
                Some(&root),
                &format!("⚡ Quick Send: {title}"),
                NodeKind::Leaf,
                true,
            );
        }

        if on_telegram_web {
            tree.separator(&root);
            tree.push(
                NodeId::AddDestination(category),
                Some(&root),
                "➕ Add to SwiftShift",
                NodeKind::Leaf,
                true,
            );
        }
    }

    out
}

/// Destinations partitioned into parents, their topics and orphans.
struct Topology<'a> {
    parents: Vec<&'a Destination>,
    children: HashMap<&'a str, Vec<&'a Destination>>,
    orphans: Vec<&'a Destination>,
}

impl<'a> Topology<'a> {
    fn new(destinations: &'a [Destination]) -> Self {
        let parents: Vec<&Destination> = destinations.iter().filter(|d| !d.is_topic()).collect();
        let mut children: HashMap<&str, Vec<&Destination>> = HashMap::new();
        let mut orphans = Vec::new();

        for topic in destinations.iter().filter(|d| d.is_topic()) {
            let parent = topic
                .parent_id
                .as_deref()
                .filter(|pid| parents.iter().any(|p| p.id == *pid));
            match parent {
                Some(pid) => children.entry(pid).or_default().push(topic),
                None => orphans.push(topic),
            }
        }

        Self {
            parents,
            children,
            orphans,
        }
    }
}

/// Emits the nodes of a single root category.
struct TreeWriter<'o> {
    category: Category,
    context: MenuContext,
    separators: u32,
    out: &'o mut Vec<MenuCommand>,
}

impl<'o> TreeWriter<'o> {
    fn new(category: Category, out: &'o mut Vec<MenuCommand>) -> Self {
        Self {
            category,
            context: MenuContext::for_category(category),
            separators: 0,
            out,
        }
    }

    fn root(&mut self) -> NodeId {
        let id = NodeId::Root(self.category);
        self.push(
            id.clone(),
            None,
            root_title(self.category),
            NodeKind::Root,
            true,
        );
        id
    }

    fn push(
        &mut self,
        id: NodeId,
        parent: Option<&NodeId>,
        title: &str,
        kind: NodeKind,
        enabled: bool,
    ) {
        self.out.push(MenuCommand::Create(MenuNode {
            id,
            parent: parent.cloned(),
            title: title.to_string(),
            kind,
            context: self.context,
            enabled,
        }));
    }

    fn separator(&mut self, parent: &NodeId) {
        self.separators += 1;
        self.push(
            NodeId::Separator(self.category, self.separators),
            Some(parent),
            "",
            NodeKind::Separator,
            true,
        );
    }

    /// Send entry for one destination: a direct leaf, or a mode selector with
    /// one leaf per mode for image and capture menus.
    fn entry(&mut self, parent: &NodeId, dest: &Destination, selector: Scope) {
        self.entry_titled(parent, dest, &destination_title(dest), selector);
    }

    fn entry_titled(&mut self, parent: &NodeId, dest: &Destination, title: &str, selector: Scope) {
        let modes = self.category.modes();
        if modes.is_empty() {
            self.push(
                parent.target(&dest.id, None),
                Some(parent),
                title,
                NodeKind::Leaf,
                true,
            );
            return;
        }

        let menu = parent.nest(selector);
        self.push(menu.clone(), Some(parent), title, NodeKind::ModeSelector, true);
        for &mode in modes {
            self.push(
                menu.target(&dest.id, Some(mode)),
                Some(&menu),
                mode_title(mode),
                NodeKind::Leaf,
                true,
            );
        }
    }

    fn parent_group(
        &mut self,
        root: &NodeId,
        parent: &Destination,
        topics: &[&Destination],
        input: &MenuInput<'_>,
    ) {
        let group = root.nest(Scope::Parent(parent.id.clone()));
        self.push(
            group.clone(),
            Some(root),
            &destination_title(parent),
            NodeKind::Group,
            true,
        );
        self.entry_titled(
            &group,
            parent,
            &format!("Send to {}", parent.name),
            Scope::SendParent(parent.id.clone()),
        );
        self.separator(&group);

        let ranked = rank_topics(topics, input.recency, input.options.top_topics);
        for topic in &ranked.top {
            self.entry(&group, topic, Scope::TopicMenu(topic.id.clone()));
        }

        if !ranked.more.is_empty() {
            let more = group.nest(Scope::More(parent.id.clone()));
            self.push(
                more.clone(),
                Some(&group),
                &format!("More Topics ({})", ranked.more.len()),
                NodeKind::Group,
                true,
            );
            for topic in &ranked.more {
                self.entry(&more, topic, Scope::TopicMenu(topic.id.clone()));
            }
        }
    }
}
