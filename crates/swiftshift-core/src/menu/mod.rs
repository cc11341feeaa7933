//! Context-menu engine: typed node ids, topic ranking, the pure tree builder
//! and the adapter that applies it to a native registrar.

pub mod adapter;
pub mod builder;
pub mod codec;
pub mod ranking;
pub mod service;

use serde::Serialize;

use crate::domain::Category;

pub use codec::{NodeId, Scope};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Root,
    Group,
    Leaf,
    ModeSelector,
    Separator,
    Placeholder,
}

/// Native trigger condition a node is shown for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MenuContext {
    Selection,
    Link,
    Image,
    Video,
    Audio,
    Page,
}

impl MenuContext {
    pub fn for_category(category: Category) -> MenuContext {
        match category {
            Category::Text => MenuContext::Selection,
            Category::Link => MenuContext::Link,
            Category::Image => MenuContext::Image,
            Category::Video => MenuContext::Video,
            Category::Audio => MenuContext::Audio,
            Category::Page | Category::Capture => MenuContext::Page,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct MenuNode {
    pub id: NodeId,
    pub parent: Option<NodeId>,
    pub title: String,
    pub kind: NodeKind,
    pub context: MenuContext,
    pub enabled: bool,
}

/// One instruction for the native registrar, produced by the builder.
#[derive(Clone, Debug, PartialEq)]
pub enum MenuCommand {
    Clear,
    Create(MenuNode),
}
