//! Messages exchanged with the extension's background script.

use serde::{Deserialize, Serialize};

use swiftshift_core::{
    capture::{Region, RegionRequest, RegionSelected},
    domain::{ClickContext, Profile, RecentSend, TabMeta},
    menu::{MenuContext, MenuNode, NodeKind},
};

/// Extension → host.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum Inbound {
    MenuClicked {
        menu_item_id: String,
        #[serde(default)]
        info: ClickContext,
        #[serde(default)]
        tab: Option<TabMeta>,
    },
    TabActivated {
        #[serde(default)]
        url: Option<String>,
    },
    /// The dashboard edited profiles or destinations.
    DestinationsChanged {
        profiles: Vec<Profile>,
        #[serde(default)]
        active_profile_id: Option<String>,
    },
    RegionSelected(RegionSelected),
    Command {
        command: String,
        #[serde(default)]
        info: ClickContext,
        #[serde(default)]
        tab: Option<TabMeta>,
    },
    /// The popup asks for the recent list.
    StateRequested,
    BridgeResponse {
        id: u64,
        #[serde(default)]
        result: Option<serde_json::Value>,
        #[serde(default)]
        error: Option<String>,
    },
}

/// Host → extension.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum Outbound {
    MenuClear,
    MenuCreate {
        id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        parent_id: Option<String>,
        title: String,
        kind: NodeKind,
        contexts: Vec<MenuContext>,
        enabled: bool,
    },
    Notify {
        title: String,
        message: String,
    },
    OpenUrl {
        url: String,
    },
    StartRegionSelection {
        #[serde(skip_serializing_if = "Option::is_none")]
        tab_id: Option<i64>,
        request: RegionRequest,
    },
    CaptureVisibleTab {
        id: u64,
        #[serde(skip_serializing_if = "Option::is_none")]
        tab_id: Option<i64>,
    },
    /// Crops either a capture the extension still holds (`capture_id`) or the
    /// inline `data_url`.
    CropImage {
        id: u64,
        #[serde(skip_serializing_if = "Option::is_none")]
        capture_id: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        data_url: Option<String>,
        region: Region,
        device_pixel_ratio: f64,
    },
    State {
        recency: Vec<String>,
        recent_sends: Vec<RecentSend>,
    },
}

impl Outbound {
    pub fn menu_create(node: &MenuNode) -> Self {
        Outbound::MenuCreate {
            id: node.id.encode(),
            parent_id: node.parent.as_ref().map(|p| p.encode()),
            title: node.title.clone(),
            kind: node.kind,
            contexts: vec![node.context],
            enabled: node.enabled,
        }
    }
}

/// Result of a `capture_visible_tab` request.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureResult {
    pub data_url: String,
    #[serde(default)]
    pub capture_id: Option<String>,
}

/// Result of a `crop_image` request.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CropResult {
    pub data_url: String,
}
