//! Hexagonal ports for everything outside the menu engine.
//!
//! The browser side (menus, notifications, tabs) is implemented by the host
//! crate; Telegram lives behind [`crate::send::port::SendService`].

use async_trait::async_trait;

use crate::{
    capture::{Region, RegionRequest},
    domain::{Destination, Profile, RecentSend},
    menu::MenuNode,
    Result,
};

/// Profiles, destinations and recency state.
#[async_trait]
pub trait DestinationStore: Send + Sync {
    async fn active_profile(&self) -> Result<Option<Profile>>;

    async fn update_destinations(&self, profile_id: &str, destinations: Vec<Destination>)
        -> Result<()>;

    /// Most-recent-first destination ids.
    async fn recency(&self) -> Result<Vec<String>>;

    async fn push_recency(&self, destination_id: &str) -> Result<()>;

    async fn push_recent_send(&self, entry: RecentSend) -> Result<()>;

    async fn recent_sends(&self) -> Result<Vec<RecentSend>>;
}

/// Native context-menu registrar.
#[async_trait]
pub trait MenuRegistrar: Send + Sync {
    async fn clear(&self) -> Result<()>;
    async fn create(&self, node: &MenuNode) -> Result<()>;
}

/// User-visible notifications (toasts / system notifications).
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, title: &str, message: &str) -> Result<()>;
}

/// Browser tab and page-context operations.
#[async_trait]
pub trait PageBridge: Send + Sync {
    async fn open_url(&self, url: &str) -> Result<()>;

    /// Ask the page to show the region-selection overlay. Completion arrives
    /// later as a separate `region_selected` message.
    async fn start_region_selection(&self, tab_id: Option<i64>, req: RegionRequest) -> Result<()>;

    /// Screenshot of the visible tab as a `data:image/png;base64,...` URL.
    async fn capture_visible_tab(&self, tab_id: Option<i64>) -> Result<String>;

    async fn crop_image(&self, data_url: &str, region: &Region, device_pixel_ratio: f64)
        -> Result<String>;
}
