//! Screenshot and region capture flows.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{
    delivery::Delivery,
    domain::{thread_part, SendMode, TabMeta},
    payload::Payload,
    ports::PageBridge,
};

/// Selected rectangle in CSS pixels.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Region {
    pub fn is_empty(&self) -> bool {
        !(self.width > 0.0 && self.height > 0.0)
    }
}

/// Sent into the page to start the selection overlay.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionRequest {
    pub destination_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination_name: Option<String>,
}

/// Completion message from the page once the user finished selecting.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionSelected {
    pub destination_id: String,
    pub region: Region,
    #[serde(default = "default_pixel_ratio")]
    pub device_pixel_ratio: f64,
    #[serde(default)]
    pub page_title: String,
    #[serde(default)]
    pub page_url: String,
    #[serde(default)]
    pub tab_id: Option<i64>,
}

fn default_pixel_ratio() -> f64 {
    1.0
}

/// Browsers refuse to screenshot or inject into these.
pub fn is_restricted_page(url: &str) -> bool {
    const PREFIXES: [&str; 8] = [
        "chrome://",
        "chrome-extension://",
        "edge://",
        "about:",
        "view-source:",
        "moz-extension://",
        "https://chrome.google.com/webstore",
        "https://chromewebstore.google.com",
    ];
    PREFIXES.iter().any(|p| url.starts_with(p))
}

pub struct CaptureOrchestrator {
    delivery: Arc<Delivery>,
    bridge: Arc<dyn PageBridge>,
}

impl CaptureOrchestrator {
    pub fn new(delivery: Arc<Delivery>, bridge: Arc<dyn PageBridge>) -> Self {
        Self { delivery, bridge }
    }

    /// Capture the current tab for `destination_id`. A missing mode means photo.
    pub async fn capture_to(
        &self,
        destination_id: &str,
        mode: Option<SendMode>,
        tab: Option<&TabMeta>,
    ) {
        let page_url = tab.map(|t| t.url.as_str()).unwrap_or_default();
        if is_restricted_page(page_url) {
            self.delivery
                .report_failure(
                    "capture",
                    Some(destination_id),
                    "❌ Capture failed",
                    "This page cannot be captured.",
                    Some(page_url),
                )
                .await;
            return;
        }

        let tab_id = tab.and_then(|t| t.id);
        match mode.unwrap_or(SendMode::Photo) {
            SendMode::Region => self.start_region(destination_id, tab_id, page_url).await,
            SendMode::Photo => {
                self.capture_visible(destination_id, tab_id, page_url, false)
                    .await
            }
            SendMode::File => {
                self.capture_visible(destination_id, tab_id, page_url, true)
                    .await
            }
        }
    }

    async fn capture_visible(
        &self,
        destination_id: &str,
        tab_id: Option<i64>,
        page_url: &str,
        as_file: bool,
    ) {
        let data_url = match self.bridge.capture_visible_tab(tab_id).await {
            Ok(u) => u,
            Err(e) => {
                self.delivery
                    .report_failure(
                        "capture",
                        Some(destination_id),
                        "❌ Capture failed",
                        &e.to_string(),
                        Some(page_url),
                    )
                    .await;
                return;
            }
        };

        let caption = Some(page_url.to_string()).filter(|u| !u.is_empty());
        let payload = if as_file {
            Payload::Document {
                document: data_url,
                caption,
            }
        } else {
            Payload::Photo {
                photo: data_url,
                caption,
            }
        };
        self.delivery
            .deliver(destination_id, &payload, as_file, Some(page_url))
            .await;
    }

    async fn start_region(&self, destination_id: &str, tab_id: Option<i64>, page_url: &str) {
        // Name and thread are cosmetic for the overlay; a store failure is not fatal.
        let dest = match self.delivery.store().active_profile().await {
            Ok(Some(profile)) => profile.find(destination_id).cloned(),
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(error = %e, "failed to load profile for region selection");
                None
            }
        };
        let req = RegionRequest {
            destination_id: destination_id.to_string(),
            thread_id: dest
                .as_ref()
                .and_then(|d| d.thread_id())
                .or_else(|| thread_part(destination_id)),
            destination_name: dest.map(|d| d.name),
        };

        if let Err(e) = self.bridge.start_region_selection(tab_id, req).await {
            self.delivery
                .report_failure(
                    "capture",
                    Some(destination_id),
                    "❌ Region selection failed",
                    &e.to_string(),
                    Some(page_url),
                )
                .await;
            return;
        }
        tracing::info!(destination = destination_id, "region selection started");
    }

    /// Second half of the region flow: crop the screenshot and send it as a photo.
    pub async fn on_region_selected(&self, sel: RegionSelected) {
        let dest = sel.destination_id.as_str();
        let page_url = sel.page_url.as_str();

        if sel.region.is_empty() {
            self.delivery
                .report_failure(
                    "capture",
                    Some(dest),
                    "❌ Capture failed",
                    "The selected region is empty.",
                    Some(page_url),
                )
                .await;
            return;
        }

        let cropped = async {
            let full = self.bridge.capture_visible_tab(sel.tab_id).await?;
            self.bridge
                .crop_image(&full, &sel.region, sel.device_pixel_ratio)
                .await
        }
        .await;

        let photo = match cropped {
            Ok(p) => p,
            Err(e) => {
                self.delivery
                    .report_failure(
                        "capture",
                        Some(dest),
                        "❌ Capture failed",
                        &e.to_string(),
                        Some(page_url),
                    )
                    .await;
                return;
            }
        };

        let caption = match (sel.page_title.trim(), page_url) {
            (_, "") => None,
            ("", url) => Some(url.to_string()),
            (title, url) => Some(format!("{title}\n{url}")),
        };
        let payload = Payload::Photo { photo, caption };
        self.delivery
            .deliver(dest, &payload, false, Some(page_url))
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delivery::testing::*;

    fn tab(url: &str) -> TabMeta {
        TabMeta {
            id: Some(7),
            title: "Example".to_string(),
            url: url.to_string(),
        }
    }

    fn orchestrator(h: &Harness) -> CaptureOrchestrator {
        CaptureOrchestrator::new(h.delivery.clone(), h.bridge.clone())
    }

    #[tokio::test]
    async fn photo_and_file_capture_send_the_screenshot() {
        let h = Harness::new(
            MemoryStore::with_profile(news_profile()),
            RecordingSender::default(),
        );
        let cap = orchestrator(&h);
        let t = tab("https://example.com");

        cap.capture_to("-100111", Some(SendMode::Photo), Some(&t)).await;
        cap.capture_to("-100111", Some(SendMode::File), Some(&t)).await;
        cap.capture_to("-100111", None, Some(&t)).await;

        assert_eq!(
            h.sender.calls(),
            vec![
                "photo -100111 data:image/png;base64,AAAA",
                "document -100111 data:image/png;base64,AAAA",
                "photo -100111 data:image/png;base64,AAAA",
            ]
        );
        assert_eq!(h.notifier.titles().len(), 3);
    }

    #[tokio::test]
    async fn region_mode_only_starts_the_overlay() {
        let h = Harness::new(
            MemoryStore::with_profile(news_profile()),
            RecordingSender::default(),
        );
        orchestrator(&h)
            .capture_to("-100111:55", Some(SendMode::Region), Some(&tab("https://a.b")))
            .await;

        assert_eq!(
            *h.bridge.calls.lock().unwrap(),
            vec![r#"region -100111:55 Some(55) Some("Sports")"#]
        );
        assert!(h.sender.calls().is_empty());
        assert!(h.notifier.titles().is_empty());
    }

    #[tokio::test]
    async fn region_selected_crops_and_sends_photo() {
        let h = Harness::new(
            MemoryStore::with_profile(news_profile()),
            RecordingSender::default(),
        );
        let sel: RegionSelected = serde_json::from_value(serde_json::json!({
            "destinationId": "-100111",
            "region": {"x": 1.0, "y": 2.0, "width": 30.0, "height": 40.0},
            "devicePixelRatio": 2.0,
            "pageTitle": "Example",
            "pageUrl": "https://example.com",
        }))
        .unwrap();

        orchestrator(&h).on_region_selected(sel).await;

        assert_eq!(
            *h.bridge.calls.lock().unwrap(),
            vec!["capture", "crop 30x40@2"]
        );
        assert_eq!(
            h.sender.calls(),
            vec!["photo -100111 data:image/png;base64,AAAACROP"]
        );
        assert_eq!(h.notifier.titles(), vec!["✅ Sent to News"]);
    }

    #[tokio::test]
    async fn restricted_pages_fail_with_one_notification() {
        let h = Harness::new(
            MemoryStore::with_profile(news_profile()),
            RecordingSender::default(),
        );
        orchestrator(&h)
            .capture_to("-100111", Some(SendMode::Photo), Some(&tab("chrome://extensions")))
            .await;

        assert!(h.bridge.calls.lock().unwrap().is_empty());
        assert_eq!(h.notifier.titles(), vec!["❌ Capture failed"]);
        let log = h.log_lines();
        assert_eq!(log[0]["page_url"], "chrome://extensions");
    }

    #[tokio::test]
    async fn bridge_errors_are_reported() {
        let bridge = FakeBridge {
            capture_error: Some("missing activeTab permission".to_string()),
            ..FakeBridge::default()
        };
        let h = Harness::with_bridge(
            MemoryStore::with_profile(news_profile()),
            RecordingSender::default(),
            bridge,
        );
        orchestrator(&h)
            .capture_to("-100111", Some(SendMode::File), Some(&tab("https://example.com")))
            .await;

        assert!(h.sender.calls().is_empty());
        assert_eq!(h.notifier.titles(), vec!["❌ Capture failed"]);
    }
}
