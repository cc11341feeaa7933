//! Outbound side of the host: core ports implemented as protocol messages.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Mutex,
    },
};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tokio::sync::{mpsc, oneshot};

use swiftshift_core::{
    capture::{Region, RegionRequest},
    errors::Error,
    menu::MenuNode,
    ports::{MenuRegistrar, Notifier, PageBridge},
    Result,
};

use crate::{
    framing::encode,
    protocol::{CaptureResult, CropResult, Outbound},
};

type Pending = HashMap<u64, oneshot::Sender<Result<serde_json::Value>>>;

/// Encodes outbound messages into frames for the writer task and correlates
/// request/response pairs by id.
pub struct HostBridge {
    frames: mpsc::UnboundedSender<Vec<u8>>,
    pending: Mutex<Pending>,
    next_id: AtomicU64,
    /// Last screenshot, so crops can reference it instead of resending it.
    last_capture: Mutex<Option<CaptureResult>>,
}

impl HostBridge {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Vec<u8>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let bridge = Self {
            frames: tx,
            pending: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            last_capture: Mutex::new(None),
        };
        (bridge, rx)
    }

    pub fn send(&self, msg: &Outbound) -> Result<()> {
        let frame = encode(msg)?;
        self.frames
            .send(frame)
            .map_err(|_| Error::Protocol("host output closed".to_string()))
    }

    fn pending(&self) -> Result<std::sync::MutexGuard<'_, Pending>> {
        self.pending
            .lock()
            .map_err(|_| Error::Protocol("pending request table poisoned".to_string()))
    }

    /// Send a request and wait for the matching `bridge_response`. No timeout:
    /// the extension always answers or the host shuts down.
    async fn request<T: DeserializeOwned>(&self, build: impl FnOnce(u64) -> Outbound) -> Result<T> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = oneshot::channel();
        self.pending()?.insert(id, tx);

        if let Err(e) = self.send(&build(id)) {
            self.pending()?.remove(&id);
            return Err(e);
        }

        let value = rx
            .await
            .map_err(|_| Error::Protocol(format!("bridge request {id} dropped")))??;
        Ok(serde_json::from_value(value)?)
    }

    /// Complete a pending request. Returns false for unknown ids.
    pub fn resolve(&self, id: u64, result: Option<serde_json::Value>, error: Option<String>) -> bool {
        let Ok(mut pending) = self.pending() else {
            return false;
        };
        let Some(tx) = pending.remove(&id) else {
            tracing::warn!(id, "bridge response for unknown request");
            return false;
        };
        let outcome = match error {
            Some(e) => Err(Error::External(e)),
            None => Ok(result.unwrap_or(serde_json::Value::Null)),
        };
        // The requester may have gone away; nothing to do then.
        let _ = tx.send(outcome);
        true
    }

    /// Fail every outstanding request, used on shutdown.
    pub fn fail_all(&self, reason: &str) {
        let Ok(mut pending) = self.pending() else {
            return;
        };
        for (_, tx) in pending.drain() {
            let _ = tx.send(Err(Error::Protocol(reason.to_string())));
        }
    }

    #[cfg(test)]
    fn pending_count(&self) -> usize {
        self.pending().map(|p| p.len()).unwrap_or_default()
    }
}

#[async_trait]
impl MenuRegistrar for HostBridge {
    async fn clear(&self) -> Result<()> {
        self.send(&Outbound::MenuClear)
    }

    async fn create(&self, node: &MenuNode) -> Result<()> {
        self.send(&Outbound::menu_create(node))
    }
}

#[async_trait]
impl Notifier for HostBridge {
    async fn notify(&self, title: &str, message: &str) -> Result<()> {
        self.send(&Outbound::Notify {
            title: title.to_string(),
            message: message.to_string(),
        })
    }
}

#[async_trait]
impl PageBridge for HostBridge {
    async fn open_url(&self, url: &str) -> Result<()> {
        self.send(&Outbound::OpenUrl {
            url: url.to_string(),
        })
    }

    async fn start_region_selection(&self, tab_id: Option<i64>, request: RegionRequest) -> Result<()> {
        self.send(&Outbound::StartRegionSelection { tab_id, request })
    }

    async fn capture_visible_tab(&self, tab_id: Option<i64>) -> Result<String> {
        let capture: CaptureResult = self
            .request(|id| Outbound::CaptureVisibleTab { id, tab_id })
            .await?;
        let data_url = capture.data_url.clone();
        if let Ok(mut last) = self.last_capture.lock() {
            *last = Some(capture);
        }
        Ok(data_url)
    }

    async fn crop_image(
        &self,
        data_url: &str,
        region: &Region,
        device_pixel_ratio: f64,
    ) -> Result<String> {
        let capture_id = self
            .last_capture
            .lock()
            .ok()
            .and_then(|last| {
                last.as_ref()
                    .filter(|c| c.data_url == data_url)
                    .and_then(|c| c.capture_id.clone())
            });
        let inline = capture_id.is_none().then(|| data_url.to_string());

        let cropped: CropResult = self
            .request(|id| Outbound::CropImage {
                id,
                capture_id,
                data_url: inline,
                region: *region,
                device_pixel_ratio,
            })
            .await?;
        Ok(cropped.data_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn decode(frame: Vec<u8>) -> serde_json::Value {
        serde_json::from_slice(&frame).unwrap()
    }

    #[tokio::test]
    async fn notifications_become_frames() {
        let (bridge, mut rx) = HostBridge::new();
        bridge.notify("✅ Sent to News", "hello").await.unwrap();
        let v = decode(rx.recv().await.unwrap());
        assert_eq!(v["type"], "notify");
        assert_eq!(v["title"], "✅ Sent to News");
    }

    #[tokio::test]
    async fn capture_waits_for_matching_response() {
        let (bridge, mut rx) = HostBridge::new();
        let bridge = Arc::new(bridge);

        let b = bridge.clone();
        let task = tokio::spawn(async move { b.capture_visible_tab(Some(3)).await });

        let req = decode(rx.recv().await.unwrap());
        assert_eq!(req["type"], "capture_visible_tab");
        assert_eq!(req["tabId"], 3);
        let id = req["id"].as_u64().unwrap();

        assert!(!bridge.resolve(id + 100, None, None));
        assert!(bridge.resolve(
            id,
            Some(serde_json::json!({"dataUrl": "data:image/png;base64,AA", "captureId": "c1"})),
            None
        ));
        assert_eq!(task.await.unwrap().unwrap(), "data:image/png;base64,AA");
        assert_eq!(bridge.pending_count(), 0);
    }

    #[tokio::test]
    async fn crop_references_the_last_capture() {
        let (bridge, mut rx) = HostBridge::new();
        let bridge = Arc::new(bridge);
        *bridge.last_capture.lock().unwrap() = Some(CaptureResult {
            data_url: "data:image/png;base64,AA".to_string(),
            capture_id: Some("c1".to_string()),
        });

        let b = bridge.clone();
        let region = Region {
            x: 0.0,
            y: 0.0,
            width: 5.0,
            height: 5.0,
        };
        let task =
            tokio::spawn(async move { b.crop_image("data:image/png;base64,AA", &region, 2.0).await });

        let req = decode(rx.recv().await.unwrap());
        assert_eq!(req["type"], "crop_image");
        assert_eq!(req["captureId"], "c1");
        assert!(req.get("dataUrl").is_none());
        bridge.resolve(
            req["id"].as_u64().unwrap(),
            Some(serde_json::json!({"dataUrl": "data:image/png;base64,BB"})),
            None,
        );
        assert_eq!(task.await.unwrap().unwrap(), "data:image/png;base64,BB");
    }

    #[tokio::test]
    async fn error_responses_and_shutdown_fail_requests() {
        let (bridge, mut rx) = HostBridge::new();
        let bridge = Arc::new(bridge);

        let b = bridge.clone();
        let denied = tokio::spawn(async move { b.capture_visible_tab(None).await });
        let id = decode(rx.recv().await.unwrap())["id"].as_u64().unwrap();
        bridge.resolve(id, None, Some("Cannot access a chrome:// URL".to_string()));
        let err = denied.await.unwrap().unwrap_err();
        assert!(err.to_string().contains("chrome://"));

        let b = bridge.clone();
        let pending = tokio::spawn(async move { b.capture_visible_tab(None).await });
        rx.recv().await.unwrap();
        bridge.fail_all("host shutting down");
        assert!(matches!(pending.await.unwrap(), Err(Error::Protocol(_))));
    }

    #[tokio::test]
    async fn closed_output_is_an_error() {
        let (bridge, rx) = HostBridge::new();
        drop(rx);
        assert!(bridge.open_url("https://t.me/x").await.is_err());
        assert!(bridge.capture_visible_tab(None).await.is_err());
        assert_eq!(bridge.pending_count(), 0);
    }
}
