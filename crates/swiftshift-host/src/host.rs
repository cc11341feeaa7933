use std::sync::Arc;

use tokio::{
    io::{AsyncRead, AsyncWrite},
    sync::mpsc,
};
use tokio_util::sync::CancellationToken;

use swiftshift_core::{
    menu::service::MenuService, ports::DestinationStore, router::ClickRouter, store::JsonFileStore,
    Result,
};

use crate::{
    bridge::HostBridge,
    framing::{read_frame, write_frame},
    protocol::{Inbound, Outbound},
};

/// Everything inbound messages are dispatched to.
pub struct HostApp {
    pub store: Arc<JsonFileStore>,
    pub menu: Arc<MenuService>,
    pub router: Arc<ClickRouter>,
    pub bridge: Arc<HostBridge>,
    /// How many recency entries the popup gets.
    pub recency_display: usize,
}

impl HostApp {
    /// Route one inbound message.
    ///
    /// Messages that change state are applied here, in arrival order, before
    /// the next frame is read. Only the menu rebuild they trigger is spawned.
    /// Clicks, commands and region completions run on their own tasks so the
    /// read loop keeps draining bridge responses.
    pub async fn dispatch(self: &Arc<Self>, msg: Inbound) {
        match msg {
            Inbound::BridgeResponse { id, result, error } => {
                self.bridge.resolve(id, result, error);
            }
            Inbound::MenuClicked {
                menu_item_id,
                info,
                tab,
            } => {
                let app = self.clone();
                tokio::spawn(async move {
                    app.router
                        .on_menu_click(&menu_item_id, &info, tab.as_ref())
                        .await;
                });
            }
            Inbound::Command { command, info, tab } => {
                let app = self.clone();
                tokio::spawn(async move {
                    app.router.on_command(&command, &info, tab.as_ref()).await;
                });
            }
            Inbound::RegionSelected(sel) => {
                let app = self.clone();
                tokio::spawn(async move {
                    app.router.capture().on_region_selected(sel).await;
                });
            }
            Inbound::TabActivated { url } => {
                if self.menu.record_active_tab(url).await {
                    self.spawn_refresh();
                }
            }
            Inbound::DestinationsChanged {
                profiles,
                active_profile_id,
            } => match self.store.replace_profiles(profiles, active_profile_id).await {
                Ok(()) => self.spawn_refresh(),
                Err(e) => tracing::warn!(error = %e, "rejected destinations update"),
            },
            Inbound::StateRequested => {
                let app = self.clone();
                tokio::spawn(async move {
                    if let Err(e) = app.send_state().await {
                        tracing::warn!(error = %e, "failed to send state");
                    }
                });
            }
        }
    }

    fn spawn_refresh(self: &Arc<Self>) {
        let app = self.clone();
        tokio::spawn(async move { app.menu.refresh().await });
    }

    async fn send_state(&self) -> Result<()> {
        let mut recency = self.store.recency().await?;
        recency.truncate(self.recency_display);
        let recent_sends = self.store.recent_sends().await?;
        self.bridge.send(&Outbound::State {
            recency,
            recent_sends,
        })
    }
}

/// Run the host until stdin closes or `cancel` fires.
///
/// The initial menu build happens here, once the writer is draining frames.
pub async fn run_host<R, W>(
    mut reader: R,
    mut writer: W,
    app: Arc<HostApp>,
    mut frames: mpsc::UnboundedReceiver<Vec<u8>>,
    cancel: CancellationToken,
) -> Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let writer_cancel = cancel.clone();
    let writer_task = tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = writer_cancel.cancelled() => break,
                frame = frames.recv() => {
                    let Some(frame) = frame else { break };
                    if let Err(e) = write_frame(&mut writer, &frame).await {
                        tracing::error!(error = %e, "failed to write frame; stopping host");
                        writer_cancel.cancel();
                        break;
                    }
                }
            }
        }
    });

    app.spawn_refresh();

    let result = loop {
        let frame = tokio::select! {
            _ = cancel.cancelled() => break Ok(()),
            frame = read_frame(&mut reader) => frame,
        };

        match frame {
            Ok(Some(buf)) => match serde_json::from_slice::<Inbound>(&buf) {
                Ok(msg) => app.dispatch(msg).await,
                Err(e) => tracing::warn!(error = %e, "ignoring malformed message"),
            },
            Ok(None) => {
                tracing::info!("extension disconnected");
                break Ok(());
            }
            Err(e) => break Err(e),
        }
    };

    cancel.cancel();
    app.bridge.fail_all("host shutting down");
    let _ = writer_task.await;
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use swiftshift_core::{
        activity::ActivityLog,
        capture::CaptureOrchestrator,
        delivery::Delivery,
        domain::{ChatInfo, SendTarget},
        menu::builder::MenuOptions,
        send::port::SendService,
        store::StoreLimits,
    };
    use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};

    struct NoopSender;

    #[async_trait]
    impl SendService for NoopSender {
        async fn send_text(&self, _: &str, _: &SendTarget, _: &str) -> Result<()> {
            Ok(())
        }
        async fn send_photo(&self, _: &str, _: &SendTarget, _: &str, _: Option<&str>) -> Result<()> {
            Ok(())
        }
        async fn send_document(
            &self,
            _: &str,
            _: &SendTarget,
            _: &str,
            _: Option<&str>,
        ) -> Result<()> {
            Ok(())
        }
        async fn send_audio(&self, _: &str, _: &SendTarget, _: &str, _: Option<&str>) -> Result<()> {
            Ok(())
        }
        async fn chat_info(&self, _: &str, _: &str) -> Result<ChatInfo> {
            Ok(ChatInfo {
                title: None,
                kind: None,
            })
        }
        async fn bot_username(&self, _: &str) -> Result<String> {
            Ok("bot".to_string())
        }
    }

    fn app(prefix: &str) -> (Arc<HostApp>, mpsc::UnboundedReceiver<Vec<u8>>, Vec<std::path::PathBuf>) {
        let pid = std::process::id();
        let store_path = std::path::PathBuf::from(format!("/tmp/{prefix}-{pid}.json"));
        let log_path = std::path::PathBuf::from(format!("/tmp/{prefix}-{pid}.log"));
        let _ = std::fs::remove_file(&store_path);

        let store = Arc::new(JsonFileStore::open(&store_path, StoreLimits::default()).unwrap());
        let (bridge, frames) = HostBridge::new();
        let bridge = Arc::new(bridge);
        let menu = Arc::new(MenuService::new(
            store.clone(),
            bridge.clone(),
            MenuOptions::default(),
        ));
        let delivery = Arc::new(Delivery::new(
            store.clone(),
            Arc::new(NoopSender),
            bridge.clone(),
            menu.clone(),
            ActivityLog::new(&log_path, true),
        ));
        let capture = Arc::new(CaptureOrchestrator::new(delivery.clone(), bridge.clone()));
        let router = Arc::new(ClickRouter::new(delivery, capture, bridge.clone()));
        let app = Arc::new(HostApp {
            store,
            menu,
            router,
            bridge,
            recency_display: 5,
        });
        (app, frames, vec![store_path, log_path])
    }

    async fn send(w: &mut DuplexStream, v: serde_json::Value) {
        let body = serde_json::to_vec(&v).unwrap();
        w.write_u32_le(body.len() as u32).await.unwrap();
        w.write_all(&body).await.unwrap();
    }

    async fn recv(r: &mut DuplexStream) -> serde_json::Value {
        let len = r.read_u32_le().await.unwrap() as usize;
        let mut buf = vec![0; len];
        r.read_exact(&mut buf).await.unwrap();
        serde_json::from_slice(&buf).unwrap()
    }

    /// Frames until one of type `ty` shows up.
    async fn recv_until(r: &mut DuplexStream, ty: &str) -> serde_json::Value {
        loop {
            let v = recv(r).await;
            if v["type"] == ty {
                return v;
            }
        }
    }

    #[tokio::test]
    async fn startup_builds_placeholder_menu_and_routes_clicks() {
        let (app, frames, cleanup) = app("swiftshift-host-startup");
        let (mut ext_in, host_in) = tokio::io::duplex(1 << 16);
        let (host_out, mut ext_out) = tokio::io::duplex(1 << 16);
        let cancel = CancellationToken::new();
        let host = tokio::spawn(run_host(host_in, host_out, app, frames, cancel.clone()));

        assert_eq!(recv(&mut ext_out).await["type"], "menu_clear");
        let first = recv(&mut ext_out).await;
        assert_eq!(first["type"], "menu_create");
        assert_eq!(first["id"], "swiftshift-text");

        send(
            &mut ext_in,
            json!({"type": "menu_clicked", "menuItemId": "swiftshift-text-setup-required"}),
        )
        .await;
        let note = recv_until(&mut ext_out, "notify").await;
        assert_eq!(note["title"], "Set up SwiftShift");

        drop(ext_in);
        host.await.unwrap().unwrap();
        for p in cleanup {
            let _ = std::fs::remove_file(p);
        }
    }

    #[tokio::test]
    async fn destinations_update_rebuilds_and_state_is_served() {
        let (app, frames, cleanup) = app("swiftshift-host-dest");
        let (mut ext_in, host_in) = tokio::io::duplex(1 << 16);
        let (host_out, mut ext_out) = tokio::io::duplex(1 << 16);
        let cancel = CancellationToken::new();
        let host = tokio::spawn(run_host(host_in, host_out, app, frames, cancel.clone()));

        send(
            &mut ext_in,
            json!({
                "type": "destinations_changed",
                "activeProfileId": "main",
                "profiles": [{
                    "id": "main", "name": "Main", "botToken": "1:x",
                    "destinations": [{"id": "-100111", "type": "channel", "name": "News"}]
                }]
            }),
        )
        .await;

        loop {
            let v = recv_until(&mut ext_out, "menu_create").await;
            if v["id"] == "swiftshift-text-target--100111" {
                assert_eq!(v["title"], "News");
                break;
            }
        }

        send(&mut ext_in, json!({"type": "state_requested"})).await;
        let state = recv_until(&mut ext_out, "state").await;
        assert_eq!(state["recency"], json!([]));

        cancel.cancel();
        host.await.unwrap().unwrap();
        for p in cleanup {
            let _ = std::fs::remove_file(p);
        }
    }

    fn profiles_named(name: &str) -> Inbound {
        serde_json::from_value(json!({
            "type": "destinations_changed",
            "activeProfileId": "main",
            "profiles": [{
                "id": "main", "name": name, "botToken": "1:x",
                "destinations": [{"id": "-100111", "type": "channel", "name": name}]
            }]
        }))
        .unwrap()
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn back_to_back_destination_updates_apply_in_order() {
        let (app, _frames, cleanup) = app("swiftshift-host-order");

        for round in 0..50 {
            app.dispatch(profiles_named(&format!("First {round}"))).await;
            app.dispatch(profiles_named(&format!("Second {round}"))).await;

            let profile = app.store.active_profile().await.unwrap().unwrap();
            assert_eq!(profile.name, format!("Second {round}"));
        }

        let reopened = JsonFileStore::open(&cleanup[0], StoreLimits::default()).unwrap();
        let profile = reopened.active_profile().await.unwrap().unwrap();
        assert_eq!(profile.name, "Second 49");

        for p in cleanup {
            let _ = std::fs::remove_file(p);
        }
    }

    #[tokio::test]
    async fn latest_tab_activation_decides_the_gate() {
        let (app, _frames, cleanup) = app("swiftshift-host-tab");

        app.dispatch(Inbound::TabActivated {
            url: Some("https://web.telegram.org/k/#-100111".to_string()),
        })
        .await;
        app.dispatch(Inbound::TabActivated {
            url: Some("https://example.com/".to_string()),
        })
        .await;

        assert!(
            !app.menu
                .record_active_tab(Some("https://example.org/".to_string()))
                .await
        );
        for p in cleanup {
            let _ = std::fs::remove_file(p);
        }
    }
}
