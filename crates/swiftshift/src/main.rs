use std::sync::Arc;

use anyhow::Context;
use tokio_util::sync::CancellationToken;

use swiftshift_core::{
    activity::ActivityLog,
    capture::CaptureOrchestrator,
    config::Config,
    delivery::Delivery,
    menu::{builder::MenuOptions, service::MenuService},
    preview::LinkPreviewer,
    router::ClickRouter,
    send::throttled::{ThrottleConfig, ThrottledSender},
    store::{JsonFileStore, StoreLimits},
};
use swiftshift_host::{run_host, HostApp, HostBridge};
use swiftshift_telegram::TelegramSender;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    swiftshift_core::logging::init("swiftshift")?;

    let cfg = Config::load().context("failed to load configuration")?;

    let store = Arc::new(
        JsonFileStore::open(
            &cfg.store_path,
            StoreLimits {
                recency_retain: cfg.recency_retain,
                recent_sends_max: cfg.recent_sends_max,
            },
        )
        .with_context(|| format!("failed to open store {}", cfg.store_path.display()))?,
    );

    let (bridge, frames) = HostBridge::new();
    let bridge = Arc::new(bridge);

    let sender = Arc::new(ThrottledSender::new(
        Arc::new(TelegramSender::new()),
        ThrottleConfig {
            global_min_interval: cfg.send_min_interval,
            per_chat_min_interval: cfg.chat_min_interval,
        },
    ));

    let menu = Arc::new(MenuService::new(
        store.clone(),
        bridge.clone(),
        MenuOptions {
            top_topics: cfg.top_topics,
            telegram_web_origin: cfg.telegram_web_origin.clone(),
        },
    ));

    let delivery = Delivery::new(
        store.clone(),
        sender,
        bridge.clone(),
        menu.clone(),
        ActivityLog::new(&cfg.activity_log_path, cfg.activity_log_json),
    )
    .with_previewer(LinkPreviewer::new(cfg.preview_timeout)?);
    let delivery = Arc::new(delivery);

    let capture = Arc::new(CaptureOrchestrator::new(delivery.clone(), bridge.clone()));
    let router = Arc::new(ClickRouter::new(delivery, capture, bridge.clone()));

    let app = Arc::new(HostApp {
        store,
        menu,
        router,
        bridge,
        recency_display: cfg.recency_display,
    });

    tracing::info!(store = %cfg.store_path.display(), "swiftshift host started");
    run_host(
        tokio::io::stdin(),
        tokio::io::stdout(),
        app,
        frames,
        CancellationToken::new(),
    )
    .await
    .context("host loop failed")?;

    Ok(())
}
