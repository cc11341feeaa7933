use std::{collections::HashMap, sync::Arc, time::Duration};

use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};

use crate::{
    domain::{ChatInfo, SendTarget},
    send::port::SendService,
    Result,
};

#[derive(Clone, Copy, Debug)]
pub struct ThrottleConfig {
    /// Minimum spacing between *any* Bot API calls (global flood control).
    pub global_min_interval: Duration,
    /// Minimum spacing between sends to the same chat.
    pub per_chat_min_interval: Duration,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            global_min_interval: Duration::from_millis(40), // ~25/sec
            per_chat_min_interval: Duration::from_millis(1050), // ~0.95/sec
        }
    }
}

#[derive(Debug)]
struct IntervalLimiter {
    interval: Duration,
    next: Instant,
}

impl IntervalLimiter {
    fn new(interval: Duration) -> Self {
        Self {
            interval,
            next: Instant::now(),
        }
    }

    /// Reserve the next slot and return the wait duration required before executing.
    fn reserve(&mut self) -> Duration {
        let now = Instant::now();
        let start = if now >= self.next { now } else { self.next };
        self.next = start + self.interval;
        start.saturating_duration_since(now)
    }
}

/// SendService decorator that spaces out outbound calls.
///
/// Bursts come from quick-send shortcuts and repeated clicks on the same
/// destination; this keeps them under Telegram's per-chat limits instead of
/// surfacing 429s as failed sends.
pub struct ThrottledSender {
    inner: Arc<dyn SendService>,
    cfg: ThrottleConfig,
    global: Mutex<IntervalLimiter>,
    per_chat: Mutex<HashMap<String, Arc<Mutex<IntervalLimiter>>>>,
}

impl ThrottledSender {
    pub fn new(inner: Arc<dyn SendService>, cfg: ThrottleConfig) -> Self {
        Self {
            inner,
            cfg,
            global: Mutex::new(IntervalLimiter::new(cfg.global_min_interval)),
            per_chat: Mutex::new(HashMap::new()),
        }
    }

    async fn limiter_for_chat(&self, chat_id: &str) -> Arc<Mutex<IntervalLimiter>> {
        let mut map = self.per_chat.lock().await;
        map.entry(chat_id.to_string())
            .or_insert_with(|| {
                Arc::new(Mutex::new(IntervalLimiter::new(
                    self.cfg.per_chat_min_interval,
                )))
            })
            .clone()
    }

    async fn throttle_chat(&self, chat_id: &str) {
        let global_wait = { self.global.lock().await.reserve() };
        let chat_wait = {
            let lim = self.limiter_for_chat(chat_id).await;
            let mut guard = lim.lock().await;
            guard.reserve()
        };

        let wait = global_wait.max(chat_wait);
        if !wait.is_zero() {
            sleep(wait).await;
        }
    }

    async fn throttle_global(&self) {
        let wait = { self.global.lock().await.reserve() };
        if !wait.is_zero() {
            sleep(wait).await;
        }
    }
}

#[async_trait::async_trait]
impl SendService for ThrottledSender {
    async fn send_text(&self, token: &str, target: &SendTarget, text: &str) -> Result<()> {
        self.throttle_chat(&target.chat_id).await;
        self.inner.send_text(token, target, text).await
    }

    async fn send_photo(
        &self,
        token: &str,
        target: &SendTarget,
        photo: &str,
        caption: Option<&str>,
    ) -> Result<()> {
        self.throttle_chat(&target.chat_id).await;
        self.inner.send_photo(token, target, photo, caption).await
    }

    async fn send_document(
        &self,
        token: &str,
        target: &SendTarget,
        document: &str,
        caption: Option<&str>,
    ) -> Result<()> {
        self.throttle_chat(&target.chat_id).await;
        self.inner
            .send_document(token, target, document, caption)
            .await
    }

    async fn send_audio(
        &self,
        token: &str,
        target: &SendTarget,
        audio: &str,
        caption: Option<&str>,
    ) -> Result<()> {
        self.throttle_chat(&target.chat_id).await;
        self.inner.send_audio(token, target, audio, caption).await
    }

    async fn chat_info(&self, token: &str, chat_id: &str) -> Result<ChatInfo> {
        self.throttle_global().await;
        self.inner.chat_info(token, chat_id).await
    }

    async fn bot_username(&self, token: &str) -> Result<String> {
        // No chat involved; apply global throttling only.
        self.throttle_global().await;
        self.inner.bot_username(token).await
    }
}
