use async_trait::async_trait;

use crate::{
    domain::{ChatInfo, SendTarget},
    Result,
};

/// Telegram Bot API operations the engine needs.
///
/// The bot token is passed per call because it belongs to the active profile,
/// which can change between clicks.
#[async_trait]
pub trait SendService: Send + Sync {
    async fn send_text(&self, token: &str, target: &SendTarget, text: &str) -> Result<()>;

    async fn send_photo(
        &self,
        token: &str,
        target: &SendTarget,
        photo: &str,
        caption: Option<&str>,
    ) -> Result<()>;

    async fn send_document(
        &self,
        token: &str,
        target: &SendTarget,
        document: &str,
        caption: Option<&str>,
    ) -> Result<()>;

    async fn send_audio(
        &self,
        token: &str,
        target: &SendTarget,
        audio: &str,
        caption: Option<&str>,
    ) -> Result<()>;

    async fn chat_info(&self, token: &str, chat_id: &str) -> Result<ChatInfo>;

    async fn bot_username(&self, token: &str) -> Result<String>;
}
