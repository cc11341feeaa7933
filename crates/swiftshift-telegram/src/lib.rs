//! Telegram adapter (teloxide).
//!
//! This crate implements the `swiftshift-core` SendService over Telegram Bot API.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use base64::Engine as _;

use teloxide::{
    prelude::*,
    types::{InputFile, Recipient},
};

use tokio::time::sleep;

use swiftshift_core::{
    domain::{ChatInfo, DestinationKind, SendTarget},
    errors::Error,
    send::port::SendService,
    Result,
};

/// Bot API client keyed by token: profiles can switch bots between clicks.
#[derive(Clone, Default)]
pub struct TelegramSender {
    bots: Arc<Mutex<HashMap<String, Bot>>>,
}

impl TelegramSender {
    pub fn new() -> Self {
        Self::default()
    }

    fn bot(&self, token: &str) -> Result<Bot> {
        if token.trim().is_empty() {
            return Err(Error::Config("bot token is empty".to_string()));
        }
        let mut bots = self
            .bots
            .lock()
            .map_err(|_| Error::External("bot cache poisoned".to_string()))?;
        Ok(bots
            .entry(token.to_string())
            .or_insert_with(|| Bot::new(token))
            .clone())
    }

    fn map_err(e: teloxide::RequestError) -> Error {
        Error::External(format!("telegram error: {e}"))
    }

    async fn with_retry<T, Fut>(&self, mut op: impl FnMut() -> Fut) -> Result<T>
    where
        Fut: std::future::IntoFuture<Output = std::result::Result<T, teloxide::RequestError>>,
        Fut::IntoFuture: Send,
    {
        const MAX_RETRIES: usize = 1;
        let mut attempts = 0usize;
        loop {
            match op().await {
                Ok(v) => return Ok(v),
                Err(e) => match e {
                    teloxide::RequestError::RetryAfter(d) if attempts < MAX_RETRIES => {
                        attempts += 1;
                        tracing::info!(wait = ?d, "telegram rate limit, retrying");
                        sleep(d).await;
                        continue;
                    }
                    other => return Err(Self::map_err(other)),
                },
            }
        }
    }
}

/// Numeric ids go out as chat ids, `@name` as a channel username.
pub fn recipient(chat_id: &str) -> Result<Recipient> {
    let chat_id = chat_id.trim();
    if let Ok(n) = chat_id.parse::<i64>() {
        return Ok(Recipient::Id(ChatId(n)));
    }
    if chat_id.starts_with('@') && chat_id.len() > 1 {
        return Ok(Recipient::ChannelUsername(chat_id.to_string()));
    }
    Err(Error::NotFound(format!("invalid chat id: {chat_id}")))
}

/// Decoded `data:<mime>;base64,<payload>` URL.
#[derive(Debug, PartialEq, Eq)]
pub struct DataUrl {
    pub mime: String,
    pub bytes: Vec<u8>,
}

pub fn decode_data_url(url: &str) -> Result<Option<DataUrl>> {
    let Some(rest) = url.strip_prefix("data:") else {
        return Ok(None);
    };
    let (meta, data) = rest
        .split_once(',')
        .ok_or_else(|| Error::Protocol("malformed data url".to_string()))?;
    let Some(mime) = meta.strip_suffix(";base64") else {
        return Err(Error::Protocol(
            "only base64 data urls are supported".to_string(),
        ));
    };
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(data.trim())
        .map_err(|e| Error::Protocol(format!("invalid base64 in data url: {e}")))?;
    Ok(Some(DataUrl {
        mime: mime.to_string(),
        bytes,
    }))
}

fn file_name_for(mime: &str) -> &'static str {
    match mime {
        "image/png" => "capture.png",
        "image/jpeg" => "capture.jpg",
        "image/webp" => "image.webp",
        "image/gif" => "image.gif",
        "image/svg+xml" => "image.svg",
        "audio/mpeg" => "audio.mp3",
        _ => "file.bin",
    }
}

/// Remote URLs are fetched by Telegram; data URLs are uploaded.
pub fn input_file(src: &str) -> Result<InputFile> {
    if let Some(data) = decode_data_url(src)? {
        let name = file_name_for(&data.mime);
        return Ok(InputFile::memory(data.bytes).file_name(name));
    }
    let url = reqwest::Url::parse(src)
        .map_err(|e| Error::Protocol(format!("invalid media url {src}: {e}")))?;
    Ok(InputFile::url(url))
}

fn caption_text(caption: Option<&str>) -> Option<String> {
    caption
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
}

#[async_trait]
impl SendService for TelegramSender {
    async fn send_text(&self, token: &str, target: &SendTarget, text: &str) -> Result<()> {
        let bot = self.bot(token)?;
        let to = recipient(&target.chat_id)?;
        self.with_retry(|| {
            let mut req = bot.send_message(to.clone(), text.to_string());
            if let Some(t) = target.thread_id {
                req = req.message_thread_id(t);
            }
            req
        })
        .await?;
        Ok(())
    }

    async fn send_photo(
        &self,
        token: &str,
        target: &SendTarget,
        photo: &str,
        caption: Option<&str>,
    ) -> Result<()> {
        let bot = self.bot(token)?;
        let to = recipient(&target.chat_id)?;
        let file = input_file(photo)?;
        let caption = caption_text(caption);
        self.with_retry(|| {
            let mut req = bot.send_photo(to.clone(), file.clone());
            if let Some(t) = target.thread_id {
                req = req.message_thread_id(t);
            }
            if let Some(c) = &caption {
                req = req.caption(c.clone());
            }
            req
        })
        .await?;
        Ok(())
    }

    async fn send_document(
        &self,
        token: &str,
        target: &SendTarget,
        document: &str,
        caption: Option<&str>,
    ) -> Result<()> {
        let bot = self.bot(token)?;
        let to = recipient(&target.chat_id)?;
        let file = input_file(document)?;
        let caption = caption_text(caption);
        self.with_retry(|| {
            let mut req = bot.send_document(to.clone(), file.clone());
            if let Some(t) = target.thread_id {
                req = req.message_thread_id(t);
            }
            if let Some(c) = &caption {
                req = req.caption(c.clone());
            }
            req
        })
        .await?;
        Ok(())
    }

    async fn send_audio(
        &self,
        token: &str,
        target: &SendTarget,
        audio: &str,
        caption: Option<&str>,
    ) -> Result<()> {
        let bot = self.bot(token)?;
        let to = recipient(&target.chat_id)?;
        let file = input_file(audio)?;
        let caption = caption_text(caption);
        self.with_retry(|| {
            let mut req = bot.send_audio(to.clone(), file.clone());
            if let Some(t) = target.thread_id {
                req = req.message_thread_id(t);
            }
            if let Some(c) = &caption {
                req = req.caption(c.clone());
            }
            req
        })
        .await?;
        Ok(())
    }

    async fn chat_info(&self, token: &str, chat_id: &str) -> Result<ChatInfo> {
        let bot = self.bot(token)?;
        let to = recipient(chat_id)?;
        let chat = self.with_retry(|| bot.get_chat(to.clone())).await?;

        let kind = if chat.is_channel() {
            Some(DestinationKind::Channel)
        } else if chat.is_group() || chat.is_supergroup() {
            Some(DestinationKind::Group)
        } else if chat.is_private() {
            Some(DestinationKind::Private)
        } else {
            None
        };
        Ok(ChatInfo {
            title: chat.title().map(str::to_string),
            kind,
        })
    }

    async fn bot_username(&self, token: &str) -> Result<String> {
        let bot = self.bot(token)?;
        let me = self.with_retry(|| bot.get_me()).await?;
        me.user
            .username
            .clone()
            .ok_or_else(|| Error::NotFound("bot has no username".to_string()))
    }
}
