//! Outbound sends: the Telegram port, a throttling decorator and payload dispatch.

pub mod port;
pub mod throttled;

use crate::{domain::SendTarget, payload::Payload, send::port::SendService, Result};

/// Send a payload with the call matching its variant.
///
/// With `send_as_file`, documents go out through `sendDocument` untouched; every
/// other case is routed by payload type.
pub async fn dispatch_payload(
    sender: &dyn SendService,
    token: &str,
    target: &SendTarget,
    payload: &Payload,
    send_as_file: bool,
) -> Result<()> {
    if send_as_file {
        if let Payload::Document { document, caption } = payload {
            return sender
                .send_document(token, target, document, caption.as_deref())
                .await;
        }
    }

    match payload {
        Payload::Photo { photo, caption } => {
            sender
                .send_photo(token, target, photo, caption.as_deref())
                .await
        }
        Payload::Document { document, caption } => {
            sender
                .send_document(token, target, document, caption.as_deref())
                .await
        }
        Payload::Audio { audio, caption } => {
            sender
                .send_audio(token, target, audio, caption.as_deref())
                .await
        }
        Payload::Text { text } => sender.send_text(token, target, text).await,
    }
}
