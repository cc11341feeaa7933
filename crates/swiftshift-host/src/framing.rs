//! Native-messaging framing: a 4-byte little-endian length, then UTF-8 JSON.

use serde::Serialize;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use swiftshift_core::{errors::Error, Result};

/// Browsers cap messages from the host at 1 MiB.
pub const MAX_OUTBOUND_FRAME: usize = 1024 * 1024;
/// ... and messages to the host at 64 MiB.
pub const MAX_INBOUND_FRAME: usize = 64 * 1024 * 1024;

/// Read one frame. `Ok(None)` on a clean end of stream.
pub async fn read_frame<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Option<Vec<u8>>> {
    let len = match reader.read_u32_le().await {
        Ok(n) => n as usize,
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    if len > MAX_INBOUND_FRAME {
        return Err(Error::Protocol(format!("inbound frame too large: {len} bytes")));
    }

    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf).await?;
    Ok(Some(buf))
}

pub async fn write_frame<W: AsyncWrite + Unpin>(writer: &mut W, payload: &[u8]) -> Result<()> {
    let len = u32::try_from(payload.len())
        .map_err(|_| Error::Protocol("outbound frame length overflows u32".to_string()))?;
    writer.write_u32_le(len).await?;
    writer.write_all(payload).await?;
    writer.flush().await?;
    Ok(())
}

/// Serialize a message, rejecting anything the browser would drop.
pub fn encode<T: Serialize>(msg: &T) -> Result<Vec<u8>> {
    let bytes = serde_json::to_vec(msg)?;
    if bytes.len() > MAX_OUTBOUND_FRAME {
        return Err(Error::Protocol(format!(
            "outbound message too large: {} bytes",
            bytes.len()
        )));
    }
    Ok(bytes)
}
