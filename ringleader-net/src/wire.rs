//! Length-prefixed bincode framing for the RPC transport.

use bytes::{BufMut, BytesMut};
use ringleader_core::{Result, RingError};
use serde::{de::DeserializeOwned, Serialize};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

/// Maximum frame size (length field + payload). Election traffic is tiny;
/// anything past this is a corrupt or hostile peer.
pub const MAX_FRAME_SIZE: usize = 1024 * 1024;

/// Serialize a value and write it as one `u32`-length-prefixed frame.
pub async fn write_frame<W, T>(writer: &mut W, value: &T) -> Result<()>
where
    W: AsyncWriteExt + Unpin,
    T: Serialize,
{
    let payload =
        bincode::serialize(value).map_err(|e| RingError::serialization(e.to_string()))?;
    if payload.len() > MAX_FRAME_SIZE - 4 {
        return Err(RingError::transport(format!(
            "frame too large: {} bytes",
            payload.len()
        )));
    }

    let mut buf = BytesMut::with_capacity(4 + payload.len());
    buf.put_u32(payload.len() as u32);
    buf.put_slice(&payload);
    writer
        .write_all(&buf)
        .await
        .map_err(|e| RingError::transport(format!("failed to write frame: {e}")))?;
    writer
        .flush()
        .await
        .map_err(|e| RingError::transport(format!("failed to flush frame: {e}")))?;
    Ok(())
}

/// Read one frame and deserialize its payload.
pub async fn read_frame<R, T>(reader: &mut R) -> Result<T>
where
    R: AsyncReadExt + Unpin,
    T: DeserializeOwned,
{
    match try_read_frame(reader).await? {
        Some(value) => Ok(value),
        None => Err(RingError::transport("connection closed before frame")),
    }
}

/// Read one frame, treating a clean EOF before the length field as
/// end-of-stream rather than an error. Used by server connection loops.
pub async fn try_read_frame<R, T>(reader: &mut R) -> Result<Option<T>>
where
    R: AsyncReadExt + Unpin,
    T: DeserializeOwned,
{
    let length = match reader.read_u32().await {
        Ok(length) => length,
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => {
            return Err(RingError::transport(format!(
                "failed to read frame length: {e}"
            )))
        }
    };

    if length as usize > MAX_FRAME_SIZE - 4 {
        return Err(RingError::transport(format!(
            "frame too large: {length} bytes"
        )));
    }

    let mut payload = vec![0u8; length as usize];
    reader
        .read_exact(&mut payload)
        .await
        .map_err(|e| RingError::transport(format!("failed to read frame payload: {e}")))?;

    bincode::deserialize(&payload)
        .map(Some)
        .map_err(|e| RingError::serialization(e.to_string()))
}
