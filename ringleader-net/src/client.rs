//! One-shot RPC client: connect, exchange a single framed request/response,
//! close.

use crate::wire::{read_frame, write_frame};
use ringleader_core::{Request, Result, RingError, WireReply};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;

/// Connection and exchange deadlines for a single call.
#[derive(Debug, Clone, Copy)]
pub struct CallTimeouts {
    pub connect: Duration,
    pub call: Duration,
}

impl Default for CallTimeouts {
    fn default() -> Self {
        Self {
            connect: Duration::from_secs(5),
            call: Duration::from_secs(10),
        }
    }
}

/// Perform one request/response exchange against `addr`.
pub async fn call(addr: SocketAddr, request: &Request, timeouts: CallTimeouts) -> Result<WireReply> {
    let mut stream = timeout(timeouts.connect, TcpStream::connect(addr))
        .await
        .map_err(|_| RingError::transport(format!("connect to {addr} timed out")))?
        .map_err(|e| RingError::transport(format!("connect to {addr} failed: {e}")))?;

    timeout(timeouts.call, async {
        write_frame(&mut stream, request).await?;
        read_frame::<_, WireReply>(&mut stream).await
    })
    .await
    .map_err(|_| RingError::transport(format!("call to {addr} timed out")))?
}

/// Decode a unit reply, surfacing faults as errors.
pub fn expect_ack(reply: WireReply) -> Result<()> {
    match reply {
        WireReply::Ack => Ok(()),
        WireReply::Fault(fault) => Err(fault.into()),
        other => Err(RingError::transport(format!(
            "unexpected reply to unit operation: {other:?}"
        ))),
    }
}

/// Decode a boolean reply.
pub fn expect_flag(reply: WireReply) -> Result<bool> {
    match reply {
        WireReply::Flag(value) => Ok(value),
        WireReply::Fault(fault) => Err(fault.into()),
        other => Err(RingError::transport(format!(
            "unexpected reply to boolean operation: {other:?}"
        ))),
    }
}

/// Decode a text reply.
pub fn expect_text(reply: WireReply) -> Result<String> {
    match reply {
        WireReply::Text(value) => Ok(value),
        WireReply::Fault(fault) => Err(fault.into()),
        other => Err(RingError::transport(format!(
            "unexpected reply to text operation: {other:?}"
        ))),
    }
}
