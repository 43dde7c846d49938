//! Framed request server.
//!
//! Accepts connections, reads framed [`Request`]s, dispatches them to a
//! [`RequestHandler`], and writes framed replies until the peer closes the
//! connection or shutdown is signalled.

use crate::wire::{try_read_frame, write_frame};
use async_trait::async_trait;
use ringleader_core::{Request, Result, RingError, WireReply};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tracing::{debug, warn};

/// Dispatches one request to a reply. Implementations must not panic on
/// malformed variants; they fault instead.
#[async_trait]
pub trait RequestHandler: Send + Sync {
    async fn handle(&self, request: Request) -> WireReply;
}

/// A running RPC listener with cooperative shutdown.
pub struct RpcServer {
    local_addr: SocketAddr,
    shutdown_tx: watch::Sender<bool>,
}

impl RpcServer {
    /// Bind `addr` and start serving `handler` in the background.
    pub async fn start(addr: SocketAddr, handler: Arc<dyn RequestHandler>) -> Result<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| RingError::transport(format!("bind {addr} failed: {e}")))?;
        let local_addr = listener
            .local_addr()
            .map_err(|e| RingError::transport(format!("local_addr failed: {e}")))?;
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        tokio::spawn(accept_loop(listener, handler, shutdown_rx));

        Ok(Self {
            local_addr,
            shutdown_tx,
        })
    }

    /// Address the listener actually bound (resolves ephemeral ports).
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Signal the accept loop and open connections to exit.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }
}

async fn accept_loop(
    listener: TcpListener,
    handler: Arc<dyn RequestHandler>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            accepted = listener.accept() => {
                match accepted {
                    Ok((stream, peer)) => {
                        let handler = Arc::clone(&handler);
                        let shutdown_rx = shutdown_rx.clone();
                        tokio::spawn(async move {
                            if let Err(e) = serve_connection(stream, handler, shutdown_rx).await {
                                debug!("connection from {peer} ended: {e}");
                            }
                        });
                    }
                    Err(e) => {
                        warn!("accept failed: {e}");
                    }
                }
            }
            changed = shutdown_rx.changed() => {
                // A dropped sender means the server handle is gone; stop.
                if changed.is_err() || *shutdown_rx.borrow() {
                    break;
                }
            }
        }
    }
}

async fn serve_connection(
    mut stream: TcpStream,
    handler: Arc<dyn RequestHandler>,
    mut shutdown_rx: watch::Receiver<bool>,
) -> Result<()> {
    loop {
        let request = tokio::select! {
            frame = try_read_frame::<_, Request>(&mut stream) => {
                match frame? {
                    Some(request) => request,
                    None => return Ok(()),
                }
            }
            changed = shutdown_rx.changed() => {
                if changed.is_err() || *shutdown_rx.borrow() {
                    return Ok(());
                }
                continue;
            }
        };

        let reply = handler.handle(request).await;
        write_frame(&mut stream, &reply).await?;
    }
}
