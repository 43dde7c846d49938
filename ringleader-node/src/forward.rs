//! Asynchronous message forwarding.
//!
//! Every outbound hop runs on its own task so a slow successor never stalls
//! inbound handling. Each hop sleeps one `network_delay` first (simulated
//! link latency, and the spacing that lets a rebuilt topology settle), then
//! retries delivery on a bounded budget. The successor is re-read on every
//! attempt, so a concurrent ring rebuild redirects the remaining retries.
//! On exhaustion the node asks the registrar for a rebuild and stops; the
//! election timeout re-drives progress.

use crate::node::RingNode;
use ringleader_core::{ElectionMessage, LeaderAnnounce, NodeUid, Result};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy)]
pub(crate) enum Outbound {
    Election(ElectionMessage),
    Leader(LeaderAnnounce),
}

impl std::fmt::Display for Outbound {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outbound::Election(m) => write!(f, "election ({}, {})", m.candidate, m.origin),
            Outbound::Leader(m) => write!(f, "leader ({}, {})", m.leader, m.origin),
        }
    }
}

impl RingNode {
    pub(crate) fn spawn_forward(&self, outbound: Outbound) {
        let Some(node) = self.weak.upgrade() else {
            return;
        };
        let mut shutdown_rx = self.shutdown_rx.clone();

        tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(node.config.network_delay) => {}
                _ = shutdown_rx.changed() => return,
            }

            let mut attempts = 0u32;
            loop {
                let Some(successor) = *node.successor.lock() else {
                    warn!("node {}: cannot forward {outbound}: no successor", node.uid());
                    return;
                };

                match node.deliver(successor, outbound).await {
                    Ok(()) => {
                        debug!("node {}: forwarded {outbound} to {successor}", node.uid());
                        return;
                    }
                    Err(e) => {
                        attempts += 1;
                        if attempts >= node.config.forward_retries {
                            warn!(
                                "node {}: forwarding {outbound} to {successor} failed after \
                                 {attempts} attempts ({e}), requesting ring rebuild",
                                node.uid()
                            );
                            node.request_rebuild().await;
                            return;
                        }
                        debug!(
                            "node {}: forward attempt {attempts} to {successor} failed: {e}",
                            node.uid()
                        );
                        tokio::select! {
                            _ = tokio::time::sleep(node.config.retry_delay) => {}
                            _ = shutdown_rx.changed() => return,
                        }
                    }
                }
            }
        });
    }

    async fn deliver(&self, successor: NodeUid, outbound: Outbound) -> Result<()> {
        let peer = self.directory.node(successor).await?;
        match outbound {
            Outbound::Election(m) => peer.receive_election(m.candidate, m.origin).await,
            Outbound::Leader(m) => peer.receive_leader(m.leader, m.origin).await,
        }
    }

    pub(crate) async fn request_rebuild(&self) {
        match self.directory.registrar().await {
            Ok(registrar) => {
                if let Err(e) = registrar.rebuild_ring().await {
                    warn!("node {}: rebuild request failed: {e}", self.uid());
                }
            }
            Err(e) => warn!("node {}: registrar unreachable for rebuild: {e}", self.uid()),
        }
    }
}
