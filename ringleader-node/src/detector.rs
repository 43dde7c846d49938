//! Leader failure detection and recovery coordination.
//!
//! Every non-leader node with an announced leader probes it once per
//! heartbeat interval. A failed probe is definitive; the next cycle is the
//! retry. On failure, all detectors clear their local leader state, but
//! only the one that wins the registrar's compare-and-set claim rebuilds
//! the ring and initiates the recovery election; the rest wait for the
//! election traffic to reach them.

use crate::node::RingNode;
use crate::state::ElectionState;
use ringleader_core::NodeUid;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Spawn the periodic heartbeat scheduler for `node`.
pub(crate) fn start(node: Arc<RingNode>) {
    let mut shutdown_rx = node.shutdown_rx.clone();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(node.config.heartbeat_interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    node.probe_leader().await;
                }
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        break;
                    }
                }
            }
        }
        debug!("node {}: failure detector stopped", node.uid());
    });
}

impl RingNode {
    /// One heartbeat cycle: probe the current leader if there is one to
    /// probe and we are in a position to care.
    pub(crate) async fn probe_leader(&self) {
        if !self.is_live() {
            return;
        }
        let leader = {
            let cell = self.election.lock();
            if cell.state != ElectionState::LeaderAnnounced {
                return;
            }
            match cell.leader {
                Some(leader) if leader != self.uid() => leader,
                _ => return,
            }
        };

        let healthy = match self.directory.node(leader).await {
            Ok(handle) => handle.is_alive().await.unwrap_or(false),
            Err(e) => {
                debug!("node {}: leader {leader} lookup failed: {e}", self.uid());
                false
            }
        };
        if healthy {
            return;
        }

        warn!("node {}: leader {leader} failed heartbeat probe", self.uid());
        self.on_leader_failure(leader).await;
    }

    async fn on_leader_failure(&self, leader: NodeUid) {
        let registrar = match self.directory.registrar().await {
            Ok(registrar) => registrar,
            Err(e) => {
                warn!("node {}: registrar unreachable during recovery: {e}", self.uid());
                return;
            }
        };

        let claimed = match registrar.try_claim_recovery().await {
            Ok(claimed) => claimed,
            Err(e) => {
                warn!("node {}: recovery claim failed: {e}", self.uid());
                false
            }
        };

        // Winner or loser, this node's view of the failed leader is gone.
        {
            let mut cell = self.election.lock();
            if cell.leader == Some(leader) {
                cell.clear();
            }
        }

        if !claimed {
            debug!(
                "node {}: recovery already coordinated elsewhere, awaiting election",
                self.uid()
            );
            return;
        }

        self.recovery_coordinated.store(true, Ordering::Release);
        info!("node {}: coordinating recovery election", self.uid());

        let outcome = async {
            registrar.rebuild_ring().await?;
            self.initiate_election_as(true).await
        }
        .await;

        if let Err(e) = outcome {
            error!("node {}: recovery initiation failed: {e}", self.uid());
            self.recovery_coordinated.store(false, Ordering::Release);
            if let Err(e) = registrar.release_recovery().await {
                warn!("node {}: failed to release recovery claim: {e}", self.uid());
            }
        }
    }
}
