//! The ring election node.
//!
//! `RingNode` owns a UID, a non-owning successor reference, the election
//! state machine, and the schedulers around it. Message handlers take the
//! election lock only to read state and classify; forwarding always happens
//! on a separate task after the lock is released.

use crate::forward::Outbound;
use crate::state::{ElectionCell, ElectionState, NodeSnapshot};
use async_trait::async_trait;
use parking_lot::Mutex;
use ringleader_core::{
    Directory, ElectionMessage, LeaderAnnounce, NodeHandle, NodeUid, Result, RingConfig,
    RingError,
};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// How an incoming election token is dispatched once classified.
#[derive(Debug)]
enum Verdict {
    Forward(ElectionMessage),
    Announce,
    Drop(RingError),
}

/// A participating process in the election ring.
pub struct RingNode {
    uid: NodeUid,
    pub(crate) config: RingConfig,
    pub(crate) directory: Arc<dyn Directory>,
    alive: AtomicBool,
    pub(crate) election: Mutex<ElectionCell>,
    pub(crate) successor: Mutex<Option<NodeUid>>,
    pub(crate) recovery_coordinated: AtomicBool,
    // Bumped to invalidate any armed election timeout.
    timeout_generation: AtomicU64,
    pub(crate) weak: Weak<RingNode>,
    shutdown_tx: watch::Sender<bool>,
    pub(crate) shutdown_rx: watch::Receiver<bool>,
}

impl RingNode {
    pub fn new(uid: NodeUid, config: RingConfig, directory: Arc<dyn Directory>) -> Arc<Self> {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        Arc::new_cyclic(|weak| Self {
            uid,
            config,
            directory,
            alive: AtomicBool::new(true),
            election: Mutex::new(ElectionCell::new()),
            successor: Mutex::new(None),
            recovery_coordinated: AtomicBool::new(false),
            timeout_generation: AtomicU64::new(0),
            weak: weak.clone(),
            shutdown_tx,
            shutdown_rx,
        })
    }

    /// Start background schedulers (currently the failure detector).
    pub fn start(self: &Arc<Self>) {
        crate::detector::start(Arc::clone(self));
        info!("node {} started", self.uid);
    }

    /// Signal every scheduler and in-flight forwarder to exit.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    pub fn uid(&self) -> NodeUid {
        self.uid
    }

    pub fn is_live(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    /// Last accepted leader, if any.
    pub fn leader(&self) -> Option<NodeUid> {
        self.election.lock().leader
    }

    pub fn is_leader(&self) -> bool {
        self.election.lock().leader == Some(self.uid)
    }

    /// Current ring successor, if the registrar has assigned one.
    pub fn current_successor(&self) -> Option<NodeUid> {
        *self.successor.lock()
    }

    pub fn election_state(&self) -> ElectionState {
        self.election.lock().state
    }

    pub fn snapshot(&self) -> NodeSnapshot {
        let cell = self.election.lock();
        NodeSnapshot {
            uid: self.uid.value(),
            alive: self.is_live(),
            state: cell.state,
            leader: cell.leader.map(|uid| uid.value()),
            is_leader: cell.leader == Some(self.uid),
            successor: self.successor.lock().map(|uid| uid.value()),
            round: cell.round,
            recovery_coordinated: self.recovery_coordinated.load(Ordering::Acquire),
        }
    }

    pub fn status_line(&self) -> String {
        let snapshot = self.snapshot();
        format!(
            "node {}: {} | state={} leader={} successor={} round={}",
            snapshot.uid,
            if snapshot.alive { "alive" } else { "dead" },
            snapshot.state,
            snapshot
                .leader
                .map_or_else(|| "none".to_string(), |uid| uid.to_string()),
            snapshot
                .successor
                .map_or_else(|| "none".to_string(), |uid| uid.to_string()),
            snapshot.round,
        )
    }

    /// Operator/recovery reset back to `Idle`.
    pub fn reset(&self) {
        self.election.lock().clear();
        self.cancel_timeout();
        self.recovery_coordinated.store(false, Ordering::Release);
        info!("node {}: election state reset", self.uid);
    }

    /// Start an election with this node as initiator.
    ///
    /// `recovery` marks a detector-triggered election: it bypasses the
    /// valid-leader guard (the detector has just cleared that state) and is
    /// recorded as such at the registrar.
    pub async fn initiate_election_as(&self, recovery: bool) -> Result<()> {
        if !self.is_live() {
            return Err(RingError::internal(format!(
                "node {} is down; recover it first",
                self.uid
            )));
        }
        if self.successor.lock().is_none() {
            return Err(RingError::NoSuccessor { uid: self.uid });
        }
        {
            let cell = self.election.lock();
            if cell.state == ElectionState::InProgress {
                warn!("node {}: election already in progress, not initiating", self.uid);
                return Ok(());
            }
            if !recovery && cell.state == ElectionState::LeaderAnnounced {
                if let Some(leader) = cell.leader {
                    info!("node {}: leader {leader} already known, not initiating", self.uid);
                    return Ok(());
                }
            }
            // Checked before the registrar is told anything, so a spent
            // budget never leaves a phantom election gating registration.
            if cell.round >= self.config.max_rounds {
                error!(
                    "node {}: election round budget exhausted ({} rounds)",
                    self.uid, cell.round
                );
                return Err(RingError::ElectionFailed { rounds: cell.round });
            }
        }

        let registrar = self.directory.registrar().await?;
        // The registrar must observe the election before the first token is
        // emitted; a duplicate start is its problem, not ours.
        registrar.begin_election(recovery).await?;
        if let Err(e) = registrar.rebuild_ring().await {
            warn!("node {}: pre-election rebuild incomplete: {e}", self.uid);
        }
        // Settle so no hop runs against a half-observed topology.
        tokio::time::sleep(self.config.network_delay).await;

        let round = {
            let mut cell = self.election.lock();
            cell.round += 1;
            cell.state = ElectionState::InProgress;
            cell.round
        };
        self.arm_timeout(round);

        info!("node {}: initiating election round {round}", self.uid);
        self.spawn_forward(Outbound::Election(ElectionMessage::initiate(self.uid)));
        Ok(())
    }

    /// The Chang-Roberts decision, taken under the election lock.
    fn classify(&self, candidate: NodeUid, origin: NodeUid) -> Verdict {
        let mut cell = self.election.lock();
        if cell.state == ElectionState::LeaderAnnounced {
            // Token from a round this node already saw complete.
            return Verdict::Drop(RingError::StaleMessage { candidate, origin });
        }
        if candidate > self.uid {
            cell.state = ElectionState::InProgress;
            Verdict::Forward(ElectionMessage::new(candidate, origin))
        } else if candidate == self.uid {
            if origin == self.uid {
                Verdict::Announce
            } else {
                // Usurp: our UID came back under someone else's banner.
                // Re-enter the race as our own originator and suppress the
                // prior originator's token.
                cell.state = ElectionState::InProgress;
                Verdict::Forward(ElectionMessage::initiate(self.uid))
            }
        } else if cell.state == ElectionState::Idle {
            cell.state = ElectionState::InProgress;
            Verdict::Forward(ElectionMessage::new(self.uid, origin))
        } else {
            // A lower candidate already superseded locally.
            Verdict::Drop(RingError::StaleMessage { candidate, origin })
        }
    }

    async fn handle_election(&self, candidate: NodeUid, origin: NodeUid) -> Result<()> {
        if !self.is_live() {
            debug!("node {}: dead, dropping election ({candidate}, {origin})", self.uid);
            return Ok(());
        }

        match self.classify(candidate, origin) {
            Verdict::Forward(message) => {
                debug!(
                    "node {}: forwarding election ({}, {})",
                    self.uid, message.candidate, message.origin
                );
                self.spawn_forward(Outbound::Election(message));
            }
            Verdict::Announce => self.announce_leader().await?,
            Verdict::Drop(reason) => {
                debug!("node {}: {reason}, dropped", self.uid);
            }
        }
        Ok(())
    }

    /// Our own token completed the circuit: this node is the leader.
    async fn announce_leader(&self) -> Result<()> {
        {
            let mut cell = self.election.lock();
            cell.leader = Some(self.uid);
            cell.state = ElectionState::LeaderAnnounced;
            cell.round = 0;
        }
        self.cancel_timeout();
        self.recovery_coordinated.store(false, Ordering::Release);
        info!("node {}: circuit complete, announcing leadership", self.uid);

        match self.directory.registrar().await {
            Ok(registrar) => {
                if let Err(e) = registrar.end_election().await {
                    warn!("node {}: failed to clear election flag: {e}", self.uid);
                }
            }
            Err(e) => warn!("node {}: registrar unreachable at announce: {e}", self.uid),
        }

        self.spawn_forward(Outbound::Leader(LeaderAnnounce::new(self.uid, self.uid)));
        Ok(())
    }

    async fn handle_leader(&self, leader: NodeUid, origin: NodeUid) -> Result<()> {
        if !self.is_live() {
            debug!("node {}: dead, dropping announcement of {leader}", self.uid);
            return Ok(());
        }

        let forward = {
            let mut cell = self.election.lock();
            if cell.state == ElectionState::LeaderAnnounced {
                debug!(
                    "node {}: duplicate announcement of {leader} from {origin} absorbed",
                    self.uid
                );
                return Ok(());
            }
            cell.leader = Some(leader);
            cell.state = ElectionState::LeaderAnnounced;
            cell.round = 0;
            // The announcement stops once it reaches the leader again.
            leader != self.uid
        };
        self.cancel_timeout();
        self.recovery_coordinated.store(false, Ordering::Release);
        info!("node {}: accepted leader {leader}", self.uid);

        if forward {
            self.spawn_forward(Outbound::Leader(LeaderAnnounce::new(leader, self.uid)));
        } else {
            debug!("node {}: announcement returned to leader, stopping", self.uid);
        }
        Ok(())
    }

    fn arm_timeout(&self, round: u32) {
        let generation = self.timeout_generation.fetch_add(1, Ordering::AcqRel) + 1;
        let Some(node) = self.weak.upgrade() else {
            return;
        };
        let mut shutdown_rx = self.shutdown_rx.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(node.config.election_timeout) => {
                    node.on_election_timeout(generation, round).await;
                }
                _ = shutdown_rx.changed() => {}
            }
        });
    }

    pub(crate) fn cancel_timeout(&self) {
        self.timeout_generation.fetch_add(1, Ordering::AcqRel);
    }

    async fn on_election_timeout(&self, generation: u64, round: u32) {
        if self.timeout_generation.load(Ordering::Acquire) != generation {
            return;
        }
        let retry = {
            let mut cell = self.election.lock();
            if cell.state != ElectionState::InProgress {
                return;
            }
            cell.state = ElectionState::Idle;
            cell.round < self.config.max_rounds
        };

        if retry {
            let timeout = RingError::ElectionTimeout { round };
            warn!("node {}: {timeout}, retrying", self.uid);
            if let Err(e) = self.initiate_election_as(false).await {
                error!("node {}: election retry failed: {e}", self.uid);
            }
        } else {
            error!(
                "node {}: election failed after {} rounds",
                self.uid, self.config.max_rounds
            );
            // The failed election is over; leave the registrar open for
            // registrations and a fresh operator-driven attempt.
            if let Ok(registrar) = self.directory.registrar().await {
                if let Err(e) = registrar.end_election().await {
                    warn!("node {}: failed to clear election flag: {e}", self.uid);
                }
            }
        }
    }

    fn mark_alive(&self, alive: bool) {
        let was = self.alive.swap(alive, Ordering::AcqRel);
        if was == alive {
            return;
        }
        if alive {
            info!("node {}: marked alive", self.uid);
        } else {
            info!("node {}: simulating crash", self.uid);
        }
    }

    /// Revive a dead node and rejoin the ring.
    pub async fn recover_node(&self) -> Result<()> {
        self.mark_alive(true);
        self.reset();
        info!("node {}: recovered, requesting ring rebuild", self.uid);

        let registrar = self.directory.registrar().await?;
        if let Err(e) = registrar.rebuild_ring().await {
            // A one-member deployment recovers into no ring; that is fine.
            warn!("node {}: post-recovery rebuild incomplete: {e}", self.uid);
        }
        Ok(())
    }
}

#[async_trait]
impl NodeHandle for RingNode {
    async fn get_id(&self) -> Result<NodeUid> {
        Ok(self.uid)
    }

    async fn receive_election(&self, candidate: NodeUid, origin: NodeUid) -> Result<()> {
        self.handle_election(candidate, origin).await
    }

    async fn receive_leader(&self, leader: NodeUid, origin: NodeUid) -> Result<()> {
        self.handle_leader(leader, origin).await
    }

    async fn set_successor(&self, uid: NodeUid) -> Result<()> {
        let previous = self.successor.lock().replace(uid);
        if previous != Some(uid) {
            debug!("node {}: successor set to {uid}", self.uid);
        }
        Ok(())
    }

    async fn get_status(&self) -> Result<String> {
        Ok(self.status_line())
    }

    async fn is_alive(&self) -> Result<bool> {
        Ok(self.is_live())
    }

    async fn set_alive(&self, alive: bool) -> Result<()> {
        self.mark_alive(alive);
        Ok(())
    }

    async fn recover(&self) -> Result<()> {
        self.recover_node().await
    }

    async fn initiate_election(&self) -> Result<()> {
        self.initiate_election_as(false).await
    }

    async fn is_election_in_progress(&self) -> Result<bool> {
        Ok(self.election_state() == ElectionState::InProgress)
    }

    async fn is_election_completed(&self) -> Result<bool> {
        Ok(self.election_state() == ElectionState::LeaderAnnounced)
    }
}
