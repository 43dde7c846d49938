//! In-process stubs for exercising the node state machine without a ring.

use async_trait::async_trait;
use parking_lot::Mutex;
use ringleader_core::{
    Directory, ElectionMessage, LeaderAnnounce, NodeHandle, NodeUid, RegistrarHandle, Result,
    RingConfig, RingError,
};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Timings tight enough that unit tests finish in tens of milliseconds.
pub(crate) fn fast_config() -> RingConfig {
    RingConfig::default()
        .with_network_delay(Duration::from_millis(2))
        .with_forward_retries(3, Duration::from_millis(10))
        .with_election_timeout(Duration::from_secs(2))
        .with_heartbeat_interval(Duration::from_millis(30))
}

/// Poll `predicate` for up to two seconds.
pub(crate) async fn wait_until(predicate: impl Fn() -> bool) -> bool {
    for _ in 0..400 {
        if predicate() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    predicate()
}

/// A [`Directory`] whose peers record every delivered message instead of
/// running protocol logic.
pub(crate) struct CaptureDirectory {
    inner: Arc<CaptureInner>,
}

struct CaptureInner {
    elections: Mutex<Vec<ElectionMessage>>,
    announcements: Mutex<Vec<LeaderAnnounce>>,
    fail_deliveries: AtomicBool,
    dead_peers: Mutex<HashSet<NodeUid>>,
    registrar: Arc<CaptureRegistrar>,
}

impl CaptureDirectory {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(CaptureInner {
                elections: Mutex::new(Vec::new()),
                announcements: Mutex::new(Vec::new()),
                fail_deliveries: AtomicBool::new(false),
                dead_peers: Mutex::new(HashSet::new()),
                registrar: Arc::new(CaptureRegistrar::default()),
            }),
        }
    }

    pub fn elections(&self) -> Vec<ElectionMessage> {
        self.inner.elections.lock().clone()
    }

    pub fn announcements(&self) -> Vec<LeaderAnnounce> {
        self.inner.announcements.lock().clone()
    }

    /// Make every delivery fail with a transport error.
    pub fn fail_deliveries(&self) {
        self.inner.fail_deliveries.store(true, Ordering::Release);
    }

    /// Make a peer fail liveness probes.
    pub fn set_peer_dead(&self, uid: NodeUid) {
        self.inner.dead_peers.lock().insert(uid);
    }

    pub fn registrar_log(&self) -> Arc<CaptureRegistrar> {
        Arc::clone(&self.inner.registrar)
    }
}

#[async_trait]
impl Directory for CaptureDirectory {
    async fn node(&self, uid: NodeUid) -> Result<Arc<dyn NodeHandle>> {
        Ok(Arc::new(CapturePeer {
            uid,
            inner: Arc::clone(&self.inner),
        }))
    }

    async fn registrar(&self) -> Result<Arc<dyn RegistrarHandle>> {
        Ok(Arc::clone(&self.inner.registrar) as Arc<dyn RegistrarHandle>)
    }
}

struct CapturePeer {
    uid: NodeUid,
    inner: Arc<CaptureInner>,
}

impl CapturePeer {
    fn check_delivery(&self) -> Result<()> {
        if self.inner.fail_deliveries.load(Ordering::Acquire) {
            return Err(RingError::transport("injected delivery failure"));
        }
        Ok(())
    }
}

#[async_trait]
impl NodeHandle for CapturePeer {
    async fn get_id(&self) -> Result<NodeUid> {
        Ok(self.uid)
    }

    async fn receive_election(&self, candidate: NodeUid, origin: NodeUid) -> Result<()> {
        self.check_delivery()?;
        self.inner
            .elections
            .lock()
            .push(ElectionMessage::new(candidate, origin));
        Ok(())
    }

    async fn receive_leader(&self, leader: NodeUid, origin: NodeUid) -> Result<()> {
        self.check_delivery()?;
        self.inner
            .announcements
            .lock()
            .push(LeaderAnnounce::new(leader, origin));
        Ok(())
    }

    async fn set_successor(&self, _uid: NodeUid) -> Result<()> {
        Ok(())
    }

    async fn get_status(&self) -> Result<String> {
        Ok(String::new())
    }

    async fn is_alive(&self) -> Result<bool> {
        Ok(!self.inner.dead_peers.lock().contains(&self.uid))
    }

    async fn set_alive(&self, _alive: bool) -> Result<()> {
        Ok(())
    }

    async fn recover(&self) -> Result<()> {
        Ok(())
    }

    async fn initiate_election(&self) -> Result<()> {
        Ok(())
    }

    async fn is_election_in_progress(&self) -> Result<bool> {
        Ok(false)
    }

    async fn is_election_completed(&self) -> Result<bool> {
        Ok(false)
    }
}

/// Registrar stub that counts coordination calls.
#[derive(Default)]
pub(crate) struct CaptureRegistrar {
    begins: Mutex<Vec<bool>>,
    ends: AtomicU32,
    rebuild_count: AtomicU32,
    recovery_claimed: AtomicBool,
}

impl CaptureRegistrar {
    pub fn begin_elections(&self) -> usize {
        self.begins.lock().len()
    }

    pub fn begin_recoveries(&self) -> usize {
        self.begins.lock().iter().filter(|&&r| r).count()
    }

    pub fn end_elections(&self) -> u32 {
        self.ends.load(Ordering::Acquire)
    }

    pub fn rebuilds(&self) -> u32 {
        self.rebuild_count.load(Ordering::Acquire)
    }

    /// Pretend another detector already claimed the recovery role.
    pub fn preclaim_recovery(&self) {
        self.recovery_claimed.store(true, Ordering::Release);
    }

    pub fn recovery_claims(&self) -> bool {
        self.recovery_claimed.load(Ordering::Acquire)
    }
}

#[async_trait]
impl RegistrarHandle for CaptureRegistrar {
    async fn register(&self, _uid: NodeUid) -> Result<()> {
        Ok(())
    }

    async fn deregister(&self, _uid: NodeUid) -> Result<()> {
        Ok(())
    }

    async fn begin_election(&self, recovery: bool) -> Result<()> {
        self.begins.lock().push(recovery);
        Ok(())
    }

    async fn end_election(&self) -> Result<()> {
        self.ends.fetch_add(1, Ordering::AcqRel);
        self.recovery_claimed.store(false, Ordering::Release);
        Ok(())
    }

    async fn get_members(&self) -> Result<Vec<NodeUid>> {
        Ok(Vec::new())
    }

    async fn rebuild_ring(&self) -> Result<()> {
        self.rebuild_count.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }

    async fn try_claim_recovery(&self) -> Result<bool> {
        Ok(self
            .recovery_claimed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok())
    }

    async fn release_recovery(&self) -> Result<()> {
        self.recovery_claimed.store(false, Ordering::Release);
        Ok(())
    }
}
