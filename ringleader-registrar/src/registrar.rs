//! Membership tracking, election gating, and ring assembly.

use async_trait::async_trait;
use parking_lot::Mutex;
use ringleader_core::{
    ring_order, Directory, NodeUid, RegistrarHandle, Result, RingError,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// The singleton coordination service.
///
/// Tracks registered members in insertion order, gates registration while
/// an election runs, rebuilds the ring topology from liveness probes, and
/// arbitrates the recovery-coordinator claim. Successor assignments go out
/// through the [`Directory`], so the registrar itself never owns node
/// state; the ring lives in the nodes.
pub struct Registrar {
    directory: Arc<dyn Directory>,
    members: Mutex<Vec<NodeUid>>,
    election_in_progress: AtomicBool,
    recovery_mode: AtomicBool,
    recovery_initiated: AtomicBool,
    // Serializes rebuilds so no node observes interleaved assignments from
    // two concurrent topology passes.
    ring_lock: tokio::sync::Mutex<()>,
}

impl Registrar {
    pub fn new(directory: Arc<dyn Directory>) -> Self {
        Self {
            directory,
            members: Mutex::new(Vec::new()),
            election_in_progress: AtomicBool::new(false),
            recovery_mode: AtomicBool::new(false),
            recovery_initiated: AtomicBool::new(false),
            ring_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Whether an election is currently gating registration.
    pub fn election_in_progress(&self) -> bool {
        self.election_in_progress.load(Ordering::Acquire)
    }

    /// Whether the current election was initiated by failure recovery.
    pub fn recovery_mode(&self) -> bool {
        self.recovery_mode.load(Ordering::Acquire)
    }

    /// Probe every member, keep the live ones, and assign successors in
    /// ascending-UID ring order.
    async fn rebuild(&self) -> Result<()> {
        let _guard = self.ring_lock.lock().await;

        let members = self.members.lock().clone();
        let mut live = Vec::with_capacity(members.len());

        for uid in members {
            match self.probe(uid).await {
                Ok(true) => live.push(uid),
                Ok(false) => debug!("rebuild: skipping dead node {uid}"),
                Err(e) => warn!("rebuild: node {uid} unreachable, skipping: {e}"),
            }
        }

        let assignments = ring_order(&live);
        if assignments.is_empty() {
            info!("rebuild: insufficient members for a ring ({} live)", live.len());
            return Err(RingError::InsufficientMembers { count: live.len() });
        }

        for (uid, successor) in &assignments {
            match self.assign_successor(*uid, *successor).await {
                Ok(()) => debug!("rebuild: {uid} -> {successor}"),
                Err(e) => warn!("rebuild: failed to assign successor of {uid}: {e}"),
            }
        }

        let order: Vec<NodeUid> = assignments.iter().map(|(uid, _)| *uid).collect();
        info!("ring rebuilt over {order:?}");
        Ok(())
    }

    async fn probe(&self, uid: NodeUid) -> Result<bool> {
        let node = self.directory.node(uid).await?;
        node.is_alive().await
    }

    async fn assign_successor(&self, uid: NodeUid, successor: NodeUid) -> Result<()> {
        let node = self.directory.node(uid).await?;
        node.set_successor(successor).await
    }
}

#[async_trait]
impl RegistrarHandle for Registrar {
    async fn register(&self, uid: NodeUid) -> Result<()> {
        if uid.value() == 0 {
            return Err(RingError::internal("UID must be a positive integer"));
        }
        if self.election_in_progress() {
            warn!("rejecting registration of {uid}: election in progress");
            return Err(RingError::ElectionActive);
        }

        let member_count = {
            let mut members = self.members.lock();
            if members.contains(&uid) {
                return Err(RingError::DuplicateUid { uid });
            }
            members.push(uid);
            members.len()
        };
        info!("registered node {uid} ({member_count} members)");

        if member_count >= 2 {
            // Admission stands even when the rebuild cannot form a ring yet.
            if let Err(e) = self.rebuild().await {
                warn!("post-registration rebuild incomplete: {e}");
            }
        }
        Ok(())
    }

    async fn deregister(&self, uid: NodeUid) -> Result<()> {
        let remaining = {
            let mut members = self.members.lock();
            let before = members.len();
            members.retain(|&member| member != uid);
            if members.len() == before {
                debug!("deregister: {uid} was not a member");
                return Ok(());
            }
            members.len()
        };
        info!("deregistered node {uid} ({remaining} members)");

        if remaining >= 2 {
            if let Err(e) = self.rebuild().await {
                warn!("post-deregistration rebuild incomplete: {e}");
            }
        }
        Ok(())
    }

    async fn begin_election(&self, recovery: bool) -> Result<()> {
        if self.election_in_progress.swap(true, Ordering::AcqRel) {
            // The in-flight election's mode wins; a racing recovery start
            // piggybacks on it.
            warn!("duplicate election start ignored (recovery={recovery})");
            return Ok(());
        }
        self.recovery_mode.store(recovery, Ordering::Release);
        info!(
            "election started ({})",
            if recovery { "recovery" } else { "operator" }
        );
        Ok(())
    }

    async fn end_election(&self) -> Result<()> {
        let was_active = self.election_in_progress.swap(false, Ordering::AcqRel);
        self.recovery_mode.store(false, Ordering::Release);
        self.recovery_initiated.store(false, Ordering::Release);
        if was_active {
            info!("election ended");
        }
        Ok(())
    }

    async fn get_members(&self) -> Result<Vec<NodeUid>> {
        Ok(self.members.lock().clone())
    }

    async fn rebuild_ring(&self) -> Result<()> {
        self.rebuild().await
    }

    async fn try_claim_recovery(&self) -> Result<bool> {
        let claimed = self
            .recovery_initiated
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if claimed {
            info!("recovery coordinator role claimed");
        } else {
            debug!("recovery coordinator role already claimed");
        }
        Ok(claimed)
    }

    async fn release_recovery(&self) -> Result<()> {
        self.recovery_initiated.store(false, Ordering::Release);
        debug!("recovery coordinator role released");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ringleader_core::NodeHandle;
    use std::collections::HashMap;
    use std::sync::atomic::AtomicU32;

    /// Node stub that records successor assignments.
    struct StubNode {
        uid: NodeUid,
        alive: AtomicBool,
        successor: Mutex<Option<NodeUid>>,
    }

    #[async_trait]
    impl NodeHandle for StubNode {
        async fn get_id(&self) -> Result<NodeUid> {
            Ok(self.uid)
        }
        async fn receive_election(&self, _candidate: NodeUid, _origin: NodeUid) -> Result<()> {
            Ok(())
        }
        async fn receive_leader(&self, _leader: NodeUid, _origin: NodeUid) -> Result<()> {
            Ok(())
        }
        async fn set_successor(&self, uid: NodeUid) -> Result<()> {
            *self.successor.lock() = Some(uid);
            Ok(())
        }
        async fn get_status(&self) -> Result<String> {
            Ok(String::new())
        }
        async fn is_alive(&self) -> Result<bool> {
            Ok(self.alive.load(Ordering::Acquire))
        }
        async fn set_alive(&self, alive: bool) -> Result<()> {
            self.alive.store(alive, Ordering::Release);
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

    #[derive(Default)]
    struct StubDirectory {
        nodes: Mutex<HashMap<NodeUid, Arc<StubNode>>>,
    }

    impl StubDirectory {
        fn add(&self, uid: u32) -> Arc<StubNode> {
            let node = Arc::new(StubNode {
                uid: NodeUid::new(uid),
                alive: AtomicBool::new(true),
                successor: Mutex::new(None),
            });
            self.nodes.lock().insert(NodeUid::new(uid), Arc::clone(&node));
            node
        }
    }

    #[async_trait]
    impl Directory for StubDirectory {
        async fn node(&self, uid: NodeUid) -> Result<Arc<dyn NodeHandle>> {
            self.nodes
                .lock()
                .get(&uid)
                .cloned()
                .map(|node| node as Arc<dyn NodeHandle>)
                .ok_or_else(|| RingError::transport(format!("no stub for {uid}")))
        }

        async fn registrar(&self) -> Result<Arc<dyn RegistrarHandle>> {
            Err(RingError::internal("stub directory has no registrar"))
        }
    }

    fn registrar_over(directory: Arc<StubDirectory>) -> Registrar {
        Registrar::new(directory)
    }

    #[tokio::test]
    async fn duplicate_registration_is_rejected() {
        let directory = Arc::new(StubDirectory::default());
        directory.add(5);
        let registrar = registrar_over(Arc::clone(&directory));

        registrar.register(NodeUid::new(5)).await.unwrap();
        let err = registrar.register(NodeUid::new(5)).await.unwrap_err();
        assert!(matches!(err, RingError::DuplicateUid { uid } if uid == NodeUid::new(5)));

        assert_eq!(registrar.get_members().await.unwrap(), vec![NodeUid::new(5)]);
    }

    #[tokio::test]
    async fn zero_uid_is_rejected() {
        let registrar = registrar_over(Arc::new(StubDirectory::default()));
        assert!(registrar.register(NodeUid::new(0)).await.is_err());
    }

    #[tokio::test]
    async fn registration_is_gated_during_election() {
        let directory = Arc::new(StubDirectory::default());
        directory.add(2);
        directory.add(5);
        let registrar = registrar_over(Arc::clone(&directory));

        registrar.register(NodeUid::new(2)).await.unwrap();
        registrar.register(NodeUid::new(5)).await.unwrap();

        registrar.begin_election(false).await.unwrap();
        let err = registrar.register(NodeUid::new(7)).await.unwrap_err();
        assert!(matches!(err, RingError::ElectionActive));

        registrar.end_election().await.unwrap();
        directory.add(7);
        registrar.register(NodeUid::new(7)).await.unwrap();
        assert_eq!(registrar.get_members().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn rebuild_assigns_sorted_ring() {
        let directory = Arc::new(StubDirectory::default());
        let n11 = directory.add(11);
        let n2 = directory.add(2);
        let n7 = directory.add(7);
        let n5 = directory.add(5);
        let registrar = registrar_over(Arc::clone(&directory));

        for uid in [11, 2, 7, 5] {
            registrar.register(NodeUid::new(uid)).await.unwrap();
        }
        registrar.rebuild_ring().await.unwrap();

        assert_eq!(*n2.successor.lock(), Some(NodeUid::new(5)));
        assert_eq!(*n5.successor.lock(), Some(NodeUid::new(7)));
        assert_eq!(*n7.successor.lock(), Some(NodeUid::new(11)));
        assert_eq!(*n11.successor.lock(), Some(NodeUid::new(2)));
    }

    #[tokio::test]
    async fn rebuild_skips_dead_nodes() {
        let directory = Arc::new(StubDirectory::default());
        let n2 = directory.add(2);
        let n5 = directory.add(5);
        let n7 = directory.add(7);
        let n11 = directory.add(11);
        let registrar = registrar_over(Arc::clone(&directory));

        for uid in [2, 5, 7, 11] {
            registrar.register(NodeUid::new(uid)).await.unwrap();
        }
        n11.alive.store(false, Ordering::Release);
        registrar.rebuild_ring().await.unwrap();

        assert_eq!(*n2.successor.lock(), Some(NodeUid::new(5)));
        assert_eq!(*n5.successor.lock(), Some(NodeUid::new(7)));
        assert_eq!(*n7.successor.lock(), Some(NodeUid::new(2)));
    }

    #[tokio::test]
    async fn rebuild_requires_two_live_members() {
        let directory = Arc::new(StubDirectory::default());
        let node = directory.add(5);
        let registrar = registrar_over(Arc::clone(&directory));

        registrar.register(NodeUid::new(5)).await.unwrap();
        let err = registrar.rebuild_ring().await.unwrap_err();
        assert!(matches!(err, RingError::InsufficientMembers { count: 1 }));
        assert_eq!(*node.successor.lock(), None);
    }

    #[tokio::test]
    async fn duplicate_begin_election_is_a_noop() {
        let registrar = registrar_over(Arc::new(StubDirectory::default()));

        registrar.begin_election(false).await.unwrap();
        assert!(!registrar.recovery_mode());

        // A racing recovery start does not flip the in-flight mode.
        registrar.begin_election(true).await.unwrap();
        assert!(registrar.election_in_progress());
        assert!(!registrar.recovery_mode());

        registrar.end_election().await.unwrap();
        registrar.end_election().await.unwrap();
        assert!(!registrar.election_in_progress());
    }

    #[tokio::test]
    async fn recovery_claim_admits_exactly_one_winner() {
        let registrar = Arc::new(registrar_over(Arc::new(StubDirectory::default())));
        let winners = Arc::new(AtomicU32::new(0));

        let mut tasks = Vec::new();
        for _ in 0..8 {
            let registrar = Arc::clone(&registrar);
            let winners = Arc::clone(&winners);
            tasks.push(tokio::spawn(async move {
                if registrar.try_claim_recovery().await.unwrap() {
                    winners.fetch_add(1, Ordering::AcqRel);
                }
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }
        assert_eq!(winners.load(Ordering::Acquire), 1);

        // EndElection resets the guard for the next failure event.
        registrar.end_election().await.unwrap();
        assert!(registrar.try_claim_recovery().await.unwrap());

        // As does an explicit release after a failed initiation.
        registrar.release_recovery().await.unwrap();
        assert!(registrar.try_claim_recovery().await.unwrap());
    }
}
