//! Transport seams between the election protocol and its carriers.
//!
//! Protocol code talks to peers exclusively through these traits. The TCP
//! transport implements them with remote stubs resolved by name lookup; the
//! test harness implements them with in-process objects. Successor
//! references stay non-owning: a node holds only the successor's UID and
//! resolves a handle through the [`Directory`] at call time.

use crate::{NodeUid, Result};
use async_trait::async_trait;
use std::sync::Arc;

/// Operations exposed by every node endpoint.
#[async_trait]
pub trait NodeHandle: Send + Sync {
    /// The node's UID.
    async fn get_id(&self) -> Result<NodeUid>;

    /// Deliver an election token.
    async fn receive_election(&self, candidate: NodeUid, origin: NodeUid) -> Result<()>;

    /// Deliver a leader announcement.
    async fn receive_leader(&self, leader: NodeUid, origin: NodeUid) -> Result<()>;

    /// Assign this node's ring successor. Set only by the registrar.
    async fn set_successor(&self, uid: NodeUid) -> Result<()>;

    /// One-line human-readable status.
    async fn get_status(&self) -> Result<String>;

    /// Liveness probe; a simulated-dead node answers `false`.
    async fn is_alive(&self) -> Result<bool>;

    /// Simulate crash (`false`) or raw revival (`true`).
    async fn set_alive(&self, alive: bool) -> Result<()>;

    /// Revive a dead node and rejoin the ring.
    async fn recover(&self) -> Result<()>;

    /// Start an election with this node as initiator.
    async fn initiate_election(&self) -> Result<()>;

    async fn is_election_in_progress(&self) -> Result<bool>;

    async fn is_election_completed(&self) -> Result<bool>;
}

/// Operations exposed by the registrar endpoint.
#[async_trait]
pub trait RegistrarHandle: Send + Sync {
    /// Admit a new member. Fails with `DuplicateUid` or `ElectionActive`.
    async fn register(&self, uid: NodeUid) -> Result<()>;

    /// Remove a member on explicit shutdown.
    async fn deregister(&self, uid: NodeUid) -> Result<()>;

    /// Gate registrations for the duration of an election. Duplicate calls
    /// are warn-and-ignore no-ops.
    async fn begin_election(&self, recovery: bool) -> Result<()>;

    /// Clear the election and recovery flags. Idempotent.
    async fn end_election(&self) -> Result<()>;

    /// Snapshot of registered members in insertion order.
    async fn get_members(&self) -> Result<Vec<NodeUid>>;

    /// Probe liveness and atomically reassign every live node's successor.
    async fn rebuild_ring(&self) -> Result<()>;

    /// Compare-and-set claim on the recovery-coordinator role. Exactly one
    /// caller per failure event receives `true`.
    async fn try_claim_recovery(&self) -> Result<bool>;

    /// Release a claimed recovery role after a failed initiation.
    async fn release_recovery(&self) -> Result<()>;
}

/// Name-based endpoint discovery.
#[async_trait]
pub trait Directory: Send + Sync {
    /// Resolve a node endpoint by UID.
    async fn node(&self, uid: NodeUid) -> Result<Arc<dyn NodeHandle>>;

    /// Resolve the registrar endpoint.
    async fn registrar(&self) -> Result<Arc<dyn RegistrarHandle>>;
}
