//! Protocol and wire messages for ring elections.

use crate::{NodeUid, RingError};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

/// Election token circulating the ring.
///
/// Carries the best candidate seen so far and the UID of the node that
/// originated this token. A token returning to its originator with
/// `candidate == origin` completes the circuit and elects that node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectionMessage {
    pub candidate: NodeUid,
    pub origin: NodeUid,
}

impl ElectionMessage {
    pub fn new(candidate: NodeUid, origin: NodeUid) -> Self {
        Self { candidate, origin }
    }

    /// An initiator's opening token names itself as both candidate and origin.
    pub fn initiate(uid: NodeUid) -> Self {
        Self::new(uid, uid)
    }
}

/// Leader announcement traversing the ring once after an election completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderAnnounce {
    pub leader: NodeUid,
    pub origin: NodeUid,
}

impl LeaderAnnounce {
    pub fn new(leader: NodeUid, origin: NodeUid) -> Self {
        Self { leader, origin }
    }
}

/// Top-level request envelope for the framed RPC transport.
///
/// A process answers the variants it serves: the registrar process handles
/// `Registry` and `Registrar`, a node process handles `Node`. Requests sent
/// to a process that does not serve them fault with `Unsupported`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Request {
    Registry(RegistryRequest),
    Registrar(RegistrarRequest),
    Node(NodeRequest),
}

/// Name-registry operations (well-known host:port discovery service).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum RegistryRequest {
    Bind { name: String, addr: SocketAddr },
    Lookup { name: String },
    Unbind { name: String },
    List,
}

/// Registrar endpoint operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum RegistrarRequest {
    Register { uid: NodeUid },
    Deregister { uid: NodeUid },
    BeginElection { recovery: bool },
    EndElection,
    GetMembers,
    RebuildRing,
    TryClaimRecovery,
    ReleaseRecovery,
}

/// Node endpoint operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum NodeRequest {
    ReceiveElection { candidate: NodeUid, origin: NodeUid },
    ReceiveLeader { leader: NodeUid, origin: NodeUid },
    SetSuccessor { uid: NodeUid },
    GetId,
    GetStatus,
    IsAlive,
    SetAlive { alive: bool },
    Recover,
    InitiateElection,
    IsElectionInProgress,
    IsElectionCompleted,
}

/// Reply envelope for the framed RPC transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum WireReply {
    Ack,
    Flag(bool),
    Uid(NodeUid),
    Text(String),
    Uids(Vec<NodeUid>),
    Addr(SocketAddr),
    Names(Vec<String>),
    Fault(WireFault),
}

/// Serializable fault carried back to the caller.
///
/// Only protocol-visible error kinds round-trip the wire; everything else
/// collapses into `Internal` with its display message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireFault {
    pub kind: FaultKind,
    pub message: String,
    pub uid: Option<NodeUid>,
    pub count: Option<usize>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FaultKind {
    DuplicateUid,
    ElectionActive,
    NoSuccessor,
    InsufficientMembers,
    Unbound,
    Unsupported,
    Internal,
}

impl WireFault {
    pub fn unsupported(what: &str) -> Self {
        Self {
            kind: FaultKind::Unsupported,
            message: format!("operation not served by this endpoint: {what}"),
            uid: None,
            count: None,
            name: None,
        }
    }
}

impl From<&RingError> for WireFault {
    fn from(err: &RingError) -> Self {
        let (kind, uid, count, name) = match err {
            RingError::DuplicateUid { uid } => (FaultKind::DuplicateUid, Some(*uid), None, None),
            RingError::ElectionActive => (FaultKind::ElectionActive, None, None, None),
            RingError::NoSuccessor { uid } => (FaultKind::NoSuccessor, Some(*uid), None, None),
            RingError::InsufficientMembers { count } => {
                (FaultKind::InsufficientMembers, None, Some(*count), None)
            }
            RingError::Unbound { name } => (FaultKind::Unbound, None, None, Some(name.clone())),
            _ => (FaultKind::Internal, None, None, None),
        };
        Self {
            kind,
            message: err.to_string(),
            uid,
            count,
            name,
        }
    }
}

impl From<WireFault> for RingError {
    fn from(fault: WireFault) -> Self {
        match (fault.kind, fault.uid, fault.count, fault.name) {
            (FaultKind::DuplicateUid, Some(uid), _, _) => RingError::DuplicateUid { uid },
            (FaultKind::ElectionActive, _, _, _) => RingError::ElectionActive,
            (FaultKind::NoSuccessor, Some(uid), _, _) => RingError::NoSuccessor { uid },
            (FaultKind::InsufficientMembers, _, Some(count), _) => {
                RingError::InsufficientMembers { count }
            }
            (FaultKind::Unbound, _, _, Some(name)) => RingError::Unbound { name },
            (_, _, _, _) => RingError::internal(fault.message),
        }
    }
}
