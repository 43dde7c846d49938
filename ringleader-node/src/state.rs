//! Election state for a single node.

use ringleader_core::NodeUid;
use serde::Serialize;
use std::fmt;

/// Where a node stands in the current election round.
///
/// `Dead` is not a separate variant: liveness is an orthogonal flag, and a
/// dead node keeps its last election state until it recovers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ElectionState {
    /// No election activity since the last reset
    Idle,
    /// This node has seen or originated an unresolved election token
    InProgress,
    /// A leader announcement has been accepted for this round
    LeaderAnnounced,
}

impl fmt::Display for ElectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElectionState::Idle => write!(f, "idle"),
            ElectionState::InProgress => write!(f, "in-progress"),
            ElectionState::LeaderAnnounced => write!(f, "leader-announced"),
        }
    }
}

/// Multi-field election state, mutated only under the node's election lock.
#[derive(Debug)]
pub(crate) struct ElectionCell {
    pub state: ElectionState,
    pub leader: Option<NodeUid>,
    pub round: u32,
}

impl ElectionCell {
    pub fn new() -> Self {
        Self {
            state: ElectionState::Idle,
            leader: None,
            round: 0,
        }
    }

    pub fn clear(&mut self) {
        self.state = ElectionState::Idle;
        self.leader = None;
        self.round = 0;
    }
}

/// Point-in-time view of a node's internals, for the operator's `debug`
/// command.
#[derive(Debug, Clone, Serialize)]
pub struct NodeSnapshot {
    pub uid: u32,
    pub alive: bool,
    pub state: ElectionState,
    pub leader: Option<u32>,
    pub is_leader: bool,
    pub successor: Option<u32>,
    pub round: u32,
    pub recovery_coordinated: bool,
}
