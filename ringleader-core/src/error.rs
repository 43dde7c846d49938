//! # Error Types
//!
//! Error handling for the Ringleader election protocol.

use crate::NodeUid;
use thiserror::Error;

/// Error types that can occur during ring election operations.
///
/// Protocol-level decisions (drop, forward, usurp) are never surfaced as
/// errors; they are design outcomes logged at debug level. The variants
/// here cover admission failures, missing topology, transport faults, and
/// election-liveness failures.
///
/// # Examples
///
/// ```rust
/// use ringleader_core::RingError;
///
/// let error = RingError::transport("connection refused");
/// assert!(error.is_retryable());
/// ```
#[derive(Error, Debug)]
pub enum RingError {
    /// Registration rejected because the UID is already a member
    #[error("duplicate UID {uid}: already registered")]
    DuplicateUid { uid: NodeUid },

    /// Registration rejected while an election is in progress
    #[error("registration rejected: election in progress")]
    ElectionActive,

    /// Operation requires ring membership but no successor is assigned
    #[error("node {uid} has no successor: not part of a ring")]
    NoSuccessor { uid: NodeUid },

    /// Too few live members to assemble a ring
    #[error("insufficient members for a ring: {count} live")]
    InsufficientMembers { count: usize },

    /// Remote call failed after retries
    #[error("transport failure: {message}")]
    Transport { message: String },

    /// No endpoint is bound under the requested registry name
    #[error("name {name:?} is not bound in the registry")]
    Unbound { name: String },

    /// Local election round expired without a leader announcement
    #[error("election round {round} timed out")]
    ElectionTimeout { round: u32 },

    /// Round budget exhausted; no automatic retry remains
    #[error("election failed after {rounds} rounds")]
    ElectionFailed { rounds: u32 },

    /// Election message for a completed or superseded round
    #[error("stale election message (candidate {candidate}, origin {origin})")]
    StaleMessage { candidate: NodeUid, origin: NodeUid },

    /// Network or file descriptor I/O failure
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Wire encoding or decoding failure
    #[error("serialization error: {message}")]
    Serialization { message: String },

    /// Unexpected internal error
    #[error("internal error: {message}")]
    Internal { message: String },
}

/// Type alias for Results in the Ringleader system.
pub type Result<T> = std::result::Result<T, RingError>;

impl RingError {
    /// Creates a new transport error with the given message.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Creates a new serialization error with the given message.
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// Creates a new internal error with the given message.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Determines if this error condition is potentially recoverable.
    ///
    /// Transport-class failures may resolve on retry or after the next ring
    /// rebuild; admission and protocol failures will not.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Transport { .. } | Self::Io(_) | Self::ElectionTimeout { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_errors_are_retryable() {
        assert!(RingError::transport("refused").is_retryable());
        assert!(RingError::ElectionTimeout { round: 1 }.is_retryable());
        assert!(!RingError::DuplicateUid { uid: NodeUid::new(5) }.is_retryable());
        assert!(!RingError::ElectionActive.is_retryable());
    }

    #[test]
    fn display_carries_context() {
        let err = RingError::NoSuccessor { uid: NodeUid::new(7) };
        assert!(err.to_string().contains('7'));

        let err = RingError::InsufficientMembers { count: 1 };
        assert!(err.to_string().contains("1 live"));
    }
}
