//! # Ringleader Node
//!
//! A participating process in the election ring.
//!
//! This crate provides:
//! - The Chang-Roberts election state machine and message handlers
//! - Asynchronous per-hop forwarding with bounded retries
//! - The election timeout scheduler and round budget
//! - The leader failure detector and recovery coordination
//! - The operator console
//!
//! A node reacts to three message kinds (election token, leader
//! announcement, heartbeat probe) and is driven from outside through the
//! `NodeHandle` trait, whether the caller is a remote peer over TCP or the
//! local console.

pub mod console;
mod detector;
mod forward;
pub mod node;
pub mod state;

#[cfg(test)]
pub(crate) mod testutil;

pub use node::RingNode;
pub use state::{ElectionState, NodeSnapshot};
