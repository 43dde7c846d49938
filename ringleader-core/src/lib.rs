//! # Ringleader Core
//!
//! Core types and seams for the Ringleader election protocol.
//!
//! This crate provides:
//! - Node identity and ring-ordering primitives
//! - Election and leader-announcement messages, plus the wire envelopes
//! - Error types shared across the workspace
//! - Runtime configuration
//! - The `NodeHandle`/`RegistrarHandle`/`Directory` traits that transports
//!   and test harnesses implement
//!
//! The protocol itself lives in `ringleader-node` and
//! `ringleader-registrar`; the TCP carrier lives in `ringleader-net`.

pub mod config;
pub mod error;
pub mod messages;
pub mod rpc;
pub mod types;

pub use config::RingConfig;
pub use error::{Result, RingError};
pub use messages::{
    ElectionMessage, FaultKind, LeaderAnnounce, NodeRequest, RegistrarRequest, RegistryRequest,
    Request, WireFault, WireReply,
};
pub use rpc::{Directory, NodeHandle, RegistrarHandle};
pub use types::{node_name, ring_order, NodeUid, REGISTRAR_NAME};
