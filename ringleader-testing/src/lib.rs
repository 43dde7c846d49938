//! # Ringleader Testing
//!
//! In-process harness for exercising whole election rings without sockets:
//! a [`LocalDirectory`] implementing the discovery seam over shared memory,
//! and a [`TestCluster`] that wires a registrar and a set of nodes through
//! it with fast timings.

pub mod cluster;
pub mod directory;

pub use cluster::{fast_config, wait_until, TestCluster};
pub use directory::LocalDirectory;
