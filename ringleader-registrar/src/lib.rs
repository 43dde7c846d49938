//! # Ringleader Registrar
//!
//! The singleton coordination service for ring elections: admits and
//! removes members, gates registration while an election is in flight,
//! rebuilds the successor ring from liveness probes, and arbitrates the
//! exactly-one recovery-coordinator claim.

pub mod registrar;

pub use registrar::Registrar;
