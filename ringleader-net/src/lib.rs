//! # Ringleader Net
//!
//! TCP transport for Ringleader ring elections.
//!
//! This crate carries the election protocol over the wire:
//!
//! - **Framing**: `u32` length prefix + bincode payloads
//! - **Name registry**: the discovery service hosted by the registrar
//!   process on the well-known registry port
//! - **Server**: a framed request listener with cooperative shutdown
//! - **Remote stubs**: `Directory`/`NodeHandle`/`RegistrarHandle`
//!   implementations that resolve endpoints by name per call
//! - **Services**: adapters exposing local protocol objects to peers
//!
//! The protocol crates never touch sockets directly; everything goes
//! through the traits in `ringleader-core`.

pub mod client;
pub mod registry;
pub mod remote;
pub mod server;
pub mod service;
pub mod wire;

pub use client::{call, CallTimeouts};
pub use registry::{Registry, RegistryClient};
pub use remote::{RemoteDirectory, RemoteNode, RemoteRegistrar};
pub use server::{RequestHandler, RpcServer};
pub use service::{NodeService, RegistrarService};
