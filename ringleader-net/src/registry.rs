//! Process-wide name registry.
//!
//! The registrar process hosts this service on the well-known registry
//! port. Nodes bind their endpoint under `node-<uid>` after their listener
//! is up and unbind it as the last step of shutdown.

use crate::client::{call, expect_ack, CallTimeouts};
use dashmap::DashMap;
use ringleader_core::{RegistryRequest, Request, Result, RingError, WireFault, WireReply};
use std::net::SocketAddr;
use tracing::{debug, info};

/// In-memory name-to-address bindings served by the registrar process.
#[derive(Debug, Default)]
pub struct Registry {
    bindings: DashMap<String, SocketAddr>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(&self, name: String, addr: SocketAddr) {
        info!("registry: bound {name:?} -> {addr}");
        self.bindings.insert(name, addr);
    }

    pub fn lookup(&self, name: &str) -> Option<SocketAddr> {
        self.bindings.get(name).map(|entry| *entry.value())
    }

    pub fn unbind(&self, name: &str) {
        if self.bindings.remove(name).is_some() {
            info!("registry: unbound {name:?}");
        }
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.bindings.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    /// Serve a registry request. Called from the registrar's request handler.
    pub fn handle(&self, request: RegistryRequest) -> WireReply {
        match request {
            RegistryRequest::Bind { name, addr } => {
                self.bind(name, addr);
                WireReply::Ack
            }
            RegistryRequest::Lookup { name } => match self.lookup(&name) {
                Some(addr) => WireReply::Addr(addr),
                None => {
                    debug!("registry: lookup miss for {name:?}");
                    WireReply::Fault(WireFault::from(&RingError::Unbound { name }))
                }
            },
            RegistryRequest::Unbind { name } => {
                self.unbind(&name);
                WireReply::Ack
            }
            RegistryRequest::List => WireReply::Names(self.names()),
        }
    }
}

/// Client for the name registry.
#[derive(Debug, Clone)]
pub struct RegistryClient {
    addr: SocketAddr,
    timeouts: CallTimeouts,
}

impl RegistryClient {
    pub fn new(addr: SocketAddr, timeouts: CallTimeouts) -> Self {
        Self { addr, timeouts }
    }

    pub async fn bind(&self, name: impl Into<String>, endpoint: SocketAddr) -> Result<()> {
        let reply = call(
            self.addr,
            &Request::Registry(RegistryRequest::Bind {
                name: name.into(),
                addr: endpoint,
            }),
            self.timeouts,
        )
        .await?;
        expect_ack(reply)
    }

    pub async fn lookup(&self, name: impl Into<String>) -> Result<SocketAddr> {
        let name = name.into();
        let reply = call(
            self.addr,
            &Request::Registry(RegistryRequest::Lookup { name: name.clone() }),
            self.timeouts,
        )
        .await?;
        match reply {
            WireReply::Addr(addr) => Ok(addr),
            WireReply::Fault(fault) => Err(fault.into()),
            other => Err(RingError::transport(format!(
                "unexpected reply to lookup: {other:?}"
            ))),
        }
    }

    pub async fn unbind(&self, name: impl Into<String>) -> Result<()> {
        let reply = call(
            self.addr,
            &Request::Registry(RegistryRequest::Unbind { name: name.into() }),
            self.timeouts,
        )
        .await?;
        expect_ack(reply)
    }

    pub async fn list(&self) -> Result<Vec<String>> {
        let reply = call(self.addr, &Request::Registry(RegistryRequest::List), self.timeouts).await?;
        match reply {
            WireReply::Names(names) => Ok(names),
            WireReply::Fault(fault) => Err(fault.into()),
            other => Err(RingError::transport(format!(
                "unexpected reply to list: {other:?}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bind_lookup_unbind() {
        let registry = Registry::new();
        let addr: SocketAddr = "127.0.0.1:4100".parse().unwrap();

        registry.bind("node-7".to_string(), addr);
        assert_eq!(registry.lookup("node-7"), Some(addr));

        registry.unbind("node-7");
        assert_eq!(registry.lookup("node-7"), None);
    }

    #[test]
    fn lookup_miss_faults() {
        let registry = Registry::new();
        let reply = registry.handle(RegistryRequest::Lookup {
            name: "node-9".to_string(),
        });
        assert!(matches!(reply, WireReply::Fault(_)));
    }

    #[test]
    fn list_is_sorted() {
        let registry = Registry::new();
        let addr: SocketAddr = "127.0.0.1:4100".parse().unwrap();
        registry.bind("node-7".to_string(), addr);
        registry.bind("node-2".to_string(), addr);
        registry.bind("registrar".to_string(), addr);

        assert_eq!(registry.names(), vec!["node-2", "node-7", "registrar"]);
    }
}
