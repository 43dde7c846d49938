//! In-process directory for single-process cluster tests.

use async_trait::async_trait;
use dashmap::{DashMap, DashSet};
use parking_lot::RwLock;
use ringleader_core::{Directory, NodeHandle, NodeUid, RegistrarHandle, Result, RingError};
use std::sync::Arc;

/// [`Directory`] over in-process handles, with a per-node fault hook.
///
/// `disconnect` makes lookups of a node fail with a transport error, which
/// is how tests exercise unreachable-peer paths (forward retries, rebuild
/// skipping) without sockets.
#[derive(Default)]
pub struct LocalDirectory {
    nodes: DashMap<NodeUid, Arc<dyn NodeHandle>>,
    disconnected: DashSet<NodeUid>,
    registrar: RwLock<Option<Arc<dyn RegistrarHandle>>>,
}

impl LocalDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_node(&self, uid: NodeUid, node: Arc<dyn NodeHandle>) {
        self.nodes.insert(uid, node);
    }

    pub fn remove_node(&self, uid: NodeUid) {
        self.nodes.remove(&uid);
    }

    pub fn set_registrar(&self, registrar: Arc<dyn RegistrarHandle>) {
        *self.registrar.write() = Some(registrar);
    }

    /// Make lookups of `uid` fail until [`reconnect`](Self::reconnect).
    pub fn disconnect(&self, uid: NodeUid) {
        self.disconnected.insert(uid);
    }

    pub fn reconnect(&self, uid: NodeUid) {
        self.disconnected.remove(&uid);
    }
}

#[async_trait]
impl Directory for LocalDirectory {
    async fn node(&self, uid: NodeUid) -> Result<Arc<dyn NodeHandle>> {
        if self.disconnected.contains(&uid) {
            return Err(RingError::transport(format!("node {uid} is unreachable")));
        }
        self.nodes
            .get(&uid)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| RingError::transport(format!("node {uid} is not registered")))
    }

    async fn registrar(&self) -> Result<Arc<dyn RegistrarHandle>> {
        self.registrar
            .read()
            .clone()
            .ok_or_else(|| RingError::internal("no registrar installed"))
    }
}
