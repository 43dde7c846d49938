//! Remote handle implementations resolved through the name registry.
//!
//! Stubs hold only a name and a cached address; every call opens its own
//! connection. A transport failure invalidates the cached address so the
//! next call re-resolves, which is how a restarted endpoint on a new port
//! is picked up without any explicit rebinding protocol.

use crate::client::{call, expect_ack, expect_flag, expect_text, CallTimeouts};
use crate::registry::RegistryClient;
use async_trait::async_trait;
use dashmap::DashMap;
use ringleader_core::{
    node_name, Directory, NodeHandle, NodeRequest, NodeUid, RegistrarHandle, RegistrarRequest,
    Request, Result, RingConfig, RingError, WireReply, REGISTRAR_NAME,
};
use std::net::SocketAddr;
use std::sync::Arc;

struct DirectoryInner {
    registry: RegistryClient,
    timeouts: CallTimeouts,
    cache: DashMap<String, SocketAddr>,
}

impl DirectoryInner {
    async fn resolve(&self, name: &str) -> Result<SocketAddr> {
        if let Some(entry) = self.cache.get(name) {
            return Ok(*entry.value());
        }
        let addr = self.registry.lookup(name).await?;
        self.cache.insert(name.to_string(), addr);
        Ok(addr)
    }

    fn invalidate(&self, name: &str) {
        self.cache.remove(name);
    }

    async fn call_named(&self, name: &str, request: &Request) -> Result<WireReply> {
        let addr = self.resolve(name).await?;
        match call(addr, request, self.timeouts).await {
            Ok(reply) => Ok(reply),
            Err(e) => {
                self.invalidate(name);
                Err(e)
            }
        }
    }
}

/// [`Directory`] backed by the TCP name registry.
#[derive(Clone)]
pub struct RemoteDirectory {
    inner: Arc<DirectoryInner>,
}

impl RemoteDirectory {
    pub fn new(registry_addr: SocketAddr, config: &RingConfig) -> Self {
        let timeouts = CallTimeouts {
            connect: config.connect_timeout,
            call: config.call_timeout,
        };
        Self {
            inner: Arc::new(DirectoryInner {
                registry: RegistryClient::new(registry_addr, timeouts),
                timeouts,
                cache: DashMap::new(),
            }),
        }
    }

    /// Client for the same registry this directory resolves against.
    pub fn registry_client(&self) -> RegistryClient {
        self.inner.registry.clone()
    }
}

#[async_trait]
impl Directory for RemoteDirectory {
    async fn node(&self, uid: NodeUid) -> Result<Arc<dyn NodeHandle>> {
        Ok(Arc::new(RemoteNode {
            uid,
            name: node_name(uid),
            inner: Arc::clone(&self.inner),
        }))
    }

    async fn registrar(&self) -> Result<Arc<dyn RegistrarHandle>> {
        Ok(Arc::new(RemoteRegistrar {
            inner: Arc::clone(&self.inner),
        }))
    }
}

/// Remote stub for a node endpoint.
pub struct RemoteNode {
    uid: NodeUid,
    name: String,
    inner: Arc<DirectoryInner>,
}

impl RemoteNode {
    async fn call(&self, request: NodeRequest) -> Result<WireReply> {
        self.inner
            .call_named(&self.name, &Request::Node(request))
            .await
    }
}

#[async_trait]
impl NodeHandle for RemoteNode {
    async fn get_id(&self) -> Result<NodeUid> {
        match self.call(NodeRequest::GetId).await? {
            WireReply::Uid(uid) => Ok(uid),
            WireReply::Fault(fault) => Err(fault.into()),
            other => Err(RingError::transport(format!(
                "unexpected reply to GetId: {other:?}"
            ))),
        }
    }

    async fn receive_election(&self, candidate: NodeUid, origin: NodeUid) -> Result<()> {
        expect_ack(
            self.call(NodeRequest::ReceiveElection { candidate, origin })
                .await?,
        )
    }

    async fn receive_leader(&self, leader: NodeUid, origin: NodeUid) -> Result<()> {
        expect_ack(
            self.call(NodeRequest::ReceiveLeader { leader, origin })
                .await?,
        )
    }

    async fn set_successor(&self, uid: NodeUid) -> Result<()> {
        expect_ack(self.call(NodeRequest::SetSuccessor { uid }).await?)
    }

    async fn get_status(&self) -> Result<String> {
        expect_text(self.call(NodeRequest::GetStatus).await?)
    }

    async fn is_alive(&self) -> Result<bool> {
        expect_flag(self.call(NodeRequest::IsAlive).await?)
    }

    async fn set_alive(&self, alive: bool) -> Result<()> {
        expect_ack(self.call(NodeRequest::SetAlive { alive }).await?)
    }

    async fn recover(&self) -> Result<()> {
        expect_ack(self.call(NodeRequest::Recover).await?)
    }

    async fn initiate_election(&self) -> Result<()> {
        expect_ack(self.call(NodeRequest::InitiateElection).await?)
    }

    async fn is_election_in_progress(&self) -> Result<bool> {
        expect_flag(self.call(NodeRequest::IsElectionInProgress).await?)
    }

    async fn is_election_completed(&self) -> Result<bool> {
        expect_flag(self.call(NodeRequest::IsElectionCompleted).await?)
    }
}

impl std::fmt::Debug for RemoteNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteNode").field("uid", &self.uid).finish()
    }
}

/// Remote stub for the registrar endpoint.
pub struct RemoteRegistrar {
    inner: Arc<DirectoryInner>,
}

impl RemoteRegistrar {
    async fn call(&self, request: RegistrarRequest) -> Result<WireReply> {
        self.inner
            .call_named(REGISTRAR_NAME, &Request::Registrar(request))
            .await
    }
}

#[async_trait]
impl RegistrarHandle for RemoteRegistrar {
    async fn register(&self, uid: NodeUid) -> Result<()> {
        expect_ack(self.call(RegistrarRequest::Register { uid }).await?)
    }

    async fn deregister(&self, uid: NodeUid) -> Result<()> {
        expect_ack(self.call(RegistrarRequest::Deregister { uid }).await?)
    }

    async fn begin_election(&self, recovery: bool) -> Result<()> {
        expect_ack(self.call(RegistrarRequest::BeginElection { recovery }).await?)
    }

    async fn end_election(&self) -> Result<()> {
        expect_ack(self.call(RegistrarRequest::EndElection).await?)
    }

    async fn get_members(&self) -> Result<Vec<NodeUid>> {
        match self.call(RegistrarRequest::GetMembers).await? {
            WireReply::Uids(members) => Ok(members),
            WireReply::Fault(fault) => Err(fault.into()),
            other => Err(RingError::transport(format!(
                "unexpected reply to GetMembers: {other:?}"
            ))),
        }
    }

    async fn rebuild_ring(&self) -> Result<()> {
        expect_ack(self.call(RegistrarRequest::RebuildRing).await?)
    }

    async fn try_claim_recovery(&self) -> Result<bool> {
        expect_flag(self.call(RegistrarRequest::TryClaimRecovery).await?)
    }

    async fn release_recovery(&self) -> Result<()> {
        expect_ack(self.call(RegistrarRequest::ReleaseRecovery).await?)
    }
}
