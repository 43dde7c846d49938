//! Service adapters: expose local protocol objects over the framed RPC
//! transport.

use crate::registry::Registry;
use crate::server::RequestHandler;
use async_trait::async_trait;
use ringleader_core::{
    NodeHandle, NodeRequest, RegistrarHandle, RegistrarRequest, Request, Result, WireFault,
    WireReply,
};
use std::sync::Arc;

/// Serves `Request::Node` against a local [`NodeHandle`].
pub struct NodeService {
    node: Arc<dyn NodeHandle>,
}

impl NodeService {
    pub fn new(node: Arc<dyn NodeHandle>) -> Self {
        Self { node }
    }

    async fn dispatch(&self, request: NodeRequest) -> Result<WireReply> {
        match request {
            NodeRequest::ReceiveElection { candidate, origin } => self
                .node
                .receive_election(candidate, origin)
                .await
                .map(|_| WireReply::Ack),
            NodeRequest::ReceiveLeader { leader, origin } => self
                .node
                .receive_leader(leader, origin)
                .await
                .map(|_| WireReply::Ack),
            NodeRequest::SetSuccessor { uid } => {
                self.node.set_successor(uid).await.map(|_| WireReply::Ack)
            }
            NodeRequest::GetId => self.node.get_id().await.map(WireReply::Uid),
            NodeRequest::GetStatus => self.node.get_status().await.map(WireReply::Text),
            NodeRequest::IsAlive => self.node.is_alive().await.map(WireReply::Flag),
            NodeRequest::SetAlive { alive } => {
                self.node.set_alive(alive).await.map(|_| WireReply::Ack)
            }
            NodeRequest::Recover => self.node.recover().await.map(|_| WireReply::Ack),
            NodeRequest::InitiateElection => {
                self.node.initiate_election().await.map(|_| WireReply::Ack)
            }
            NodeRequest::IsElectionInProgress => self
                .node
                .is_election_in_progress()
                .await
                .map(WireReply::Flag),
            NodeRequest::IsElectionCompleted => {
                self.node.is_election_completed().await.map(WireReply::Flag)
            }
        }
    }
}

#[async_trait]
impl RequestHandler for NodeService {
    async fn handle(&self, request: Request) -> WireReply {
        match request {
            Request::Node(request) => self
                .dispatch(request)
                .await
                .unwrap_or_else(|e| WireReply::Fault(WireFault::from(&e))),
            Request::Registrar(_) => WireReply::Fault(WireFault::unsupported("registrar")),
            Request::Registry(_) => WireReply::Fault(WireFault::unsupported("registry")),
        }
    }
}

/// Serves `Request::Registrar` and `Request::Registry` against the local
/// registrar and its co-hosted name registry.
pub struct RegistrarService {
    registrar: Arc<dyn RegistrarHandle>,
    registry: Arc<Registry>,
}

impl RegistrarService {
    pub fn new(registrar: Arc<dyn RegistrarHandle>, registry: Arc<Registry>) -> Self {
        Self {
            registrar,
            registry,
        }
    }

    async fn dispatch(&self, request: RegistrarRequest) -> Result<WireReply> {
        match request {
            RegistrarRequest::Register { uid } => {
                self.registrar.register(uid).await.map(|_| WireReply::Ack)
            }
            RegistrarRequest::Deregister { uid } => {
                self.registrar.deregister(uid).await.map(|_| WireReply::Ack)
            }
            RegistrarRequest::BeginElection { recovery } => self
                .registrar
                .begin_election(recovery)
                .await
                .map(|_| WireReply::Ack),
            RegistrarRequest::EndElection => {
                self.registrar.end_election().await.map(|_| WireReply::Ack)
            }
            RegistrarRequest::GetMembers => {
                self.registrar.get_members().await.map(WireReply::Uids)
            }
            RegistrarRequest::RebuildRing => {
                self.registrar.rebuild_ring().await.map(|_| WireReply::Ack)
            }
            RegistrarRequest::TryClaimRecovery => {
                self.registrar.try_claim_recovery().await.map(WireReply::Flag)
            }
            RegistrarRequest::ReleaseRecovery => self
                .registrar
                .release_recovery()
                .await
                .map(|_| WireReply::Ack),
        }
    }
}

#[async_trait]
impl RequestHandler for RegistrarService {
    async fn handle(&self, request: Request) -> WireReply {
        match request {
            Request::Registrar(request) => self
                .dispatch(request)
                .await
                .unwrap_or_else(|e| WireReply::Fault(WireFault::from(&e))),
            Request::Registry(request) => self.registry.handle(request),
            Request::Node(_) => WireReply::Fault(WireFault::unsupported("node")),
        }
    }
}
