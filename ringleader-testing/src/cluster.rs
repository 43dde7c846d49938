//! Single-process cluster harness.

use crate::directory::LocalDirectory;
use ringleader_core::{
    Directory, NodeHandle, NodeUid, RegistrarHandle, Result, RingConfig,
};
use ringleader_node::{ElectionState, RingNode};
use ringleader_registrar::Registrar;
use std::sync::Arc;
use std::time::Duration;

/// Timings scaled down so whole-ring elections settle in well under a
/// second while keeping the protocol's ordering behavior intact.
pub fn fast_config() -> RingConfig {
    RingConfig::default()
        .with_network_delay(Duration::from_millis(10))
        .with_heartbeat_interval(Duration::from_millis(100))
        .with_election_timeout(Duration::from_secs(3))
        .with_forward_retries(5, Duration::from_millis(50))
        .with_max_rounds(3)
}

/// Poll `predicate` every 20 ms until it holds or `deadline` passes.
pub async fn wait_until(deadline: Duration, predicate: impl Fn() -> bool) -> bool {
    let start = tokio::time::Instant::now();
    loop {
        if predicate() {
            return true;
        }
        if start.elapsed() > deadline {
            return predicate();
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

/// A registrar plus a set of nodes wired through a [`LocalDirectory`].
pub struct TestCluster {
    pub directory: Arc<LocalDirectory>,
    pub registrar: Arc<Registrar>,
    nodes: Vec<Arc<RingNode>>,
}

impl TestCluster {
    /// Build and register a cluster over `uids`, with detectors running.
    pub async fn start(uids: &[u32]) -> Result<Self> {
        Self::start_with(uids, fast_config()).await
    }

    pub async fn start_with(uids: &[u32], config: RingConfig) -> Result<Self> {
        let directory = Arc::new(LocalDirectory::new());
        let registrar = Arc::new(Registrar::new(
            Arc::clone(&directory) as Arc<dyn Directory>
        ));
        directory.set_registrar(Arc::clone(&registrar) as Arc<dyn RegistrarHandle>);

        let mut nodes = Vec::with_capacity(uids.len());
        for &uid in uids {
            let uid = NodeUid::new(uid);
            let node = RingNode::new(
                uid,
                config.clone(),
                Arc::clone(&directory) as Arc<dyn Directory>,
            );
            directory.insert_node(uid, Arc::clone(&node) as Arc<dyn NodeHandle>);
            registrar.register(uid).await?;
            node.start();
            nodes.push(node);
        }

        Ok(Self {
            directory,
            registrar,
            nodes,
        })
    }

    /// Panics if `uid` is not part of the cluster.
    pub fn node(&self, uid: u32) -> Arc<RingNode> {
        self.nodes
            .iter()
            .find(|node| node.uid() == NodeUid::new(uid))
            .cloned()
            .unwrap_or_else(|| panic!("no node {uid} in cluster"))
    }

    pub fn nodes(&self) -> &[Arc<RingNode>] {
        &self.nodes
    }

    /// Wait until every live node has announced `expected` as leader.
    pub async fn wait_for_leader(&self, expected: u32, deadline: Duration) -> bool {
        let expected = NodeUid::new(expected);
        wait_until(deadline, || {
            self.nodes.iter().filter(|node| node.is_live()).all(|node| {
                node.leader() == Some(expected)
                    && node.election_state() == ElectionState::LeaderAnnounced
            })
        })
        .await
    }

    /// Successor map of the live ring, in ascending UID order.
    pub fn successors(&self) -> Vec<(u32, u32)> {
        let mut pairs: Vec<(u32, u32)> = self
            .nodes
            .iter()
            .filter(|node| node.is_live())
            .filter_map(|node| {
                node.current_successor()
                    .map(|succ| (node.uid().value(), succ.value()))
            })
            .collect();
        pairs.sort_unstable();
        pairs
    }

    pub fn shutdown(&self) {
        for node in &self.nodes {
            node.shutdown();
        }
    }
}
