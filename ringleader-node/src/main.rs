//! Node process: binds a node endpoint, registers with the registrar, and
//! runs the operator console.

use anyhow::Context;
use ringleader_core::{node_name, Directory, NodeHandle, NodeUid, RingConfig};
use ringleader_net::{NodeService, RemoteDirectory, RpcServer};
use ringleader_node::{console, RingNode};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let uid: u32 = std::env::args()
        .nth(1)
        .context("usage: node <uid>")?
        .parse()
        .context("UID must be a positive integer")?;
    anyhow::ensure!(uid > 0, "UID must be a positive integer");
    let uid = NodeUid::new(uid);

    let config = RingConfig::from_env();
    let registry_addr = resolve(&config.registry_endpoint())
        .await
        .context("resolving registry endpoint")?;
    let directory = RemoteDirectory::new(registry_addr, &config);

    let node = RingNode::new(uid, config, Arc::new(directory.clone()) as Arc<dyn Directory>);
    let service = NodeService::new(Arc::clone(&node) as Arc<dyn NodeHandle>);
    let server = RpcServer::start("127.0.0.1:0".parse()?, Arc::new(service))
        .await
        .context("starting node service")?;
    info!("node {uid} listening on {}", server.local_addr());

    let registry = directory.registry_client();
    registry
        .bind(node_name(uid), server.local_addr())
        .await
        .context("binding node name in registry")?;

    let registrar = directory
        .registrar()
        .await
        .context("resolving registrar")?;
    if let Err(e) = registrar.register(uid).await {
        let _ = registry.unbind(node_name(uid)).await;
        anyhow::bail!("registration failed: {e}");
    }
    info!("node {uid} registered");

    node.start();
    let console_result = console::run(Arc::clone(&node)).await;

    // Teardown order: leave the membership, stop schedulers and pools, and
    // unbind the endpoint name last.
    if let Err(e) = registrar.deregister(uid).await {
        warn!("deregistration failed: {e}");
    }
    node.shutdown();
    server.shutdown();
    if let Err(e) = registry.unbind(node_name(uid)).await {
        warn!("unbind failed: {e}");
    }

    console_result.context("console loop failed")?;
    info!("node {uid} exited cleanly");
    Ok(())
}

async fn resolve(endpoint: &str) -> anyhow::Result<SocketAddr> {
    tokio::net::lookup_host(endpoint)
        .await?
        .next()
        .with_context(|| format!("no address for {endpoint}"))
}
