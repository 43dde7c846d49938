//! Registrar process: hosts the name registry and the registrar service on
//! the well-known registry port.

use anyhow::Context;
use ringleader_core::{Directory, RingConfig, REGISTRAR_NAME};
use ringleader_net::{RegistrarService, Registry, RemoteDirectory, RpcServer};
use ringleader_registrar::Registrar;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = RingConfig::from_env();
    let listen_addr = resolve(&config.registry_endpoint())
        .await
        .context("resolving registry endpoint")?;

    // The registrar resolves node endpoints through its own registry, over
    // the same loopback RPC path the nodes use.
    let registry = Arc::new(Registry::new());
    let directory: Arc<dyn Directory> = Arc::new(RemoteDirectory::new(listen_addr, &config));
    let registrar = Arc::new(Registrar::new(directory));

    let service = RegistrarService::new(registrar, Arc::clone(&registry));
    let server = RpcServer::start(listen_addr, Arc::new(service))
        .await
        .context("starting registrar service")?;
    registry.bind(REGISTRAR_NAME.to_string(), server.local_addr());

    info!("registrar listening on {}", server.local_addr());
    tokio::signal::ctrl_c()
        .await
        .context("waiting for shutdown signal")?;

    info!("registrar shutting down");
    server.shutdown();
    Ok(())
}

async fn resolve(endpoint: &str) -> anyhow::Result<SocketAddr> {
    tokio::net::lookup_host(endpoint)
        .await?
        .next()
        .with_context(|| format!("no address for {endpoint}"))
}
