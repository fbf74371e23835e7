mod api;
mod config;
mod constants;
mod fetch;

use anyhow::Context;
use clap::Parser;
use config::{Args, NodeConfig};
use std::{net::SocketAddr, sync::atomic::Ordering};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "debug".into()),
        )
        .init();

    let args = Args::parse();
    let config = NodeConfig::from_args(&args);
    info!(node_address = %config.node_address, "node identity");

    let state = api::AppState::new(config)?;
    {
        let mut peers = state.peers.write();
        for peer in &args.peers {
            match peers.register(peer) {
                Ok(location) => info!(%location, "registered startup peer"),
                Err(e) => warn!(error = %e, "ignoring startup peer"),
            }
        }
    }

    let stop = state.stop.clone();
    let app = api::router(state);

    let addr: SocketAddr = args
        .listen
        .parse()
        .with_context(|| format!("invalid listen address {:?}", args.listen))?;
    info!("hadcoin-node listening on http://{addr}");
    axum::serve(tokio::net::TcpListener::bind(addr).await?, app)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "failed to listen for shutdown signal");
                std::future::pending::<()>().await;
            }
            info!("shutting down");
            stop.store(true, Ordering::Relaxed);
        })
        .await?;
    Ok(())
}
