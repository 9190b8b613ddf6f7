//! nodeprobed — health-check sidecar for Substrate nodes.
//!
//! Serves `/healthz`, `/healthz_block`, and `/readiness` for an
//! orchestrator's liveness and readiness probes, answering each request by
//! querying the node's WebSocket RPC and/or metrics endpoint.
//!
//! # Usage
//!
//! ```text
//! nodeprobed --ws-endpoint ws://127.0.0.1:9944 --ws-endpoint ws://127.0.0.1:9945 \
//!     --metrics-endpoint http://127.0.0.1:9615/metrics --listen :49944
//! ```

mod cli;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};

use nodeprobe_client::NodeClient;

const BUILD_COMMIT: &str = match option_env!("NODEPROBE_BUILD_COMMIT") {
    Some(commit) => commit,
    None => "none",
};

const BUILD_DATE: &str = match option_env!("NODEPROBE_BUILD_DATE") {
    Some(date) => date,
    None => "unknown",
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,nodeprobe=debug")),
        )
        .init();

    let config = cli::Cli::parse().into_config()?;
    let targets = config.targets()?;
    let policy = config.policy()?;
    let addr = config.listen_addr()?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        commit = BUILD_COMMIT,
        built = BUILD_DATE,
        "node probe starting"
    );
    info!(
        ws = ?config.ws_endpoints,
        metrics = %config.metrics_endpoint,
        use_metrics = policy.use_metrics,
        "probe targets configured"
    );
    if !policy.use_metrics {
        info!("metrics disabled; finalized block threshold is ignored by /healthz");
    }

    let client = Arc::new(NodeClient::new(&config.metrics_prefix));
    let router = nodeprobe_api::build_router(client, targets, policy);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, "serving probe requests");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("node probe stopped");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("shutdown signal received"),
        Err(e) => {
            error!(error = %e, "failed to install Ctrl-C handler");
            std::future::pending::<()>().await;
        }
    }
}
