//! nodeprobe-client — endpoint clients for the node-probe sidecar.
//!
//! Each client turns one candidate endpoint into a typed
//! [`HealthReading`](nodeprobe_core::HealthReading). Clients never retry;
//! timeouts and fallback across endpoints belong to the probe strategies.
//!
//! # Architecture
//!
//! ```text
//! EndpointClient (trait)
//!   └── NodeClient — routes by EndpointKind
//!         ├── WsClient      → chain_getHeader, chain_getFinalizedHead,
//!         │                   system_health, state_getStorage(Timestamp.now)
//!         └── MetricsClient → GET /metrics → exposition::parse_exposition()
//! ```

pub mod exposition;
pub mod metrics;
pub mod ws;

use async_trait::async_trait;

use nodeprobe_core::{EndpointKind, EndpointRef, HealthReading, ProbeResult};

pub use metrics::MetricsClient;
pub use ws::WsClient;

/// Produces a [`HealthReading`] from a single endpoint.
#[async_trait]
pub trait EndpointClient: Send + Sync {
    async fn read(&self, endpoint: &EndpointRef) -> ProbeResult<HealthReading>;
}

/// Production client: dispatches each endpoint to the client for its kind.
#[derive(Debug, Clone)]
pub struct NodeClient {
    ws: WsClient,
    metrics: MetricsClient,
}

impl NodeClient {
    pub fn new(metrics_prefix: &str) -> Self {
        Self {
            ws: WsClient::new(),
            metrics: MetricsClient::new(metrics_prefix),
        }
    }
}

#[async_trait]
impl EndpointClient for NodeClient {
    async fn read(&self, endpoint: &EndpointRef) -> ProbeResult<HealthReading> {
        match endpoint.kind {
            EndpointKind::WebSocket => self.ws.read(endpoint).await,
            EndpointKind::Metrics => self.metrics.read(endpoint).await,
        }
    }
}
