//! nodeprobe-api — HTTP surface of the node-probe sidecar.
//!
//! Binds one probe strategy to each route and renders its verdict.
//!
//! # API Routes
//!
//! | Method | Path | Probe |
//! |---|---|---|
//! | GET | `/healthz` | Liveness (finality) |
//! | GET | `/healthz_block` | Liveness (latest block age) |
//! | GET | `/readiness` | Readiness (sync status) |
//!
//! Healthy → `200`, unhealthy → `503`, no verdict → `500`. The body is the
//! verdict reason as plain text.

pub mod handlers;

use std::sync::Arc;

use axum::Router;
use axum::routing::get;

use nodeprobe_client::EndpointClient;
use nodeprobe_core::{ProbePolicy, ProbeTargets};
use nodeprobe_health::{
    HeightTracker, LivenessBlockProbe, LivenessProbe, Prober, ReadinessProbe,
};

/// Per-route state: the bound strategy plus the fixed targets and policy.
#[derive(Clone)]
pub struct ProbeState {
    pub prober: Arc<dyn Prober>,
    pub targets: Arc<ProbeTargets>,
    pub policy: Arc<ProbePolicy>,
}

/// The three strategies, one per route.
pub struct ProbeSet {
    pub liveness: Arc<dyn Prober>,
    pub liveness_block: Arc<dyn Prober>,
    pub readiness: Arc<dyn Prober>,
}

impl ProbeSet {
    /// Standard strategies sharing one client and one height tracker.
    pub fn standard(client: Arc<dyn EndpointClient>) -> Self {
        let tracker = Arc::new(HeightTracker::new());
        Self {
            liveness: Arc::new(LivenessProbe::new(client.clone(), tracker.clone())),
            liveness_block: Arc::new(LivenessBlockProbe::new(client.clone(), tracker)),
            readiness: Arc::new(ReadinessProbe::new(client)),
        }
    }
}

/// Build the probe router with the standard strategies.
pub fn build_router(
    client: Arc<dyn EndpointClient>,
    targets: ProbeTargets,
    policy: ProbePolicy,
) -> Router {
    router_with(ProbeSet::standard(client), targets, policy)
}

/// Build the probe router around an explicit set of strategies.
pub fn router_with(probes: ProbeSet, targets: ProbeTargets, policy: ProbePolicy) -> Router {
    let targets = Arc::new(targets);
    let policy = Arc::new(policy);
    let state = |prober: Arc<dyn Prober>| ProbeState {
        prober,
        targets: targets.clone(),
        policy: policy.clone(),
    };

    Router::new()
        .route("/healthz", get(handlers::probe).with_state(state(probes.liveness)))
        .route(
            "/healthz_block",
            get(handlers::probe).with_state(state(probes.liveness_block)),
        )
        .route("/readiness", get(handlers::probe).with_state(state(probes.readiness)))
}
