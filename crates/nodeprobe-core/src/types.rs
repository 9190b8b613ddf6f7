//! Shared types used across node-probe crates.

use std::collections::HashMap;
use std::time::{Duration, SystemTime};

use crate::endpoint::EndpointRef;

/// WebSocket endpoint used when configuration supplies none.
pub const DEFAULT_WS_ENDPOINT: &str = "ws://127.0.0.1:9944";

/// Metrics endpoint used when configuration supplies none.
pub const DEFAULT_METRICS_ENDPOINT: &str = "http://127.0.0.1:9615/metrics";

/// Status returned with a healthy verdict.
pub const STATUS_HEALTHY: u16 = 200;

/// Status returned with an unhealthy verdict.
pub const STATUS_UNHEALTHY: u16 = 503;

/// Status returned when no verdict could be computed.
pub const STATUS_INTERNAL: u16 = 500;

/// Facts extracted from one endpoint during one probe.
///
/// Produced fresh per request and never persisted. Fields the endpoint
/// could not supply stay `None`; which ones matter depends on the probe.
#[derive(Debug, Clone, PartialEq)]
pub struct HealthReading {
    pub source: EndpointRef,
    /// Local wall-clock time the reading was taken.
    pub observed_at: SystemTime,
    pub latest_block_height: Option<u64>,
    /// On-chain timestamp of the latest block, when the node exposes it.
    pub latest_block_timestamp: Option<SystemTime>,
    pub finalized_block_height: Option<u64>,
    /// Time since finality last advanced, when reported directly.
    pub finalized_block_age: Option<Duration>,
    pub is_syncing: Option<bool>,
    pub peers: Option<u64>,
    pub should_have_peers: Option<bool>,
    /// Raw scraped samples keyed by `name{label="value",...}`.
    pub metrics: HashMap<String, f64>,
}

impl HealthReading {
    /// An empty reading for `source` taken at `observed_at`.
    pub fn new(source: EndpointRef, observed_at: SystemTime) -> Self {
        Self {
            source,
            observed_at,
            latest_block_height: None,
            latest_block_timestamp: None,
            finalized_block_height: None,
            finalized_block_age: None,
            is_syncing: None,
            peers: None,
            should_have_peers: None,
            metrics: HashMap::new(),
        }
    }

    /// True when the node says it should be peered but has no peers.
    pub fn is_isolated(&self) -> bool {
        self.should_have_peers.unwrap_or(false) && self.peers == Some(0)
    }
}

/// Thresholds and switches that shape probe decisions. Set once at start.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbePolicy {
    /// Liveness reads the metrics endpoint instead of WebSocket RPC.
    pub use_metrics: bool,
    /// Max finalized block age for liveness. Only applies with metrics.
    pub finalized_block_threshold_seconds: i64,
    /// Max latest block age for block liveness.
    pub block_threshold_seconds: f64,
    /// Bound on a single endpoint attempt.
    pub timeout: Duration,
}

impl Default for ProbePolicy {
    fn default() -> Self {
        Self {
            use_metrics: true,
            finalized_block_threshold_seconds: 300,
            block_threshold_seconds: 300.0,
            timeout: Duration::from_secs(5),
        }
    }
}

/// Ordered candidate endpoints, grouped by kind.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeTargets {
    pub websocket: Vec<EndpointRef>,
    pub metrics: Vec<EndpointRef>,
}

impl ProbeTargets {
    /// Group endpoints, falling back to the local defaults for an empty list.
    pub fn new(websocket: Vec<EndpointRef>, metrics: Vec<EndpointRef>) -> Self {
        let websocket = if websocket.is_empty() {
            vec![EndpointRef {
                uri: DEFAULT_WS_ENDPOINT.to_string(),
                kind: crate::EndpointKind::WebSocket,
            }]
        } else {
            websocket
        };
        let metrics = if metrics.is_empty() {
            vec![EndpointRef {
                uri: DEFAULT_METRICS_ENDPOINT.to_string(),
                kind: crate::EndpointKind::Metrics,
            }]
        } else {
            metrics
        };
        Self { websocket, metrics }
    }
}

/// Outcome of one probe request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub healthy: bool,
    pub reason: String,
    pub http_status: u16,
}

impl Verdict {
    pub fn healthy(reason: impl Into<String>) -> Self {
        Self {
            healthy: true,
            reason: reason.into(),
            http_status: STATUS_HEALTHY,
        }
    }

    pub fn unhealthy(reason: impl Into<String>) -> Self {
        Self {
            healthy: false,
            reason: reason.into(),
            http_status: STATUS_UNHEALTHY,
        }
    }

    /// Every candidate endpoint failed.
    pub fn exhausted() -> Self {
        Self::unhealthy(crate::ProbeError::ExhaustedEndpoints.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EndpointKind;

    #[test]
    fn targets_fall_back_to_defaults() {
        let targets = ProbeTargets::new(vec![], vec![]);
        assert_eq!(targets.websocket.len(), 1);
        assert_eq!(targets.websocket[0].uri, DEFAULT_WS_ENDPOINT);
        assert_eq!(targets.websocket[0].kind, EndpointKind::WebSocket);
        assert_eq!(targets.metrics[0].uri, DEFAULT_METRICS_ENDPOINT);
        assert_eq!(targets.metrics[0].kind, EndpointKind::Metrics);
    }

    #[test]
    fn targets_keep_configured_order() {
        let relay = EndpointRef::websocket("ws://relay:9944").unwrap();
        let para = EndpointRef::websocket("ws://para:9944").unwrap();
        let targets = ProbeTargets::new(vec![relay.clone(), para.clone()], vec![]);
        assert_eq!(targets.websocket, vec![relay, para]);
    }

    #[test]
    fn verdict_statuses() {
        assert_eq!(Verdict::healthy("ok").http_status, 200);
        assert_eq!(Verdict::unhealthy("stalled").http_status, 503);

        let exhausted = Verdict::exhausted();
        assert!(!exhausted.healthy);
        assert_eq!(exhausted.reason, "no endpoint reachable");
        assert_eq!(exhausted.http_status, 503);
    }

    #[test]
    fn isolation_requires_should_have_peers() {
        let source = EndpointRef::websocket("ws://node:9944").unwrap();
        let mut reading = HealthReading::new(source, SystemTime::UNIX_EPOCH);
        reading.peers = Some(0);
        assert!(!reading.is_isolated());

        reading.should_have_peers = Some(true);
        assert!(reading.is_isolated());

        reading.peers = Some(3);
        assert!(!reading.is_isolated());
    }
}
