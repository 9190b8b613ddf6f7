//! Sidecar configuration, loadable from a TOML file.
//!
//! Every field has a default, so an empty file (or no file at all) yields a
//! probe against a local node on the standard Substrate ports. Command-line
//! flags are layered on top by the daemon.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::endpoint::EndpointRef;
use crate::error::ConfigError;
use crate::types::{DEFAULT_METRICS_ENDPOINT, DEFAULT_WS_ENDPOINT, ProbePolicy, ProbeTargets};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// WebSocket RPC endpoints in probe order (e.g. relaychain, then parachain).
    pub ws_endpoints: Vec<String>,
    pub metrics_endpoint: String,
    pub use_metrics: bool,
    pub finalized_block_threshold_seconds: i64,
    pub block_threshold_seconds: f64,
    /// Per-endpoint attempt timeout.
    pub probe_timeout_seconds: f64,
    /// Metric name prefix exported by the node (`substrate`, `polkadot`, ...).
    pub metrics_prefix: String,
    /// Listen address. Host-less `:port` binds all interfaces.
    pub listen: String,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            ws_endpoints: vec![DEFAULT_WS_ENDPOINT.to_string()],
            metrics_endpoint: DEFAULT_METRICS_ENDPOINT.to_string(),
            use_metrics: true,
            finalized_block_threshold_seconds: 300,
            block_threshold_seconds: 300.0,
            probe_timeout_seconds: 5.0,
            metrics_prefix: "substrate".to_string(),
            listen: ":49944".to_string(),
        }
    }
}

impl ProbeConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Parse and order the configured endpoints.
    pub fn targets(&self) -> Result<ProbeTargets, ConfigError> {
        let websocket = self
            .ws_endpoints
            .iter()
            .map(|uri| EndpointRef::websocket(uri))
            .collect::<Result<Vec<_>, _>>()?;
        let metrics = vec![EndpointRef::metrics(&self.metrics_endpoint)?];
        Ok(ProbeTargets::new(websocket, metrics))
    }

    /// Validate thresholds and build the probe policy.
    pub fn policy(&self) -> Result<ProbePolicy, ConfigError> {
        if self.finalized_block_threshold_seconds <= 0 {
            return Err(ConfigError::InvalidThreshold {
                name: "finalized_block_threshold_seconds",
                value: self.finalized_block_threshold_seconds.to_string(),
            });
        }
        if !(self.block_threshold_seconds.is_finite() && self.block_threshold_seconds > 0.0) {
            return Err(ConfigError::InvalidThreshold {
                name: "block_threshold_seconds",
                value: self.block_threshold_seconds.to_string(),
            });
        }
        if !(self.probe_timeout_seconds.is_finite() && self.probe_timeout_seconds > 0.0) {
            return Err(ConfigError::InvalidThreshold {
                name: "probe_timeout_seconds",
                value: self.probe_timeout_seconds.to_string(),
            });
        }
        Ok(ProbePolicy {
            use_metrics: self.use_metrics,
            finalized_block_threshold_seconds: self.finalized_block_threshold_seconds,
            block_threshold_seconds: self.block_threshold_seconds,
            timeout: Duration::from_secs_f64(self.probe_timeout_seconds),
        })
    }

    /// Resolve the listen address, accepting the `:49944` shorthand.
    pub fn listen_addr(&self) -> Result<SocketAddr, ConfigError> {
        let listen = self.listen.trim();
        if let Some(port) = listen.strip_prefix(':') {
            let port: u16 = port
                .parse()
                .map_err(|_| ConfigError::InvalidListen(listen.to_string()))?;
            return Ok(SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), port));
        }
        listen
            .parse()
            .map_err(|_| ConfigError::InvalidListen(listen.to_string()))
    }
}
