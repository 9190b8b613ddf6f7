//! Command-line flags.
//!
//! Flags mirror the config file keys and override them when given.

use std::path::PathBuf;

use clap::Parser;

use nodeprobe_core::{ConfigError, ProbeConfig};

#[derive(Debug, Parser)]
#[command(
    name = "nodeprobed",
    about = "Liveness and readiness probes for Substrate nodes",
    version
)]
pub struct Cli {
    /// TOML config file. Flags take precedence over its values.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Node WebSocket endpoint. Repeat to probe relaychain and parachain
    /// in order [default: ws://127.0.0.1:9944]
    #[arg(long = "ws-endpoint", value_name = "URI")]
    pub ws_endpoints: Vec<String>,

    /// Node metrics endpoint [default: http://127.0.0.1:9615/metrics]
    #[arg(long, value_name = "URI")]
    pub metrics_endpoint: Option<String>,

    /// Use metrics for /healthz. When false, /healthz reads the finalized
    /// head over WebSocket instead [default: true]
    #[arg(long, num_args = 0..=1, default_missing_value = "true", value_name = "BOOL")]
    pub use_metrics: Option<bool>,

    /// /healthz is unhealthy when finality has not advanced for this long.
    /// Ignored when --use-metrics=false [default: 300]
    #[arg(long, value_name = "SECONDS", allow_negative_numbers = true)]
    pub finalized_block_threshold_seconds: Option<i64>,

    /// /healthz_block is unhealthy when the latest block is older than this
    /// [default: 300]
    #[arg(long, value_name = "SECONDS", allow_negative_numbers = true)]
    pub block_threshold_seconds: Option<f64>,

    /// Timeout for a single endpoint attempt [default: 5]
    #[arg(long, value_name = "SECONDS")]
    pub probe_timeout_seconds: Option<f64>,

    /// Metric name prefix exported by the node [default: substrate]
    #[arg(long, value_name = "PREFIX")]
    pub metrics_prefix: Option<String>,

    /// Listen address [default: :49944]
    #[arg(long, value_name = "ADDR")]
    pub listen: Option<String>,
}

impl Cli {
    /// Load the config file, if any, and layer the flags on top.
    pub fn into_config(self) -> Result<ProbeConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => ProbeConfig::from_file(path)?,
            None => ProbeConfig::default(),
        };

        if !self.ws_endpoints.is_empty() {
            config.ws_endpoints = self.ws_endpoints;
        }
        if let Some(v) = self.metrics_endpoint {
            config.metrics_endpoint = v;
        }
        if let Some(v) = self.use_metrics {
            config.use_metrics = v;
        }
        if let Some(v) = self.finalized_block_threshold_seconds {
            config.finalized_block_threshold_seconds = v;
        }
        if let Some(v) = self.block_threshold_seconds {
            config.block_threshold_seconds = v;
        }
        if let Some(v) = self.probe_timeout_seconds {
            config.probe_timeout_seconds = v;
        }
        if let Some(v) = self.metrics_prefix {
            config.metrics_prefix = v;
        }
        if let Some(v) = self.listen {
            config.listen = v;
        }
        Ok(config)
    }
}
