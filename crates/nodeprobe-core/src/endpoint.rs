//! Endpoint references and scheme validation.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Which protocol an endpoint speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndpointKind {
    /// JSON-RPC over WebSocket: ws://127.0.0.1:9944
    WebSocket,
    /// Prometheus text exposition over HTTP: http://127.0.0.1:9615/metrics
    Metrics,
}

impl EndpointKind {
    pub fn label(&self) -> &'static str {
        match self {
            EndpointKind::WebSocket => "ws",
            EndpointKind::Metrics => "metrics",
        }
    }
}

/// A single candidate endpoint. Immutable once built from configuration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EndpointRef {
    pub uri: String,
    pub kind: EndpointKind,
}

impl EndpointRef {
    /// Build a WebSocket RPC endpoint. Accepts `ws://` and `wss://`.
    pub fn websocket(uri: &str) -> Result<Self, ConfigError> {
        let uri = uri.trim();
        if uri.starts_with("ws://") || uri.starts_with("wss://") {
            Self::checked(uri, EndpointKind::WebSocket)
        } else {
            Err(ConfigError::UnsupportedScheme {
                kind: EndpointKind::WebSocket.label(),
                uri: uri.to_string(),
            })
        }
    }

    /// Build a metrics scrape endpoint. Only plain `http://` is scraped.
    pub fn metrics(uri: &str) -> Result<Self, ConfigError> {
        let uri = uri.trim();
        if uri.starts_with("http://") {
            Self::checked(uri, EndpointKind::Metrics)
        } else {
            Err(ConfigError::UnsupportedScheme {
                kind: EndpointKind::Metrics.label(),
                uri: uri.to_string(),
            })
        }
    }

    fn checked(uri: &str, kind: EndpointKind) -> Result<Self, ConfigError> {
        let rest = uri.split_once("://").map(|(_, rest)| rest).unwrap_or("");
        let host = rest.split('/').next().unwrap_or("");
        if host.is_empty() {
            return Err(ConfigError::InvalidUri(uri.to_string()));
        }
        Ok(Self {
            uri: uri.to_string(),
            kind,
        })
    }
}

impl fmt::Display for EndpointRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.uri)
    }
}
