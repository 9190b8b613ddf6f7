//! Error types for probing and configuration.

use thiserror::Error;

/// Result type alias for endpoint reads and probe evaluation.
pub type ProbeResult<T> = Result<T, ProbeError>;

/// Errors raised while reading an endpoint or evaluating a probe.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ProbeError {
    /// Endpoint unreachable, handshake failed, non-2xx status, or timed out.
    #[error("connection error ({endpoint}): {message}")]
    Connection { endpoint: String, message: String },

    /// Endpoint answered but the RPC response had an unexpected shape.
    #[error("protocol error ({endpoint}): {message}")]
    Protocol { endpoint: String, message: String },

    /// Metrics exposition was malformed or lacked a required series.
    #[error("parse error ({endpoint}): {message}")]
    Parse { endpoint: String, message: String },

    #[error("no endpoint reachable")]
    ExhaustedEndpoints,

    #[error("internal fault: {0}")]
    Internal(String),
}

impl ProbeError {
    pub fn connection(endpoint: impl Into<String>, message: impl ToString) -> Self {
        Self::Connection {
            endpoint: endpoint.into(),
            message: message.to_string(),
        }
    }

    pub fn protocol(endpoint: impl Into<String>, message: impl ToString) -> Self {
        Self::Protocol {
            endpoint: endpoint.into(),
            message: message.to_string(),
        }
    }

    pub fn parse(endpoint: impl Into<String>, message: impl ToString) -> Self {
        Self::Parse {
            endpoint: endpoint.into(),
            message: message.to_string(),
        }
    }

    /// Reachable endpoint with an unusable answer. Still advances the
    /// fallback, but is logged louder than a connection failure.
    pub fn is_hard_failure(&self) -> bool {
        matches!(self, Self::Protocol { .. } | Self::Parse { .. })
    }
}

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Read(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("unsupported scheme for {kind} endpoint: {uri}")]
    UnsupportedScheme { kind: &'static str, uri: String },

    #[error("invalid endpoint URI: {0}")]
    InvalidUri(String),

    #[error("invalid listen address: {0}")]
    InvalidListen(String),

    #[error("{name} must be positive, got {value}")]
    InvalidThreshold { name: &'static str, value: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exhausted_message() {
        assert_eq!(ProbeError::ExhaustedEndpoints.to_string(), "no endpoint reachable");
    }

    #[test]
    fn hard_failures() {
        assert!(ProbeError::protocol("ws://a", "bad json").is_hard_failure());
        assert!(ProbeError::parse("http://a", "missing series").is_hard_failure());
        assert!(!ProbeError::connection("ws://a", "refused").is_hard_failure());
        assert!(!ProbeError::Internal("boom".into()).is_hard_failure());
    }

    #[test]
    fn display_includes_endpoint() {
        let err = ProbeError::connection("ws://127.0.0.1:9944", "connection refused");
        assert_eq!(
            err.to_string(),
            "connection error (ws://127.0.0.1:9944): connection refused"
        );
    }
}
