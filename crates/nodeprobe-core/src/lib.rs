//! nodeprobe-core — shared types for the node-probe sidecar.
//!
//! Holds the vocabulary every other crate speaks: endpoint references,
//! health readings produced by endpoint clients, the probe policy, the
//! verdict rendered by the dispatcher, and the sidecar configuration.

pub mod config;
pub mod endpoint;
pub mod error;
pub mod types;

pub use config::ProbeConfig;
pub use endpoint::{EndpointKind, EndpointRef};
pub use error::{ConfigError, ProbeError, ProbeResult};
pub use types::*;
