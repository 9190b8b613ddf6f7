//! nodeprobe-health — probe strategies for the node-probe sidecar.
//!
//! Each strategy implements [`Prober`] and decides a [`Verdict`] by walking
//! the configured endpoints in order until one yields a usable reading.
//!
//! # Architecture
//!
//! ```text
//! Prober::evaluate(targets, policy)
//!   ├── LivenessProbe       → metrics (finality age) or ws (finalized head)
//!   ├── LivenessBlockProbe  → ws (latest block age, HeightTracker)
//!   ├── ReadinessProbe      → ws (sync status)
//!   └── fallback::first_usable() — sequential, first usable reading wins
//! ```
//!
//! # Shared state
//!
//! Staleness is measured against a process-wide [`HeightTracker`] keyed by
//! endpoint. It is created at startup, shared by all requests under a
//! mutex, and never persisted.

pub mod fallback;
pub mod liveness;
pub mod readiness;
pub mod tracker;

#[cfg(test)]
mod testing;

use async_trait::async_trait;

use nodeprobe_core::{ProbePolicy, ProbeResult, ProbeTargets, Verdict};

pub use liveness::{LivenessBlockProbe, LivenessProbe};
pub use readiness::ReadinessProbe;
pub use tracker::{HeightMark, HeightTracker, Series};

/// A probe strategy.
///
/// Returns `Ok` with a healthy or unhealthy verdict, including the
/// "no endpoint reachable" verdict when every candidate failed. `Err` is
/// reserved for internal faults that prevent a verdict.
#[async_trait]
pub trait Prober: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    async fn evaluate(&self, targets: &ProbeTargets, policy: &ProbePolicy) -> ProbeResult<Verdict>;
}
