//! Liveness probes: is the node still making progress?
//!
//! - [`LivenessProbe`] (`/healthz`) watches finality, from metrics or RPC.
//! - [`LivenessBlockProbe`] (`/healthz_block`) watches the latest block.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use nodeprobe_client::EndpointClient;
use nodeprobe_core::{HealthReading, ProbeError, ProbePolicy, ProbeResult, ProbeTargets, Verdict};

use crate::Prober;
use crate::fallback::first_usable;
use crate::tracker::{HeightTracker, Series};

/// Finality-based liveness.
///
/// With `use_metrics`, the metrics endpoint is scraped and the node is
/// unhealthy once finality has not advanced for longer than
/// `finalized_block_threshold_seconds`. The age comes from the node's own
/// age gauge when exported, otherwise from the finalized height tracker.
///
/// Without metrics, the WebSocket endpoints are asked for the finalized
/// head and the threshold is not applied: the node is live when it reports
/// a finalized head and is not isolated from its peers.
pub struct LivenessProbe {
    client: Arc<dyn EndpointClient>,
    tracker: Arc<HeightTracker>,
}

impl LivenessProbe {
    pub fn new(client: Arc<dyn EndpointClient>, tracker: Arc<HeightTracker>) -> Self {
        Self { client, tracker }
    }

    fn judge_metrics(&self, reading: HealthReading, policy: &ProbePolicy) -> ProbeResult<Verdict> {
        let uri = &reading.source.uri;
        let finalized = reading
            .finalized_block_height
            .ok_or_else(|| ProbeError::parse(uri, "no finalized block height"))?;

        let age = match reading.finalized_block_age {
            Some(age) => age,
            None => self
                .tracker
                .observe(&reading.source, Series::Finalized, finalized, reading.observed_at)?
                .age(reading.observed_at),
        };

        let threshold = Duration::from_secs(policy.finalized_block_threshold_seconds.max(0) as u64);
        if age > threshold {
            Ok(Verdict::unhealthy(format!(
                "{uri}: finalized block #{finalized} has not advanced for {}s (threshold {}s)",
                age.as_secs(),
                threshold.as_secs()
            )))
        } else {
            Ok(Verdict::healthy(format!(
                "{uri}: finalized block #{finalized}, last advanced {}s ago",
                age.as_secs()
            )))
        }
    }

    fn judge_rpc(&self, reading: HealthReading) -> ProbeResult<Verdict> {
        let uri = &reading.source.uri;
        let finalized = reading
            .finalized_block_height
            .ok_or_else(|| ProbeError::protocol(uri, "node reported no finalized head"))?;

        if reading.is_isolated() {
            return Ok(Verdict::unhealthy(format!(
                "{uri}: node has no peers (finalized block #{finalized})"
            )));
        }
        Ok(Verdict::healthy(format!("{uri}: finalized block #{finalized}")))
    }
}

#[async_trait]
impl Prober for LivenessProbe {
    fn name(&self) -> &'static str {
        "liveness"
    }

    async fn evaluate(&self, targets: &ProbeTargets, policy: &ProbePolicy) -> ProbeResult<Verdict> {
        if policy.use_metrics {
            first_usable(self.client.as_ref(), &targets.metrics, policy.timeout, |reading| {
                self.judge_metrics(reading, policy)
            })
            .await
        } else {
            first_usable(self.client.as_ref(), &targets.websocket, policy.timeout, |reading| {
                self.judge_rpc(reading)
            })
            .await
        }
    }
}

/// Latest-block liveness over WebSocket RPC.
///
/// Unhealthy once the latest block height has not strictly increased for
/// longer than `block_threshold_seconds`. The change time is the block's
/// on-chain timestamp when the node exposes it, otherwise the local time
/// the new height was first seen. The first reading of an endpoint without
/// an on-chain timestamp seeds the tracker and is healthy.
pub struct LivenessBlockProbe {
    client: Arc<dyn EndpointClient>,
    tracker: Arc<HeightTracker>,
}

impl LivenessBlockProbe {
    pub fn new(client: Arc<dyn EndpointClient>, tracker: Arc<HeightTracker>) -> Self {
        Self { client, tracker }
    }

    fn judge(&self, reading: HealthReading, policy: &ProbePolicy) -> ProbeResult<Verdict> {
        let uri = &reading.source.uri;
        let height = reading
            .latest_block_height
            .ok_or_else(|| ProbeError::protocol(uri, "node reported no latest block"))?;

        let changed_at = reading.latest_block_timestamp.unwrap_or(reading.observed_at);
        let mark = self
            .tracker
            .observe(&reading.source, Series::Best, height, changed_at)?;
        let age = mark.age(reading.observed_at).as_secs_f64();

        if age > policy.block_threshold_seconds {
            Ok(Verdict::unhealthy(format!(
                "{uri}: latest block #{} is {age:.0}s old (threshold {}s)",
                mark.height, policy.block_threshold_seconds
            )))
        } else {
            Ok(Verdict::healthy(format!(
                "{uri}: latest block #{} is {age:.0}s old",
                mark.height
            )))
        }
    }
}

#[async_trait]
impl Prober for LivenessBlockProbe {
    fn name(&self) -> &'static str {
        "liveness_block"
    }

    async fn evaluate(&self, targets: &ProbeTargets, policy: &ProbePolicy) -> ProbeResult<Verdict> {
        first_usable(self.client.as_ref(), &targets.websocket, policy.timeout, |reading| {
            self.judge(reading, policy)
        })
        .await
    }
}
