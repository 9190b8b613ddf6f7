//! Ordered endpoint fallback.
//!
//! Candidates are tried one at a time in configured order. The first
//! endpoint that yields a usable reading decides the verdict, even when
//! that verdict is unhealthy; later endpoints are never contacted. This is
//! what lets a relaychain endpoint take precedence over a parachain one.

use std::time::Duration;

use tracing::{debug, info, warn};

use nodeprobe_client::EndpointClient;
use nodeprobe_core::{EndpointRef, HealthReading, ProbeError, ProbeResult, Verdict};

/// Walk `endpoints` in order and let `decide` judge the first usable reading.
///
/// Each read is bounded by `timeout`; expiry counts as a connection
/// failure. `decide` may reject a reading with a protocol or parse error
/// (e.g. a required fact is missing), which advances to the next endpoint.
/// An internal fault aborts the walk. When every endpoint fails the verdict
/// is unhealthy with reason "no endpoint reachable".
pub async fn first_usable<F>(
    client: &dyn EndpointClient,
    endpoints: &[EndpointRef],
    timeout: Duration,
    mut decide: F,
) -> ProbeResult<Verdict>
where
    F: FnMut(HealthReading) -> ProbeResult<Verdict>,
{
    for endpoint in endpoints {
        let read = match tokio::time::timeout(timeout, client.read(endpoint)).await {
            Ok(result) => result,
            Err(_) => Err(ProbeError::connection(
                &endpoint.uri,
                format!("timed out after {}ms", timeout.as_millis()),
            )),
        };

        match read.and_then(&mut decide) {
            Ok(verdict) => {
                debug!(
                    %endpoint,
                    healthy = verdict.healthy,
                    reason = %verdict.reason,
                    "endpoint decided verdict"
                );
                return Ok(verdict);
            }
            Err(ProbeError::Internal(message)) => return Err(ProbeError::Internal(message)),
            Err(e) if e.is_hard_failure() => {
                warn!(%endpoint, error = %e, "endpoint returned unusable response, trying next");
            }
            Err(e) => {
                info!(%endpoint, error = %e, "endpoint unavailable, trying next");
            }
        }
    }

    warn!(candidates = endpoints.len(), "no endpoint reachable");
    Ok(Verdict::exhausted())
}
