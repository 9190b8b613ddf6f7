//! Readiness probe: should traffic be sent to this node now?

use std::sync::Arc;

use async_trait::async_trait;

use nodeprobe_client::EndpointClient;
use nodeprobe_core::{HealthReading, ProbePolicy, ProbeResult, ProbeTargets, Verdict};

use crate::Prober;
use crate::fallback::first_usable;

/// Ready when the node answers RPC and is not in a major sync. A node that
/// does not report sync status is ready as long as it answered in time.
pub struct ReadinessProbe {
    client: Arc<dyn EndpointClient>,
}

impl ReadinessProbe {
    pub fn new(client: Arc<dyn EndpointClient>) -> Self {
        Self { client }
    }
}

fn judge(reading: HealthReading) -> ProbeResult<Verdict> {
    let uri = &reading.source.uri;
    let at_block = reading
        .latest_block_height
        .map(|h| format!(" at block #{h}"))
        .unwrap_or_default();

    Ok(match reading.is_syncing {
        Some(true) => Verdict::unhealthy(format!("{uri}: node is syncing{at_block}")),
        Some(false) => Verdict::healthy(format!("{uri}: node is synced{at_block}")),
        None => Verdict::healthy(format!(
            "{uri}: node responded{at_block}, sync status unavailable"
        )),
    })
}

#[async_trait]
impl Prober for ReadinessProbe {
    fn name(&self) -> &'static str {
        "readiness"
    }

    async fn evaluate(&self, targets: &ProbeTargets, policy: &ProbePolicy) -> ProbeResult<Verdict> {
        first_usable(self.client.as_ref(), &targets.websocket, policy.timeout, judge).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ScriptedClient, reading};
    use nodeprobe_core::{EndpointRef, ProbeError};

    fn targets() -> ProbeTargets {
        ProbeTargets::new(
            vec![
                EndpointRef::websocket("ws://relay:9944").unwrap(),
                EndpointRef::websocket("ws://para:9944").unwrap(),
            ],
            vec![],
        )
    }

    fn probe(client: ScriptedClient) -> (ReadinessProbe, Arc<ScriptedClient>) {
        let client = Arc::new(client);
        (ReadinessProbe::new(client.clone()), client)
    }

    #[tokio::test]
    async fn synced_node_is_ready() {
        let t = targets();
        let ep = &t.websocket[0];
        let (probe, _) = probe(ScriptedClient::new().then(ep, Ok(reading(ep))));
        let verdict = probe.evaluate(&t, &ProbePolicy::default()).await.unwrap();
        assert!(verdict.healthy);
        assert_eq!(verdict.reason, "ws://relay:9944: node is synced at block #100");
    }

    #[tokio::test]
    async fn syncing_node_is_not_ready() {
        let t = targets();
        let mut r = reading(&t.websocket[0]);
        r.is_syncing = Some(true);
        let (probe, client) = probe(
            ScriptedClient::new()
                .then(&t.websocket[0], Ok(r))
                .then(&t.websocket[1], Ok(reading(&t.websocket[1]))),
        );

        let verdict = probe.evaluate(&t, &ProbePolicy::default()).await.unwrap();
        assert!(!verdict.healthy);
        assert_eq!(verdict.http_status, 503);
        assert_eq!(client.calls(&t.websocket[1]), 0);
    }

    #[tokio::test]
    async fn unknown_sync_status_is_ready() {
        let t = targets();
        let mut r = reading(&t.websocket[0]);
        r.is_syncing = None;
        let (probe, _) = probe(ScriptedClient::new().then(&t.websocket[0], Ok(r)));

        let verdict = probe.evaluate(&t, &ProbePolicy::default()).await.unwrap();
        assert!(verdict.healthy);
        assert!(verdict.reason.contains("sync status unavailable"));
    }

    #[tokio::test]
    async fn falls_back_to_parachain() {
        let t = targets();
        let (probe, _) = probe(
            ScriptedClient::new()
                .then(&t.websocket[0], Err(ProbeError::connection("ws://relay:9944", "refused")))
                .then(&t.websocket[1], Ok(reading(&t.websocket[1]))),
        );

        let verdict = probe.evaluate(&t, &ProbePolicy::default()).await.unwrap();
        assert!(verdict.healthy);
        assert!(verdict.reason.starts_with("ws://para:9944"));
    }

    #[tokio::test]
    async fn repeated_requests_agree() {
        let t = targets();
        let ep = &t.websocket[0];
        let (probe, _) = probe(ScriptedClient::new().then(ep, Ok(reading(ep))));
        let policy = ProbePolicy::default();

        let first = probe.evaluate(&t, &policy).await.unwrap();
        for _ in 0..3 {
            assert_eq!(probe.evaluate(&t, &policy).await.unwrap(), first);
        }
    }
}
