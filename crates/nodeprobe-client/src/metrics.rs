//! Metrics scrape client.
//!
//! Fetches the node's Prometheus endpoint over plain HTTP/1.1 and maps the
//! well-known Substrate series onto a [`HealthReading`].

use std::time::{Duration, SystemTime};

use http_body_util::{BodyExt, Limited};
use tracing::debug;

use nodeprobe_core::{EndpointRef, HealthReading, ProbeError, ProbeResult};

use crate::exposition::{self, Sample};

/// Largest exposition body accepted from a node.
pub const MAX_BODY_BYTES: usize = 8 * 1024 * 1024;

/// Scrapes and interprets a node metrics endpoint.
#[derive(Debug, Clone)]
pub struct MetricsClient {
    /// Metric name prefix, e.g. `substrate` → `substrate_block_height`.
    prefix: String,
}

impl MetricsClient {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Scrape `endpoint` and extract a reading.
    pub async fn read(&self, endpoint: &EndpointRef) -> ProbeResult<HealthReading> {
        let body = scrape(&endpoint.uri).await?;
        self.interpret(endpoint, &body, SystemTime::now())
    }

    /// Turn an exposition body into a reading observed at `observed_at`.
    pub fn interpret(
        &self,
        endpoint: &EndpointRef,
        body: &str,
        observed_at: SystemTime,
    ) -> ProbeResult<HealthReading> {
        let samples =
            exposition::parse_exposition(body).map_err(|e| ProbeError::parse(&endpoint.uri, e))?;

        let height_name = self.metric("block_height");
        let finalized = exposition::find(&samples, &height_name, &[("status", "finalized")])
            .ok_or_else(|| {
                ProbeError::parse(
                    &endpoint.uri,
                    format!("missing {height_name}{{status=\"finalized\"}}"),
                )
            })?;

        let mut reading = HealthReading::new(endpoint.clone(), observed_at);
        reading.finalized_block_height = Some(as_height(&endpoint.uri, finalized)?);
        reading.latest_block_height =
            match exposition::find(&samples, &height_name, &[("status", "best")]) {
                Some(best) => Some(as_height(&endpoint.uri, best)?),
                None => None,
            };

        reading.is_syncing = [
            self.metric("sub_libp2p_is_major_syncing"),
            self.metric("sync_is_major_syncing"),
        ]
        .iter()
        .find_map(|name| exposition::find(&samples, name, &[]))
        .map(|s| s.value != 0.0);

        reading.peers = exposition::find(&samples, &self.metric("sub_libp2p_peers_count"), &[])
            .filter(|s| s.value.is_finite() && s.value >= 0.0)
            .map(|s| s.value as u64);

        reading.finalized_block_age =
            exposition::find(&samples, &self.metric("finalized_block_age_seconds"), &[])
                .filter(|s| s.value.is_finite() && s.value >= 0.0)
                .map(|s| Duration::from_secs_f64(s.value));

        reading.metrics = exposition::to_map(&samples);
        Ok(reading)
    }

    fn metric(&self, suffix: &str) -> String {
        format!("{}_{suffix}", self.prefix)
    }
}

fn as_height(uri: &str, sample: &Sample) -> ProbeResult<u64> {
    if sample.value.is_finite() && sample.value >= 0.0 && sample.value.fract() == 0.0 {
        Ok(sample.value as u64)
    } else {
        Err(ProbeError::parse(
            uri,
            format!("{} is not a block height: {}", sample.key(), sample.value),
        ))
    }
}

/// GET `uri` and return the body of a 2xx response.
async fn scrape(uri: &str) -> ProbeResult<String> {
    let parsed: http::Uri = uri
        .parse()
        .map_err(|e| ProbeError::connection(uri, format!("invalid URI: {e}")))?;
    let host = parsed
        .host()
        .ok_or_else(|| ProbeError::connection(uri, "URI has no host"))?;
    let port = parsed.port_u16().unwrap_or(80);
    // IPv6 literals keep their brackets in the URI host.
    let ip_or_name = host.trim_start_matches('[').trim_end_matches(']');
    let authority = parsed
        .authority()
        .map(|a| a.as_str().to_string())
        .unwrap_or_else(|| host.to_string());

    let stream = tokio::net::TcpStream::connect((ip_or_name, port))
        .await
        .map_err(|e| ProbeError::connection(uri, e))?;

    let io = hyper_util::rt::TokioIo::new(stream);
    let (mut sender, conn) = hyper::client::conn::http1::handshake(io)
        .await
        .map_err(|e| ProbeError::connection(uri, format!("handshake failed: {e}")))?;

    // Drive the connection in the background.
    tokio::spawn(async move {
        if let Err(e) = conn.await {
            debug!(error = %e, "metrics connection closed with error");
        }
    });

    let path = parsed
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    let req = http::Request::builder()
        .method("GET")
        .uri(path)
        .header("host", authority)
        .header("user-agent", concat!("nodeprobe/", env!("CARGO_PKG_VERSION")))
        .header("accept", "text/plain")
        .body(http_body_util::Empty::<bytes::Bytes>::new())
        .map_err(|e| ProbeError::connection(uri, e))?;

    let resp = sender
        .send_request(req)
        .await
        .map_err(|e| ProbeError::connection(uri, format!("request failed: {e}")))?;

    let status = resp.status();
    if !status.is_success() {
        debug!(%status, %uri, "metrics scrape non-2xx");
        return Err(ProbeError::connection(uri, format!("unexpected status {status}")));
    }

    let body = Limited::new(resp.into_body(), MAX_BODY_BYTES)
        .collect()
        .await
        .map_err(|e| ProbeError::connection(uri, format!("failed to read body: {e}")))?
        .to_bytes();

    String::from_utf8(body.to_vec()).map_err(|e| ProbeError::parse(uri, e))
}
