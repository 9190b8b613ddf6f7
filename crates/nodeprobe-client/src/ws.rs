//! WebSocket JSON-RPC client.
//!
//! Opens one short-lived connection per read, issues the Substrate RPC calls
//! needed for a [`HealthReading`], and closes the socket. Only the best block
//! hash and its header are required; every other fact degrades to `None` when
//! the node rejects or cannot answer the call. `wss://` endpoints are dialed
//! with rustls over the webpki root set.

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::{Connector, MaybeTlsStream, WebSocketStream, connect_async_tls_with_config};
use tracing::debug;

use nodeprobe_core::{EndpointRef, HealthReading, ProbeError, ProbeResult};

/// Storage key of `Timestamp::Now`: `twox128("Timestamp") ++ twox128("Now")`.
pub const TIMESTAMP_NOW_KEY: &str =
    "0xf0c365c3cf59d671eb72da0e7a4113c49f1f0515f462cdcf84e0f1d6045dfcbb";

/// Reads chain head, finality, and sync state over WebSocket RPC.
#[derive(Debug, Clone, Default)]
pub struct WsClient;

impl WsClient {
    pub fn new() -> Self {
        Self
    }

    pub async fn read(&self, endpoint: &EndpointRef) -> ProbeResult<HealthReading> {
        let connector = tls_connector(&endpoint.uri)?;
        let (socket, _) =
            connect_async_tls_with_config(endpoint.uri.as_str(), None, false, Some(connector))
                .await
                .map_err(|e| ProbeError::connection(&endpoint.uri, e))?;

        let mut session = RpcSession {
            socket,
            next_id: 0,
            endpoint: endpoint.uri.clone(),
        };
        let result = session.collect(endpoint).await;
        session.close().await;
        result
    }
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct Header {
    number: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SystemHealth {
    peers: u64,
    is_syncing: bool,
    #[serde(default)]
    should_have_peers: Option<bool>,
}

struct RpcSession {
    socket: WebSocketStream<MaybeTlsStream<TcpStream>>,
    next_id: u64,
    endpoint: String,
}

impl RpcSession {
    async fn collect(&mut self, endpoint: &EndpointRef) -> ProbeResult<HealthReading> {
        // Pin the best block by hash so its height and timestamp agree.
        let best: String = self.call_typed("chain_getBlockHash", json!([])).await?;
        let header: Header = self
            .call_typed("chain_getHeader", json!([best.as_str()]))
            .await?;
        let observed_at = SystemTime::now();

        let mut reading = HealthReading::new(endpoint.clone(), observed_at);
        reading.latest_block_height = Some(parse_block_number(&self.endpoint, &header.number)?);
        let timestamp = self.timestamp_at(&best).await;
        reading.latest_block_timestamp = self.optional(timestamp);

        let finalized_head = self
            .call_typed::<String>("chain_getFinalizedHead", json!([]))
            .await;
        if let Some(hash) = self.optional(finalized_head) {
            let finalized = self
                .call_typed::<Header>("chain_getHeader", json!([hash.as_str()]))
                .await;
            reading.finalized_block_height = self.optional(finalized).and_then(|h| {
                let number = parse_block_number(&self.endpoint, &h.number);
                self.optional(number)
            });
        }

        let health = self
            .call_typed::<SystemHealth>("system_health", json!([]))
            .await;
        if let Some(health) = self.optional(health) {
            reading.peers = Some(health.peers);
            reading.is_syncing = Some(health.is_syncing);
            reading.should_have_peers = health.should_have_peers;
        }

        Ok(reading)
    }

    /// On-chain `Timestamp::Now` at block `hash`.
    async fn timestamp_at(&mut self, hash: &str) -> ProbeResult<SystemTime> {
        let raw: String = self
            .call_typed("state_getStorage", json!([TIMESTAMP_NOW_KEY, hash]))
            .await?;
        decode_moment(&self.endpoint, &raw)
    }

    fn optional<T>(&self, result: ProbeResult<T>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(e) => {
                debug!(endpoint = %self.endpoint, error = %e, "optional rpc fact unavailable");
                None
            }
        }
    }

    async fn call_typed<T: serde::de::DeserializeOwned>(
        &mut self,
        method: &str,
        params: Value,
    ) -> ProbeResult<T> {
        let value = self.call(method, params).await?;
        serde_json::from_value(value)
            .map_err(|e| ProbeError::protocol(&self.endpoint, format!("{method}: {e}")))
    }

    async fn call(&mut self, method: &str, params: Value) -> ProbeResult<Value> {
        self.next_id += 1;
        let id = self.next_id;
        let request = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });

        self.socket
            .send(Message::Text(request.to_string()))
            .await
            .map_err(|e| ProbeError::connection(&self.endpoint, e))?;

        while let Some(msg) = self.socket.next().await {
            let msg = msg.map_err(|e| ProbeError::connection(&self.endpoint, e))?;
            let text = match msg {
                Message::Text(text) => text,
                Message::Binary(bytes) => String::from_utf8(bytes)
                    .map_err(|e| ProbeError::protocol(&self.endpoint, e))?,
                Message::Close(_) => break,
                _ => continue,
            };

            let response: RpcResponse = serde_json::from_str(&text)
                .map_err(|e| ProbeError::protocol(&self.endpoint, format!("{method}: {e}")))?;
            // Subscription notifications and stale replies carry other ids.
            if response.id.as_ref().and_then(Value::as_u64) != Some(id) {
                continue;
            }
            if let Some(err) = response.error {
                return Err(ProbeError::protocol(
                    &self.endpoint,
                    format!("{method}: {} (code {})", err.message, err.code),
                ));
            }
            return match response.result {
                Some(Value::Null) | None => Err(ProbeError::protocol(
                    &self.endpoint,
                    format!("{method}: empty result"),
                )),
                Some(result) => Ok(result),
            };
        }

        Err(ProbeError::connection(&self.endpoint, "connection closed"))
    }

    async fn close(&mut self) {
        if let Err(e) = self.socket.close(None).await {
            debug!(endpoint = %self.endpoint, error = %e, "websocket close failed");
        }
    }
}

/// Rustls connector trusting the webpki roots. Plain `ws://` URIs ignore it.
fn tls_connector(endpoint: &str) -> ProbeResult<Connector> {
    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let roots = rustls::RootCertStore {
        roots: webpki_roots::TLS_SERVER_ROOTS.to_vec(),
    };
    let config = rustls::ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .map_err(|e| ProbeError::connection(endpoint, format!("tls setup: {e}")))?
        .with_root_certificates(roots)
        .with_no_client_auth();
    Ok(Connector::Rustls(Arc::new(config)))
}

/// Parse a hex-encoded block number (`"0x1a2b"`).
pub fn parse_block_number(endpoint: &str, raw: &str) -> ProbeResult<u64> {
    let digits = raw
        .strip_prefix("0x")
        .ok_or_else(|| ProbeError::protocol(endpoint, format!("block number {raw:?} is not hex")))?;
    u64::from_str_radix(digits, 16)
        .map_err(|e| ProbeError::protocol(endpoint, format!("block number {raw:?}: {e}")))
}

/// Decode a SCALE-encoded `u64` millisecond moment.
pub fn decode_moment(endpoint: &str, raw: &str) -> ProbeResult<SystemTime> {
    let bytes = hex::decode(raw.trim_start_matches("0x"))
        .map_err(|e| ProbeError::protocol(endpoint, format!("timestamp {raw:?}: {e}")))?;
    let bytes: [u8; 8] = bytes.try_into().map_err(|b: Vec<u8>| {
        ProbeError::protocol(endpoint, format!("timestamp is {} bytes, want 8", b.len()))
    })?;
    Ok(UNIX_EPOCH + Duration::from_millis(u64::from_le_bytes(bytes)))
}
