//! Scripted endpoint client for strategy tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;

use nodeprobe_client::EndpointClient;
use nodeprobe_core::{EndpointRef, HealthReading, ProbeError, ProbeResult};

/// Replays queued results per endpoint. The last queued result repeats.
#[derive(Default)]
pub struct ScriptedClient {
    scripts: Mutex<HashMap<String, VecDeque<ProbeResult<HealthReading>>>>,
    delays: HashMap<String, Duration>,
    calls: Mutex<HashMap<String, usize>>,
}

impl ScriptedClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn then(mut self, endpoint: &EndpointRef, result: ProbeResult<HealthReading>) -> Self {
        self.scripts
            .get_mut()
            .unwrap()
            .entry(endpoint.uri.clone())
            .or_default()
            .push_back(result);
        self
    }

    pub fn delay(mut self, endpoint: &EndpointRef, delay: Duration) -> Self {
        self.delays.insert(endpoint.uri.clone(), delay);
        self
    }

    pub fn calls(&self, endpoint: &EndpointRef) -> usize {
        self.calls
            .lock()
            .unwrap()
            .get(&endpoint.uri)
            .copied()
            .unwrap_or(0)
    }
}

#[async_trait]
impl EndpointClient for ScriptedClient {
    async fn read(&self, endpoint: &EndpointRef) -> ProbeResult<HealthReading> {
        *self
            .calls
            .lock()
            .unwrap()
            .entry(endpoint.uri.clone())
            .or_default() += 1;

        if let Some(delay) = self.delays.get(&endpoint.uri) {
            tokio::time::sleep(*delay).await;
        }

        let mut scripts = self.scripts.lock().unwrap();
        let Some(queue) = scripts.get_mut(&endpoint.uri) else {
            return Err(ProbeError::connection(&endpoint.uri, "unscripted endpoint"));
        };
        if queue.len() > 1 {
            queue.pop_front().unwrap()
        } else {
            queue
                .front()
                .cloned()
                .unwrap_or_else(|| Err(ProbeError::connection(&endpoint.uri, "script exhausted")))
        }
    }
}

pub fn at(secs: u64) -> SystemTime {
    UNIX_EPOCH + Duration::from_secs(secs)
}

/// A healthy-looking reading taken at t=1000s.
pub fn reading(endpoint: &EndpointRef) -> HealthReading {
    let mut reading = HealthReading::new(endpoint.clone(), at(1000));
    reading.latest_block_height = Some(100);
    reading.finalized_block_height = Some(98);
    reading.is_syncing = Some(false);
    reading.peers = Some(8);
    reading.should_have_peers = Some(true);
    reading
}
