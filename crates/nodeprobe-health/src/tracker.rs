//! Height progress tracking.
//!
//! Remembers, per endpoint and per series, the highest block height seen
//! and when it last strictly increased. Shared by every request of the
//! process and guarded by a mutex; nothing is persisted across restarts.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, SystemTime};

use tracing::debug;

use nodeprobe_core::{EndpointRef, ProbeError, ProbeResult};

/// Which height a mark follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Series {
    /// Latest (best) block.
    Best,
    /// Latest finalized block.
    Finalized,
}

/// Last observed progress for one endpoint and series.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeightMark {
    pub height: u64,
    /// When `height` was first observed.
    pub changed_at: SystemTime,
}

impl HeightMark {
    /// Time since the height last advanced. Clamped to zero when
    /// `changed_at` is ahead of `now` (clock skew).
    pub fn age(&self, now: SystemTime) -> Duration {
        now.duration_since(self.changed_at).unwrap_or(Duration::ZERO)
    }
}

/// Keyed store of [`HeightMark`]s.
#[derive(Debug, Default)]
pub struct HeightTracker {
    marks: Mutex<HashMap<(String, Series), HeightMark>>,
}

impl HeightTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `height` observed for `endpoint`, changed at `changed_at`.
    ///
    /// The first observation seeds the mark. Afterwards the mark moves only
    /// when `height` is strictly higher; equal or lower heights (stall,
    /// reorg) keep the previous change time.
    pub fn observe(
        &self,
        endpoint: &EndpointRef,
        series: Series,
        height: u64,
        changed_at: SystemTime,
    ) -> ProbeResult<HeightMark> {
        let mut marks = self
            .marks
            .lock()
            .map_err(|_| poisoned())?;

        let key = (endpoint.uri.clone(), series);
        let mark = marks
            .entry(key)
            .and_modify(|mark| {
                if height > mark.height {
                    debug!(
                        endpoint = %endpoint,
                        ?series,
                        from = mark.height,
                        to = height,
                        "height advanced"
                    );
                    *mark = HeightMark { height, changed_at };
                }
            })
            .or_insert_with(|| {
                debug!(endpoint = %endpoint, ?series, height, "height tracking seeded");
                HeightMark { height, changed_at }
            });

        Ok(*mark)
    }

    #[cfg(test)]
    fn get(&self, endpoint: &EndpointRef, series: Series) -> ProbeResult<Option<HeightMark>> {
        let marks = self.marks.lock().map_err(|_| poisoned())?;
        Ok(marks.get(&(endpoint.uri.clone(), series)).copied())
    }
}

fn poisoned() -> ProbeError {
    ProbeError::Internal("height tracker lock poisoned".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::UNIX_EPOCH;

    fn at(secs: u64) -> SystemTime {
        UNIX_EPOCH + Duration::from_secs(secs)
    }

    fn relay() -> EndpointRef {
        EndpointRef::websocket("ws://relay:9944").unwrap()
    }

    #[test]
    fn first_observation_seeds() {
        let tracker = HeightTracker::new();
        assert_eq!(tracker.get(&relay(), Series::Best).unwrap(), None);

        let mark = tracker.observe(&relay(), Series::Best, 10, at(100)).unwrap();
        assert_eq!(mark, HeightMark { height: 10, changed_at: at(100) });
        assert_eq!(mark.age(at(100)), Duration::ZERO);
    }

    #[test]
    fn advances_only_on_strictly_higher() {
        let tracker = HeightTracker::new();
        tracker.observe(&relay(), Series::Best, 10, at(100)).unwrap();

        // Same height: keep the original change time.
        let mark = tracker.observe(&relay(), Series::Best, 10, at(150)).unwrap();
        assert_eq!(mark.changed_at, at(100));
        assert_eq!(mark.age(at(150)), Duration::from_secs(50));

        // Lower height (reorg): still keep it.
        let mark = tracker.observe(&relay(), Series::Best, 9, at(160)).unwrap();
        assert_eq!(mark.height, 10);
        assert_eq!(mark.changed_at, at(100));

        let mark = tracker.observe(&relay(), Series::Best, 11, at(170)).unwrap();
        assert_eq!(mark, HeightMark { height: 11, changed_at: at(170) });
    }

    #[test]
    fn keys_are_per_endpoint_and_series() {
        let tracker = HeightTracker::new();
        let para = EndpointRef::websocket("ws://para:9944").unwrap();

        tracker.observe(&relay(), Series::Best, 10, at(100)).unwrap();
        tracker.observe(&relay(), Series::Finalized, 8, at(100)).unwrap();
        tracker.observe(&para, Series::Best, 500, at(120)).unwrap();

        let height = |ep: &EndpointRef, series| tracker.get(ep, series).unwrap().map(|m| m.height);
        assert_eq!(height(&relay(), Series::Best), Some(10));
        assert_eq!(height(&relay(), Series::Finalized), Some(8));
        assert_eq!(height(&para, Series::Best), Some(500));
        assert_eq!(height(&para, Series::Finalized), None);
    }

    #[test]
    fn age_clamps_clock_skew() {
        let mark = HeightMark { height: 1, changed_at: at(200) };
        assert_eq!(mark.age(at(100)), Duration::ZERO);
    }

    #[test]
    fn poisoned_lock_is_internal_fault() {
        let tracker = std::sync::Arc::new(HeightTracker::new());
        let poisoner = tracker.clone();
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.marks.lock().unwrap();
            panic!("poison the tracker");
        })
        .join();

        let err = tracker.observe(&relay(), Series::Best, 1, at(1)).unwrap_err();
        assert!(matches!(err, ProbeError::Internal(_)));
        let err = tracker.get(&relay(), Series::Best).unwrap_err();
        assert!(matches!(err, ProbeError::Internal(_)));
    }
}
