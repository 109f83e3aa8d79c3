use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use queuelens_core::{build_hourly_series, Event, HourBucket, QueueLensError, Result};

use crate::source::EventSource;

/// One fetched event collection with its precomputed series.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub events: Arc<Vec<Event>>,
    pub series: Arc<Vec<HourBucket>>,
    pub fetched_at: DateTime<Utc>,
    loaded: Instant,
}

impl Snapshot {
    fn new(events: Vec<Event>) -> Self {
        let series = build_hourly_series(&events);
        Self {
            events: Arc::new(events),
            series: Arc::new(series),
            fetched_at: Utc::now(),
            loaded: Instant::now(),
        }
    }

    /// Time since the snapshot was fetched.
    pub fn age(&self) -> Duration {
        self.loaded.elapsed()
    }
}

/// Serves the last fetched snapshot until it is older than the TTL.
///
/// Refreshes hold the write lock, so concurrent requests for a stale snapshot
/// trigger a single fetch. A failed fetch is returned to the caller and the
/// stale snapshot is not served in its place. Records the source cannot turn
/// into valid events count as a source failure, not a bad request.
pub struct SnapshotCache {
    source: Arc<dyn EventSource>,
    ttl: Duration,
    current: RwLock<Option<Snapshot>>,
}

impl SnapshotCache {
    pub fn new(source: Arc<dyn EventSource>, ttl: Duration) -> Self {
        Self {
            source,
            ttl,
            current: RwLock::new(None),
        }
    }

    /// Get a fresh snapshot, fetching from the source if needed.
    pub async fn get(&self) -> Result<Snapshot> {
        {
            let current = self.current.read().await;
            if let Some(snapshot) = current.as_ref().filter(|s| s.age() < self.ttl) {
                return Ok(snapshot.clone());
            }
        }

        let mut current = self.current.write().await;
        // Another request may have refreshed while we waited for the lock.
        if let Some(snapshot) = current.as_ref().filter(|s| s.age() < self.ttl) {
            return Ok(snapshot.clone());
        }

        let started = Instant::now();
        let events = match self.source.fetch_events().await {
            Ok(events) => events,
            Err(e) => {
                let e = as_source_failure(e);
                tracing::warn!(source = self.source.name(), error = %e, "Event fetch failed");
                *current = None;
                return Err(e);
            }
        };

        let snapshot = Snapshot::new(events);
        tracing::info!(
            source = self.source.name(),
            events = snapshot.events.len(),
            buckets = snapshot.series.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Refreshed event snapshot"
        );

        *current = Some(snapshot.clone());
        Ok(snapshot)
    }

    /// Drop the cached snapshot so the next `get` refetches.
    pub async fn invalidate(&self) {
        *self.current.write().await = None;
    }
}

fn as_source_failure(error: QueueLensError) -> QueueLensError {
    if error.is_validation() || matches!(error, QueueLensError::Serialization(_)) {
        QueueLensError::DataSource(format!("event store returned invalid record: {}", error))
    } else {
        error
    }
}
