use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{QueueLensError, Result};

/// One unit of work observed entering, and optionally leaving, a queue.
///
/// Constructed only through [`Event::new`] or by deserializing a [`RawEvent`],
/// so `dequeue_time >= enqueue_time` always holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawEvent")]
pub struct Event {
    id: i64,
    queue_name: String,
    event_type: String,
    enqueue_time: DateTime<Utc>,
    dequeue_time: Option<DateTime<Utc>>,
}

impl Event {
    /// Create a validated event.
    pub fn new(
        id: i64,
        queue_name: impl Into<String>,
        event_type: impl Into<String>,
        enqueue_time: DateTime<Utc>,
        dequeue_time: Option<DateTime<Utc>>,
    ) -> Result<Self> {
        if let Some(dequeued) = dequeue_time {
            if dequeued < enqueue_time {
                return Err(QueueLensError::Validation(format!(
                    "event {}: dequeue_time {} precedes enqueue_time {}",
                    id,
                    dequeued.to_rfc3339(),
                    enqueue_time.to_rfc3339()
                )));
            }
        }

        Ok(Self {
            id,
            queue_name: queue_name.into(),
            event_type: event_type.into(),
            enqueue_time,
            dequeue_time,
        })
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn queue_name(&self) -> &str {
        &self.queue_name
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn enqueue_time(&self) -> DateTime<Utc> {
        self.enqueue_time
    }

    pub fn dequeue_time(&self) -> Option<DateTime<Utc>> {
        self.dequeue_time
    }

    /// Still waiting, or never observed leaving.
    pub fn is_in_flight(&self) -> bool {
        self.dequeue_time.is_none()
    }

    /// Transit time for completed events.
    pub fn time_in_queue(&self) -> Option<Duration> {
        self.dequeue_time.map(|dequeued| dequeued - self.enqueue_time)
    }
}

/// Wire form of an event, with timestamps as strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawEvent {
    #[serde(alias = "replay_id")]
    pub id: i64,
    pub queue_name: String,
    pub event_type: String,
    pub enqueue_time: String,
    #[serde(default)]
    pub dequeue_time: Option<String>,
}

impl TryFrom<RawEvent> for Event {
    type Error = QueueLensError;

    fn try_from(raw: RawEvent) -> Result<Self> {
        let enqueue_time = parse_timestamp("enqueue_time", &raw.enqueue_time)?;

        // Older exports encode "not dequeued" as an empty string.
        let dequeue_time = match raw.dequeue_time.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(value) => Some(parse_timestamp("dequeue_time", value)?),
        };

        Event::new(
            raw.id,
            raw.queue_name,
            raw.event_type,
            enqueue_time,
            dequeue_time,
        )
    }
}

impl From<&Event> for RawEvent {
    fn from(event: &Event) -> Self {
        Self {
            id: event.id,
            queue_name: event.queue_name.clone(),
            event_type: event.event_type.clone(),
            enqueue_time: event.enqueue_time.to_rfc3339(),
            dequeue_time: event.dequeue_time.map(|t| t.to_rfc3339()),
        }
    }
}

/// Parse an RFC 3339 timestamp. Values without an offset are rejected rather
/// than guessed at.
pub fn parse_timestamp(field: &'static str, value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value.trim())
        .map(|t| t.with_timezone(&Utc))
        .map_err(|_| QueueLensError::InvalidTimestamp {
            field,
            value: value.to_string(),
        })
}

/// Per-queue totals for the queue selector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueueSummary {
    pub queue_name: String,
    pub event_count: usize,
    pub in_flight: usize,
}

/// Distinct queues in name order, with event counts.
pub fn queue_summaries(events: &[Event]) -> Vec<QueueSummary> {
    let mut by_queue: BTreeMap<&str, QueueSummary> = BTreeMap::new();

    for event in events {
        let summary = by_queue
            .entry(event.queue_name())
            .or_insert_with(|| QueueSummary {
                queue_name: event.queue_name().to_string(),
                event_count: 0,
                in_flight: 0,
            });
        summary.event_count += 1;
        if event.is_in_flight() {
            summary.in_flight += 1;
        }
    }

    by_queue.into_values().collect()
}

/// Events belonging to `queue`, in source order.
pub fn filter_by_queue(events: &[Event], queue: &str) -> Vec<Event> {
    events
        .iter()
        .filter(|e| e.queue_name() == queue)
        .cloned()
        .collect()
}
