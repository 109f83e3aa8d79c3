//! Hourly event series.
//!
//! Events are bucketed by the UTC hour of their `enqueue_time`, and the result is
//! right-joined against a generated grid of every hour between the first and last
//! bucket, so hours without events appear with a count of zero instead of being
//! dropped.

mod window;

pub use window::{
    average_events_per_hour, average_time_in_queue, series_in_window, summarize_window,
    TimeWindow, WindowAnchor, WindowPreset, WindowSummary,
};

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::event::Event;

/// Chart label format, e.g. `03/04/21 9:00 AM`.
const CHART_LABEL_FORMAT: &str = "%m/%d/%y %-I:%M %p";

/// One-hour time slot with the number of events enqueued in it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HourBucket {
    /// Top of the hour.
    pub interval_start: DateTime<Utc>,
    /// `interval_start + 59:59`, inclusive.
    pub interval_end: DateTime<Utc>,
    pub event_count: usize,
}

impl HourBucket {
    pub fn new(interval_start: DateTime<Utc>, event_count: usize) -> Self {
        Self {
            interval_start,
            interval_end: interval_start + Duration::minutes(59) + Duration::seconds(59),
            event_count,
        }
    }

    /// Last representable instant of the hour, including sub-second precision.
    pub fn last_instant(&self) -> DateTime<Utc> {
        self.interval_start + Duration::hours(1) - Duration::nanoseconds(1)
    }
}

/// Truncate a timestamp to the top of its UTC hour.
pub fn truncate_to_hour(t: DateTime<Utc>) -> DateTime<Utc> {
    let into_hour = Duration::seconds(t.timestamp().rem_euclid(3600))
        + Duration::nanoseconds(i64::from(t.timestamp_subsec_nanos()));
    t - into_hour
}

/// Build the gap-free hourly series covering every hour from the earliest to the
/// latest `enqueue_time`, inclusive. Empty input yields an empty series.
pub fn build_hourly_series(events: &[Event]) -> Vec<HourBucket> {
    let mut counts: BTreeMap<DateTime<Utc>, usize> = BTreeMap::new();
    for event in events {
        *counts
            .entry(truncate_to_hour(event.enqueue_time()))
            .or_default() += 1;
    }

    let (Some((&first, _)), Some((&last, _))) = (counts.first_key_value(), counts.last_key_value())
    else {
        return Vec::new();
    };

    let hours = (last - first).num_hours();
    let series: Vec<HourBucket> = (0..=hours)
        .map(|offset| {
            let start = first + Duration::hours(offset);
            HourBucket::new(start, counts.get(&start).copied().unwrap_or(0))
        })
        .collect();

    tracing::trace!(
        events = events.len(),
        buckets = series.len(),
        occupied = counts.len(),
        "Built hourly series"
    );

    series
}

/// Chart-ready point: a bucket labelled in the display timezone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChartPoint {
    pub label: String,
    pub interval_start: DateTime<Utc>,
    pub event_count: usize,
}

/// Label each bucket for display in `tz`.
pub fn chart_points(series: &[HourBucket], tz: Tz) -> Vec<ChartPoint> {
    series
        .iter()
        .map(|bucket| ChartPoint {
            label: bucket
                .interval_start
                .with_timezone(&tz)
                .format(CHART_LABEL_FORMAT)
                .to_string(),
            interval_start: bucket.interval_start,
            event_count: bucket.event_count,
        })
        .collect()
}
