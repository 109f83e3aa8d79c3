use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::HourBucket;
use crate::error::{QueueLensError, Result};
use crate::event::Event;

/// Inclusive `[start, end]` time range used to scope aggregates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeWindow {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self> {
        if start > end {
            return Err(QueueLensError::Validation(format!(
                "window start {} is after end {}",
                start.to_rfc3339(),
                end.to_rfc3339()
            )));
        }
        Ok(Self { start, end })
    }

    /// Window spanning the whole series, including the tail of its last hour.
    pub fn covering(series: &[HourBucket]) -> Option<Self> {
        let first = series.first()?;
        let last = series.last()?;
        Some(Self {
            start: first.interval_start,
            end: last.last_instant(),
        })
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    pub fn contains(&self, t: DateTime<Utc>) -> bool {
        self.start <= t && t <= self.end
    }
}

/// The instant window presets count back from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowAnchor {
    /// Wall-clock time at request.
    #[default]
    Now,
    /// Start of the last bucket in the fetched series. Goes stale between refreshes.
    SeriesEnd,
}

impl FromStr for WindowAnchor {
    type Err = QueueLensError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "now" => Ok(Self::Now),
            "series_end" => Ok(Self::SeriesEnd),
            other => Err(QueueLensError::Validation(format!(
                "unknown window anchor '{}', expected 'now' or 'series_end'",
                other
            ))),
        }
    }
}

/// Named window selections offered by the dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowPreset {
    #[default]
    All,
    LastHour,
    LastFourHours,
}

impl FromStr for WindowPreset {
    type Err = QueueLensError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "all" => Ok(Self::All),
            "1h" | "last_hour" => Ok(Self::LastHour),
            "4h" | "last_4_hours" | "last_four_hours" => Ok(Self::LastFourHours),
            other => Err(QueueLensError::Validation(format!(
                "unknown window '{}', expected 'all', '1h' or '4h'",
                other
            ))),
        }
    }
}

impl WindowPreset {
    fn hours(self) -> Option<i64> {
        match self {
            Self::All => None,
            Self::LastHour => Some(1),
            Self::LastFourHours => Some(4),
        }
    }

    /// Resolve to a concrete window. `None` when there is nothing to anchor on:
    /// `All` or `SeriesEnd` over an empty series.
    pub fn resolve(
        self,
        series: &[HourBucket],
        anchor: WindowAnchor,
        now: DateTime<Utc>,
    ) -> Option<TimeWindow> {
        let Some(hours) = self.hours() else {
            return TimeWindow::covering(series);
        };

        let end = match anchor {
            WindowAnchor::Now => now,
            WindowAnchor::SeriesEnd => series.last()?.interval_start,
        };

        Some(TimeWindow {
            start: end - Duration::hours(hours),
            end,
        })
    }
}

/// Buckets whose `interval_start` falls inside the window.
pub fn series_in_window(series: &[HourBucket], window: &TimeWindow) -> Vec<HourBucket> {
    series
        .iter()
        .filter(|b| window.contains(b.interval_start))
        .copied()
        .collect()
}

/// Mean bucket count over the window. `None` when the window holds no buckets.
pub fn average_events_per_hour(series: &[HourBucket], window: &TimeWindow) -> Option<f64> {
    let (buckets, total) = series
        .iter()
        .filter(|b| window.contains(b.interval_start))
        .fold((0usize, 0usize), |(n, sum), b| (n + 1, sum + b.event_count));

    (buckets > 0).then(|| total as f64 / buckets as f64)
}

/// Mean transit time of completed events enqueued inside the window.
///
/// In-flight events count toward neither the total nor the divisor. `None` when
/// no completed event qualifies.
pub fn average_time_in_queue(events: &[Event], window: &TimeWindow) -> Option<Duration> {
    let (completed, total_micros) = events
        .iter()
        .filter(|e| window.contains(e.enqueue_time()))
        .filter_map(Event::time_in_queue)
        .fold((0u64, 0i128), |(n, sum), d| (n + 1, sum + micros(d)));

    if completed == 0 {
        return None;
    }

    let mean_micros = (total_micros as f64 / completed as f64).round() as i64;
    Some(Duration::microseconds(mean_micros))
}

fn micros(d: Duration) -> i128 {
    match d.num_microseconds() {
        Some(us) => i128::from(us),
        // Past the i64 microsecond range.
        None => i128::from(d.num_milliseconds()) * 1000,
    }
}

/// Aggregates shown beside the chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WindowSummary {
    pub window: Option<TimeWindow>,
    pub bucket_count: usize,
    /// Events enqueued inside the window.
    pub total_events: usize,
    /// Of those, events with a dequeue time.
    pub completed_events: usize,
    pub average_events_per_hour: Option<f64>,
    pub average_time_in_queue_ms: Option<f64>,
}

/// Compute every window aggregate in one go. A missing window yields a summary
/// with no data rather than zeros.
pub fn summarize_window(
    events: &[Event],
    series: &[HourBucket],
    window: Option<TimeWindow>,
) -> WindowSummary {
    let Some(window) = window else {
        return WindowSummary {
            window: None,
            bucket_count: 0,
            total_events: 0,
            completed_events: 0,
            average_events_per_hour: None,
            average_time_in_queue_ms: None,
        };
    };

    let in_window: Vec<&Event> = events
        .iter()
        .filter(|e| window.contains(e.enqueue_time()))
        .collect();

    WindowSummary {
        window: Some(window),
        bucket_count: series
            .iter()
            .filter(|b| window.contains(b.interval_start))
            .count(),
        total_events: in_window.len(),
        completed_events: in_window.iter().filter(|e| !e.is_in_flight()).count(),
        average_events_per_hour: average_events_per_hour(series, &window),
        average_time_in_queue_ms: average_time_in_queue(events, &window)
            .and_then(|d| d.num_microseconds())
            .map(|us| us as f64 / 1000.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::build_hourly_series;
    use chrono::TimeZone;

    fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2021, 3, 4, h, m, s).unwrap()
    }

    fn event(id: i64, enqueue: DateTime<Utc>, dequeue: Option<DateTime<Utc>>) -> Event {
        Event::new(id, "queue_1", "PE Name", enqueue, dequeue).unwrap()
    }

    #[test]
    fn test_window_rejects_inverted_range() {
        assert!(TimeWindow::new(at(10, 0, 0), at(9, 0, 0)).is_err());
        assert!(TimeWindow::new(at(9, 0, 0), at(9, 0, 0)).is_ok());
    }

    #[test]
    fn test_average_time_in_queue_ignores_in_flight() {
        let events = vec![
            event(1, at(9, 0, 0), Some(at(9, 0, 6))),
            event(2, at(9, 10, 0), None),
        ];
        let window = TimeWindow::new(at(9, 0, 0), at(9, 59, 59)).unwrap();

        assert_eq!(
            average_time_in_queue(&events, &window),
            Some(Duration::seconds(6))
        );
    }

    #[test]
    fn test_average_time_in_queue_keeps_sub_millisecond_transits() {
        let enqueue = at(9, 0, 0);
        let events = vec![
            event(1, enqueue, Some(enqueue + Duration::microseconds(400))),
            event(2, enqueue, Some(enqueue + Duration::microseconds(800))),
        ];
        let window = TimeWindow::new(at(9, 0, 0), at(9, 59, 59)).unwrap();

        assert_eq!(
            average_time_in_queue(&events, &window),
            Some(Duration::microseconds(600))
        );
    }

    #[test]
    fn test_average_time_in_queue_no_data() {
        let events = vec![event(1, at(9, 0, 0), None)];
        let window = TimeWindow::new(at(8, 0, 0), at(10, 0, 0)).unwrap();
        assert_eq!(average_time_in_queue(&events, &window), None);
        assert_eq!(average_time_in_queue(&[], &window), None);
    }

    #[test]
    fn test_average_time_in_queue_only_counts_window() {
        let events = vec![
            event(1, at(9, 0, 0), Some(at(9, 0, 2))),
            event(2, at(9, 30, 0), Some(at(9, 30, 4))),
            event(3, at(12, 0, 0), Some(at(12, 10, 0))),
        ];
        let window = TimeWindow::new(at(9, 0, 0), at(10, 0, 0)).unwrap();
        assert_eq!(
            average_time_in_queue(&events, &window),
            Some(Duration::seconds(3))
        );
    }

    #[test]
    fn test_average_events_per_hour_counts_zero_buckets() {
        let events = vec![
            event(1, at(9, 0, 0), None),
            event(2, at(9, 1, 0), None),
            event(3, at(11, 0, 0), None),
        ];
        let series = build_hourly_series(&events);
        let window = TimeWindow::covering(&series).unwrap();

        assert_eq!(average_events_per_hour(&series, &window), Some(1.0));
    }

    #[test]
    fn test_average_events_per_hour_empty_window() {
        let series = vec![HourBucket::new(at(9, 0, 0), 4)];
        let window = TimeWindow::new(at(12, 0, 0), at(13, 0, 0)).unwrap();
        assert_eq!(average_events_per_hour(&series, &window), None);
    }

    #[test]
    fn test_covering_window_includes_tail_of_last_hour() {
        let events = vec![
            event(1, at(9, 0, 0), None),
            event(2, at(11, 59, 59) + Duration::milliseconds(500), None),
        ];
        let series = build_hourly_series(&events);
        let window = TimeWindow::covering(&series).unwrap();
        assert!(events.iter().all(|e| window.contains(e.enqueue_time())));
    }

    #[test]
    fn test_preset_anchored_on_series_end() {
        let series: Vec<HourBucket> = (0..6)
            .map(|h| HourBucket::new(at(8 + h, 0, 0), h as usize))
            .collect();

        let window = WindowPreset::LastHour
            .resolve(&series, WindowAnchor::SeriesEnd, at(23, 0, 0))
            .unwrap();
        assert_eq!(window.start(), at(12, 0, 0));
        assert_eq!(window.end(), at(13, 0, 0));
        assert_eq!(series_in_window(&series, &window).len(), 2);

        let window = WindowPreset::LastFourHours
            .resolve(&series, WindowAnchor::SeriesEnd, at(23, 0, 0))
            .unwrap();
        assert_eq!(series_in_window(&series, &window).len(), 5);
    }

    #[test]
    fn test_preset_anchored_on_now() {
        let series = vec![HourBucket::new(at(8, 0, 0), 3)];
        let now = at(20, 30, 0);

        let window = WindowPreset::LastHour
            .resolve(&series, WindowAnchor::Now, now)
            .unwrap();
        assert_eq!(window.start(), at(19, 30, 0));
        assert_eq!(window.end(), now);
        assert_eq!(average_events_per_hour(&series, &window), None);
    }

    #[test]
    fn test_preset_over_empty_series() {
        assert!(WindowPreset::All
            .resolve(&[], WindowAnchor::Now, at(9, 0, 0))
            .is_none());
        assert!(WindowPreset::LastHour
            .resolve(&[], WindowAnchor::SeriesEnd, at(9, 0, 0))
            .is_none());
        assert!(WindowPreset::LastHour
            .resolve(&[], WindowAnchor::Now, at(9, 0, 0))
            .is_some());
    }

    #[test]
    fn test_parse_presets() {
        assert_eq!("1h".parse::<WindowPreset>().unwrap(), WindowPreset::LastHour);
        assert_eq!(
            "last_four_hours".parse::<WindowPreset>().unwrap(),
            WindowPreset::LastFourHours
        );
        assert!("1d".parse::<WindowPreset>().is_err());
        assert_eq!(
            "series_end".parse::<WindowAnchor>().unwrap(),
            WindowAnchor::SeriesEnd
        );
    }

    #[test]
    fn test_summarize_window() {
        let events = vec![
            event(1, at(9, 0, 0), Some(at(9, 0, 6))),
            event(2, at(9, 10, 0), None),
            event(3, at(11, 0, 0), Some(at(11, 0, 2))),
        ];
        let series = build_hourly_series(&events);
        let window = TimeWindow::covering(&series);

        let summary = summarize_window(&events, &series, window);
        assert_eq!(summary.bucket_count, 3);
        assert_eq!(summary.total_events, 3);
        assert_eq!(summary.completed_events, 2);
        assert_eq!(summary.average_events_per_hour, Some(1.0));
        assert_eq!(summary.average_time_in_queue_ms, Some(4000.0));
    }

    #[test]
    fn test_summarize_without_window_is_no_data() {
        let summary = summarize_window(&[], &[], None);
        assert_eq!(summary.average_events_per_hour, None);
        assert_eq!(summary.average_time_in_queue_ms, None);
        let json = serde_json::to_value(&summary).unwrap();
        assert!(json["average_events_per_hour"].is_null());
    }
}
