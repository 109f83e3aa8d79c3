use std::borrow::Cow;

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use queuelens_core::event::parse_timestamp;
use queuelens_core::{
    build_hourly_series, chart_points, filter_by_queue, page_view, queue_summaries,
    series_in_window, summarize_window, ChartPoint, Event, HourBucket, QueueLensError, Result,
    TimeWindow, WindowAnchor, WindowPreset, WindowSummary,
};

use super::DashboardState;
use crate::cache::Snapshot;

/// Upper bound on rows per page a client may request.
const MAX_PAGE_SIZE: usize = 1000;

/// Query parameters for the event table.
#[derive(Debug, Default, Deserialize)]
pub struct EventsQuery {
    /// Page number (1-indexed).
    pub page: Option<usize>,
    /// Rows per page; defaults to the configured page size.
    pub page_size: Option<usize>,
    /// Restrict to one queue.
    pub queue: Option<String>,
}

/// Query parameters selecting a queue and a time window.
#[derive(Debug, Default, Deserialize)]
pub struct WindowQuery {
    pub queue: Option<String>,
    /// Preset: `all`, `1h` or `4h`.
    pub window: Option<String>,
    /// Explicit window start (RFC 3339). Takes precedence over `window`.
    pub start: Option<String>,
    /// Explicit window end (RFC 3339).
    pub end: Option<String>,
    /// `now` or `series_end`; defaults to the configured anchor.
    pub anchor: Option<String>,
    /// Display timezone for chart labels.
    pub tz: Option<String>,
}

impl WindowQuery {
    /// Resolve the requested window. `Ok(None)` means there is nothing to
    /// measure, which renders as "no data".
    fn resolve(
        &self,
        series: &[HourBucket],
        default_anchor: WindowAnchor,
        now: DateTime<Utc>,
    ) -> Result<Option<TimeWindow>> {
        match (self.start.as_deref(), self.end.as_deref()) {
            (Some(start), Some(end)) => {
                let start = parse_timestamp("start", start)?;
                let end = parse_timestamp("end", end)?;
                return TimeWindow::new(start, end).map(Some);
            }
            (None, None) => {}
            _ => {
                return Err(QueueLensError::Validation(
                    "start and end must be given together".to_string(),
                ))
            }
        }

        let preset = self
            .window
            .as_deref()
            .map(str::parse::<WindowPreset>)
            .transpose()?
            .unwrap_or_default();
        let anchor = self
            .anchor
            .as_deref()
            .map(str::parse::<WindowAnchor>)
            .transpose()?
            .unwrap_or(default_anchor);

        Ok(preset.resolve(series, anchor, now))
    }
}

/// API response wrapper.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

fn respond<T: Serialize>(data: T) -> Response {
    (StatusCode::OK, Json(ApiResponse::success(data))).into_response()
}

fn status_for(error: &QueueLensError) -> StatusCode {
    if error.is_validation() {
        StatusCode::BAD_REQUEST
    } else if error.is_upstream() {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

fn fail(error: QueueLensError) -> Response {
    let status = status_for(&error);
    if status.is_server_error() {
        tracing::error!(status = status.as_u16(), error = %error, "Dashboard request failed");
    } else {
        tracing::debug!(error = %error, "Rejected dashboard request");
    }
    (status, Json(ApiResponse::<()>::error(error.to_string()))).into_response()
}

fn reject(rejection: QueryRejection) -> Response {
    fail(QueueLensError::Validation(rejection.body_text()))
}

/// Window aggregates with the time the underlying events were fetched.
#[derive(Debug, Serialize)]
struct SummaryResponse {
    #[serde(flatten)]
    summary: WindowSummary,
    fetched_at: DateTime<Utc>,
}

/// Events and series for an optional queue filter.
struct Selection<'a> {
    events: Cow<'a, [Event]>,
    series: Cow<'a, [HourBucket]>,
}

fn select<'a>(snapshot: &'a Snapshot, queue: Option<&str>) -> Selection<'a> {
    match queue.filter(|q| !q.is_empty()) {
        Some(queue) => {
            let events = filter_by_queue(&snapshot.events, queue);
            let series = build_hourly_series(&events);
            Selection {
                events: Cow::Owned(events),
                series: Cow::Owned(series),
            }
        }
        None => Selection {
            events: Cow::Borrowed(snapshot.events.as_slice()),
            series: Cow::Borrowed(snapshot.series.as_slice()),
        },
    }
}

// ============================================================================
// Queues API
// ============================================================================

/// List the queues present in the store.
pub async fn list_queues(State(state): State<DashboardState>) -> Response {
    match state.cache.get().await {
        Ok(snapshot) => respond(queue_summaries(&snapshot.events)),
        Err(e) => fail(e),
    }
}

// ============================================================================
// Events API
// ============================================================================

/// One page of the event table with its page index.
pub async fn list_events(
    State(state): State<DashboardState>,
    query: std::result::Result<Query<EventsQuery>, QueryRejection>,
) -> Response {
    let Query(query) = match query {
        Ok(query) => query,
        Err(rejection) => return reject(rejection),
    };
    let snapshot = match state.cache.get().await {
        Ok(snapshot) => snapshot,
        Err(e) => return fail(e),
    };
    let selection = select(&snapshot, query.queue.as_deref());

    let page_size = query
        .page_size
        .unwrap_or(state.config.page_size)
        .min(MAX_PAGE_SIZE);

    match page_view(&selection.events, page_size, query.page.unwrap_or(1)) {
        Ok(view) => respond(view),
        Err(e) => fail(e),
    }
}

// ============================================================================
// Series API
// ============================================================================

/// Hourly buckets inside the requested window.
pub async fn get_series(
    State(state): State<DashboardState>,
    query: std::result::Result<Query<WindowQuery>, QueryRejection>,
) -> Response {
    let Query(query) = match query {
        Ok(query) => query,
        Err(rejection) => return reject(rejection),
    };
    let snapshot = match state.cache.get().await {
        Ok(snapshot) => snapshot,
        Err(e) => return fail(e),
    };
    let selection = select(&snapshot, query.queue.as_deref());

    match query.resolve(&selection.series, state.config.window_anchor, Utc::now()) {
        Ok(Some(window)) => respond(series_in_window(&selection.series, &window)),
        Ok(None) => respond(Vec::<HourBucket>::new()),
        Err(e) => fail(e),
    }
}

/// Windowed buckets labelled for the chart.
pub async fn get_chart(
    State(state): State<DashboardState>,
    query: std::result::Result<Query<WindowQuery>, QueryRejection>,
) -> Response {
    let Query(query) = match query {
        Ok(query) => query,
        Err(rejection) => return reject(rejection),
    };
    let tz = match query.tz.as_deref() {
        Some(name) => match name.parse::<Tz>() {
            Ok(tz) => tz,
            Err(_) => {
                return fail(QueueLensError::Validation(format!(
                    "unknown timezone '{}'",
                    name
                )))
            }
        },
        None => state.display_tz,
    };

    let snapshot = match state.cache.get().await {
        Ok(snapshot) => snapshot,
        Err(e) => return fail(e),
    };
    let selection = select(&snapshot, query.queue.as_deref());

    match query.resolve(&selection.series, state.config.window_anchor, Utc::now()) {
        Ok(Some(window)) => respond(chart_points(
            &series_in_window(&selection.series, &window),
            tz,
        )),
        Ok(None) => respond(Vec::<ChartPoint>::new()),
        Err(e) => fail(e),
    }
}

// ============================================================================
// Summary API
// ============================================================================

/// Average events per hour and average time in queue for the window.
pub async fn get_summary(
    State(state): State<DashboardState>,
    query: std::result::Result<Query<WindowQuery>, QueryRejection>,
) -> Response {
    let Query(query) = match query {
        Ok(query) => query,
        Err(rejection) => return reject(rejection),
    };
    let snapshot = match state.cache.get().await {
        Ok(snapshot) => snapshot,
        Err(e) => return fail(e),
    };
    let selection = select(&snapshot, query.queue.as_deref());

    match query.resolve(&selection.series, state.config.window_anchor, Utc::now()) {
        Ok(window) => respond(SummaryResponse {
            summary: summarize_window(&selection.events, &selection.series, window),
            fetched_at: snapshot.fetched_at,
        }),
        Err(e) => fail(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::Request;
    use chrono::TimeZone;
    use queuelens_core::config::DashboardConfig;
    use serde_json::Value;
    use tower::ServiceExt;

    use crate::cache::SnapshotCache;
    use crate::dashboard::create_api_router;
    use crate::source::{FileEventSource, MemoryEventSource};

    fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2021, 3, 4, h, m, s).unwrap()
    }

    fn event(id: i64, queue: &str, enqueue: DateTime<Utc>, dequeue: Option<DateTime<Utc>>) -> Event {
        Event::new(id, queue, "PE Name", enqueue, dequeue).unwrap()
    }

    fn state_with(source: Arc<MemoryEventSource>) -> DashboardState {
        let cache = Arc::new(SnapshotCache::new(source, Duration::from_secs(60)));
        DashboardState::new(cache, DashboardConfig::default()).unwrap()
    }

    async fn get(state: DashboardState, uri: &str) -> (StatusCode, Value) {
        let response = create_api_router(state)
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn test_api_response_success() {
        let response: ApiResponse<String> = ApiResponse::success("test".to_string());
        assert!(response.success);
        assert_eq!(response.data, Some("test".to_string()));
        assert!(response.error.is_none());
    }

    #[test]
    fn test_api_response_error() {
        let response: ApiResponse<String> = ApiResponse::error("failed");
        assert!(!response.success);
        assert!(response.data.is_none());
        assert_eq!(response.error, Some("failed".to_string()));
    }

    #[test]
    fn test_window_query_requires_both_bounds() {
        let query = WindowQuery {
            start: Some("2021-03-04T09:00:00Z".to_string()),
            ..Default::default()
        };
        let err = query.resolve(&[], WindowAnchor::Now, at(12, 0, 0)).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_window_query_explicit_bounds_win() {
        let query = WindowQuery {
            window: Some("1h".to_string()),
            start: Some("2021-03-04T09:00:00Z".to_string()),
            end: Some("2021-03-04T10:00:00+00:00".to_string()),
            ..Default::default()
        };
        let window = query
            .resolve(&[], WindowAnchor::Now, at(12, 0, 0))
            .unwrap()
            .unwrap();
        assert_eq!(window.start(), at(9, 0, 0));
        assert_eq!(window.end(), at(10, 0, 0));
    }

    #[tokio::test]
    async fn test_events_third_page() {
        let events = (0..25)
            .map(|i| event(i, "queue_1", at(9, 0, 0) + chrono::Duration::seconds(i), None))
            .collect();
        let state = state_with(Arc::new(MemoryEventSource::new(events)));

        let (status, body) = get(state, "/events?page=3").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["page_count"], 3);
        assert_eq!(body["data"]["items"].as_array().unwrap().len(), 5);
        assert_eq!(body["data"]["items"][0]["id"], 20);
        assert_eq!(body["data"]["previous"], 2);
        assert!(body["data"]["next"].is_null());
    }

    #[tokio::test]
    async fn test_events_zero_page_size_is_bad_request() {
        let state = state_with(Arc::new(MemoryEventSource::new(vec![event(
            1,
            "queue_1",
            at(9, 0, 0),
            None,
        )])));

        let (status, body) = get(state, "/events?page_size=0").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_series_is_gap_filled() {
        let state = state_with(Arc::new(MemoryEventSource::new(vec![
            event(1, "queue_1", at(9, 0, 0), None),
            event(2, "queue_1", at(9, 30, 0), None),
            event(3, "queue_1", at(11, 0, 0), None),
        ])));

        let (status, body) = get(state, "/series").await;
        assert_eq!(status, StatusCode::OK);
        let counts: Vec<u64> = body["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|b| b["event_count"].as_u64().unwrap())
            .collect();
        assert_eq!(counts, vec![2, 0, 1]);
    }

    #[tokio::test]
    async fn test_series_filtered_by_queue() {
        let state = state_with(Arc::new(MemoryEventSource::new(vec![
            event(1, "queue_1", at(9, 0, 0), None),
            event(2, "queue_2", at(10, 0, 0), None),
            event(3, "queue_1", at(12, 0, 0), None),
        ])));

        let (_, body) = get(state, "/series?queue=queue_2").await;
        let buckets = body["data"].as_array().unwrap();
        assert_eq!(buckets.len(), 1);
        assert_eq!(buckets[0]["event_count"], 1);
    }

    #[tokio::test]
    async fn test_series_rejects_bad_timestamp() {
        let state = state_with(Arc::new(MemoryEventSource::new(Vec::new())));
        let (status, body) =
            get(state, "/series?start=yesterday&end=2021-03-04T10:00:00Z").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("start"));
    }

    #[tokio::test]
    async fn test_summary_excludes_in_flight_events() {
        let state = state_with(Arc::new(MemoryEventSource::new(vec![
            event(1, "queue_1", at(9, 0, 0), Some(at(9, 0, 6))),
            event(2, "queue_1", at(9, 20, 0), None),
        ])));

        let (status, body) = get(state, "/summary?window=all").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["average_time_in_queue_ms"], 6000.0);
        assert_eq!(body["data"]["average_events_per_hour"], 2.0);
        assert_eq!(body["data"]["completed_events"], 1);
    }

    #[tokio::test]
    async fn test_summary_of_empty_store_is_no_data() {
        let state = state_with(Arc::new(MemoryEventSource::new(Vec::new())));

        let (status, body) = get(state, "/summary").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["data"]["average_events_per_hour"].is_null());
        assert!(body["data"]["average_time_in_queue_ms"].is_null());
    }

    #[tokio::test]
    async fn test_upstream_failure_is_service_unavailable() {
        let source = Arc::new(MemoryEventSource::new(Vec::new()));
        source.set_failure(Some("connection refused".to_string()));
        let state = state_with(source);

        for uri in ["/queues", "/events", "/series", "/series/chart", "/summary"] {
            let (status, body) = get(state.clone(), uri).await;
            assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE, "{}", uri);
            assert_eq!(body["success"], false);
        }
    }

    #[tokio::test]
    async fn test_chart_labels_in_requested_timezone() {
        let state = state_with(Arc::new(MemoryEventSource::new(vec![event(
            1,
            "queue_1",
            at(14, 5, 0),
            None,
        )])));

        let (_, body) = get(state.clone(), "/series/chart?tz=America/New_York").await;
        assert_eq!(body["data"][0]["label"], "03/04/21 9:00 AM");

        let (status, _) = get(state, "/series/chart?tz=Not/AZone").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_list_queues() {
        let state = state_with(Arc::new(MemoryEventSource::new(vec![
            event(1, "queue_2", at(9, 0, 0), None),
            event(2, "queue_1", at(9, 0, 0), Some(at(9, 0, 1))),
        ])));

        let (_, body) = get(state, "/queues").await;
        assert_eq!(body["data"][0]["queue_name"], "queue_1");
        assert_eq!(body["data"][1]["in_flight"], 1);
    }

    #[tokio::test]
    async fn test_malformed_stored_record_is_service_unavailable() {
        use std::io::Write;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"id":1,"queue_name":"queue_1","event_type":"PE Name","enqueue_time":"not a time"}}]"#
        )
        .unwrap();

        let cache = Arc::new(SnapshotCache::new(
            Arc::new(FileEventSource::new(file.path())),
            Duration::from_secs(60),
        ));
        let state = DashboardState::new(cache, DashboardConfig::default()).unwrap();

        let (status, body) = get(state, "/series").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["success"], false);
        assert!(body["error"].as_str().unwrap().contains("invalid record"));
    }

    #[tokio::test]
    async fn test_undecodable_query_uses_response_envelope() {
        let state = state_with(Arc::new(MemoryEventSource::new(Vec::new())));

        for uri in ["/events?page=-1", "/events?page_size=abc"] {
            let (status, body) = get(state.clone(), uri).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
            assert_eq!(body["success"], false);
            assert!(body["error"].is_string());
        }
    }

    #[tokio::test]
    async fn test_summary_reports_fetch_time() {
        let state = state_with(Arc::new(MemoryEventSource::new(vec![event(
            1,
            "queue_1",
            at(9, 0, 0),
            None,
        )])));

        let (status, body) = get(state, "/summary").await;
        assert_eq!(status, StatusCode::OK);
        let fetched_at = body["data"]["fetched_at"].as_str().unwrap();
        assert!(DateTime::parse_from_rfc3339(fetched_at).is_ok());
        assert_eq!(body["data"]["total_events"], 1);
    }
}
