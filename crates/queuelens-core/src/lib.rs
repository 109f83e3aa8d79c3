//! Queue event reporting core.
//!
//! Pure transforms over queue events: the gap-filled hourly series with its
//! window aggregates, and fixed-size paging with a bounded page index. Nothing
//! here performs I/O.

pub mod config;
pub mod error;
pub mod event;
pub mod pagination;
pub mod series;

pub use config::QueueLensConfig;
pub use error::{QueueLensError, Result};
pub use event::{filter_by_queue, queue_summaries, Event, QueueSummary, RawEvent};
pub use pagination::{
    next_page, page_index, page_view, paginate, previous_page, Page, PageMarker, PageView,
    Paginated,
};
pub use series::{
    average_events_per_hour, average_time_in_queue, build_hourly_series, chart_points,
    series_in_window, summarize_window, truncate_to_hour, ChartPoint, HourBucket, TimeWindow,
    WindowAnchor, WindowPreset, WindowSummary,
};
