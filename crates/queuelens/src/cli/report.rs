use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use clap::Parser;
use console::style;

use queuelens::logging;
use queuelens::queuelens_core::config::{DashboardConfig, LoggingConfig};
use queuelens::queuelens_core::{
    build_hourly_series, chart_points, filter_by_queue, page_view, series_in_window,
    summarize_window, Event, PageMarker, WindowAnchor, WindowPreset, WindowSummary,
};
use queuelens::queuelens_runtime::{Database, EventSource, FileEventSource, PgEventSource};

use super::load_config;

/// Print the hourly series, window summary and one table page.
#[derive(Parser)]
pub struct ReportCommand {
    /// Configuration file path. Optional when `--file` is given.
    #[arg(short, long, default_value = "queuelens.toml")]
    pub config: String,

    /// Read events from a JSON export instead of the database.
    #[arg(short, long)]
    pub file: Option<PathBuf>,

    /// Only report on this queue.
    #[arg(short, long)]
    pub queue: Option<String>,

    /// Window preset: all, 1h or 4h.
    #[arg(short, long, default_value = "all")]
    pub window: String,

    /// Instant presets count back from: now or series_end (overrides config).
    #[arg(long)]
    pub anchor: Option<String>,

    /// Table page to print, starting at 1.
    #[arg(long, default_value_t = 1)]
    pub page: usize,

    /// Rows per page (overrides config).
    #[arg(long)]
    pub page_size: Option<usize>,

    /// Timezone for hour labels (overrides config).
    #[arg(long)]
    pub tz: Option<String>,

    /// Print the report as JSON.
    #[arg(long)]
    pub json: bool,
}

impl ReportCommand {
    pub async fn execute(self) -> Result<()> {
        let config_exists = std::path::Path::new(&self.config).exists();

        let (source, db, dashboard, logging_config) = match &self.file {
            Some(path) => {
                let (dashboard, logging_config) = if config_exists {
                    let config = load_config(&self.config)?;
                    (config.dashboard, config.observability.logging)
                } else {
                    (DashboardConfig::default(), LoggingConfig::default())
                };
                let source: Arc<dyn EventSource> = Arc::new(FileEventSource::new(path));
                (source, None, dashboard, logging_config)
            }
            None => {
                let config = load_config(&self.config)?;
                let db = Database::from_config(&config.database)
                    .await
                    .map_err(|e| anyhow::anyhow!("{}", e))?;
                let source: Arc<dyn EventSource> = Arc::new(
                    PgEventSource::new(db.pool().clone(), db.config())
                        .map_err(|e| anyhow::anyhow!("{}", e))?,
                );
                (
                    source,
                    Some(db),
                    config.dashboard,
                    config.observability.logging,
                )
            }
        };

        logging::init(&logging_config, false)?;

        let fetched = source.fetch_events().await;
        if let Some(db) = db {
            db.close().await;
        }
        let events = fetched.map_err(|e| anyhow::anyhow!("{}", e))?;

        self.print(events, &dashboard)
    }

    fn print(&self, events: Vec<Event>, dashboard: &DashboardConfig) -> Result<()> {
        let events = match &self.queue {
            Some(queue) => filter_by_queue(&events, queue),
            None => events,
        };

        let preset: WindowPreset = self.window.parse().map_err(|e| anyhow::anyhow!("{}", e))?;
        let anchor = match &self.anchor {
            Some(anchor) => anchor
                .parse::<WindowAnchor>()
                .map_err(|e| anyhow::anyhow!("{}", e))?,
            None => dashboard.window_anchor,
        };
        let tz_name = self.tz.as_deref().unwrap_or(&dashboard.display_timezone);
        let tz: Tz = tz_name
            .parse()
            .map_err(|_| anyhow::anyhow!("Unknown timezone '{}'", tz_name))?;
        let page_size = self.page_size.unwrap_or(dashboard.page_size);

        let series = build_hourly_series(&events);
        let window = preset.resolve(&series, anchor, Utc::now());
        let windowed = match &window {
            Some(window) => series_in_window(&series, window),
            None => Vec::new(),
        };
        let points = chart_points(&windowed, tz);
        let summary = summarize_window(&events, &series, window);
        let view =
            page_view(&events, page_size, self.page).map_err(|e| anyhow::anyhow!("{}", e))?;

        if self.json {
            let report = serde_json::json!({
                "series": points,
                "summary": summary,
                "page": view,
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
            return Ok(());
        }

        println!();
        println!("  {}", style("Events per hour").bold());
        if points.is_empty() {
            println!("  {}", style("no data").dim());
        }
        for point in &points {
            println!("  {:<22} {:>6}", point.label, point.event_count);
        }

        println!();
        println!("  {}", style("Summary").bold());
        for line in summary_lines(&summary) {
            println!("  {}", line);
        }

        println!();
        println!(
            "  {} (page {} of {}, {} events)",
            style("Events").bold(),
            view.current_page,
            view.page_count,
            view.total_items
        );
        println!(
            "  {:>8}  {:<16} {:<16} {:<20} {:<20} {:>10}",
            "ID", "Queue", "Type", "Enqueued", "Dequeued", "In queue"
        );
        for event in view.items {
            println!("  {}", table_row(event, tz));
        }
        if !view.index.is_empty() {
            println!();
            println!("  {}", render_index(&view.index));
        }
        println!();

        Ok(())
    }
}

fn summary_lines(summary: &WindowSummary) -> Vec<String> {
    let window = match &summary.window {
        Some(window) => format!(
            "{} .. {}",
            window.start().format("%Y-%m-%d %H:%M"),
            window.end().format("%Y-%m-%d %H:%M")
        ),
        None => "no data".to_string(),
    };

    vec![
        format!("Window                  {}", window),
        format!("Events in window        {}", summary.total_events),
        format!("Completed               {}", summary.completed_events),
        format!(
            "Avg events per hour     {}",
            format_average(summary.average_events_per_hour, "")
        ),
        format!(
            "Avg time in queue       {}",
            format_average(summary.average_time_in_queue_ms, " ms")
        ),
    ]
}

fn format_average(value: Option<f64>, unit: &str) -> String {
    match value {
        Some(v) => format!("{:.2}{}", v, unit),
        None => "no data".to_string(),
    }
}

fn table_row(event: &Event, tz: Tz) -> String {
    let stamp = |t: DateTime<Utc>| {
        t.with_timezone(&tz)
            .format("%m/%d/%y %H:%M:%S")
            .to_string()
    };

    let dequeued = event
        .dequeue_time()
        .map(stamp)
        .unwrap_or_else(|| "in flight".to_string());
    let in_queue = event
        .time_in_queue()
        .map(|d| format!("{:.1}s", d.num_milliseconds() as f64 / 1000.0))
        .unwrap_or_else(|| "-".to_string());

    format!(
        "{:>8}  {:<16} {:<16} {:<20} {:<20} {:>10}",
        event.id(),
        event.queue_name(),
        event.event_type(),
        stamp(event.enqueue_time()),
        dequeued,
        in_queue
    )
}

/// `1 2 [3] 4 … 10`
fn render_index(index: &[PageMarker]) -> String {
    index
        .iter()
        .map(|marker| match marker {
            PageMarker::Page {
                number,
                current: true,
            } => format!("[{}]", number),
            PageMarker::Page { number, .. } => number.to_string(),
            PageMarker::Ellipsis => "…".to_string(),
        })
        .collect::<Vec<_>>()
        .join(" ")
}
