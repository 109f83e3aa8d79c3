use std::future::Future;
use std::pin::Pin;
use std::time::Instant;

use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

use queuelens_core::config::DatabaseConfig;
use queuelens_core::{Event, QueueLensError, Result};

use super::EventSource;

/// Reads events from the monitoring table.
pub struct PgEventSource {
    pool: PgPool,
    query: String,
}

impl PgEventSource {
    /// Build a source over `config.table`. The table name is validated before it
    /// is spliced into the query.
    pub fn new(pool: PgPool, config: &DatabaseConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            pool,
            query: select_events_sql(&config.table),
        })
    }

    async fn fetch(&self) -> Result<Vec<Event>> {
        let started = Instant::now();

        let rows = sqlx::query(&self.query)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| QueueLensError::DataSource(format!("Failed to read events: {}", e)))?;

        let events = rows.iter().map(row_to_event).collect::<Result<Vec<_>>>()?;

        tracing::debug!(
            rows = events.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Fetched events from PostgreSQL"
        );

        Ok(events)
    }
}

impl EventSource for PgEventSource {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn fetch_events(&self) -> Pin<Box<dyn Future<Output = Result<Vec<Event>>> + Send + '_>> {
        Box::pin(self.fetch())
    }
}

fn select_events_sql(table: &str) -> String {
    format!(
        r#"
        SELECT
            replay_id::BIGINT AS replay_id,
            queue_name::TEXT AS queue_name,
            event_type::TEXT AS event_type,
            enqueue_time::TIMESTAMPTZ AS enqueue_time,
            dequeue_time::TIMESTAMPTZ AS dequeue_time
        FROM {}
        ORDER BY enqueue_time, replay_id
        "#,
        table
    )
}

fn row_to_event(row: &PgRow) -> Result<Event> {
    let enqueue_time: Option<DateTime<Utc>> = row.try_get("enqueue_time")?;
    let id: i64 = row.try_get("replay_id")?;

    // A NULL enqueue time is a broken record, not an event to drop.
    let enqueue_time = enqueue_time.ok_or_else(|| {
        QueueLensError::Validation(format!("event {}: enqueue_time is NULL", id))
    })?;

    Event::new(
        id,
        row.try_get::<String, _>("queue_name")?,
        row.try_get::<String, _>("event_type")?,
        enqueue_time,
        row.try_get("dequeue_time")?,
    )
}
