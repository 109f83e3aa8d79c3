use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;

use queuelens_core::{Event, QueueLensError, RawEvent, Result};

use super::EventSource;

/// Reads a JSON array of event records, as exported from the monitoring table.
pub struct FileEventSource {
    path: PathBuf,
}

impl FileEventSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn fetch(&self) -> Result<Vec<Event>> {
        let content = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            QueueLensError::DataSource(format!("Failed to read {}: {}", self.path.display(), e))
        })?;

        let raw: Vec<RawEvent> = serde_json::from_str(&content)?;
        let mut events = raw
            .into_iter()
            .map(Event::try_from)
            .collect::<Result<Vec<_>>>()?;

        // Match the database ordering so pages are stable across sources.
        events.sort_by_key(|e| (e.enqueue_time(), e.id()));

        tracing::debug!(
            path = %self.path.display(),
            events = events.len(),
            "Loaded events from file"
        );

        Ok(events)
    }
}

impl EventSource for FileEventSource {
    fn name(&self) -> &'static str {
        "file"
    }

    fn fetch_events(&self) -> Pin<Box<dyn Future<Output = Result<Vec<Event>>> + Send + '_>> {
        Box::pin(self.fetch())
    }
}
