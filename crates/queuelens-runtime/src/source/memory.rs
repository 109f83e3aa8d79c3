use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;

use queuelens_core::{Event, QueueLensError, Result};

use super::EventSource;

/// In-process source for tests and embedding.
pub struct MemoryEventSource {
    events: RwLock<Vec<Event>>,
    failure: RwLock<Option<String>>,
    fetches: AtomicUsize,
}

impl MemoryEventSource {
    pub fn new(events: Vec<Event>) -> Self {
        Self {
            events: RwLock::new(events),
            failure: RwLock::new(None),
            fetches: AtomicUsize::new(0),
        }
    }

    /// Replace the stored events.
    pub fn set_events(&self, events: Vec<Event>) {
        if let Ok(mut guard) = self.events.write() {
            *guard = events;
        }
    }

    /// Make every subsequent fetch fail with `message`, or succeed again with `None`.
    pub fn set_failure(&self, message: Option<String>) {
        if let Ok(mut guard) = self.failure.write() {
            *guard = message;
        }
    }

    /// Number of fetches served so far.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::Relaxed)
    }

    fn snapshot(&self) -> Result<Vec<Event>> {
        self.fetches.fetch_add(1, Ordering::Relaxed);

        let failure = self
            .failure
            .read()
            .map_err(|_| QueueLensError::Internal("failure lock poisoned".to_string()))?;
        if let Some(message) = failure.as_ref() {
            return Err(QueueLensError::DataSource(message.clone()));
        }

        self.events
            .read()
            .map(|events| events.clone())
            .map_err(|_| QueueLensError::Internal("event lock poisoned".to_string()))
    }
}

impl EventSource for MemoryEventSource {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn fetch_events(&self) -> Pin<Box<dyn Future<Output = Result<Vec<Event>>> + Send + '_>> {
        let result = self.snapshot();
        Box::pin(async move { result })
    }
}
