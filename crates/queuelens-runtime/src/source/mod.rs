//! Where events come from.
//!
//! Every source hands back the complete, validated event collection or fails
//! outright; the core is never given partial data.

mod file;
mod memory;
mod postgres;

pub use file::FileEventSource;
pub use memory::MemoryEventSource;
pub use postgres::PgEventSource;

use std::future::Future;
use std::pin::Pin;

use queuelens_core::{Event, Result};

/// A read-only provider of the full event collection.
pub trait EventSource: Send + Sync + 'static {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Fetch every event, ordered by enqueue time.
    fn fetch_events(&self) -> Pin<Box<dyn Future<Output = Result<Vec<Event>>> + Send + '_>>;
}
