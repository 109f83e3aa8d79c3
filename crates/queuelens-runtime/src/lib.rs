pub mod cache;
pub mod dashboard;
pub mod db;
pub mod server;
pub mod source;

pub use cache::{Snapshot, SnapshotCache};
pub use dashboard::{create_api_router, ApiResponse, DashboardState};
pub use db::Database;
pub use server::DashboardServer;
pub use source::{EventSource, FileEventSource, MemoryEventSource, PgEventSource};
