mod api;

pub use api::{ApiResponse, EventsQuery, WindowQuery};

use std::sync::Arc;

use axum::{routing::get, Router};
use chrono_tz::Tz;

use queuelens_core::config::DashboardConfig;
use queuelens_core::{QueueLensError, Result};

use crate::cache::SnapshotCache;

/// Dashboard state shared across handlers.
#[derive(Clone)]
pub struct DashboardState {
    pub cache: Arc<SnapshotCache>,
    pub config: DashboardConfig,
    pub display_tz: Tz,
}

impl DashboardState {
    pub fn new(cache: Arc<SnapshotCache>, config: DashboardConfig) -> Result<Self> {
        let display_tz = config.display_timezone.parse::<Tz>().map_err(|_| {
            QueueLensError::Config(format!(
                "Unknown display timezone '{}'",
                config.display_timezone
            ))
        })?;

        Ok(Self {
            cache,
            config,
            display_tz,
        })
    }
}

/// Create the JSON API router.
pub fn create_api_router(state: DashboardState) -> Router {
    Router::new()
        .route("/queues", get(api::list_queues))
        .route("/events", get(api::list_events))
        .route("/series", get(api::get_series))
        .route("/series/chart", get(api::get_chart))
        .route("/summary", get(api::get_summary))
        .with_state(state)
}
