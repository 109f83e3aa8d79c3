use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;

use queuelens_core::config::QueueLensConfig;
use queuelens_core::{QueueLensError, Result};
use queuelens_runtime::{
    DashboardServer, DashboardState, Database, EventSource, PgEventSource, SnapshotCache,
};

/// The queuelens service: event source, snapshot cache and dashboard API.
pub struct QueueLens {
    config: QueueLensConfig,
    source: Option<Arc<dyn EventSource>>,
    shutdown_tx: broadcast::Sender<()>,
}

impl QueueLens {
    /// Create a new builder.
    pub fn builder() -> QueueLensBuilder {
        QueueLensBuilder::new()
    }

    pub fn config(&self) -> &QueueLensConfig {
        &self.config
    }

    /// Run until Ctrl-C or a send on [`QueueLens::shutdown_handle`].
    ///
    /// Without an explicit source, events are read from the configured
    /// Postgres table.
    pub async fn run(self) -> Result<()> {
        tracing::info!(project = %self.config.project.name, "queuelens starting");
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        let (source, db) = match self.source.clone() {
            Some(source) => (source, None),
            None => {
                let db = Database::from_config(&self.config.database).await?;
                tracing::info!(table = %self.config.database.table, "Connected to database");
                let source: Arc<dyn EventSource> =
                    Arc::new(PgEventSource::new(db.pool().clone(), db.config())?);
                (source, Some(db))
            }
        };

        let ttl = Duration::from_secs(self.config.dashboard.cache_ttl_secs);
        let cache = Arc::new(SnapshotCache::new(source.clone(), ttl));
        let state = DashboardState::new(cache, self.config.dashboard.clone())?;
        let server = DashboardServer::new(self.config.server.clone(), state);

        tracing::info!(
            source = source.name(),
            cache_ttl_secs = ttl.as_secs(),
            "Serving dashboard API"
        );

        let shutdown = async move {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Received shutdown signal");
                }
                _ = shutdown_rx.recv() => {
                    tracing::info!("Received shutdown notification");
                }
            }
        };

        let result = server.run(shutdown).await;

        if let Some(db) = db {
            db.close().await;
        }

        tracing::info!("queuelens stopped");
        result
    }

    /// Handle for requesting shutdown from another task.
    pub fn shutdown_handle(&self) -> broadcast::Sender<()> {
        self.shutdown_tx.clone()
    }
}

/// Builder for the queuelens service.
pub struct QueueLensBuilder {
    config: Option<QueueLensConfig>,
    source: Option<Arc<dyn EventSource>>,
}

impl QueueLensBuilder {
    pub fn new() -> Self {
        Self {
            config: None,
            source: None,
        }
    }

    /// Set the configuration.
    pub fn config(mut self, config: QueueLensConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Read events from `source` instead of the configured database.
    pub fn source(mut self, source: Arc<dyn EventSource>) -> Self {
        self.source = Some(source);
        self
    }

    /// Build the service.
    pub fn build(self) -> Result<QueueLens> {
        let config = self
            .config
            .ok_or_else(|| QueueLensError::Config("Configuration is required".to_string()))?;
        config.validate()?;

        let (shutdown_tx, _) = broadcast::channel(1);

        Ok(QueueLens {
            config,
            source: self.source,
            shutdown_tx,
        })
    }
}

impl Default for QueueLensBuilder {
    fn default() -> Self {
        Self::new()
    }
}
