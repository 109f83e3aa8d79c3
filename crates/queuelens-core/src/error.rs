use thiserror::Error;

/// Core error type for queuelens operations.
#[derive(Error, Debug)]
pub enum QueueLensError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQL error: {0}")]
    Sql(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid timestamp in {field}: {value:?}")]
    InvalidTimestamp { field: &'static str, value: String },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Data source unavailable: {0}")]
    DataSource(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl QueueLensError {
    /// Whether this error was caused by bad caller input rather than a failure downstream.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            QueueLensError::Validation(_) | QueueLensError::InvalidTimestamp { .. }
        )
    }

    /// Whether this error means the event store could not be reached or read.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            QueueLensError::DataSource(_) | QueueLensError::Database(_) | QueueLensError::Sql(_)
        )
    }
}

impl From<serde_json::Error> for QueueLensError {
    fn from(e: serde_json::Error) -> Self {
        QueueLensError::Serialization(e.to_string())
    }
}

/// Result type alias using QueueLensError.
pub type Result<T> = std::result::Result<T, QueueLensError>;
