use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::error::{QueueLensError, Result};

/// Database configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Connection URL of the event store.
    pub url: String,

    /// Connection pool size.
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,

    /// Pool checkout timeout in seconds.
    #[serde(default = "default_pool_timeout")]
    pub pool_timeout_secs: u64,

    /// Statement timeout in seconds.
    #[serde(default = "default_statement_timeout")]
    pub statement_timeout_secs: u64,

    /// Table holding the event records, optionally schema-qualified.
    #[serde(default = "default_table")]
    pub table: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            pool_size: default_pool_size(),
            pool_timeout_secs: default_pool_timeout(),
            statement_timeout_secs: default_statement_timeout(),
            table: default_table(),
        }
    }
}

impl DatabaseConfig {
    /// The table name is spliced into SQL, so it must be a plain identifier.
    pub fn validate(&self) -> Result<()> {
        if !TABLE_IDENT.is_match(&self.table) {
            return Err(QueueLensError::Config(format!(
                "Invalid table name '{}': expected identifier or schema.identifier",
                self.table
            )));
        }
        if self.pool_size == 0 {
            return Err(QueueLensError::Config(
                "database.pool_size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

static TABLE_IDENT: Lazy<regex_lite::Regex> = Lazy::new(|| {
    regex_lite::Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)?$")
        .expect("table pattern is valid")
});

fn default_pool_size() -> u32 {
    5
}

fn default_pool_timeout() -> u64 {
    30
}

fn default_statement_timeout() -> u64 {
    30
}

fn default_table() -> String {
    "queue_monitoring".to_string()
}
