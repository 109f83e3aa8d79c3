use serde::{Deserialize, Serialize};

use crate::error::{QueueLensError, Result};
use crate::series::WindowAnchor;

/// Table and chart configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardConfig {
    /// Rows per table page.
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// How long a fetched event snapshot is served before re-reading the store.
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_secs: u64,

    /// IANA timezone used for chart labels. Buckets themselves are always UTC.
    #[serde(default = "default_display_timezone")]
    pub display_timezone: String,

    /// What window presets are measured back from.
    #[serde(default)]
    pub window_anchor: WindowAnchor,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            cache_ttl_secs: default_cache_ttl(),
            display_timezone: default_display_timezone(),
            window_anchor: WindowAnchor::default(),
        }
    }
}

impl DashboardConfig {
    pub fn validate(&self) -> Result<()> {
        if self.page_size == 0 {
            return Err(QueueLensError::Config(
                "dashboard.page_size must be at least 1".to_string(),
            ));
        }
        self.display_timezone
            .parse::<chrono_tz::Tz>()
            .map_err(|_| {
                QueueLensError::Config(format!(
                    "Unknown display timezone '{}'",
                    self.display_timezone
                ))
            })?;
        Ok(())
    }
}

fn default_page_size() -> usize {
    10
}

fn default_cache_ttl() -> u64 {
    60
}

fn default_display_timezone() -> String {
    "UTC".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DashboardConfig::default();
        assert_eq!(config.page_size, 10);
        assert_eq!(config.cache_ttl_secs, 60);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_unknown_timezone() {
        let config = DashboardConfig {
            display_timezone: "Mars/Olympus_Mons".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
