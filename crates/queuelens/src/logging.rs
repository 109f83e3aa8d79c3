use anyhow::Result;
use tracing_subscriber::EnvFilter;

use queuelens_core::config::LoggingConfig;

/// Install the global subscriber. `RUST_LOG` wins over the configured level;
/// `dev` raises the configured level to `debug`.
pub fn init(config: &LoggingConfig, dev: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(config, dev)));

    let result = if config.json_format {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .try_init()
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .try_init()
    };

    result.map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))
}

fn default_directive(config: &LoggingConfig, dev: bool) -> String {
    if dev {
        "debug".to_string()
    } else {
        config.level.clone()
    }
}
