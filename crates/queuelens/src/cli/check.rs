use anyhow::Result;
use clap::Parser;
use console::style;

use queuelens::logging;
use queuelens::queuelens_runtime::{Database, EventSource, PgEventSource};

use super::load_config;

/// Check that the event store is reachable and the table is readable.
#[derive(Parser)]
pub struct CheckCommand {
    /// Configuration file path.
    #[arg(short, long, default_value = "queuelens.toml")]
    pub config: String,
}

impl CheckCommand {
    pub async fn execute(self) -> Result<()> {
        let config = load_config(&self.config)?;
        logging::init(&config.observability.logging, false)?;

        let db = Database::from_config(&config.database)
            .await
            .map_err(|e| anyhow::anyhow!("{}", e))?;

        let outcome = async {
            db.health_check().await?;
            let source = PgEventSource::new(db.pool().clone(), db.config())?;
            source.fetch_events().await
        }
        .await;
        db.close().await;

        match outcome {
            Ok(events) => {
                println!(
                    "  {} {} reachable, {} events in {}",
                    style("ok").green().bold(),
                    style("database").bold(),
                    events.len(),
                    style(&config.database.table).cyan()
                );
                Ok(())
            }
            Err(e) => {
                println!("  {} {}", style("failed").red().bold(), e);
                anyhow::bail!("Event store check failed")
            }
        }
    }
}
