use anyhow::Result;
use clap::Parser;
use console::style;
use tracing::info;

use queuelens::{logging, QueueLens};

use super::load_config;

/// Serve the dashboard API.
#[derive(Parser)]
pub struct RunCommand {
    /// Configuration file path.
    #[arg(short, long, default_value = "queuelens.toml")]
    pub config: String,

    /// Port to listen on (overrides config).
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Host to bind to (overrides config).
    #[arg(long)]
    pub host: Option<String>,

    /// Verbose logging and a zero cache TTL.
    #[arg(long)]
    pub dev: bool,
}

impl RunCommand {
    /// Execute the run command.
    pub async fn execute(self) -> Result<()> {
        let mut config = load_config(&self.config)?;
        logging::init(&config.observability.logging, self.dev)?;

        info!("Loaded configuration from {}", self.config);

        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(host) = self.host.clone() {
            config.server.host = host;
        }
        if self.dev {
            config.dashboard.cache_ttl_secs = 0;
        }

        println!();
        println!("  {}", banner(&config.project.name));
        println!();
        println!(
            "  Listening on {}",
            style(format!("http://{}:{}", config.server.host, config.server.port)).cyan()
        );
        println!(
            "  Reading events from {}",
            style(&config.database.table).cyan()
        );
        if self.dev {
            println!("  {}", style("Development mode enabled").yellow());
        }
        println!();

        let app = QueueLens::builder()
            .config(config)
            .build()
            .map_err(|e| anyhow::anyhow!("{}", e))?;

        app.run().await.map_err(|e| anyhow::anyhow!("{}", e))?;

        println!("\n  {}", style("Stopped.").dim());

        Ok(())
    }
}

fn banner(project: &str) -> String {
    format!(
        "{} {} v{}",
        style(project).bold().cyan(),
        style("queuelens").dim(),
        env!("CARGO_PKG_VERSION")
    )
}
