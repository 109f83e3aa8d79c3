mod check;
mod report;
mod run;

pub use check::CheckCommand;
pub use report::ReportCommand;
pub use run::RunCommand;

use anyhow::Result;
use clap::{Parser, Subcommand};

use queuelens::queuelens_core::QueueLensConfig;

/// queuelens - hourly throughput and latency for queue monitoring events
#[derive(Parser)]
#[command(name = "queuelens")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// CLI commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Serve the dashboard API.
    Run(RunCommand),

    /// Print the hourly series, window summary and one table page.
    Report(ReportCommand),

    /// Check that the event store is reachable.
    Check(CheckCommand),
}

impl Cli {
    /// Execute the CLI command.
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::Run(cmd) => cmd.execute().await,
            Commands::Report(cmd) => cmd.execute().await,
            Commands::Check(cmd) => cmd.execute().await,
        }
    }
}

/// Load the configuration file, pointing at `queuelens.toml` when it is missing.
fn load_config(path: &str) -> Result<QueueLensConfig> {
    if !std::path::Path::new(path).exists() {
        anyhow::bail!(
            "Configuration file not found: {}\nCreate one with at least a [database] url.",
            path
        );
    }

    QueueLensConfig::from_file(path).map_err(|e| anyhow::anyhow!("{}", e))
}
