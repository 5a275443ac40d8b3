//! Top-level command line configuration.

use clap::Parser;
use tracing::Level;

use crate::commands::Command;

#[derive(Debug, Parser)]
#[command(name = "quorum-kv")]
#[command(about = "Quorum-replicated key-value store")]
#[command(version, long_about = None)]
pub struct CliConfig {
    /// Maximum log level (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "info")]
    pub log_level: Level,

    #[command(subcommand)]
    pub command: Command,
}

impl CliConfig {
    pub fn init_logging(&self) {
        // A second subscriber (e.g. in tests) is not an error worth exiting for.
        let _ = tracing_subscriber::fmt()
            .with_max_level(self.log_level)
            .with_target(false)
            .try_init();
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let json = self.command.wants_json();
        let result = self.command.execute().await?;
        result.print(json)
    }
}
