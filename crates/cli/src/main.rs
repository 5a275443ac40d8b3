//! CLI entry point for quorum-kv.

use clap::Parser;
use cli::CliConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = CliConfig::parse();
    config.init_logging();
    config.run().await
}
