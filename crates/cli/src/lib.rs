//! The `quorum-kv` command line.
//!
//! Provides commands for:
//! - Running a replica node (`serve`)
//! - Pushing the roster to every node (`init`)
//! - Issuing client writes and reads (`put`, `get`)
//! - Clearing commit logs before a fresh start (`reset`)

pub mod commands;
pub mod config;

pub use commands::{Command, CommandResult};
pub use config::CliConfig;
