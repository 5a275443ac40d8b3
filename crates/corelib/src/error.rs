//! Error types for the core library.

use thiserror::Error;

/// Result type alias for the core library.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the core library.
#[derive(Debug, Error)]
pub enum Error {
    /// Key outside the fixed 0..=255 domain
    #[error("invalid key {0}: keys must be in 0..=255")]
    InvalidKey(u32),
    /// Invalid node configuration
    #[error("invalid node: {0}")]
    InvalidNode(String),
    /// Roster cannot be used for partitioning
    #[error("invalid roster: {0}")]
    InvalidRoster(String),
    /// Roster file line could not be parsed
    #[error("roster line {line}: {reason}")]
    RosterParse { line: usize, reason: String },
    /// Roster file could not be read
    #[error("roster I/O error: {0}")]
    Io(#[from] std::io::Error),
}
