//! Per-node runtime settings.

use std::fmt;
use std::str::FromStr;

use crate::strategy::simple::DEFAULT_REPLICATION_FACTOR;

/// Which failure-recovery mechanism is active. Exactly one at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecoveryMode {
    #[default]
    None,
    /// Push the winning value back to stale replicas after each read.
    ReadRepair,
    /// Queue writes for unreachable owners and replay them on next contact.
    HintedHandoff,
}

impl RecoveryMode {
    pub fn as_str(self) -> &'static str {
        match self {
            RecoveryMode::None => "none",
            RecoveryMode::ReadRepair => "read-repair",
            RecoveryMode::HintedHandoff => "hinted-handoff",
        }
    }
}

impl fmt::Display for RecoveryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecoveryMode {
    type Err = String;

    /// Accepts the names above or the numeric selectors `0`, `1`, `2`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" | "0" => Ok(RecoveryMode::None),
            "read-repair" | "1" => Ok(RecoveryMode::ReadRepair),
            "hinted-handoff" | "2" => Ok(RecoveryMode::HintedHandoff),
            other => Err(format!(
                "unknown recovery mode {:?} (expected none, read-repair or hinted-handoff)",
                other
            )),
        }
    }
}

/// How a node obtains its roster and state at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BootMode {
    /// Wait for a peer-pushed init message; the log is not replayed.
    #[default]
    Fresh,
    /// Load the roster file, partition, and replay the commit log.
    Rebuild,
}

/// Settings that shape a replica node's behavior.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeSettings {
    pub recovery: RecoveryMode,
    pub replication_factor: usize,
}

impl Default for NodeSettings {
    fn default() -> Self {
        Self {
            recovery: RecoveryMode::None,
            replication_factor: DEFAULT_REPLICATION_FACTOR,
        }
    }
}

impl NodeSettings {
    pub fn with_recovery(mut self, recovery: RecoveryMode) -> Self {
        self.recovery = recovery;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recovery_mode_parse() {
        assert_eq!("read-repair".parse::<RecoveryMode>().unwrap(), RecoveryMode::ReadRepair);
        assert_eq!("2".parse::<RecoveryMode>().unwrap(), RecoveryMode::HintedHandoff);
        assert_eq!("NONE".parse::<RecoveryMode>().unwrap(), RecoveryMode::None);
        assert!("gossip".parse::<RecoveryMode>().is_err());
    }
}
