//! Simple replication strategy.
//!
//! Places N replicas on consecutive roster members, starting at the primary
//! of the key's range.
//!
//! # Algorithm
//!
//! 1. Find the key's range with the partitioner (one range per roster member)
//! 2. The primary is the roster member at that range's position
//! 3. Continue through the roster (wrapping) for N-1 more members
//!
//! With a roster `[A, B, C, D]` and N = 3 this yields the fixed quartile
//! layout: 0-63 -> {A,B,C}, 64-127 -> {B,C,D}, 128-191 -> {C,D,A},
//! 192-255 -> {D,A,B}.
//!
//! # Limitations
//!
//! - Roster changes re-shuffle every range (no online membership)
//! - N is capped by roster size; the node refuses to init otherwise

use corelib::partitioner::{ByteOrderedPartitioner, Partitioner};
use corelib::{Key, NodeId, Roster};

use crate::strategy::ReplicationStrategy;

/// Default number of replicas per key.
pub const DEFAULT_REPLICATION_FACTOR: usize = 3;

/// Simple replication strategy: N replicas on consecutive roster members.
///
/// # Example
///
/// ```rust
/// use corelib::{Key, Roster};
/// use replication::strategy::{ReplicationStrategy, SimpleStrategy};
///
/// let roster = Roster::parse("A 127.0.0.1 1\nB 127.0.0.1 2\nC 127.0.0.1 3\nD 127.0.0.1 4").unwrap();
/// let owners = SimpleStrategy::new(3).replicas_for_key(&roster, Key(10));
/// let names: Vec<&str> = owners.iter().map(|n| n.as_str()).collect();
/// assert_eq!(names, ["A", "B", "C"]);
/// ```
#[derive(Debug, Clone)]
pub struct SimpleStrategy {
    /// Number of replicas to create (including primary).
    replication_factor: usize,
    partitioner: ByteOrderedPartitioner,
}

impl SimpleStrategy {
    /// Create a new simple strategy with the given replication factor.
    ///
    /// # Arguments
    /// * `replication_factor` - Number of replicas (typically 1-5)
    ///   - 1: No replication (single copy)
    ///   - 3: Standard (primary + 2 replicas)
    pub fn new(replication_factor: usize) -> Self {
        Self {
            replication_factor,
            partitioner: ByteOrderedPartitioner,
        }
    }
}

impl Default for SimpleStrategy {
    fn default() -> Self {
        Self::new(DEFAULT_REPLICATION_FACTOR)
    }
}

impl ReplicationStrategy for SimpleStrategy {
    fn replication_factor(&self) -> usize {
        self.replication_factor
    }

    fn replicas_for_key(&self, roster: &Roster, key: Key) -> Vec<NodeId> {
        if self.replication_factor == 0 || roster.is_empty() {
            return Vec::new();
        }

        let primary = self.partitioner.range_of(key, roster.len());
        let count = self.replication_factor.min(roster.len());

        (0..count)
            .map(|offset| roster.at(primary + offset).id.clone())
            .collect()
    }

    fn name(&self) -> &'static str {
        "SimpleStrategy"
    }
}
