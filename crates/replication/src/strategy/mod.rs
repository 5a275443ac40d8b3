//! Replication strategy abstractions.
//!
//! Replication strategies determine how many replicas to create and which
//! roster members hold them:
//!
//! - **SimpleStrategy**: the range's primary plus the next N-1 roster members

pub mod simple;

pub use simple::SimpleStrategy;

use corelib::{Key, NodeId, Roster};

/// Trait for replication strategies.
///
/// A replication strategy determines:
/// 1. How many replicas to create for a key
/// 2. Which nodes should hold those replicas
///
/// # Thread Safety
///
/// Implementations must be thread-safe (Send + Sync) as they may be
/// shared across connection handlers.
pub trait ReplicationStrategy: Send + Sync + 'static {
    /// Get the number of replicas this strategy creates.
    fn replication_factor(&self) -> usize;

    /// Find replica nodes for a given key.
    ///
    /// # Arguments
    /// * `roster` - The ordered cluster roster
    /// * `key` - The key to find replicas for
    ///
    /// # Returns
    /// Distinct NodeIds that should hold replicas (primary first). A pure
    /// function of `key` and roster order.
    fn replicas_for_key(&self, roster: &Roster, key: Key) -> Vec<NodeId>;

    /// Get the strategy name (for logging/debugging).
    fn name(&self) -> &'static str;
}
