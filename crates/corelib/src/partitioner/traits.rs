//! Core partitioner trait definitions.

use crate::key::Key;

/// A partitioner maps keys onto contiguous ranges of the key domain.
///
/// Partitioners are stateless and thread-safe. Which nodes own a range is
/// decided by the replication strategy, not here.
pub trait Partitioner: Send + Sync + 'static {
    /// Index of the range `key` falls into, in `0..range_count`.
    ///
    /// # Arguments
    ///
    /// * `key` - The key to partition
    /// * `range_count` - Number of ranges (one per roster member); must be > 0
    fn range_of(&self, key: Key, range_count: usize) -> usize;

    /// Returns the name of this partitioner.
    fn name(&self) -> &'static str;
}
