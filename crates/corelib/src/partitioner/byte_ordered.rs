//! Byte-ordered partitioner implementation.

use crate::key::{Key, KEY_SPACE};
use crate::partitioner::traits::Partitioner;

/// Byte-ordered partitioner.
///
/// Keys keep their natural order and the domain is cut into `range_count`
/// contiguous slices of (nearly) equal width: `range(k) = k * n / 256`.
/// With four ranges this gives 0-63, 64-127, 128-191 and 192-255.
#[derive(Clone, Debug, Default)]
pub struct ByteOrderedPartitioner;

impl Partitioner for ByteOrderedPartitioner {
    fn range_of(&self, key: Key, range_count: usize) -> usize {
        debug_assert!(range_count > 0);
        key.index() * range_count / KEY_SPACE
    }

    fn name(&self) -> &'static str {
        "ByteOrderedPartitioner"
    }
}
