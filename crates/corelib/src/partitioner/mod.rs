//! Partitioner abstraction for the key domain.
//!
//! Partitioners are responsible for mapping keys onto contiguous ranges
//! that replication strategies then assign to nodes.

pub mod byte_ordered;
pub mod traits;

pub use byte_ordered::ByteOrderedPartitioner;
pub use traits::Partitioner;
