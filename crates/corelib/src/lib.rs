//! Core library for the replicated key-value store.
//!
//! This crate provides the fundamental abstractions shared by every node:
//! - Node identity and addressing
//! - The fixed 0..=255 key domain
//! - The cluster roster (static membership table)
//! - Partitioner algorithms over the key domain
//! - The clock used to stamp writes

pub mod clock;
pub mod error;
pub mod key;
pub mod node;
pub mod partitioner;
pub mod topology;

pub use clock::{Clock, SystemClock};
pub use error::{Error, Result};
pub use key::{Key, KEY_SPACE};
pub use node::{Node, NodeId};
pub use partitioner::{ByteOrderedPartitioner, Partitioner};
pub use topology::Roster;
