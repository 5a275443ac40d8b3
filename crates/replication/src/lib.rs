//! Replica node for a quorum-replicated key-value store.
//!
//! This crate holds everything a single node does:
//! - Which nodes own a key (`strategy`, `placement`)
//! - Local state and durability (`store`, `commitlog`)
//! - Coordinating client writes and reads at a consistency level (`node`)
//! - Recovering from peer failures (hinted hand-off, read repair)
//!
//! Peers are reached through the [`PeerClient`] trait; the TCP transport
//! lives in the `wire` crate.

pub mod commitlog;
pub mod consistency;
pub mod error;
pub mod hints;
pub mod node;
pub mod peer;
pub mod placement;
pub mod settings;
pub mod store;
pub mod strategy;

pub use commitlog::{CommitLog, LogEntry};
pub use consistency::ConsistencyLevel;
pub use error::{PeerError, ReplicationError, Result};
pub use hints::{Hint, HintTable};
pub use node::{Observation, ReadOutcome, ReplicaNode, WriteAck, WriteOutcome};
pub use peer::{PeerClient, ReplicaReadReply, ReplicaWrite};
pub use placement::ReplicaSet;
pub use settings::{BootMode, NodeSettings, RecoveryMode};
pub use store::{Record, ReplicatedStore};
pub use strategy::{ReplicationStrategy, SimpleStrategy};
