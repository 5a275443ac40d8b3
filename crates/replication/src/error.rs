//! Error types for the replication layer.

use corelib::{Key, NodeId};
use thiserror::Error;

/// Errors raised by the replica node and its components.
#[derive(Debug, Error)]
pub enum ReplicationError {
    /// Partitioning has not run yet on this node.
    #[error("replica not initialized")]
    NotInitialized,
    /// A second init would wipe committed data.
    #[error("replica already initialized")]
    AlreadyInitialized,
    #[error("invalid consistency level {0:?}")]
    InvalidConsistency(String),
    #[error("invalid value for key {key}: {reason}")]
    InvalidValue { key: Key, reason: &'static str },
    #[error("roster of {members} members cannot hold {replication_factor} replicas")]
    RosterTooSmall {
        members: usize,
        replication_factor: usize,
    },
    #[error("unknown node {0}")]
    UnknownNode(NodeId),
    #[error(transparent)]
    Core(#[from] corelib::Error),
    #[error("commit log error: {0}")]
    CommitLog(#[from] std::io::Error),
}

/// Failure of a single peer round trip.
#[derive(Debug, Error)]
pub enum PeerError {
    #[error("peer {0} unreachable: {1}")]
    Unreachable(NodeId, String),
    #[error("peer {0} timed out")]
    Timeout(NodeId),
    #[error("peer {0} rejected request: {1}")]
    Rejected(NodeId, String),
    #[error("peer {0} sent an invalid reply: {1}")]
    Protocol(NodeId, String),
}

pub type Result<T> = std::result::Result<T, ReplicationError>;
