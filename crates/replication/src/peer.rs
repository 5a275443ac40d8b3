//! Peer-to-peer calls made by a coordinating node.
//!
//! The node logic is generic over `PeerClient` so tests can swap the TCP
//! transport for an in-process mock.

use async_trait::async_trait;
use corelib::{Key, Node, NodeId};

use crate::consistency::ConsistencyLevel;
use crate::error::PeerError;

/// A write pushed to an owning replica.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplicaWrite {
    pub key: Key,
    pub value: String,
    pub timestamp: i64,
    /// Node sending this write.
    pub origin: NodeId,
    pub consistency: ConsistencyLevel,
}

/// A replica's answer to a replica-read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplicaReadReply {
    pub key: Key,
    /// Empty when the replica holds no value.
    pub value: String,
    pub timestamp: i64,
    pub origin: NodeId,
}

#[async_trait]
pub trait PeerClient: Send + Sync + 'static {
    /// Deliver a replica-put. Success means the message was written to the
    /// peer; no acknowledgment is expected back.
    async fn replica_put(&self, target: &Node, write: &ReplicaWrite) -> Result<(), PeerError>;

    /// Fetch the peer's current value and timestamp for `key`.
    async fn replica_read(&self, target: &Node, key: Key) -> Result<ReplicaReadReply, PeerError>;

    /// Throwaway reachability check.
    async fn probe(&self, target: &Node) -> Result<(), PeerError>;
}
