//! Node abstractions for the replica cluster.
//!
//! Nodes are identified by their unique name. Identity and address are fixed
//! at boot and never change while the cluster is running.

use std::fmt;
use std::net::SocketAddr;

use serde::{Deserialize, Serialize};

/// Unique name of a node in the cluster.
///
/// Names are what the placement table stores per key, so comparisons must be
/// exact (no case folding).
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub struct NodeId(pub String);

impl NodeId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

/// Member of the cluster roster.
///
/// Keep this struct small and cheap to clone; connection state lives in the
/// transport layer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    /// Address the node's replica service listens on.
    pub addr: SocketAddr,
}

impl Node {
    pub fn new(id: impl Into<NodeId>, addr: SocketAddr) -> Self {
        Self {
            id: id.into(),
            addr,
        }
    }

    pub fn name(&self) -> &str {
        self.id.as_str()
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.id, self.addr)
    }
}

impl From<String> for NodeId {
    fn from(name: String) -> Self {
        Self(name)
    }
}
