//! Cluster roster (membership table).
//!
//! The roster is the ordered, fixed set of nodes a cluster runs with. Order is
//! significant: it drives partition assignment, so two nodes that disagree on
//! roster order disagree on ownership.
//!
//! Rosters come from a file at boot or from a peer-pushed init message. The
//! file has one member per line:
//!
//! ```text
//! # name  ip         port
//! A       10.0.0.1   9001
//! B       10.0.0.2   9001
//! ```

use std::collections::HashSet;
use std::net::{IpAddr, SocketAddr, ToSocketAddrs};
use std::path::Path;

use crate::error::{Error, Result};
use crate::key::KEY_SPACE;
use crate::node::{Node, NodeId};

/// Ordered, immutable set of cluster members.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Roster {
    members: Vec<Node>,
}

impl Roster {
    /// Build a roster, rejecting empty, oversized or duplicate-name member lists.
    pub fn new(members: Vec<Node>) -> Result<Self> {
        if members.is_empty() {
            return Err(Error::InvalidRoster("roster is empty".into()));
        }
        if members.len() > KEY_SPACE {
            return Err(Error::InvalidRoster(format!(
                "{} members exceed the {} keys in the domain",
                members.len(),
                KEY_SPACE
            )));
        }
        let mut seen = HashSet::with_capacity(members.len());
        for node in &members {
            if node.id.as_str().is_empty() {
                return Err(Error::InvalidNode("empty node name".into()));
            }
            if !seen.insert(node.id.clone()) {
                return Err(Error::InvalidRoster(format!("duplicate node name {}", node.id)));
            }
        }
        Ok(Self { members })
    }

    /// Parse roster file contents.
    pub fn parse(contents: &str) -> Result<Self> {
        let mut members = Vec::new();
        for (idx, raw) in contents.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let fields: Vec<&str> = line.split_whitespace().collect();
            let &[name, host, port] = fields.as_slice() else {
                return Err(Error::RosterParse {
                    line: idx + 1,
                    reason: format!("expected `<name> <ip> <port>`, got {:?}", line),
                });
            };
            let addr = resolve(host, port).map_err(|reason| Error::RosterParse {
                line: idx + 1,
                reason,
            })?;
            members.push(Node::new(name, addr));
        }
        Self::new(members)
    }

    /// Read and parse a roster file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        let roster = Self::parse(&contents)?;
        tracing::debug!(
            path = %path.as_ref().display(),
            members = roster.len(),
            "loaded cluster roster"
        );
        Ok(roster)
    }

    pub fn members(&self) -> &[Node] {
        &self.members
    }

    pub fn ids(&self) -> impl Iterator<Item = &NodeId> {
        self.members.iter().map(|n| &n.id)
    }

    pub fn get(&self, id: &NodeId) -> Option<&Node> {
        self.members.iter().find(|n| &n.id == id)
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.get(id).is_some()
    }

    /// Member at roster position `idx`, wrapping around.
    pub fn at(&self, idx: usize) -> &Node {
        &self.members[idx % self.members.len()]
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// Resolve a `host port` pair. IP literals are taken as-is, anything else
/// goes through the system resolver.
pub fn resolve(host: &str, port: &str) -> std::result::Result<SocketAddr, String> {
    let port: u16 = port
        .parse()
        .map_err(|e| format!("invalid port {:?}: {}", port, e))?;
    if let Ok(ip) = host.parse::<IpAddr>() {
        return Ok(SocketAddr::new(ip, port));
    }
    (host, port)
        .to_socket_addrs()
        .map_err(|e| format!("cannot resolve {:?}: {}", host, e))?
        .next()
        .ok_or_else(|| format!("no address for {:?}", host))
}
