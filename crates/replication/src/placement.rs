//! Replica placement: the owner set assigned to each key.

use std::fmt;

use corelib::{Key, NodeId, Roster};
use serde::{Deserialize, Serialize};

use crate::error::{ReplicationError, Result};
use crate::strategy::ReplicationStrategy;

/// The nodes responsible for one key, primary first.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ReplicaSet {
    owners: Vec<NodeId>,
}

impl ReplicaSet {
    pub fn new(owners: Vec<NodeId>) -> Self {
        Self { owners }
    }

    pub fn owners(&self) -> &[NodeId] {
        &self.owners
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.owners.contains(id)
    }

    /// Owners other than `local`, in placement order.
    pub fn others<'a>(&'a self, local: &'a NodeId) -> impl Iterator<Item = &'a NodeId> + 'a {
        self.owners.iter().filter(move |id| *id != local)
    }

    pub fn len(&self) -> usize {
        self.owners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }
}

impl fmt::Display for ReplicaSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.owners.iter().map(NodeId::as_str).collect();
        write!(f, "{{{}}}", names.join(","))
    }
}

/// Compute the owner set of every key in the domain, indexed by key.
///
/// Fails when the roster is smaller than the replication factor: every key
/// must end up with exactly `replication_factor` distinct owners.
pub fn assign<S: ReplicationStrategy>(strategy: &S, roster: &Roster) -> Result<Vec<ReplicaSet>> {
    let rf = strategy.replication_factor();
    if rf == 0 || roster.len() < rf {
        return Err(ReplicationError::RosterTooSmall {
            members: roster.len(),
            replication_factor: rf,
        });
    }
    Ok(Key::all()
        .map(|key| ReplicaSet::new(strategy.replicas_for_key(roster, key)))
        .collect())
}
