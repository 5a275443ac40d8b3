//! Read path: the coordinator side of a client GET.

use std::sync::Arc;

use corelib::{Key, NodeId};
use tokio::task::JoinSet;

use super::ReplicaNode;
use crate::error::Result;
use crate::peer::PeerClient;

/// One owner's answer during a read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation {
    pub replica: NodeId,
    /// Empty when the owner holds no value.
    pub value: String,
    pub timestamp: i64,
}

impl Observation {
    pub fn is_candidate(&self) -> bool {
        !self.value.is_empty()
    }
}

/// Everything a coordinated read learned about one key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadOutcome {
    pub key: Key,
    /// Reachable owners in placement order, this node first if it owns the key.
    pub observations: Vec<Observation>,
    pub winner: Option<Observation>,
}

impl ReadOutcome {
    /// Reachable owners holding something older than the winner.
    pub fn stale(&self) -> impl Iterator<Item = &Observation> {
        let winning = self.winner.as_ref().map(|w| w.timestamp);
        self.observations
            .iter()
            .filter(move |obs| matches!(winning, Some(ts) if obs.timestamp < ts))
    }
}

/// The candidate with the strictly greatest timestamp. Ties keep the
/// earlier observation.
pub fn pick_winner(observations: &[Observation]) -> Option<&Observation> {
    let mut winner: Option<&Observation> = None;
    for obs in observations.iter().filter(|o| o.is_candidate()) {
        match winner {
            Some(best) if obs.timestamp <= best.timestamp => {}
            _ => winner = Some(obs),
        }
    }
    winner
}

impl<P: PeerClient> ReplicaNode<P> {
    /// Collect the value every reachable owner holds for `key` and choose
    /// the most recent one.
    pub async fn coordinate_read(&self, key: Key) -> Result<ReadOutcome> {
        let roster = self.roster()?;
        let owners = self.owners(key)?;

        let mut observations = Vec::with_capacity(owners.len());
        if owners.contains(&self.local) {
            let record = self.store.read(key)?;
            observations.push(Observation {
                replica: self.local.clone(),
                value: record.value,
                timestamp: record.timestamp,
            });
        }

        let remote: Vec<_> = owners
            .others(&self.local)
            .filter_map(|id| roster.get(id).cloned())
            .collect();
        let mut answers: Vec<Option<Observation>> = vec![None; remote.len()];

        let mut pending = JoinSet::new();
        for (idx, target) in remote.into_iter().enumerate() {
            let peers = Arc::clone(&self.peers);
            pending.spawn(async move {
                let result = peers.replica_read(&target, key).await;
                (idx, target.id, result)
            });
        }

        while let Some(joined) = pending.join_next().await {
            match joined {
                Ok((idx, _, Ok(reply))) => {
                    answers[idx] = Some(Observation {
                        replica: reply.origin,
                        value: reply.value,
                        timestamp: reply.timestamp,
                    });
                }
                Ok((_, target, Err(err))) => {
                    tracing::warn!(key = %key, target = %target, error = %err, "replica read failed");
                }
                Err(err) => tracing::error!(key = %key, error = %err, "replica read task failed"),
            }
        }
        observations.extend(answers.into_iter().flatten());

        let winner = pick_winner(&observations).cloned();
        tracing::debug!(
            key = %key,
            answered = observations.len(),
            winner = ?winner.as_ref().map(|w| w.replica.as_str()),
            "read collected"
        );
        Ok(ReadOutcome {
            key,
            observations,
            winner,
        })
    }
}
