//! Write path: the coordinator side of a client PUT.

use std::sync::Arc;

use corelib::{Key, NodeId};
use tokio::sync::oneshot;
use tokio::task::JoinSet;

use super::ReplicaNode;
use crate::consistency::ConsistencyLevel;
use crate::error::Result;
use crate::hints::Hint;
use crate::peer::{PeerClient, ReplicaWrite};
use crate::settings::RecoveryMode;

/// Sent to the waiting client handler once enough owners have the write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteAck {
    pub key: Key,
    pub timestamp: i64,
    pub acks: usize,
}

/// Final tally of a coordinated write, after every owner was tried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteOutcome {
    pub key: Key,
    pub timestamp: i64,
    pub successes: usize,
    pub required: usize,
    /// Owners that could not be reached.
    pub failed: Vec<NodeId>,
    /// Subset of `failed` for which a hint was queued.
    pub hinted: Vec<NodeId>,
}

impl WriteOutcome {
    pub fn acknowledged(&self) -> bool {
        self.successes >= self.required
    }
}

impl<P: PeerClient> ReplicaNode<P> {
    /// Admission checks for a client PUT, run before any work is started.
    pub fn check_write(&self, key: Key, value: &str) -> Result<()> {
        self.roster()?;
        Self::validate_value(key, value)
    }

    /// Stamp, store and replicate a client write.
    ///
    /// `ack` fires once as soon as `consistency` is satisfied; the remaining
    /// owners are still tried afterwards. If the level is never reached,
    /// `ack` is dropped unsent.
    pub async fn coordinate_write(
        &self,
        key: Key,
        value: String,
        consistency: ConsistencyLevel,
        ack: oneshot::Sender<WriteAck>,
    ) -> Result<WriteOutcome> {
        self.check_write(key, &value)?;
        let roster = self.roster()?;
        let owners = self.owners(key)?;
        let timestamp = self.clock.now_seconds();
        let required = consistency.required_acks(owners.len());

        let mut ack = Some(ack);
        let mut outcome = WriteOutcome {
            key,
            timestamp,
            successes: 0,
            required,
            failed: Vec::new(),
            hinted: Vec::new(),
        };

        if owners.contains(&self.local) {
            match self.apply_local(key, &value, timestamp) {
                Ok(_) => {
                    outcome.successes += 1;
                    settle(&mut ack, &outcome);
                }
                Err(err) => tracing::error!(
                    key = %key,
                    error = %err,
                    "local write failed"
                ),
            }
        }

        let write = Arc::new(ReplicaWrite {
            key,
            value,
            timestamp,
            origin: self.local.clone(),
            consistency,
        });

        let mut pending = JoinSet::new();
        for owner in owners.others(&self.local) {
            let Some(target) = roster.get(owner).cloned() else {
                tracing::warn!(key = %key, owner = %owner, "owner missing from roster");
                outcome.failed.push(owner.clone());
                continue;
            };
            let peers = Arc::clone(&self.peers);
            let write = Arc::clone(&write);
            pending.spawn(async move {
                let result = peers.replica_put(&target, &write).await;
                (target.id, result)
            });
        }

        while let Some(joined) = pending.join_next().await {
            match joined {
                Ok((_, Ok(()))) => {
                    outcome.successes += 1;
                    settle(&mut ack, &outcome);
                }
                Ok((target, Err(err))) => {
                    tracing::warn!(key = %key, target = %target, error = %err, "replica put failed");
                    if self.settings.recovery == RecoveryMode::HintedHandoff {
                        self.hints.record(Hint {
                            target: target.clone(),
                            key,
                            value: write.value.clone(),
                            timestamp,
                        });
                        metrics::counter!("kv_hints_stored_total").increment(1);
                        tracing::debug!(key = %key, target = %target, "stored hint");
                        outcome.hinted.push(target.clone());
                    }
                    outcome.failed.push(target);
                }
                Err(err) => tracing::error!(key = %key, error = %err, "replica put task failed"),
            }
        }

        if ack.is_some() {
            tracing::warn!(
                key = %key,
                consistency = %consistency,
                successes = outcome.successes,
                required,
                "write did not reach its consistency level"
            );
        }
        Ok(outcome)
    }
}

fn settle(ack: &mut Option<oneshot::Sender<WriteAck>>, outcome: &WriteOutcome) {
    if !outcome.acknowledged() {
        return;
    }
    if let Some(tx) = ack.take() {
        // The client handler may have gone away; nothing to do then.
        let _ = tx.send(WriteAck {
            key: outcome.key,
            timestamp: outcome.timestamp,
            acks: outcome.successes,
        });
    }
}
