//! Liveness pre-check, hinted hand-off replay and read repair.

use corelib::{Key, NodeId};

use super::{ReadOutcome, ReplicaNode};
use crate::consistency::ConsistencyLevel;
use crate::error::Result;
use crate::peer::{PeerClient, ReplicaWrite};
use crate::settings::RecoveryMode;

impl<P: PeerClient> ReplicaNode<P> {
    /// Whether enough owners of `key` look reachable to attempt an operation
    /// at `consistency`.
    ///
    /// This node counts if it owns the key. Remote owners are probed in
    /// placement order, stopping as soon as the level is met. A `true`
    /// answer does not guarantee the operation itself will succeed.
    pub async fn check_replica_status(
        &self,
        key: Key,
        consistency: ConsistencyLevel,
    ) -> Result<bool> {
        let roster = self.roster()?;
        let owners = self.owners(key)?;
        let required = consistency.required_acks(owners.len());

        let mut reachable = usize::from(owners.contains(&self.local));
        if reachable >= required {
            return Ok(true);
        }
        for owner in owners.others(&self.local) {
            let Some(target) = roster.get(owner) else {
                continue;
            };
            match self.peers.probe(target).await {
                Ok(()) => {
                    reachable += 1;
                    if reachable >= required {
                        return Ok(true);
                    }
                }
                Err(err) => tracing::debug!(key = %key, target = %owner, error = %err, "probe failed"),
            }
        }
        tracing::info!(
            key = %key,
            consistency = %consistency,
            reachable,
            required,
            "not enough replicas are up"
        );
        Ok(false)
    }

    /// Replay every hint held for `target`. Returns how many were delivered.
    ///
    /// Hints are removed from the table before sending; any that fail to
    /// deliver are put back for the next contact.
    pub async fn replay_hints_for(&self, target: &NodeId) -> usize {
        if self.settings.recovery != RecoveryMode::HintedHandoff {
            return 0;
        }
        let Ok(roster) = self.roster() else {
            return 0;
        };
        let Some(node) = roster.get(target) else {
            tracing::warn!(target = %target, "hint target missing from roster");
            return 0;
        };

        let hints = self.hints.take_for(target);
        if hints.is_empty() {
            return 0;
        }

        let mut delivered = 0;
        for (id, hint) in hints {
            let write = ReplicaWrite {
                key: hint.key,
                value: hint.value.clone(),
                timestamp: hint.timestamp,
                origin: self.local.clone(),
                consistency: ConsistencyLevel::One,
            };
            match self.peers.replica_put(node, &write).await {
                Ok(()) => delivered += 1,
                Err(err) => {
                    tracing::warn!(target = %target, key = %hint.key, error = %err, "hint replay failed");
                    self.hints.restore(id, hint);
                }
            }
        }
        metrics::counter!("kv_hints_replayed_total").increment(delivered as u64);
        tracing::info!(target = %target, delivered, "replayed hints");
        delivered
    }

    /// Push the winning value of `outcome` to every owner seen holding an
    /// older one. The local copy is updated in place. Returns how many
    /// owners were repaired.
    pub async fn read_repair(&self, outcome: &ReadOutcome) -> usize {
        let Some(winner) = outcome.winner.as_ref() else {
            return 0;
        };
        let Ok(roster) = self.roster() else {
            return 0;
        };

        let write = ReplicaWrite {
            key: outcome.key,
            value: winner.value.clone(),
            timestamp: winner.timestamp,
            origin: self.local.clone(),
            consistency: ConsistencyLevel::One,
        };

        let mut repaired = 0;
        for stale in outcome.stale() {
            if stale.replica == self.local {
                match self.apply_local(write.key, &write.value, write.timestamp) {
                    Ok(_) => repaired += 1,
                    Err(err) => tracing::warn!(key = %write.key, error = %err, "local repair failed"),
                }
                continue;
            }
            let Some(target) = roster.get(&stale.replica) else {
                continue;
            };
            match self.peers.replica_put(target, &write).await {
                Ok(()) => repaired += 1,
                Err(err) => tracing::warn!(
                    key = %write.key,
                    target = %stale.replica,
                    error = %err,
                    "repair push failed"
                ),
            }
        }
        if repaired > 0 {
            metrics::counter!("kv_read_repairs_total").increment(repaired as u64);
            tracing::debug!(key = %write.key, repaired, "read repair done");
        }
        repaired
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use super::*;
    use tokio::sync::oneshot;

    #[tokio::test]
    async fn test_liveness_one_satisfied_locally() {
        let h = harness("A", RecoveryMode::None);
        h.peers.set_down("B", true);
        h.peers.set_down("C", true);
        assert!(h.node.check_replica_status(Key(10), ConsistencyLevel::One).await.unwrap());
        assert!(h.peers.probes.lock().is_empty(), "owner does not need to probe for ONE");
    }

    #[tokio::test]
    async fn test_liveness_quorum() {
        let h = harness("A", RecoveryMode::None);
        h.peers.set_down("B", true);
        h.peers.set_down("C", true);
        assert!(!h.node.check_replica_status(Key(10), ConsistencyLevel::Quorum).await.unwrap());

        h.peers.set_down("C", false);
        assert!(h.node.check_replica_status(Key(10), ConsistencyLevel::Quorum).await.unwrap());
    }

    #[tokio::test]
    async fn test_liveness_non_owner_probes() {
        let h = harness("D", RecoveryMode::None);
        h.peers.set_down("A", true);
        h.peers.set_down("B", true);
        h.peers.set_down("C", true);
        assert!(!h.node.check_replica_status(Key(10), ConsistencyLevel::One).await.unwrap());

        h.peers.set_down("C", false);
        assert!(h.node.check_replica_status(Key(10), ConsistencyLevel::One).await.unwrap());
    }

    #[tokio::test]
    async fn test_hint_replayed_exactly_once() {
        let h = harness("A", RecoveryMode::HintedHandoff);
        h.peers.set_down("B", true);
        let (tx, _rx) = oneshot::channel();
        h.node
            .coordinate_write(Key(10), "x".into(), ConsistencyLevel::One, tx)
            .await
            .unwrap();
        assert!(h.peers.puts_to("B").is_empty());

        h.peers.set_down("B", false);
        let from_b = ReplicaWrite {
            key: Key(20),
            value: "y".into(),
            timestamp: 2_000,
            origin: "B".into(),
            consistency: ConsistencyLevel::One,
        };
        h.node.accept_replica_write(from_b.clone()).await.unwrap();
        h.node.accept_replica_write(from_b).await.unwrap();

        let delivered = h.peers.puts_to("B");
        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0].key, Key(10));
        assert_eq!(delivered[0].value, "x");
        assert_eq!(delivered[0].origin, NodeId::from("A"));
        assert!(h.node.hints().is_empty());
    }

    #[tokio::test]
    async fn test_failed_replay_restores_hint() {
        let h = harness("A", RecoveryMode::HintedHandoff);
        h.peers.set_down("B", true);
        let (tx, _rx) = oneshot::channel();
        h.node
            .coordinate_write(Key(10), "x".into(), ConsistencyLevel::One, tx)
            .await
            .unwrap();

        assert_eq!(h.node.replay_hints_for(&NodeId::from("B")).await, 0);
        assert_eq!(h.node.hints().pending_for(&NodeId::from("B")), 1);

        h.peers.set_down("B", false);
        assert_eq!(h.node.replay_hints_for(&NodeId::from("B")).await, 1);
        assert!(h.node.hints().is_empty());
    }

    #[tokio::test]
    async fn test_read_repair_converges_stale_owners() {
        let h = harness("A", RecoveryMode::ReadRepair);
        h.node.store().update(Key(10), "old", 5).unwrap();
        h.peers.seed("B", Key(10), "fresh", 9);

        let outcome = h.node.coordinate_read(Key(10)).await.unwrap();
        assert_eq!(h.node.read_repair(&outcome).await, 2);

        let local = h.node.store().read(Key(10)).unwrap();
        assert_eq!((local.value.as_str(), local.timestamp), ("fresh", 9));
        assert_eq!(h.peers.value_at("C", Key(10)), Some(("fresh".into(), 9)));
        assert!(h.peers.puts_to("B").is_empty(), "winner is not re-pushed");

        let again = h.node.coordinate_read(Key(10)).await.unwrap();
        assert_eq!(h.node.read_repair(&again).await, 0);
    }

    #[tokio::test]
    async fn test_restarted_owner_converges_after_read() {
        let h = harness("A", RecoveryMode::ReadRepair);
        h.clock.0.store(100, std::sync::atomic::Ordering::SeqCst);
        h.peers.set_down("B", true);
        h.peers.set_down("C", true);
        let (tx, rx) = oneshot::channel();
        h.node
            .coordinate_write(Key(10), "x".into(), ConsistencyLevel::One, tx)
            .await
            .unwrap();
        assert!(rx.await.is_ok());

        h.peers.set_down("B", false);
        let outcome = h.node.coordinate_read(Key(10)).await.unwrap();
        assert_eq!(outcome.winner.as_ref().unwrap().value, "x");
        h.node.read_repair(&outcome).await;

        assert_eq!(h.peers.value_at("B", Key(10)), Some(("x".into(), 100)));
    }
}
