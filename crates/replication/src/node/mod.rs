//! The replica node: one process's view of the cluster.
//!
//! `ReplicaNode` owns everything a node needs to serve requests: its
//! identity and settings, the roster once known, the replicated store, the
//! commit log, the hint table and a handle for calling peers. Request
//! handlers share it behind an `Arc`.

mod read;
mod recovery;
mod write;

use std::sync::Arc;

use corelib::{Clock, Key, NodeId, Roster, SystemClock};
use parking_lot::RwLock;

use crate::commitlog::CommitLog;
use crate::error::{ReplicationError, Result};
use crate::hints::HintTable;
use crate::peer::{PeerClient, ReplicaReadReply, ReplicaWrite};
use crate::placement::{self, ReplicaSet};
use crate::settings::{NodeSettings, RecoveryMode};
use crate::store::{Record, ReplicatedStore};
use crate::strategy::{ReplicationStrategy, SimpleStrategy};

pub use read::{pick_winner, Observation, ReadOutcome};
pub use write::{WriteAck, WriteOutcome};

pub struct ReplicaNode<P: PeerClient> {
    local: NodeId,
    settings: NodeSettings,
    strategy: SimpleStrategy,
    roster: RwLock<Option<Arc<Roster>>>,
    store: ReplicatedStore,
    log: CommitLog,
    hints: HintTable,
    peers: Arc<P>,
    clock: Arc<dyn Clock>,
}

impl<P: PeerClient> std::fmt::Debug for ReplicaNode<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReplicaNode")
            .field("local", &self.local)
            .field("settings", &self.settings)
            .field("initialized", &self.is_initialized())
            .finish_non_exhaustive()
    }
}

impl<P: PeerClient> ReplicaNode<P> {
    pub fn new(
        local: impl Into<NodeId>,
        settings: NodeSettings,
        log: CommitLog,
        peers: Arc<P>,
    ) -> Self {
        let strategy = SimpleStrategy::new(settings.replication_factor);
        Self {
            local: local.into(),
            settings,
            strategy,
            roster: RwLock::new(None),
            store: ReplicatedStore::new(),
            log,
            hints: HintTable::new(),
            peers,
            clock: Arc::new(SystemClock),
        }
    }

    /// Replace the wall clock used to stamp writes.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn local(&self) -> &NodeId {
        &self.local
    }

    pub fn settings(&self) -> &NodeSettings {
        &self.settings
    }

    pub fn recovery(&self) -> RecoveryMode {
        self.settings.recovery
    }

    pub fn store(&self) -> &ReplicatedStore {
        &self.store
    }

    pub fn hints(&self) -> &HintTable {
        &self.hints
    }

    pub fn commit_log(&self) -> &CommitLog {
        &self.log
    }

    pub fn is_initialized(&self) -> bool {
        self.roster.read().is_some()
    }

    /// The roster, or `NotInitialized` before partitioning has run.
    pub fn roster(&self) -> Result<Arc<Roster>> {
        self.roster
            .read()
            .as_ref()
            .cloned()
            .ok_or(ReplicationError::NotInitialized)
    }

    /// Owner set of `key`.
    pub fn owners(&self, key: Key) -> Result<ReplicaSet> {
        self.store.owners(key)
    }

    /// Adopt `roster` and partition the key space. Values start empty.
    ///
    /// Rejected with `AlreadyInitialized` on a node that has already run it.
    pub fn initialize(&self, roster: Roster) -> Result<()> {
        let mut slot = self.roster.write();
        if slot.is_some() {
            return Err(ReplicationError::AlreadyInitialized);
        }
        if !roster.contains(&self.local) {
            return Err(ReplicationError::UnknownNode(self.local.clone()));
        }

        let table = placement::assign(&self.strategy, &roster)?;
        self.store.initialize(table)?;
        tracing::info!(
            node = %self.local,
            members = roster.len(),
            strategy = self.strategy.name(),
            "replica initialized"
        );
        *slot = Some(Arc::new(roster));
        Ok(())
    }

    /// Initialize from `roster`, then fold this node's commit log into the
    /// store. Returns how many log records changed a value.
    pub fn rebuild(&self, roster: Roster) -> Result<usize> {
        self.initialize(roster)?;
        let entries = self.log.replay()?;
        let total = entries.len();
        let applied = self.store.replay(entries)?;
        tracing::info!(
            node = %self.local,
            path = %self.log.path().display(),
            records = total,
            applied,
            "rebuilt store from commit log"
        );
        Ok(applied)
    }

    /// Reject values the store or the log cannot represent.
    pub fn validate_value(key: Key, value: &str) -> Result<()> {
        if value.is_empty() {
            return Err(ReplicationError::InvalidValue {
                key,
                reason: "value must not be empty",
            });
        }
        if value.contains('\n') {
            return Err(ReplicationError::InvalidValue {
                key,
                reason: "value must not contain a newline",
            });
        }
        Ok(())
    }

    /// Log the write durably, then apply it to the store.
    ///
    /// Returns whether the store changed; an older or equal timestamp is
    /// logged but leaves the record untouched.
    pub(crate) fn apply_local(&self, key: Key, value: &str, timestamp: i64) -> Result<bool> {
        Self::validate_value(key, value)?;
        self.log.append(key, value, timestamp)?;
        self.store.update(key, value, timestamp)
    }

    /// Handle a replica-put from a peer.
    ///
    /// In hinted hand-off mode, contact from `origin` also flushes any hints
    /// this node holds for it.
    pub async fn accept_replica_write(&self, write: ReplicaWrite) -> Result<bool> {
        self.roster()?;
        let applied = self.apply_local(write.key, &write.value, write.timestamp);
        match &applied {
            Ok(changed) => tracing::debug!(
                key = %write.key,
                origin = %write.origin,
                timestamp = write.timestamp,
                changed,
                "applied replica write"
            ),
            Err(err) => tracing::warn!(
                key = %write.key,
                origin = %write.origin,
                error = %err,
                "replica write failed locally"
            ),
        }

        if self.settings.recovery == RecoveryMode::HintedHandoff {
            self.replay_hints_for(&write.origin).await;
        }
        applied
    }

    /// This node's answer to a replica-read.
    pub fn local_reply(&self, key: Key) -> Result<ReplicaReadReply> {
        let Record {
            value, timestamp, ..
        } = self.store.read(key)?;
        Ok(ReplicaReadReply {
            key,
            value,
            timestamp,
            origin: self.local.clone(),
        })
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-process peers for exercising the coordinator paths.

    use std::collections::{HashMap, HashSet};
    use std::sync::atomic::{AtomicI64, Ordering};

    use async_trait::async_trait;
    use corelib::{Clock, Key, Node, NodeId};
    use parking_lot::Mutex;
    use tempfile::TempDir;
    use tokio::sync::Notify;

    use super::*;
    use crate::error::PeerError;

    pub const ROSTER: &str = "A 127.0.0.1 9001\nB 127.0.0.1 9002\nC 127.0.0.1 9003\nD 127.0.0.1 9004\n";

    pub struct FixedClock(pub AtomicI64);

    impl FixedClock {
        pub fn at(seconds: i64) -> Arc<Self> {
            Arc::new(Self(AtomicI64::new(seconds)))
        }
    }

    impl Clock for FixedClock {
        fn now_seconds(&self) -> i64 {
            self.0.load(Ordering::SeqCst)
        }
    }

    /// Peers simulated as plain maps. Nodes listed in `down` fail every call;
    /// replica puts to a node in `held` wait until its gate is notified.
    #[derive(Default)]
    pub struct MockPeers {
        pub values: Mutex<HashMap<(NodeId, Key), (String, i64)>>,
        pub down: Mutex<HashSet<NodeId>>,
        pub held: Mutex<HashMap<NodeId, Arc<Notify>>>,
        pub puts: Mutex<Vec<(NodeId, ReplicaWrite)>>,
        pub probes: Mutex<Vec<NodeId>>,
    }

    impl MockPeers {
        pub fn set_down(&self, name: &str, down: bool) {
            let mut set = self.down.lock();
            if down {
                set.insert(NodeId::from(name));
            } else {
                set.remove(&NodeId::from(name));
            }
        }

        pub fn hold(&self, name: &str) -> Arc<Notify> {
            let gate = Arc::new(Notify::new());
            self.held.lock().insert(NodeId::from(name), gate.clone());
            gate
        }

        pub fn seed(&self, name: &str, key: Key, value: &str, timestamp: i64) {
            self.values
                .lock()
                .insert((NodeId::from(name), key), (value.to_string(), timestamp));
        }

        pub fn value_at(&self, name: &str, key: Key) -> Option<(String, i64)> {
            self.values.lock().get(&(NodeId::from(name), key)).cloned()
        }

        pub fn puts_to(&self, name: &str) -> Vec<ReplicaWrite> {
            self.puts
                .lock()
                .iter()
                .filter(|(target, _)| target.as_str() == name)
                .map(|(_, write)| write.clone())
                .collect()
        }

        fn check_up(&self, target: &Node) -> std::result::Result<(), PeerError> {
            if self.down.lock().contains(&target.id) {
                Err(PeerError::Unreachable(target.id.clone(), "connection refused".into()))
            } else {
                Ok(())
            }
        }
    }

    #[async_trait]
    impl PeerClient for MockPeers {
        async fn replica_put(
            &self,
            target: &Node,
            write: &ReplicaWrite,
        ) -> std::result::Result<(), PeerError> {
            let gate = self.held.lock().get(&target.id).cloned();
            if let Some(gate) = gate {
                gate.notified().await;
            }
            self.check_up(target)?;
            self.puts.lock().push((target.id.clone(), write.clone()));
            let mut values = self.values.lock();
            let slot = values
                .entry((target.id.clone(), write.key))
                .or_insert_with(|| (String::new(), 0));
            if write.timestamp > slot.1 {
                *slot = (write.value.clone(), write.timestamp);
            }
            Ok(())
        }

        async fn replica_read(
            &self,
            target: &Node,
            key: Key,
        ) -> std::result::Result<ReplicaReadReply, PeerError> {
            self.check_up(target)?;
            let (value, timestamp) = self
                .values
                .lock()
                .get(&(target.id.clone(), key))
                .cloned()
                .unwrap_or_default();
            Ok(ReplicaReadReply {
                key,
                value,
                timestamp,
                origin: target.id.clone(),
            })
        }

        async fn probe(&self, target: &Node) -> std::result::Result<(), PeerError> {
            self.probes.lock().push(target.id.clone());
            self.check_up(target)
        }
    }

    pub struct Harness {
        pub node: Arc<ReplicaNode<MockPeers>>,
        pub peers: Arc<MockPeers>,
        pub clock: Arc<FixedClock>,
        pub _dir: TempDir,
    }

    pub fn harness(local: &str, recovery: RecoveryMode) -> Harness {
        let dir = TempDir::new().unwrap();
        let peers = Arc::new(MockPeers::default());
        let clock = FixedClock::at(1_000);
        let log = CommitLog::open(CommitLog::path_for(dir.path(), &NodeId::from(local))).unwrap();
        let node = ReplicaNode::new(
            local,
            NodeSettings::default().with_recovery(recovery),
            log,
            peers.clone(),
        )
        .with_clock(clock.clone());
        node.initialize(Roster::parse(ROSTER).unwrap()).unwrap();
        Harness {
            node: Arc::new(node),
            peers,
            clock,
            _dir: dir,
        }
    }
}
