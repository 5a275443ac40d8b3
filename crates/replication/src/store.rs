//! Replicated store: the node's local copy of every key it knows about.
//!
//! A single lock guards the whole record map. `read` and `update` are the
//! only access paths, and `update` performs its timestamp comparison and
//! write under that lock so two updates of one key never interleave.

use corelib::{Key, KEY_SPACE};
use parking_lot::Mutex;

use crate::commitlog::LogEntry;
use crate::error::{ReplicationError, Result};
use crate::placement::ReplicaSet;

/// Snapshot of one key's state.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Record {
    /// Stored value; empty means absent.
    pub value: String,
    /// Seconds timestamp of the write that produced `value` (0 if never written).
    pub timestamp: i64,
    /// Owners assigned at partitioning time.
    pub owners: ReplicaSet,
}

impl Record {
    pub fn is_absent(&self) -> bool {
        self.value.is_empty()
    }
}

/// Mutex-guarded key -> record table.
///
/// Uninitialized until partitioning populates every key's owner set.
#[derive(Debug, Default)]
pub struct ReplicatedStore {
    records: Mutex<Option<Vec<Record>>>,
}

impl ReplicatedStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Populate owner sets and clear every value.
    ///
    /// Runs once; a second call is rejected instead of wiping committed data.
    pub fn initialize(&self, placement: Vec<ReplicaSet>) -> Result<()> {
        if placement.len() != KEY_SPACE {
            return Err(corelib::Error::InvalidRoster(format!(
                "placement covers {} keys, expected {}",
                placement.len(),
                KEY_SPACE
            ))
            .into());
        }
        let mut records = self.records.lock();
        if records.is_some() {
            return Err(ReplicationError::AlreadyInitialized);
        }
        *records = Some(
            placement
                .into_iter()
                .map(|owners| Record {
                    owners,
                    ..Record::default()
                })
                .collect(),
        );
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.records.lock().is_some()
    }

    /// Copy of the current record. It may be stale as soon as the lock drops.
    pub fn read(&self, key: Key) -> Result<Record> {
        let records = self.records.lock();
        let records = records.as_ref().ok_or(ReplicationError::NotInitialized)?;
        Ok(records[key.index()].clone())
    }

    /// Owner set of `key`.
    pub fn owners(&self, key: Key) -> Result<ReplicaSet> {
        let records = self.records.lock();
        let records = records.as_ref().ok_or(ReplicationError::NotInitialized)?;
        Ok(records[key.index()].owners.clone())
    }

    /// Last-write-wins update. Returns whether the record changed.
    ///
    /// No-op when `timestamp <= stored timestamp`; ties keep the existing value.
    pub fn update(&self, key: Key, value: &str, timestamp: i64) -> Result<bool> {
        let mut records = self.records.lock();
        let records = records.as_mut().ok_or(ReplicationError::NotInitialized)?;
        let record = &mut records[key.index()];
        if timestamp <= record.timestamp {
            return Ok(false);
        }
        record.value.clear();
        record.value.push_str(value);
        record.timestamp = timestamp;
        Ok(true)
    }

    /// Fold log entries through the last-write-wins rule. Returns how many
    /// entries changed a record.
    pub fn replay<I>(&self, entries: I) -> Result<usize>
    where
        I: IntoIterator<Item = LogEntry>,
    {
        let mut applied = 0;
        for entry in entries {
            if self.update(entry.key, &entry.value, entry.timestamp)? {
                applied += 1;
            }
        }
        Ok(applied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use corelib::NodeId;
    use proptest::prelude::*;

    fn initialized() -> ReplicatedStore {
        let store = ReplicatedStore::new();
        let owners = ReplicaSet::new(vec![NodeId::from("A"), NodeId::from("B"), NodeId::from("C")]);
        store.initialize(vec![owners; KEY_SPACE]).unwrap();
        store
    }

    #[test]
    fn test_uninitialized_store_rejects_access() {
        let store = ReplicatedStore::new();
        assert!(!store.is_initialized());
        assert!(matches!(store.read(Key(1)), Err(ReplicationError::NotInitialized)));
        assert!(matches!(
            store.update(Key(1), "x", 5),
            Err(ReplicationError::NotInitialized)
        ));
    }

    #[test]
    fn test_second_initialize_rejected() {
        let store = initialized();
        store.update(Key(7), "kept", 10).unwrap();

        let err = store
            .initialize(vec![ReplicaSet::default(); KEY_SPACE])
            .unwrap_err();
        assert!(matches!(err, ReplicationError::AlreadyInitialized));
        assert_eq!(store.read(Key(7)).unwrap().value, "kept");
    }

    #[test]
    fn test_initialize_clears_values_and_sets_owners() {
        let store = initialized();
        let record = store.read(Key(200)).unwrap();
        assert!(record.is_absent());
        assert_eq!(record.timestamp, 0);
        assert_eq!(record.owners.len(), 3);
    }

    #[test]
    fn test_update_last_write_wins() {
        let store = initialized();
        assert!(store.update(Key(3), "old", 100).unwrap());
        assert!(store.update(Key(3), "new", 101).unwrap());
        assert!(!store.update(Key(3), "older", 99).unwrap());

        let record = store.read(Key(3)).unwrap();
        assert_eq!(record.value, "new");
        assert_eq!(record.timestamp, 101);
    }

    #[test]
    fn test_tie_keeps_existing() {
        let store = initialized();
        store.update(Key(3), "first", 100).unwrap();
        assert!(!store.update(Key(3), "second", 100).unwrap());
        assert_eq!(store.read(Key(3)).unwrap().value, "first");
    }

    #[test]
    fn test_concurrent_updates_keep_max_timestamp() {
        let store = std::sync::Arc::new(initialized());
        let handles: Vec<_> = (1..=16)
            .map(|ts| {
                let store = store.clone();
                std::thread::spawn(move || {
                    store.update(Key(42), &format!("v{}", ts), ts).unwrap();
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        let record = store.read(Key(42)).unwrap();
        assert_eq!(record.timestamp, 16);
        assert_eq!(record.value, "v16");
    }

    proptest! {
        #[test]
        fn prop_lww_independent_of_call_order(
            v1 in "[a-z]{1,8}",
            v2 in "[a-z]{1,8}",
            t1 in 1i64..1_000_000,
            delta in 1i64..1_000,
        ) {
            let t2 = t1 + delta;

            let forward = initialized();
            forward.update(Key(9), &v1, t1).unwrap();
            forward.update(Key(9), &v2, t2).unwrap();

            let reverse = initialized();
            reverse.update(Key(9), &v2, t2).unwrap();
            reverse.update(Key(9), &v1, t1).unwrap();

            let a = forward.read(Key(9)).unwrap();
            let b = reverse.read(Key(9)).unwrap();
            prop_assert_eq!(&a.value, &v2);
            prop_assert_eq!(a.timestamp, t2);
            prop_assert_eq!(a, b);
        }
    }
}
