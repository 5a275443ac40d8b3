//! Hinted hand-off queue.
//!
//! Writes that could not be delivered to an owner are kept here, keyed by a
//! monotonically increasing id, until that owner next contacts this node.
//! Hints live in memory only and are lost on restart.

use std::collections::BTreeMap;

use corelib::{Key, NodeId};
use parking_lot::Mutex;

/// A write accepted on behalf of an unreachable owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hint {
    pub target: NodeId,
    pub key: Key,
    pub value: String,
    pub timestamp: i64,
}

#[derive(Debug, Default)]
struct Inner {
    next_id: u64,
    hints: BTreeMap<u64, Hint>,
}

/// Mutex-guarded hint table.
#[derive(Debug, Default)]
pub struct HintTable {
    inner: Mutex<Inner>,
}

impl HintTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a hint and return its id.
    pub fn record(&self, hint: Hint) -> u64 {
        let mut inner = self.inner.lock();
        inner.next_id += 1;
        let id = inner.next_id;
        inner.hints.insert(id, hint);
        id
    }

    /// Remove and return every hint for `target`, oldest first.
    ///
    /// Removal happens under the lock, so concurrent callers never receive
    /// the same hint twice.
    pub fn take_for(&self, target: &NodeId) -> Vec<(u64, Hint)> {
        let mut inner = self.inner.lock();
        let ids: Vec<u64> = inner
            .hints
            .iter()
            .filter(|(_, hint)| &hint.target == target)
            .map(|(id, _)| *id)
            .collect();
        ids.into_iter()
            .filter_map(|id| inner.hints.remove(&id).map(|hint| (id, hint)))
            .collect()
    }

    /// Put back a hint whose replay failed, keeping its original id.
    pub fn restore(&self, id: u64, hint: Hint) {
        self.inner.lock().hints.insert(id, hint);
    }

    pub fn pending_for(&self, target: &NodeId) -> usize {
        self.inner
            .lock()
            .hints
            .values()
            .filter(|hint| &hint.target == target)
            .count()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().hints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
