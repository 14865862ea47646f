use std::{
    collections::VecDeque,
    sync::{Arc, Mutex, MutexGuard},
};

use chrono::{DateTime, Utc};

use crate::db::models::session::MAX_EVIDENCE_IMAGES;

pub const SNAPSHOT_CAPACITY: usize = MAX_EVIDENCE_IMAGES;

/// One JPEG-encoded camera still.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub captured_at: DateTime<Utc>,
    pub jpeg: Vec<u8>,
}

/// Fixed-capacity ring of the most recent snapshots. Pushing into a full
/// buffer evicts the oldest entry. Clones share the same storage.
#[derive(Debug, Clone)]
pub struct SnapshotBuffer {
    inner: Arc<Mutex<VecDeque<Snapshot>>>,
    capacity: usize,
}

impl Default for SnapshotBuffer {
    fn default() -> Self {
        Self::with_capacity(SNAPSHOT_CAPACITY)
    }
}

impl SnapshotBuffer {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))),
            capacity,
        }
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<Snapshot>> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Returns how many snapshots are retained after the push.
    pub fn push(&self, snapshot: Snapshot) -> usize {
        let mut guard = self.lock();
        if self.capacity == 0 {
            return 0;
        }
        if guard.len() == self.capacity {
            guard.pop_front();
        }
        guard.push_back(snapshot);
        guard.len()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Oldest first.
    pub fn to_vec(&self) -> Vec<Snapshot> {
        self.lock().iter().cloned().collect()
    }

    /// Empties the buffer, handing back its contents oldest first.
    pub fn take(&self) -> Vec<Snapshot> {
        self.lock().drain(..).collect()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }
}
