//! Bounded, insertion-ordered snapshot history.

use std::collections::VecDeque;

use crate::snapshot::MetricsSnapshot;

/// Fixed-capacity FIFO ring of snapshots.
///
/// One buffer per monitoring session. On overflow the oldest entry is
/// evicted; recency of insertion is the only signal. Identical consecutive
/// snapshots are both retained.
#[derive(Debug, Clone)]
pub struct HistoryBuffer {
    entries: VecDeque<MetricsSnapshot>,
    capacity: usize,
}

impl HistoryBuffer {
    /// A capacity of zero is clamped to one so the buffer can always hold
    /// the latest snapshot.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn push(&mut self, snapshot: MetricsSnapshot) {
        if self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(snapshot);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Entries oldest-to-newest, read-only.
    pub fn iter(&self) -> impl Iterator<Item = &MetricsSnapshot> {
        self.entries.iter()
    }

    pub fn latest(&self) -> Option<&MetricsSnapshot> {
        self.entries.back()
    }

    /// Owned copy of the sequence, oldest-to-newest, for export and
    /// persistence consumers.
    pub fn to_vec(&self) -> Vec<MetricsSnapshot> {
        self.entries.iter().cloned().collect()
    }
}
