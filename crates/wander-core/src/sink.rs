//! Snapshot consumers.
//!
//! The driver hands every post-tick [`Snapshot`] to each registered
//! [`SnapshotSink`]. A sink can ask the run to stop by returning
//! [`SinkControl::Stop`]; the current tick still completes.

use crate::snapshot::Snapshot;
use std::sync::Arc;

/// Whether the run should continue after a sink has seen a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SinkControl {
    #[default]
    Continue,
    Stop,
}

/// Receives snapshots from the driver.
pub trait SnapshotSink {
    fn accept(&mut self, snapshot: &Arc<Snapshot>) -> SinkControl;
}

impl<F> SnapshotSink for F
where
    F: FnMut(&Arc<Snapshot>) -> SinkControl,
{
    fn accept(&mut self, snapshot: &Arc<Snapshot>) -> SinkControl {
        self(snapshot)
    }
}

// ---------------------------------------------------------------------------
// SnapshotBuffer -- pre-allocated ring buffer
// ---------------------------------------------------------------------------

/// A fixed-capacity ring buffer of snapshots. When full, the oldest
/// snapshot is dropped.
#[derive(Debug, Clone)]
pub struct SnapshotBuffer {
    slots: Vec<Option<Arc<Snapshot>>>,
    /// Write position (wraps around).
    head: usize,
    len: usize,
    /// Total snapshots ever written (including dropped).
    total_written: u64,
}

impl SnapshotBuffer {
    /// Create a buffer with the given capacity. A capacity of 0 is clamped
    /// to 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            slots: vec![None; capacity],
            head: 0,
            len: 0,
            total_written: 0,
        }
    }

    pub fn push(&mut self, snapshot: Arc<Snapshot>) {
        self.slots[self.head] = Some(snapshot);
        self.head = (self.head + 1) % self.capacity();
        if self.len < self.capacity() {
            self.len += 1;
        }
        self.total_written += 1;
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn total_written(&self) -> u64 {
        self.total_written
    }

    /// Snapshots dropped because the buffer was full.
    pub fn dropped_count(&self) -> u64 {
        self.total_written.saturating_sub(self.capacity() as u64)
    }

    /// The most recently pushed snapshot.
    pub fn latest(&self) -> Option<&Arc<Snapshot>> {
        if self.len == 0 {
            return None;
        }
        let idx = (self.head + self.capacity() - 1) % self.capacity();
        self.slots[idx].as_ref()
    }

    /// Iterate from oldest to newest.
    pub fn iter(&self) -> SnapshotBufferIter<'_> {
        let start = if self.len < self.capacity() {
            0
        } else {
            // head points to the next write position, which is the oldest entry
            self.head
        };
        SnapshotBufferIter {
            buffer: self,
            index: start,
            remaining: self.len,
        }
    }

    pub fn clear(&mut self) {
        for slot in &mut self.slots {
            *slot = None;
        }
        self.head = 0;
        self.len = 0;
    }
}

impl SnapshotSink for SnapshotBuffer {
    fn accept(&mut self, snapshot: &Arc<Snapshot>) -> SinkControl {
        self.push(Arc::clone(snapshot));
        SinkControl::Continue
    }
}

/// Iterator over a [`SnapshotBuffer`], from oldest to newest.
pub struct SnapshotBufferIter<'a> {
    buffer: &'a SnapshotBuffer,
    index: usize,
    remaining: usize,
}

impl<'a> Iterator for SnapshotBufferIter<'a> {
    type Item = &'a Arc<Snapshot>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let snapshot = self.buffer.slots[self.index].as_ref();
        self.index = (self.index + 1) % self.buffer.capacity();
        self.remaining -= 1;
        snapshot
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for SnapshotBufferIter<'_> {}
