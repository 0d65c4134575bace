//! Ordered cache of idle resources.

use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;

/// Ordered sequence of idle resource ids with a stable eviction cursor.
///
/// Entries are keyed by a monotone sequence number, so the structure
/// supports append (`push_back`), prepend (`push_front`), popping either
/// end, and removal by id anywhere in the middle, while the eviction
/// cursor stays valid across all of it. The cursor is a sequence number,
/// not a position: removing the entry it points at simply makes the next
/// advance land on the following entry, and advancing past the tail wraps
/// to the head.
pub(crate) struct IdleQueue {
    entries: BTreeMap<i64, u64>,
    index: HashMap<u64, i64>,
    next_front: i64,
    next_back: i64,
    cursor: Option<i64>,
}

impl IdleQueue {
    pub(crate) fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            index: HashMap::new(),
            next_front: -1,
            next_back: 0,
            cursor: None,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Append to the tail.
    pub(crate) fn push_back(&mut self, id: u64) {
        debug_assert!(!self.index.contains_key(&id), "id already queued");
        let seq = self.next_back;
        self.next_back += 1;
        self.entries.insert(seq, id);
        self.index.insert(id, seq);
    }

    /// Prepend to the head.
    pub(crate) fn push_front(&mut self, id: u64) {
        debug_assert!(!self.index.contains_key(&id), "id already queued");
        let seq = self.next_front;
        self.next_front -= 1;
        self.entries.insert(seq, id);
        self.index.insert(id, seq);
    }

    /// Pop the head (oldest entry for FIFO insertion).
    pub(crate) fn pop_front(&mut self) -> Option<u64> {
        let (&seq, &id) = self.entries.iter().next()?;
        self.entries.remove(&seq);
        self.index.remove(&id);
        Some(id)
    }

    /// Pop the tail.
    pub(crate) fn pop_back(&mut self) -> Option<u64> {
        let (&seq, &id) = self.entries.iter().next_back()?;
        self.entries.remove(&seq);
        self.index.remove(&id);
        Some(id)
    }

    /// Remove an id from anywhere in the sequence.
    pub(crate) fn remove(&mut self, id: u64) -> bool {
        match self.index.remove(&id) {
            Some(seq) => {
                self.entries.remove(&seq);
                true
            }
            None => false,
        }
    }

    /// Advance the eviction cursor one step and return the id it lands on.
    ///
    /// Past the tail the cursor wraps to the head. Returns `None` only when
    /// the queue is empty.
    pub(crate) fn cursor_next(&mut self) -> Option<u64> {
        if self.entries.is_empty() {
            self.cursor = None;
            return None;
        }
        let next = match self.cursor {
            Some(c) => self
                .entries
                .range((Bound::Excluded(c), Bound::Unbounded))
                .next(),
            None => self.entries.iter().next(),
        };
        let (&seq, &id) = match next {
            Some(entry) => entry,
            // Wrap-around: reset to the head and continue.
            None => self.entries.iter().next().expect("checked non-empty"),
        };
        self.cursor = Some(seq);
        Some(id)
    }
}

impl std::fmt::Debug for IdleQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdleQueue")
            .field("len", &self.entries.len())
            .field("cursor", &self.cursor)
            .finish()
    }
}
