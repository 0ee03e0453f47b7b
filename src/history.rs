//! Bounded undo/redo buffer for diagram edits.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

pub const DEFAULT_CAPACITY: usize = 50;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot<N, E> {
    pub nodes: Vec<N>,
    pub edges: Vec<E>,
}

/// Linear history with a cursor.
///
/// Pushing while the cursor is behind the tail discards the redo branch;
/// pushing at capacity evicts the oldest entry.
#[derive(Debug, Clone)]
pub struct History<N, E> {
    entries: VecDeque<Snapshot<N, E>>,
    cursor: Option<usize>,
    capacity: usize,
}

impl<N, E> Default for History<N, E> {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl<N, E> History<N, E> {
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            cursor: None,
            capacity,
        }
    }

    pub fn push(&mut self, nodes: Vec<N>, edges: Vec<E>) {
        let keep = self.cursor.map_or(0, |c| c + 1);
        self.entries.truncate(keep);

        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(Snapshot { nodes, edges });
        self.cursor = Some(self.entries.len() - 1);
    }

    pub fn undo(&mut self) -> Option<&Snapshot<N, E>> {
        let cursor = self.cursor.filter(|&c| c > 0)?;
        self.cursor = Some(cursor - 1);
        self.entries.get(cursor - 1)
    }

    pub fn redo(&mut self) -> Option<&Snapshot<N, E>> {
        let next = self.cursor.map_or(0, |c| c + 1);
        if next >= self.entries.len() {
            return None;
        }
        self.cursor = Some(next);
        self.entries.get(next)
    }

    pub fn current(&self) -> Option<&Snapshot<N, E>> {
        self.cursor.and_then(|c| self.entries.get(c))
    }

    pub fn can_undo(&self) -> bool {
        self.cursor.is_some_and(|c| c > 0)
    }

    pub fn can_redo(&self) -> bool {
        self.cursor.map_or(0, |c| c + 1) < self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.cursor = None;
    }
}
