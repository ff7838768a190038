use std::collections::VecDeque;

pub const UNDO_DEPTH: usize = 10;

/// Bounded stack of opaque snapshots; the oldest entry is evicted first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UndoStack {
    depth: usize,
    snapshots: VecDeque<String>,
}

impl Default for UndoStack {
    fn default() -> Self {
        Self::new(UNDO_DEPTH)
    }
}

impl UndoStack {
    pub fn new(depth: usize) -> Self {
        Self {
            depth: depth.max(1),
            snapshots: VecDeque::new(),
        }
    }

    /// Rebuilds a stack from persisted snapshots, keeping the newest `depth`.
    pub fn from_snapshots(depth: usize, snapshots: impl IntoIterator<Item = String>) -> Self {
        let mut stack = Self::new(depth);
        for s in snapshots {
            stack.push(s);
        }
        stack
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn push(&mut self, snapshot: String) {
        self.snapshots.push_back(snapshot);
        while self.snapshots.len() > self.depth {
            self.snapshots.pop_front();
        }
    }

    pub fn pop(&mut self) -> Option<String> {
        self.snapshots.pop_back()
    }

    pub fn clear(&mut self) {
        self.snapshots.clear();
    }

    /// Oldest first.
    pub fn snapshots(&self) -> impl Iterator<Item = &str> + '_ {
        self.snapshots.iter().map(String::as_str)
    }
}
