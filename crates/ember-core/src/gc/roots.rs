//! GC root tracking
//!
//! Transient roots for objects that are allocated but not yet reachable from
//! the stack or globals. Roots are pushed and popped in strict LIFO order;
//! the innermost object under construction is always on top.

use crate::value::Value;

/// Transient root stack
#[derive(Debug, Default)]
pub struct RootSet {
    roots: Vec<Value>,
}

impl RootSet {
    /// Create a new root set
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a root, returning the depth to truncate back to when releasing it
    pub fn push(&mut self, value: Value) -> usize {
        let depth = self.roots.len();
        self.roots.push(value);
        depth
    }

    /// Release every root at or above `depth`
    pub fn truncate(&mut self, depth: usize) {
        self.roots.truncate(depth);
    }

    /// Topmost root
    pub fn top(&self) -> Option<Value> {
        self.roots.last().copied()
    }

    /// Current number of roots
    pub fn depth(&self) -> usize {
        self.roots.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Iterate over all roots, bottom first
    pub fn iter(&self) -> impl Iterator<Item = Value> + '_ {
        self.roots.iter().copied()
    }
}
