// SPDX-License-Identifier: Apache-2.0

//! Per-node visitation marks keyed by a traversal id.
//!
//! Starting a new traversal bumps the id; a node counts as marked only if its
//! stored id equals the current one, so nothing needs clearing between roots.

use crate::network::NodeRef;

#[derive(Debug, Clone, Default)]
pub struct TraversalMarks {
    current: u32,
    stamps: Vec<u32>,
}

impl TraversalMarks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a new traversal; all nodes become unmarked.
    pub fn new_traversal(&mut self) {
        self.current = self.current.wrapping_add(1);
        if self.current == 0 {
            // Wrapped: stale stamps could alias the new id.
            self.stamps.iter_mut().for_each(|s| *s = 0);
            self.current = 1;
        }
    }

    fn ensure(&mut self, node: NodeRef) {
        if node.id >= self.stamps.len() {
            self.stamps.resize(node.id + 1, 0);
        }
    }

    /// Marks `node`; returns true if it was not marked before.
    pub fn mark(&mut self, node: NodeRef) -> bool {
        self.ensure(node);
        let fresh = self.stamps[node.id] != self.current;
        self.stamps[node.id] = self.current;
        fresh
    }

    pub fn unmark(&mut self, node: NodeRef) {
        if let Some(stamp) = self.stamps.get_mut(node.id) {
            *stamp = 0;
        }
    }

    pub fn is_marked(&self, node: NodeRef) -> bool {
        self.current != 0 && self.stamps.get(node.id) == Some(&self.current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_traversal_clears_marks() {
        let mut marks = TraversalMarks::new();
        marks.new_traversal();
        let n = NodeRef { id: 7 };
        assert!(!marks.is_marked(n));
        assert!(marks.mark(n));
        assert!(!marks.mark(n));
        assert!(marks.is_marked(n));
        marks.new_traversal();
        assert!(!marks.is_marked(n));
        marks.mark(n);
        marks.unmark(n);
        assert!(!marks.is_marked(n));
    }

    #[test]
    fn test_wraparound_resets_stamps() {
        let mut marks = TraversalMarks {
            current: u32::MAX,
            stamps: vec![1, u32::MAX],
        };
        marks.new_traversal();
        assert!(!marks.is_marked(NodeRef { id: 0 }));
        assert!(!marks.is_marked(NodeRef { id: 1 }));
    }
}
