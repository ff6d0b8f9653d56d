// SPDX-License-Identifier: Apache-2.0

//! Maximum fanout-free cone of a root, bounded by a set of leaves.
//!
//! The cone is found by reference counting: dereferencing the root releases
//! every node that only the root keeps alive. The counts are restored before
//! returning, so the network is unchanged afterwards.

use crate::network::{LogicNetwork, NodeRef, Signal};
use crate::resub::marks::TraversalMarks;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mffc {
    /// Cone members in topological order, root last.
    pub nodes: Vec<NodeRef>,
    /// Number of gates removed together with the root.
    pub gain: u32,
}

/// Recursively releases the fanins of `node`; returns the number of nodes
/// whose count dropped to zero, `node` included.
pub fn node_deref_rec<N: LogicNetwork>(ntk: &mut N, node: NodeRef) -> u32 {
    if ntk.is_constant(node) || ntk.is_pi(node) {
        return 0;
    }
    let mut count = 0;
    let mut worklist = vec![node];
    while let Some(current) = worklist.pop() {
        count += 1;
        let fanins: Vec<Signal> = ntk.fanins(current).to_vec();
        for fanin in fanins {
            if ntk.decr_fanout_size(fanin.node) == 0
                && !ntk.is_constant(fanin.node)
                && !ntk.is_pi(fanin.node)
            {
                worklist.push(fanin.node);
            }
        }
    }
    count
}

/// Inverse of [`node_deref_rec`].
pub fn node_ref_rec<N: LogicNetwork>(ntk: &mut N, node: NodeRef) -> u32 {
    if ntk.is_constant(node) || ntk.is_pi(node) {
        return 0;
    }
    let mut count = 0;
    let mut worklist = vec![node];
    while let Some(current) = worklist.pop() {
        count += 1;
        let fanins: Vec<Signal> = ntk.fanins(current).to_vec();
        for fanin in fanins {
            if ntk.incr_fanout_size(fanin.node) == 1
                && !ntk.is_constant(fanin.node)
                && !ntk.is_pi(fanin.node)
            {
                worklist.push(fanin.node);
            }
        }
    }
    count
}

#[derive(Debug, Default)]
pub struct MffcCollector {
    marks: TraversalMarks,
}

impl MffcCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Computes the cone of `root` that lies above `leaves`.
    pub fn run<N: LogicNetwork>(&mut self, ntk: &mut N, root: NodeRef, leaves: &[NodeRef]) -> Mffc {
        // Leaves act as extra outputs so that nothing below them is released.
        for leaf in leaves {
            ntk.incr_fanout_size(*leaf);
        }

        let count1 = node_deref_rec(ntk, root);
        let nodes = self.collect(ntk, root);
        let count2 = node_ref_rec(ntk, root);
        debug_assert_eq!(
            count1, count2,
            "MFFC of {}: dereferenced {} nodes but re-referenced {}",
            root, count1, count2
        );

        for leaf in leaves {
            ntk.decr_fanout_size(*leaf);
        }

        debug_assert!(
            count1 == 0 || nodes.len() == count1 as usize,
            "MFFC of {}: collected {} nodes, released {}",
            root,
            nodes.len(),
            count1
        );
        Mffc {
            nodes,
            gain: count1,
        }
    }

    /// Postorder walk over the released nodes; must run while the root is
    /// dereferenced.
    fn collect<N: LogicNetwork>(&mut self, ntk: &N, root: NodeRef) -> Vec<NodeRef> {
        self.marks.new_traversal();
        let mut cone = Vec::new();
        let mut stack: Vec<(NodeRef, bool)> = vec![(root, false)];
        while let Some((node, expanded)) = stack.pop() {
            if expanded {
                cone.push(node);
                continue;
            }
            if self.marks.is_marked(node) {
                continue;
            }
            if node != root
                && (ntk.is_constant(node) || ntk.is_pi(node) || ntk.fanout_size(node) > 0)
            {
                continue;
            }
            self.marks.mark(node);
            stack.push((node, true));
            for fanin in ntk.fanins(node).iter().rev() {
                if !self.marks.is_marked(fanin.node) {
                    stack.push((fanin.node, false));
                }
            }
        }
        cone
    }
}
