// SPDX-License-Identifier: Apache-2.0

//! Reconvergence-driven cuts.
//!
//! Starting from one or more pivot nodes, the leaf set is grown toward the
//! primary inputs by repeatedly expanding the leaf whose expansion adds the
//! fewest new leaves. Leaves whose fanins are already inside the cut cost
//! nothing to expand, so reconvergent paths are absorbed first.

use crate::error::ResubError;
use crate::network::{LogicNetwork, NodeRef};
use crate::resub::marks::TraversalMarks;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cut {
    pub leaves: Vec<NodeRef>,
    /// Expanded nodes (pivots included), in expansion order.
    pub interior: Vec<NodeRef>,
}

pub struct ReconvergenceCut {
    max_leaves: usize,
    max_fanout_to_expand: u32,
    marks: TraversalMarks,
}

impl ReconvergenceCut {
    pub fn new(max_leaves: usize, max_fanout_to_expand: u32) -> Self {
        Self {
            max_leaves,
            max_fanout_to_expand,
            marks: TraversalMarks::new(),
        }
    }

    pub fn max_leaves(&self) -> usize {
        self.max_leaves
    }

    /// Number of new leaves expanding `node` would introduce, or `None` if the
    /// node cannot be expanded.
    fn expansion_cost<N: LogicNetwork>(&self, ntk: &N, node: NodeRef) -> Option<usize> {
        if ntk.is_constant(node) || ntk.is_pi(node) {
            return None;
        }
        if ntk.fanout_size(node) > self.max_fanout_to_expand {
            return None;
        }
        Some(
            ntk.fanins(node)
                .iter()
                .filter(|f| !ntk.is_constant(f.node) && !self.marks.is_marked(f.node))
                .count(),
        )
    }

    pub fn run<N: LogicNetwork>(&mut self, ntk: &N, pivots: &[NodeRef]) -> Result<Cut, ResubError> {
        self.marks.new_traversal();
        let mut leaves: Vec<NodeRef> = Vec::with_capacity(self.max_leaves);
        for pivot in pivots {
            if self.marks.mark(*pivot) {
                leaves.push(*pivot);
            }
        }
        if leaves.len() > self.max_leaves {
            return Err(ResubError::CutOverflow {
                pivots: leaves.len(),
                max_leaves: self.max_leaves,
            });
        }

        let mut interior: Vec<NodeRef> = Vec::new();
        loop {
            // Lowest cost wins; ties go to the higher level, then the earlier
            // leaf.
            let mut best: Option<(usize, usize, u32)> = None;
            for (position, leaf) in leaves.iter().enumerate() {
                let Some(cost) = self.expansion_cost(ntk, *leaf) else {
                    continue;
                };
                let level = ntk.level(*leaf);
                let better = match best {
                    None => true,
                    Some((_, best_cost, best_level)) => {
                        cost < best_cost || (cost == best_cost && level > best_level)
                    }
                };
                if better {
                    best = Some((position, cost, level));
                }
            }
            let Some((position, cost, _)) = best else {
                break;
            };
            if leaves.len() - 1 + cost > self.max_leaves {
                break;
            }

            let expanded = leaves.remove(position);
            interior.push(expanded);
            for fanin in ntk.fanins(expanded) {
                if ntk.is_constant(fanin.node) {
                    continue;
                }
                if self.marks.mark(fanin.node) {
                    leaves.push(fanin.node);
                }
            }
        }

        debug_assert!(
            leaves.len() <= self.max_leaves,
            "cut has {} leaves, bound is {}",
            leaves.len(),
            self.max_leaves
        );
        log::trace!(
            "reconvergence cut: pivots={} leaves={} interior={}",
            pivots.len(),
            leaves.len(),
            interior.len()
        );
        Ok(Cut { leaves, interior })
    }
}
