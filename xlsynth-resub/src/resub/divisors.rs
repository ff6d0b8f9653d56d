// SPDX-License-Identifier: Apache-2.0

//! Divisor collection: the signals a root may be re-expressed with.
//!
//! The pool starts with the cut leaves, adds the root's transitive fanin cone
//! above the leaves (minus the MFFC), and then grows through "wing" fanouts
//! whose fanins are all already in the window.

use crate::error::ResubError;
use crate::network::{LogicNetwork, NodeRef};
use crate::resub::marks::TraversalMarks;
use crate::resub::params::ResubParams;

#[derive(Debug, Default)]
pub struct DivisorCollector {
    visited: TraversalMarks,
    in_mffc: TraversalMarks,
}

impl DivisorCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the divisor pool: `leaves` first, then the remaining cone
    /// nodes in topological order, then wing nodes in admission order.
    pub fn run<N: LogicNetwork>(
        &mut self,
        ntk: &N,
        root: NodeRef,
        leaves: &[NodeRef],
        mffc: &[NodeRef],
        params: &ResubParams,
    ) -> Result<Vec<NodeRef>, ResubError> {
        self.visited.new_traversal();
        self.in_mffc.new_traversal();

        let mut divs: Vec<NodeRef> = Vec::with_capacity(params.max_divisors as usize);
        for leaf in leaves {
            if self.visited.mark(*leaf) {
                divs.push(*leaf);
            }
        }
        for node in mffc {
            self.in_mffc.mark(*node);
        }
        self.collect_cone(ntk, root, &mut divs);

        let budget = params.max_divisors.saturating_sub(params.max_pis) as usize;
        let window_nodes = (divs.len() + mffc.len()).saturating_sub(leaves.len());
        if window_nodes > budget {
            return Err(ResubError::DivisorBudgetExceeded {
                window_nodes,
                budget,
            });
        }
        let limit = (budget + leaves.len()).saturating_sub(mffc.len());
        let required_level = if params.preserve_depth {
            ntk.level(root)
        } else {
            u32::MAX
        };

        let mut i = 0;
        'wings: while i < divs.len() {
            let d = divs[i];
            i += 1;
            for &p in ntk.fanouts(d) {
                if self.visited.is_marked(p)
                    || ntk.is_dead(p)
                    || ntk.level(p) > required_level
                    || ntk.fanout_size(p) > params.skip_fanout_limit_for_divisors
                {
                    continue;
                }
                let fanins = ntk.fanins(p);
                let all_fanins_visited = fanins.iter().all(|f| self.visited.is_marked(f.node));
                let has_root_as_child = fanins.iter().any(|f| f.node == root);
                if !all_fanins_visited || has_root_as_child {
                    continue;
                }
                self.visited.mark(p);
                divs.push(p);
                if divs.len() >= limit {
                    break 'wings;
                }
            }
        }

        log::trace!(
            "divisors for {}: leaves={} mffc={} divisors={}",
            root,
            leaves.len(),
            mffc.len(),
            divs.len()
        );
        Ok(divs)
    }

    /// Postorder walk from `root` down to the already-visited leaves, pushing
    /// every non-constant node outside the MFFC.
    fn collect_cone<N: LogicNetwork>(&mut self, ntk: &N, root: NodeRef, divs: &mut Vec<NodeRef>) {
        let mut stack: Vec<(NodeRef, bool)> = vec![(root, false)];
        while let Some((node, expanded)) = stack.pop() {
            if expanded {
                if !self.in_mffc.is_marked(node) && !ntk.is_constant(node) {
                    divs.push(node);
                }
                continue;
            }
            if !self.visited.mark(node) {
                continue;
            }
            stack.push((node, true));
            for fanin in ntk.fanins(node).iter().rev() {
                if !self.visited.is_marked(fanin.node) {
                    stack.push((fanin.node, false));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::GateNetwork;
    use crate::resub::mffc::MffcCollector;
    use crate::resub::reconv_cut::ReconvergenceCut;
    use crate::test_utils::random_network;
    use pretty_assertions::assert_eq;
    use std::collections::HashSet;
    use test_case::test_case;

    #[test]
    fn test_wing_node_is_admitted() {
        // root = (a & b) & c; w = a & c is a wing over the leaves.
        let mut ntk = GateNetwork::new("t");
        let a = ntk.add_input("a");
        let b = ntk.add_input("b");
        let c = ntk.add_input("c");
        let ab = ntk.and(a, b);
        let root = ntk.and(ab, c);
        let w = ntk.and(a, c);
        ntk.add_output("o", root);
        ntk.add_output("w", w);

        let leaves = [a.node, b.node, c.node];
        let mffc = MffcCollector::new().run(&mut ntk, root.node, &leaves);
        assert_eq!(mffc.nodes, vec![ab.node, root.node]);
        let divs = DivisorCollector::new()
            .run(
                &ntk,
                root.node,
                &leaves,
                &mffc.nodes,
                &ResubParams::default(),
            )
            .unwrap();
        assert_eq!(divs, vec![a.node, b.node, c.node, w.node]);
    }

    #[test]
    fn test_fanout_of_root_is_never_a_divisor() {
        let mut ntk = GateNetwork::new("t");
        let a = ntk.add_input("a");
        let b = ntk.add_input("b");
        let root = ntk.and(a, b);
        let above = ntk.and(root, a.negate());
        ntk.add_output("o", above);
        let leaves = [a.node, b.node];
        let mffc = MffcCollector::new().run(&mut ntk, root.node, &leaves);
        let divs = DivisorCollector::new()
            .run(
                &ntk,
                root.node,
                &leaves,
                &mffc.nodes,
                &ResubParams::default(),
            )
            .unwrap();
        assert_eq!(divs, vec![a.node, b.node]);
    }

    #[test]
    fn test_preserve_depth_rejects_deeper_wings() {
        // root = a & b sits at level 1; deep = (a ^ b) & c sits at level 2.
        let mut ntk = GateNetwork::new("t");
        let a = ntk.add_input("a");
        let b = ntk.add_input("b");
        let c = ntk.add_input("c");
        let root = ntk.and(a, b);
        let x = ntk.xor(a, b);
        let deep = ntk.and(x, c);
        ntk.add_output("o", root);
        ntk.add_output("deep", deep);

        let leaves = [a.node, b.node, c.node];
        let mffc = MffcCollector::new().run(&mut ntk, root.node, &leaves);
        let params = ResubParams {
            preserve_depth: true,
            ..ResubParams::default()
        };
        let divs = DivisorCollector::new()
            .run(&ntk, root.node, &leaves, &mffc.nodes, &params)
            .unwrap();
        assert!(divs.contains(&x.node));
        assert!(!divs.contains(&deep.node), "divs: {:?}", divs);

        let divs = DivisorCollector::new()
            .run(
                &ntk,
                root.node,
                &leaves,
                &mffc.nodes,
                &ResubParams::default(),
            )
            .unwrap();
        assert!(divs.contains(&deep.node));
    }

    #[test]
    fn test_budget_exceeded_is_reported() {
        let mut ntk = GateNetwork::new("t");
        let a = ntk.add_input("a");
        let b = ntk.add_input("b");
        let c = ntk.add_input("c");
        let ab = ntk.and(a, b);
        let root = ntk.and(ab, c);
        ntk.add_output("o", root);
        ntk.add_output("ab", ab);
        let params = ResubParams {
            max_pis: 3,
            max_divisors: 3,
            ..ResubParams::default()
        };
        let leaves = [a.node, b.node, c.node];
        let mffc = MffcCollector::new().run(&mut ntk, root.node, &leaves);
        let err = DivisorCollector::new()
            .run(&ntk, root.node, &leaves, &mffc.nodes, &params)
            .unwrap_err();
        assert_eq!(
            err,
            ResubError::DivisorBudgetExceeded {
                window_nodes: 2,
                budget: 0
            }
        );
    }

    #[test_case(5 ; "seed 5")]
    #[test_case(99 ; "seed 99")]
    #[test_case(31337 ; "seed 31337")]
    fn test_divisors_exclude_mffc_and_root_fanouts(seed: u64) {
        let _ = env_logger::builder().is_test(true).try_init();
        let mut ntk = random_network(seed, 7, 70, 6);
        let params = ResubParams::default();
        let mut cutter =
            ReconvergenceCut::new(params.max_pis as usize, params.max_fanout_to_expand);
        let mut mffcs = MffcCollector::new();
        let mut collector = DivisorCollector::new();
        for root in ntk.gates() {
            let cut = cutter.run(&ntk, &[root]).unwrap();
            let leaves = &cut.leaves;
            let mffc = mffcs.run(&mut ntk, root, leaves);
            let Ok(divs) = collector.run(&ntk, root, leaves, &mffc.nodes, &params) else {
                continue;
            };
            let mffc_set: HashSet<NodeRef> = mffc.nodes.iter().copied().collect();
            let unique: HashSet<NodeRef> = divs.iter().copied().collect();
            assert_eq!(unique.len(), divs.len(), "duplicate divisors");
            assert!(divs.len() <= params.max_divisors as usize);
            for d in &divs {
                assert_ne!(*d, root);
                if !leaves.contains(d) {
                    assert!(!mffc_set.contains(d), "{} is in the MFFC of {}", d, root);
                }
                assert!(ntk.fanins(*d).iter().all(|f| f.node != root));
            }
        }
    }
}
