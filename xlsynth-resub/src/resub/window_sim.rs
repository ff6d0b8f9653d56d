// SPDX-License-Identifier: Apache-2.0

//! Complete truth-table simulation of a window.
//!
//! Slot 0 holds constant false, slots `1..=L` the projections of the `L`
//! leaves, and the following slots the window nodes in the order given.

use std::collections::HashMap;

use crate::error::ResubError;
use crate::network::{LogicNetwork, NodeRef};
use crate::truth_table::TruthTable;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowSimulation {
    num_vars: u32,
    /// Stored tables; complemented where `phases` is set.
    tables: Vec<TruthTable>,
    phases: Vec<bool>,
    slots: HashMap<NodeRef, usize>,
}

impl WindowSimulation {
    /// Simulates `nodes` (topologically ordered, fanins first) over the
    /// projections of `leaves`. With `normalize`, any table whose bit 0 is
    /// set is stored complemented and its phase recorded.
    pub fn simulate<N: LogicNetwork>(
        ntk: &N,
        leaves: &[NodeRef],
        nodes: &[NodeRef],
        normalize: bool,
    ) -> Result<Self, ResubError> {
        let num_vars = leaves.len() as u32;
        let mut sim = WindowSimulation {
            num_vars,
            tables: Vec::with_capacity(1 + leaves.len() + nodes.len()),
            phases: Vec::with_capacity(1 + leaves.len() + nodes.len()),
            slots: HashMap::new(),
        };
        sim.slots.insert(NodeRef::CONST0, 0);
        sim.tables.push(TruthTable::const0(num_vars));
        sim.phases.push(false);
        for (i, leaf) in leaves.iter().enumerate() {
            sim.slots.insert(*leaf, sim.tables.len());
            sim.tables.push(TruthTable::nth_var(num_vars, i as u32));
            sim.phases.push(false);
        }

        for node in nodes {
            if sim.slots.contains_key(node) {
                continue;
            }
            let mut fanin_values: Vec<TruthTable> = Vec::with_capacity(3);
            for fanin in ntk.fanins(*node) {
                match sim.slots.get(&fanin.node) {
                    Some(slot) => fanin_values.push(sim.function(*slot)),
                    None => return Err(ResubError::WindowIncomplete { node: *node }),
                }
            }
            let value: TruthTable = ntk.compute(*node, &fanin_values);
            let flip = normalize && value.get_bit(0);
            sim.slots.insert(*node, sim.tables.len());
            sim.tables.push(if flip { !value } else { value });
            sim.phases.push(flip);
        }
        Ok(sim)
    }

    pub fn num_vars(&self) -> u32 {
        self.num_vars
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn slot(&self, node: NodeRef) -> Option<usize> {
        self.slots.get(&node).copied()
    }

    /// The function computed at `slot`, with any normalization undone.
    pub fn function(&self, slot: usize) -> TruthTable {
        if self.phases[slot] {
            !&self.tables[slot]
        } else {
            self.tables[slot].clone()
        }
    }

    pub fn node_function(&self, node: NodeRef) -> Option<TruthTable> {
        self.slot(node).map(|slot| self.function(slot))
    }

    /// The stored (possibly complemented) table at `slot`.
    pub fn normalized(&self, slot: usize) -> &TruthTable {
        &self.tables[slot]
    }

    /// True if the table at `slot` is stored complemented.
    pub fn phase(&self, slot: usize) -> bool {
        self.phases[slot]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::GateNetwork;
    use crate::resub::reconv_cut::ReconvergenceCut;
    use crate::sim::simulate_values;
    use crate::test_utils::random_network;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    #[test]
    fn test_simulates_mixed_gates_with_polarity() {
        let mut ntk = GateNetwork::new("t");
        let a = ntk.add_input("a");
        let b = ntk.add_input("b");
        let c = ntk.add_input("c");
        let nab = ntk.and(a.negate(), b);
        let x = ntk.xor(nab, c);
        let m = ntk.maj(a, b.negate(), x);
        ntk.add_output("o", m);

        let sim = WindowSimulation::simulate(
            &ntk,
            &[a.node, b.node, c.node],
            &[nab.node, x.node, m.node],
            false,
        )
        .unwrap();
        let ta = TruthTable::nth_var(3, 0);
        let tb = TruthTable::nth_var(3, 1);
        let tc = TruthTable::nth_var(3, 2);
        let t_nab = &!&ta & &tb;
        let t_x = &t_nab ^ &tc;
        let t_m = TruthTable::maj(&ta, &!&tb, &t_x);
        assert_eq!(sim.node_function(nab.node), Some(t_nab));
        assert_eq!(sim.node_function(x.node), Some(t_x));
        assert_eq!(sim.node_function(m.node), Some(t_m));
        assert_eq!(sim.len(), 7);
    }

    #[test]
    fn test_normalization_records_phase() {
        let mut ntk = GateNetwork::new("t");
        let a = ntk.add_input("a");
        let b = ntk.add_input("b");
        // !a & !b is 1 on the all-zero assignment.
        let nor = ntk.and(a.negate(), b.negate());
        ntk.add_output("o", nor);
        let sim = WindowSimulation::simulate(&ntk, &[a.node, b.node], &[nor.node], true).unwrap();
        let slot = sim.slot(nor.node).unwrap();
        assert!(sim.phase(slot));
        assert!(!sim.normalized(slot).get_bit(0));
        assert_eq!(sim.function(slot).words(), &[0b0001]);
    }

    #[test]
    fn test_missing_fanin_is_reported() {
        let mut ntk = GateNetwork::new("t");
        let a = ntk.add_input("a");
        let b = ntk.add_input("b");
        let c = ntk.add_input("c");
        let ab = ntk.and(a, b);
        let root = ntk.and(ab, c);
        let result = WindowSimulation::simulate(&ntk, &[a.node, c.node], &[root.node], false);
        assert_eq!(
            result.unwrap_err(),
            ResubError::WindowIncomplete { node: root.node }
        );
    }

    #[test_case(17 ; "seed 17")]
    #[test_case(123 ; "seed 123")]
    fn test_window_tables_match_pointwise_simulation(seed: u64) {
        // Windows whose leaves are all primary inputs can be checked against
        // plain simulation of the whole network.
        let ntk = random_network(seed, 5, 40, 3);
        let mut cutter = ReconvergenceCut::new(5, 1000);
        for root in ntk.gates() {
            let cut = cutter.run(&ntk, &[root]).unwrap();
            if !cut.leaves.iter().all(|l| ntk.is_pi(*l)) {
                continue;
            }
            let mut interior = cut.interior.clone();
            interior.sort();
            let sim = WindowSimulation::simulate(&ntk, &cut.leaves, &interior, true).unwrap();
            let again = WindowSimulation::simulate(&ntk, &cut.leaves, &interior, true).unwrap();
            assert_eq!(sim, again);

            let root_tt = sim.node_function(root).unwrap();
            for minterm in 0..(1usize << cut.leaves.len()) {
                let mut pi_values = vec![false; ntk.pis().len()];
                for (j, leaf) in cut.leaves.iter().enumerate() {
                    let position = ntk.pis().iter().position(|p| p == leaf).unwrap();
                    pi_values[position] = (minterm >> j) & 1 == 1;
                }
                let values = simulate_values(&ntk, &pi_values);
                assert_eq!(
                    root_tt.get_bit(minterm),
                    values[root.id],
                    "root {} minterm {}",
                    root,
                    minterm
                );
            }
        }
    }
}
