// SPDX-License-Identifier: Apache-2.0

//! Satisfiability don't-cares of a cut.
//!
//! Some assignments to the cut leaves can never occur because the leaves are
//! themselves functions of common signals further down. A larger window is
//! grown below the leaves and simulated; leaf assignments that no window
//! input assignment produces are don't-cares.

use std::collections::HashSet;

use crate::network::topo::postorder_from;
use crate::network::{LogicNetwork, NodeRef};
use crate::resub::reconv_cut::ReconvergenceCut;
use crate::resub::window_sim::WindowSimulation;
use crate::truth_table::TruthTable;

/// Returns the mask (over `leaves.len()` variables) of leaf assignments that
/// cannot occur. An empty mask is returned when no window of `window_size`
/// leaves can be grown below `leaves`.
pub fn satisfiability_dont_cares<N: LogicNetwork>(
    ntk: &N,
    leaves: &[NodeRef],
    window_size: u32,
    max_fanout_to_expand: u32,
) -> TruthTable {
    let num_vars = leaves.len() as u32;
    let mut cutter = ReconvergenceCut::new(window_size as usize, max_fanout_to_expand);
    let cut = match cutter.run(ntk, leaves) {
        Ok(cut) => cut,
        Err(e) => {
            log::trace!("satisfiability_dont_cares: {}; no don't-cares", e);
            return TruthTable::const0(num_vars);
        }
    };

    let boundary: HashSet<NodeRef> = cut.leaves.iter().copied().collect();
    let nodes = postorder_from(ntk, leaves, &boundary);
    let sim = match WindowSimulation::simulate(ntk, &cut.leaves, &nodes, false) {
        Ok(sim) => sim,
        Err(e) => {
            log::warn!("satisfiability_dont_cares: {}", e);
            return TruthTable::const0(num_vars);
        }
    };
    let mut leaf_functions = Vec::with_capacity(leaves.len());
    for leaf in leaves {
        match sim.node_function(*leaf) {
            Some(tt) => leaf_functions.push(tt),
            None => return TruthTable::const0(num_vars),
        }
    }

    let mut care = TruthTable::const0(num_vars);
    for minterm in 0..(1usize << cut.leaves.len()) {
        let mut leaf_minterm = 0usize;
        for (j, tt) in leaf_functions.iter().enumerate() {
            if tt.get_bit(minterm) {
                leaf_minterm |= 1 << j;
            }
        }
        care.set_bit(leaf_minterm, true);
    }
    !care
}
