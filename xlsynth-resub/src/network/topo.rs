// SPDX-License-Identifier: Apache-2.0

use std::collections::HashSet;

use crate::network::{LogicNetwork, NodeRef};

/// Returns the nodes reachable from `starts` without entering `boundary`, in
/// postorder (fanins before users). Boundary nodes are not included.
pub fn postorder_from<N: LogicNetwork>(
    ntk: &N,
    starts: &[NodeRef],
    boundary: &HashSet<NodeRef>,
) -> Vec<NodeRef> {
    let mut worklist: Vec<NodeRef> = Vec::new();
    let mut visited: HashSet<NodeRef> = HashSet::new();
    let mut postorder = Vec::new();
    for start in starts.iter().rev() {
        worklist.push(*start);
    }
    while let Some(current) = worklist.pop() {
        if visited.contains(&current) || boundary.contains(&current) {
            continue;
        }
        let mut all_deps_visited = true;
        for dep in ntk.fanins(current) {
            if !visited.contains(&dep.node) && !boundary.contains(&dep.node) {
                worklist.push(current); // Revisit after dependencies
                worklist.push(dep.node);
                all_deps_visited = false;
                break;
            }
        }
        if all_deps_visited {
            visited.insert(current);
            postorder.push(current);
        }
    }
    postorder
}

/// Topological order of the whole network: the constant, the primary inputs,
/// then every live gate (dangling ones included), fanins first.
pub fn topo_sort<N: LogicNetwork>(ntk: &N) -> Vec<NodeRef> {
    let mut order = vec![NodeRef::CONST0];
    order.extend_from_slice(ntk.pis());
    let boundary: HashSet<NodeRef> = order.iter().copied().collect();
    let mut starts: Vec<NodeRef> = ntk.po_signals().iter().map(|s| s.node).collect();
    starts.extend(ntk.gates());
    order.extend(postorder_from(ntk, &starts, &boundary));
    order
}
