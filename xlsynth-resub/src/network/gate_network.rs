// SPDX-License-Identifier: Apache-2.0

//! Arena-backed, structurally hashed logic network.
//!
//! Slot 0 is the constant-false node. Primary inputs and gates follow in
//! creation order. Removing a gate marks its slot dead instead of freeing it:
//! the fanins stay in place so that `substitute_node` can revive a dead node
//! that turns out to be needed again.
//!
//! Basic example usage:
//! ```
//! use xlsynth_resub::network::{GateNetwork, LogicNetwork};
//!
//! let mut ntk = GateNetwork::new("f");
//! let a = ntk.add_input("a");
//! let b = ntk.add_input("b");
//! let ab = ntk.and(a, b);
//! let ab2 = ntk.and(b, a);
//! assert_eq!(ab, ab2);
//! ntk.add_output("o", ab);
//! assert_eq!(ntk.num_gates(), 1);
//! ```

use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;

use crate::network::LogicNetwork;
use crate::network::events::{
    EventHandler, LevelContext, NetworkEvent, NetworkEvents, SubscriptionId,
};
use crate::network::gate::{GateKind, NodeRef, Normalized, Signal, normalize};
use crate::network::topo::topo_sort;

#[derive(Debug, Clone, PartialEq, Eq)]
enum NodeKind {
    Constant,
    Input { name: String },
    Gate(GateKind),
}

#[derive(Debug, Clone)]
struct NodeData {
    kind: NodeKind,
    fanins: Vec<Signal>,
    fanout_size: u32,
    dead: bool,
}

/// Structural hashing key: the canonical `(kind, fanins)` of a gate.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct StrashKey {
    kind: GateKind,
    fanins: Vec<Signal>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Output {
    pub name: String,
    pub signal: Signal,
}

/// Read/level-write view handed to event subscribers.
struct LevelView<'a> {
    nodes: &'a [NodeData],
    fanouts: &'a [Vec<NodeRef>],
    levels: &'a mut Vec<u32>,
}

impl LevelContext for LevelView<'_> {
    fn fanins(&self, node: NodeRef) -> &[Signal] {
        &self.nodes[node.id].fanins
    }

    fn fanouts(&self, node: NodeRef) -> &[NodeRef] {
        &self.fanouts[node.id]
    }

    fn is_dead(&self, node: NodeRef) -> bool {
        self.nodes[node.id].dead
    }

    fn level(&self, node: NodeRef) -> u32 {
        self.levels[node.id]
    }

    fn set_level(&mut self, node: NodeRef, level: u32) {
        self.levels[node.id] = level;
    }
}

#[derive(Debug)]
pub struct GateNetwork {
    pub name: String,
    nodes: Vec<NodeData>,
    fanouts: Vec<Vec<NodeRef>>,
    levels: Vec<u32>,
    strash: HashMap<StrashKey, NodeRef>,
    pis: Vec<NodeRef>,
    outputs: Vec<Output>,
    num_live_gates: usize,
    events: NetworkEvents,
}

impl GateNetwork {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            nodes: vec![NodeData {
                kind: NodeKind::Constant,
                fanins: Vec::new(),
                fanout_size: 0,
                dead: false,
            }],
            fanouts: vec![Vec::new()],
            levels: vec![0],
            strash: HashMap::new(),
            pis: Vec::new(),
            outputs: Vec::new(),
            num_live_gates: 0,
            events: NetworkEvents::new(),
        }
    }

    pub fn add_input(&mut self, name: &str) -> Signal {
        let node = NodeRef {
            id: self.nodes.len(),
        };
        self.nodes.push(NodeData {
            kind: NodeKind::Input {
                name: name.to_string(),
            },
            fanins: Vec::new(),
            fanout_size: 0,
            dead: false,
        });
        self.fanouts.push(Vec::new());
        self.levels.push(0);
        self.pis.push(node);
        node.into()
    }

    pub fn add_output(&mut self, name: &str, signal: Signal) {
        debug_assert!(
            signal.node.id < self.nodes.len(),
            "add_output: node index out of bounds: {} (nodes.len() = {})",
            signal.node.id,
            self.nodes.len()
        );
        self.nodes[signal.node.id].fanout_size += 1;
        self.outputs.push(Output {
            name: name.to_string(),
            signal,
        });
    }

    pub fn outputs(&self) -> &[Output] {
        &self.outputs
    }

    pub fn input_name(&self, node: NodeRef) -> Option<&str> {
        match &self.nodes[node.id].kind {
            NodeKind::Input { name } => Some(name.as_str()),
            _ => None,
        }
    }

    pub fn and(&mut self, a: Signal, b: Signal) -> Signal {
        self.create_gate(GateKind::And2, &[a, b])
    }

    pub fn or(&mut self, a: Signal, b: Signal) -> Signal {
        self.and(a.negate(), b.negate()).negate()
    }

    pub fn xor(&mut self, a: Signal, b: Signal) -> Signal {
        self.create_gate(GateKind::Xor2, &[a, b])
    }

    pub fn maj(&mut self, a: Signal, b: Signal, c: Signal) -> Signal {
        self.create_gate(GateKind::Maj3, &[a, b, c])
    }

    /// Largest level among the primary outputs.
    pub fn depth(&self) -> u32 {
        self.outputs
            .iter()
            .map(|o| self.levels[o.signal.node.id])
            .max()
            .unwrap_or(0)
    }

    /// Recomputes every live node's level exactly, from the inputs up.
    pub fn recompute_levels(&mut self) {
        // In-place rewrites can point a node at a higher index, so index
        // order is not topological.
        for node in self.topo_order() {
            let level = self.level_from_fanins(node);
            self.levels[node.id] = level;
        }
    }

    pub fn topo_order(&self) -> Vec<NodeRef> {
        topo_sort(self)
    }

    fn level_from_fanins(&self, node: NodeRef) -> u32 {
        let data = &self.nodes[node.id];
        if !matches!(data.kind, NodeKind::Gate(_)) {
            return 0;
        }
        let max_fanin = data
            .fanins
            .iter()
            .filter(|f| !self.nodes[f.node.id].dead)
            .map(|f| self.levels[f.node.id])
            .max()
            .unwrap_or(0);
        max_fanin + 1
    }

    fn strash_key(&self, node: NodeRef) -> Option<StrashKey> {
        match self.nodes[node.id].kind {
            NodeKind::Gate(kind) => Some(StrashKey {
                kind,
                fanins: self.nodes[node.id].fanins.clone(),
            }),
            _ => None,
        }
    }

    fn fire(&mut self, event: NetworkEvent) {
        if self.events.is_empty() {
            return;
        }
        let mut view = LevelView {
            nodes: &self.nodes,
            fanouts: &self.fanouts,
            levels: &mut self.levels,
        };
        self.events.fire(&event, &mut view);
    }

    fn add_fanout(&mut self, child: NodeRef, parent: NodeRef) {
        let list = &mut self.fanouts[child.id];
        if !list.contains(&parent) {
            list.push(parent);
        }
    }

    fn remove_fanout(&mut self, child: NodeRef, parent: NodeRef) {
        self.fanouts[child.id].retain(|p| *p != parent);
    }

    /// Returns a live node structurally identical to the dead `node`, if any.
    fn live_equivalent(&self, node: NodeRef) -> Option<NodeRef> {
        let key = self.strash_key(node)?;
        self.strash
            .get(&key)
            .copied()
            .filter(|n| *n != node && !self.nodes[n.id].dead)
    }

    /// Brings `node` and any dead nodes in its fanin cone back to life,
    /// children before parents.
    fn revive_node(&mut self, node: NodeRef) {
        if !self.nodes[node.id].dead {
            return;
        }
        let mut postorder: Vec<NodeRef> = Vec::new();
        let mut visited: HashSet<NodeRef> = HashSet::new();
        let mut worklist = vec![node];
        while let Some(current) = worklist.pop() {
            if visited.contains(&current) {
                continue;
            }
            let mut all_deps_visited = true;
            for dep in &self.nodes[current.id].fanins {
                if self.nodes[dep.node.id].dead && !visited.contains(&dep.node) {
                    worklist.push(current);
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

        for current in postorder {
            // Dead nodes carry a zero fanout count; references are added
            // below and by the caller.
            self.nodes[current.id].dead = false;
            self.num_live_gates += 1;
            if let Some(key) = self.strash_key(current) {
                match self.strash.get(&key) {
                    Some(existing) if !self.nodes[existing.id].dead => {
                        log::trace!(
                            "revive_node: {} duplicates live node {}; keeping the live entry",
                            current,
                            existing
                        );
                    }
                    _ => {
                        self.strash.insert(key, current);
                    }
                }
            }
            let fanins = self.nodes[current.id].fanins.clone();
            for fanin in &fanins {
                self.nodes[fanin.node.id].fanout_size += 1;
                self.add_fanout(fanin.node, current);
            }
            self.levels[current.id] = self.level_from_fanins(current);
            self.fire(NetworkEvent::Add(current));
        }
    }

    /// Rewrites the fanin of `node` that points at `old` to `new`.
    ///
    /// Returns a follow-up substitution when the rewritten gate folds to an
    /// existing signal (or must be re-created with complemented output);
    /// `node` is then left untouched and keeps its reference to `old`.
    /// Otherwise rewrites `node` in place and moves the reference.
    fn replace_in_node(
        &mut self,
        node: NodeRef,
        old: NodeRef,
        new: Signal,
        old_to_new: &HashMap<NodeRef, Signal>,
    ) -> Option<(NodeRef, Signal)> {
        let kind = match self.nodes[node.id].kind {
            NodeKind::Gate(kind) => kind,
            _ => return None,
        };
        let old_fanins = self.nodes[node.id].fanins.clone();
        let position = old_fanins.iter().position(|f| f.node == old)?;
        let mut new_fanins = old_fanins.clone();
        new_fanins[position] = new.negate_if(old_fanins[position].negated);

        let (canon_kind, canon_fanins, output_negated) = match normalize(kind, &new_fanins) {
            Normalized::Trivial(signal) => return Some((node, signal)),
            Normalized::Gate {
                kind,
                fanins,
                output_negated,
            } => (kind, fanins, output_negated),
        };
        let key = StrashKey {
            kind: canon_kind,
            fanins: canon_fanins.clone(),
        };
        if let Some(existing) = self.strash.get(&key).copied() {
            if existing != old && existing != node {
                return Some((node, Signal::new(existing, output_negated)));
            }
        }
        if output_negated {
            // An in-place rewrite would flip the polarity seen by every
            // consumer; build the canonical gate and redirect instead.
            let fanins: Vec<Signal> = canon_fanins
                .iter()
                .map(|f| resolve_replacement(old_to_new, *f))
                .collect();
            let fresh = self.create_gate(canon_kind, &fanins);
            return Some((node, fresh.negate()));
        }

        if let Some(old_key) = self.strash_key(node) {
            if self.strash.get(&old_key) == Some(&node) {
                self.strash.remove(&old_key);
            }
        }
        self.nodes[node.id].fanins = canon_fanins;
        self.strash.insert(key, node);
        self.decr_fanout_size(old);
        self.nodes[new.node.id].fanout_size += 1;
        self.remove_fanout(old, node);
        self.add_fanout(new.node, node);
        self.fire(NetworkEvent::Modified { node, old_fanins });
        None
    }

    /// Moves primary output references from `old` to `new`.
    fn replace_in_outputs(&mut self, old: NodeRef, new: Signal) {
        debug_assert_ne!(old, new.node);
        let mut moved = 0;
        for output in self.outputs.iter_mut() {
            if output.signal.node == old {
                output.signal = new.negate_if(output.signal.negated);
                moved += 1;
            }
        }
        self.nodes[old.id].fanout_size -= moved;
        self.nodes[new.node.id].fanout_size += moved;
    }

    /// Checks the bookkeeping against the structure: every live node's
    /// fanout count equals its live gate consumers plus output references,
    /// fanout lists match, no live gate reads a dead node, and the live gate
    /// count is exact.
    pub fn check_integrity(&self) -> Result<(), String> {
        let mut refs: Vec<u32> = vec![0; self.nodes.len()];
        let mut live_gates = 0;
        for (id, data) in self.nodes.iter().enumerate() {
            if data.dead || !matches!(data.kind, NodeKind::Gate(_)) {
                continue;
            }
            live_gates += 1;
            let node = NodeRef { id };
            for fanin in &data.fanins {
                if self.nodes[fanin.node.id].dead {
                    return Err(format!("live gate {} has dead fanin {}", node, fanin.node));
                }
                if !self.fanouts[fanin.node.id].contains(&node) {
                    return Err(format!(
                        "{} is missing from the fanout list of {}",
                        node, fanin.node
                    ));
                }
                refs[fanin.node.id] += 1;
            }
        }
        for output in &self.outputs {
            if self.nodes[output.signal.node.id].dead {
                return Err(format!(
                    "output {} reads dead node {}",
                    output.name, output.signal.node
                ));
            }
            refs[output.signal.node.id] += 1;
        }
        for (id, data) in self.nodes.iter().enumerate() {
            let node = NodeRef { id };
            if data.dead {
                if data.fanout_size != 0 {
                    return Err(format!(
                        "dead node {} has fanout count {}",
                        node, data.fanout_size
                    ));
                }
                continue;
            }
            if data.fanout_size != refs[id] {
                return Err(format!(
                    "fanout count of {} is {}, structure has {}",
                    node, data.fanout_size, refs[id]
                ));
            }
            for parent in &self.fanouts[id] {
                let parent_data = &self.nodes[parent.id];
                if parent_data.dead || !parent_data.fanins.iter().any(|f| f.node == node) {
                    return Err(format!("stale fanout {} listed under {}", parent, node));
                }
            }
        }
        if live_gates != self.num_live_gates {
            return Err(format!(
                "live gate count is {}, structure has {}",
                self.num_live_gates, live_gates
            ));
        }
        Ok(())
    }
}

/// Follows the replacements recorded so far by one `substitute_node` call.
fn resolve_replacement(old_to_new: &HashMap<NodeRef, Signal>, signal: Signal) -> Signal {
    let mut resolved = signal;
    let mut hops = 0;
    while let Some(next) = old_to_new.get(&resolved.node) {
        resolved = next.negate_if(resolved.negated);
        hops += 1;
        assert!(
            hops <= old_to_new.len(),
            "substitute_node: cyclic replacement chain at {}",
            resolved.node
        );
    }
    resolved
}

impl LogicNetwork for GateNetwork {
    fn size(&self) -> usize {
        self.nodes.len()
    }

    fn num_gates(&self) -> usize {
        self.num_live_gates
    }

    fn pis(&self) -> &[NodeRef] {
        &self.pis
    }

    fn po_signals(&self) -> Vec<Signal> {
        self.outputs.iter().map(|o| o.signal).collect()
    }

    fn is_pi(&self, node: NodeRef) -> bool {
        matches!(self.nodes[node.id].kind, NodeKind::Input { .. })
    }

    fn is_dead(&self, node: NodeRef) -> bool {
        self.nodes[node.id].dead
    }

    fn gate_kind(&self, node: NodeRef) -> Option<GateKind> {
        match self.nodes[node.id].kind {
            NodeKind::Gate(kind) => Some(kind),
            _ => None,
        }
    }

    fn fanins(&self, node: NodeRef) -> &[Signal] {
        &self.nodes[node.id].fanins
    }

    fn fanouts(&self, node: NodeRef) -> &[NodeRef] {
        &self.fanouts[node.id]
    }

    fn fanout_size(&self, node: NodeRef) -> u32 {
        self.nodes[node.id].fanout_size
    }

    fn incr_fanout_size(&mut self, node: NodeRef) -> u32 {
        let data = &mut self.nodes[node.id];
        data.fanout_size += 1;
        data.fanout_size
    }

    fn decr_fanout_size(&mut self, node: NodeRef) -> u32 {
        let data = &mut self.nodes[node.id];
        debug_assert!(
            data.fanout_size > 0,
            "decr_fanout_size: fanout count of {} would underflow",
            node
        );
        data.fanout_size -= 1;
        data.fanout_size
    }

    fn level(&self, node: NodeRef) -> u32 {
        self.levels[node.id]
    }

    fn set_level(&mut self, node: NodeRef, level: u32) {
        self.levels[node.id] = level;
    }

    fn create_gate(&mut self, kind: GateKind, fanins: &[Signal]) -> Signal {
        for f in fanins {
            debug_assert!(
                !self.nodes[f.node.id].dead,
                "create_gate: fanin {} is dead",
                f.node
            );
        }
        let (kind, fanins, output_negated) = match normalize(kind, fanins) {
            Normalized::Trivial(signal) => return signal,
            Normalized::Gate {
                kind,
                fanins,
                output_negated,
            } => (kind, fanins, output_negated),
        };
        let key = StrashKey {
            kind,
            fanins: fanins.clone(),
        };
        if let Some(existing) = self.strash.get(&key) {
            debug_assert!(
                !self.nodes[existing.id].dead,
                "structural hash table refers to dead node {}",
                existing
            );
            return Signal::new(*existing, output_negated);
        }

        let node = NodeRef {
            id: self.nodes.len(),
        };
        for f in &fanins {
            self.nodes[f.node.id].fanout_size += 1;
        }
        self.nodes.push(NodeData {
            kind: NodeKind::Gate(kind),
            fanins: fanins.clone(),
            fanout_size: 0,
            dead: false,
        });
        self.fanouts.push(Vec::new());
        self.levels.push(0);
        for f in &fanins {
            self.add_fanout(f.node, node);
        }
        self.levels[node.id] = self.level_from_fanins(node);
        self.strash.insert(key, node);
        self.num_live_gates += 1;
        self.fire(NetworkEvent::Add(node));
        Signal::new(node, output_negated)
    }

    /// Replaces every use of `old` by `new`, then removes `old` and whatever
    /// dies with it. Consumers that fold to another signal after the rewrite
    /// are queued and substituted in turn; until then they keep their
    /// reference, so a node is only taken out once nothing reads it.
    fn substitute_node(&mut self, old: NodeRef, new: Signal) {
        let mut old_to_new: HashMap<NodeRef, Signal> = HashMap::new();
        let mut queued: HashSet<NodeRef> = HashSet::new();
        let mut pending: VecDeque<(NodeRef, Signal)> = VecDeque::new();
        queued.insert(old);
        pending.push_back((old, new));

        while let Some((old, target)) = pending.pop_front() {
            let mut new = resolve_replacement(&old_to_new, target);
            if self.nodes[new.node.id].dead {
                match self.live_equivalent(new.node) {
                    Some(live) => new = Signal::new(live, new.negated),
                    None => self.revive_node(new.node),
                }
            }
            if old == new.node {
                continue;
            }
            if self.nodes[old.id].dead {
                // Died with an earlier replacement; later targets naming it
                // still need to be redirected.
                old_to_new.insert(old, new);
                continue;
            }

            let consumers: Vec<NodeRef> = self.fanouts[old.id].clone();
            for consumer in consumers {
                if self.nodes[consumer.id].dead
                    || queued.contains(&consumer)
                    || old_to_new.contains_key(&consumer)
                {
                    continue;
                }
                if let Some((node, replacement)) =
                    self.replace_in_node(consumer, old, new, &old_to_new)
                {
                    queued.insert(node);
                    pending.push_back((node, replacement));
                }
            }

            self.replace_in_outputs(old, new);

            old_to_new.insert(old, new);
            if self.nodes[old.id].fanout_size == 0 {
                self.take_out_node(old);
            }
        }
    }

    /// Marks `node` dead and recursively takes out fanins whose fanout count
    /// drops to zero. Inputs, the constant, and dead nodes are left alone.
    fn take_out_node(&mut self, node: NodeRef) {
        let mut worklist = vec![node];
        while let Some(current) = worklist.pop() {
            if current == NodeRef::CONST0 || self.is_pi(current) || self.nodes[current.id].dead {
                continue;
            }
            if let Some(key) = self.strash_key(current) {
                if self.strash.get(&key) == Some(&current) {
                    self.strash.remove(&key);
                }
            }
            {
                let data = &mut self.nodes[current.id];
                data.dead = true;
                data.fanout_size = 0;
            }
            self.num_live_gates -= 1;
            self.fire(NetworkEvent::Delete(current));

            let fanins = self.nodes[current.id].fanins.clone();
            for fanin in fanins {
                self.remove_fanout(fanin.node, current);
                if self.nodes[fanin.node.id].fanout_size == 0 {
                    continue;
                }
                if self.decr_fanout_size(fanin.node) == 0 {
                    worklist.push(fanin.node);
                }
            }
        }
    }

    fn subscribe(&mut self, handler: EventHandler) -> SubscriptionId {
        self.events.subscribe(handler)
    }

    fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.events.unsubscribe(id)
    }
}

impl fmt::Display for GateNetwork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inputs: Vec<String> = self
            .pis
            .iter()
            .map(|pi| format!("{}: {}", self.input_name(*pi).unwrap_or("?"), pi))
            .collect();
        writeln!(f, "network {}({}) {{", self.name, inputs.join(", "))?;
        for node in self.topo_order() {
            if let NodeKind::Gate(kind) = self.nodes[node.id].kind {
                let args: Vec<String> = self.nodes[node.id]
                    .fanins
                    .iter()
                    .map(|s| s.to_string())
                    .collect();
                writeln!(f, "  {} = {}({})", node, kind, args.join(", "))?;
            }
        }
        for output in &self.outputs {
            writeln!(f, "  {} = {}", output.name, output.signal)?;
        }
        write!(f, "}}")
    }
}
