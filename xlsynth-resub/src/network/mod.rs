// SPDX-License-Identifier: Apache-2.0

//! Logic networks: the capability trait the resubstitution core is written
//! against, and an arena-backed implementation for AIG/XAG/MIG-style graphs.

pub mod events;
pub mod gate;
pub mod gate_network;
pub mod topo;

pub use crate::network::events::{
    EventHandler, LevelContext, NetworkEvent, NetworkEvents, ScopedSubscriptions, SubscriptionId,
};
pub use crate::network::gate::{GateKind, GateValue, NodeRef, Normalized, Signal};
pub use crate::network::gate_network::{GateNetwork, Output};

/// Operations a network must offer for resubstitution.
///
/// Fanout counts include references from primary outputs; fanout lists only
/// contain gate consumers. Dead nodes keep their slot (and fanins) so they can
/// be revived.
pub trait LogicNetwork {
    /// Number of node slots, including the constant, inputs, and dead gates.
    fn size(&self) -> usize;
    fn num_gates(&self) -> usize;
    fn pis(&self) -> &[NodeRef];
    fn po_signals(&self) -> Vec<Signal>;

    fn is_constant(&self, node: NodeRef) -> bool {
        node == NodeRef::CONST0
    }
    fn is_pi(&self, node: NodeRef) -> bool;
    /// True for gate slots, live or dead.
    fn is_gate(&self, node: NodeRef) -> bool {
        self.gate_kind(node).is_some()
    }
    fn is_dead(&self, node: NodeRef) -> bool;
    fn gate_kind(&self, node: NodeRef) -> Option<GateKind>;

    fn fanins(&self, node: NodeRef) -> &[Signal];
    fn fanouts(&self, node: NodeRef) -> &[NodeRef];
    fn fanout_size(&self, node: NodeRef) -> u32;
    /// Returns the fanout count after incrementing.
    fn incr_fanout_size(&mut self, node: NodeRef) -> u32;
    /// Returns the fanout count after decrementing.
    fn decr_fanout_size(&mut self, node: NodeRef) -> u32;

    fn level(&self, node: NodeRef) -> u32;
    fn set_level(&mut self, node: NodeRef, level: u32);

    /// Structurally hashed gate creation; may return an existing signal.
    fn create_gate(&mut self, kind: GateKind, fanins: &[Signal]) -> Signal;
    fn substitute_node(&mut self, old: NodeRef, new: Signal);
    fn take_out_node(&mut self, node: NodeRef);

    fn subscribe(&mut self, handler: EventHandler) -> SubscriptionId;
    fn unsubscribe(&mut self, id: SubscriptionId) -> bool;

    /// Evaluates gate `node` given the values of its fanin *nodes* (in fanin
    /// order); fanin complementation is applied here.
    fn compute<V: GateValue>(&self, node: NodeRef, fanin_values: &[V]) -> V {
        let kind = match self.gate_kind(node) {
            Some(kind) => kind,
            None => panic!("compute: {} is not a gate", node),
        };
        let fanins = self.fanins(node);
        debug_assert_eq!(fanins.len(), fanin_values.len());
        let polarized: Vec<V> = fanins
            .iter()
            .zip(fanin_values.iter())
            .map(|(f, v)| v.complement_if(f.negated))
            .collect();
        kind.apply(&polarized)
    }

    /// Live gates in increasing index order.
    fn gates(&self) -> Vec<NodeRef> {
        (0..self.size())
            .map(|id| NodeRef { id })
            .filter(|n| self.is_gate(*n) && !self.is_dead(*n))
            .collect()
    }
}
