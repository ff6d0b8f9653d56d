// SPDX-License-Identifier: Apache-2.0

//! Node handles, signals, and the primitive gate kinds of a logic network.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::truth_table::TruthTable;

#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub struct NodeRef {
    pub id: usize,
}

impl NodeRef {
    /// The constant-false node; every network reserves slot 0 for it.
    pub const CONST0: NodeRef = NodeRef { id: 0 };
}

impl fmt::Display for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%{}", self.id)
    }
}

/// A (node, polarity) pair, i.e. a node or its complement.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub struct Signal {
    pub node: NodeRef,
    pub negated: bool,
}

impl Signal {
    pub fn new(node: NodeRef, negated: bool) -> Self {
        Self { node, negated }
    }

    pub fn constant(value: bool) -> Self {
        Self {
            node: NodeRef::CONST0,
            negated: value,
        }
    }

    #[must_use]
    pub fn negate(&self) -> Self {
        Self {
            node: self.node,
            negated: !self.negated,
        }
    }

    /// Returns this signal complemented iff `flip` is set.
    #[must_use]
    pub fn negate_if(&self, flip: bool) -> Self {
        Self {
            node: self.node,
            negated: self.negated ^ flip,
        }
    }

    pub fn is_constant(&self) -> bool {
        self.node == NodeRef::CONST0
    }
}

impl From<NodeRef> for Signal {
    fn from(node: NodeRef) -> Self {
        Signal {
            node,
            negated: false,
        }
    }
}

impl From<&NodeRef> for Signal {
    fn from(node: &NodeRef) -> Self {
        Signal {
            node: *node,
            negated: false,
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negated {
            write!(f, "not({})", self.node)
        } else {
            write!(f, "{}", self.node)
        }
    }
}

/// Primitive gate kinds. AIGs use only `And2`, XAGs add `Xor2`, MIGs use
/// `Maj3`.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub enum GateKind {
    And2,
    Xor2,
    Maj3,
}

impl GateKind {
    pub fn arity(&self) -> usize {
        match self {
            GateKind::And2 | GateKind::Xor2 => 2,
            GateKind::Maj3 => 3,
        }
    }

    /// Applies the gate function to already-polarized fanin values.
    pub fn apply<V: GateValue>(&self, values: &[V]) -> V {
        debug_assert_eq!(values.len(), self.arity());
        match self {
            GateKind::And2 => values[0].and(&values[1]),
            GateKind::Xor2 => values[0].xor(&values[1]),
            GateKind::Maj3 => V::maj(&values[0], &values[1], &values[2]),
        }
    }
}

impl fmt::Display for GateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GateKind::And2 => write!(f, "and"),
            GateKind::Xor2 => write!(f, "xor"),
            GateKind::Maj3 => write!(f, "maj"),
        }
    }
}

/// Values a gate can be evaluated over: single Boolean values, 64 parallel
/// patterns packed in a word, or complete truth tables.
pub trait GateValue: Clone {
    fn complement(&self) -> Self;
    fn and(&self, other: &Self) -> Self;
    fn xor(&self, other: &Self) -> Self;
    fn maj(a: &Self, b: &Self, c: &Self) -> Self;

    fn complement_if(&self, flip: bool) -> Self {
        if flip {
            self.complement()
        } else {
            self.clone()
        }
    }
}

impl GateValue for bool {
    fn complement(&self) -> Self {
        !*self
    }

    fn and(&self, other: &Self) -> Self {
        *self && *other
    }

    fn xor(&self, other: &Self) -> Self {
        *self ^ *other
    }

    fn maj(a: &Self, b: &Self, c: &Self) -> Self {
        (*a && *b) || (*a && *c) || (*b && *c)
    }
}

impl GateValue for u64 {
    fn complement(&self) -> Self {
        !*self
    }

    fn and(&self, other: &Self) -> Self {
        *self & *other
    }

    fn xor(&self, other: &Self) -> Self {
        *self ^ *other
    }

    fn maj(a: &Self, b: &Self, c: &Self) -> Self {
        (a & b) | (a & c) | (b & c)
    }
}

impl GateValue for TruthTable {
    fn complement(&self) -> Self {
        !self
    }

    fn and(&self, other: &Self) -> Self {
        self & other
    }

    fn xor(&self, other: &Self) -> Self {
        self ^ other
    }

    fn maj(a: &Self, b: &Self, c: &Self) -> Self {
        TruthTable::maj(a, b, c)
    }
}

/// Result of bringing a prospective gate into canonical form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Normalized {
    /// The gate folds to an existing signal (possibly a constant).
    Trivial(Signal),
    /// The gate is a genuine node with the given canonical fanins; the
    /// resulting node must be used complemented iff `output_negated`.
    Gate {
        kind: GateKind,
        fanins: Vec<Signal>,
        output_negated: bool,
    },
}

/// Canonicalizes `(kind, fanins)` so that structurally identical gates hash to
/// the same key.
pub fn normalize(kind: GateKind, fanins: &[Signal]) -> Normalized {
    assert_eq!(
        fanins.len(),
        kind.arity(),
        "normalize: {} expects {} fanins, got {}",
        kind,
        kind.arity(),
        fanins.len()
    );
    match kind {
        GateKind::And2 => normalize_and(fanins[0], fanins[1]),
        GateKind::Xor2 => normalize_xor(fanins[0], fanins[1]),
        GateKind::Maj3 => normalize_maj(fanins[0], fanins[1], fanins[2]),
    }
}

fn normalize_and(mut a: Signal, mut b: Signal) -> Normalized {
    if a > b {
        std::mem::swap(&mut a, &mut b);
    }
    if a.node == b.node {
        return Normalized::Trivial(if a.negated == b.negated {
            a
        } else {
            Signal::constant(false)
        });
    }
    if a.is_constant() {
        return Normalized::Trivial(if a.negated {
            b
        } else {
            Signal::constant(false)
        });
    }
    Normalized::Gate {
        kind: GateKind::And2,
        fanins: vec![a, b],
        output_negated: false,
    }
}

fn normalize_xor(a: Signal, b: Signal) -> Normalized {
    let output_negated = a.negated ^ b.negated;
    let (mut a, mut b) = (Signal::from(a.node), Signal::from(b.node));
    if a > b {
        std::mem::swap(&mut a, &mut b);
    }
    if a.node == b.node {
        return Normalized::Trivial(Signal::constant(output_negated));
    }
    if a.is_constant() {
        return Normalized::Trivial(b.negate_if(output_negated));
    }
    Normalized::Gate {
        kind: GateKind::Xor2,
        fanins: vec![a, b],
        output_negated,
    }
}

fn normalize_maj(a: Signal, b: Signal, c: Signal) -> Normalized {
    let mut fanins = [a, b, c];
    fanins.sort();
    let [a, b, c] = fanins;
    // Two identical fanins decide the output; two complementary fanins leave
    // the third one in charge.
    if a.node == b.node {
        return Normalized::Trivial(if a.negated == b.negated { a } else { c });
    }
    if b.node == c.node {
        return Normalized::Trivial(if b.negated == c.negated { b } else { a });
    }
    let negated_count = fanins.iter().filter(|s| s.negated).count();
    let output_negated = negated_count >= 2;
    let fanins = if output_negated {
        fanins.iter().map(|s| s.negate()).collect()
    } else {
        fanins.to_vec()
    };
    Normalized::Gate {
        kind: GateKind::Maj3,
        fanins,
        output_negated,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn sig(id: usize, negated: bool) -> Signal {
        Signal::new(NodeRef { id }, negated)
    }

    #[test]
    fn test_and_folds_trivial_cases() {
        assert_eq!(
            normalize(GateKind::And2, &[sig(3, false), sig(3, false)]),
            Normalized::Trivial(sig(3, false))
        );
        assert_eq!(
            normalize(GateKind::And2, &[sig(3, false), sig(3, true)]),
            Normalized::Trivial(Signal::constant(false))
        );
        assert_eq!(
            normalize(GateKind::And2, &[sig(4, true), Signal::constant(true)]),
            Normalized::Trivial(sig(4, true))
        );
        assert_eq!(
            normalize(GateKind::And2, &[sig(4, true), Signal::constant(false)]),
            Normalized::Trivial(Signal::constant(false))
        );
    }

    #[test]
    fn test_and_is_commutative() {
        assert_eq!(
            normalize(GateKind::And2, &[sig(5, true), sig(2, false)]),
            normalize(GateKind::And2, &[sig(2, false), sig(5, true)])
        );
    }

    #[test]
    fn test_xor_moves_complements_to_output() {
        match normalize(GateKind::Xor2, &[sig(5, true), sig(2, false)]) {
            Normalized::Gate {
                fanins,
                output_negated,
                ..
            } => {
                assert_eq!(fanins, vec![sig(2, false), sig(5, false)]);
                assert!(output_negated);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(
            normalize(GateKind::Xor2, &[sig(5, true), sig(5, false)]),
            Normalized::Trivial(Signal::constant(true))
        );
    }

    #[test]
    fn test_maj_pushes_complements_out() {
        match normalize(GateKind::Maj3, &[sig(1, true), sig(2, true), sig(3, false)]) {
            Normalized::Gate {
                fanins,
                output_negated,
                ..
            } => {
                assert_eq!(fanins, vec![sig(1, false), sig(2, false), sig(3, true)]);
                assert!(output_negated);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(
            normalize(GateKind::Maj3, &[sig(1, false), sig(1, true), sig(3, true)]),
            Normalized::Trivial(sig(3, true))
        );
    }

    #[test_case(GateKind::And2; "and")]
    #[test_case(GateKind::Xor2; "xor")]
    #[test_case(GateKind::Maj3; "maj")]
    fn test_normalization_preserves_function(kind: GateKind) {
        // Exhaustively check over three distinct non-constant nodes plus the
        // constant, all polarities.
        let nodes = [0usize, 1, 2, 3];
        let vars = 3u32;
        let node_tt = |id: usize| -> TruthTable {
            if id == 0 {
                TruthTable::const0(vars)
            } else {
                TruthTable::nth_var(vars, (id - 1) as u32)
            }
        };
        let signal_tt = |s: Signal| node_tt(s.node.id).complement_if(s.negated);
        let arity = kind.arity();
        let mut choices: Vec<Vec<Signal>> = vec![vec![]];
        for _ in 0..arity {
            let mut next = Vec::new();
            for prefix in &choices {
                for &id in &nodes {
                    for negated in [false, true] {
                        let mut v = prefix.clone();
                        v.push(sig(id, negated));
                        next.push(v);
                    }
                }
            }
            choices = next;
        }
        for fanins in choices {
            let expected = kind.apply(&fanins.iter().map(|s| signal_tt(*s)).collect::<Vec<_>>());
            let got = match normalize(kind, &fanins) {
                Normalized::Trivial(s) => signal_tt(s),
                Normalized::Gate {
                    kind,
                    fanins,
                    output_negated,
                } => kind
                    .apply(&fanins.iter().map(|s| signal_tt(*s)).collect::<Vec<_>>())
                    .complement_if(output_negated),
            };
            assert_eq!(got, expected, "fanins {:?}", fanins);
        }
    }
}
