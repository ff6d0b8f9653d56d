// SPDX-License-Identifier: Apache-2.0

//! Compact encoding of a small gate network over a list of divisors.
//!
//! A literal is `2 * index + complemented`. Index 0 is constant false,
//! indices `1..=num_divisors` are the divisors, and each gate added gets the
//! next index.

use std::fmt;

use crate::network::{GateKind, GateValue, LogicNetwork, Signal};

pub type Literal = u32;

pub fn make_literal(index: u32, complemented: bool) -> Literal {
    2 * index + complemented as u32
}

pub fn literal_index(lit: Literal) -> u32 {
    lit >> 1
}

pub fn literal_complemented(lit: Literal) -> bool {
    lit & 1 == 1
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexGate {
    pub kind: GateKind,
    pub fanins: Vec<Literal>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexList {
    num_divisors: u32,
    gates: Vec<IndexGate>,
    output: Literal,
}

impl IndexList {
    pub fn new(num_divisors: u32) -> Self {
        Self {
            num_divisors,
            gates: Vec::new(),
            output: 0,
        }
    }

    /// A gate-free candidate returning a constant.
    pub fn constant(num_divisors: u32, value: bool) -> Self {
        let mut list = Self::new(num_divisors);
        list.set_output(make_literal(0, value));
        list
    }

    /// A gate-free candidate returning divisor `i` (0-based), optionally
    /// complemented.
    pub fn divisor(num_divisors: u32, i: u32, complemented: bool) -> Self {
        debug_assert!(i < num_divisors);
        let mut list = Self::new(num_divisors);
        list.set_output(make_literal(i + 1, complemented));
        list
    }

    /// Literal of divisor `i` (0-based).
    pub fn divisor_literal(&self, i: u32, complemented: bool) -> Literal {
        debug_assert!(i < self.num_divisors);
        make_literal(i + 1, complemented)
    }

    /// Appends a gate and returns its (uncomplemented) literal.
    pub fn add_gate(&mut self, kind: GateKind, fanins: &[Literal]) -> Literal {
        debug_assert_eq!(fanins.len(), kind.arity());
        let next_index = 1 + self.num_divisors + self.gates.len() as u32;
        for lit in fanins {
            debug_assert!(
                literal_index(*lit) < next_index,
                "gate fanin literal {} refers forward",
                lit
            );
        }
        self.gates.push(IndexGate {
            kind,
            fanins: fanins.to_vec(),
        });
        make_literal(next_index, false)
    }

    pub fn add_and(&mut self, a: Literal, b: Literal) -> Literal {
        self.add_gate(GateKind::And2, &[a, b])
    }

    pub fn add_xor(&mut self, a: Literal, b: Literal) -> Literal {
        self.add_gate(GateKind::Xor2, &[a, b])
    }

    pub fn add_maj(&mut self, a: Literal, b: Literal, c: Literal) -> Literal {
        self.add_gate(GateKind::Maj3, &[a, b, c])
    }

    pub fn set_output(&mut self, lit: Literal) {
        self.output = lit;
    }

    pub fn output(&self) -> Literal {
        self.output
    }

    pub fn num_gates(&self) -> u32 {
        self.gates.len() as u32
    }

    pub fn num_divisors(&self) -> u32 {
        self.num_divisors
    }

    pub fn gates(&self) -> &[IndexGate] {
        &self.gates
    }

    /// Evaluates the list given one value per divisor.
    pub fn evaluate<V: GateValue>(&self, zero: &V, divisor_values: &[V]) -> V {
        debug_assert_eq!(divisor_values.len(), self.num_divisors as usize);
        let mut values: Vec<V> = Vec::with_capacity(1 + divisor_values.len() + self.gates.len());
        values.push(zero.clone());
        values.extend(divisor_values.iter().cloned());
        for gate in &self.gates {
            let inputs: Vec<V> = gate
                .fanins
                .iter()
                .map(|lit| {
                    values[literal_index(*lit) as usize].complement_if(literal_complemented(*lit))
                })
                .collect();
            values.push(gate.kind.apply(&inputs));
        }
        values[literal_index(self.output) as usize]
            .complement_if(literal_complemented(self.output))
    }

    /// Builds the gates in `ntk` over `divisors` and returns the output
    /// signal.
    pub fn insert<N: LogicNetwork>(&self, ntk: &mut N, divisors: &[Signal]) -> Signal {
        debug_assert_eq!(divisors.len(), self.num_divisors as usize);
        let mut signals: Vec<Signal> = Vec::with_capacity(1 + divisors.len() + self.gates.len());
        signals.push(Signal::constant(false));
        signals.extend_from_slice(divisors);
        for gate in &self.gates {
            let fanins: Vec<Signal> = gate
                .fanins
                .iter()
                .map(|lit| {
                    signals[literal_index(*lit) as usize].negate_if(literal_complemented(*lit))
                })
                .collect();
            let s = ntk.create_gate(gate.kind, &fanins);
            signals.push(s);
        }
        signals[literal_index(self.output) as usize]
            .negate_if(literal_complemented(self.output))
    }
}

fn fmt_literal(lit: Literal) -> String {
    if literal_complemented(lit) {
        format!("!{}", literal_index(lit))
    } else {
        format!("{}", literal_index(lit))
    }
}

impl fmt::Display for IndexList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{divisors: {}", self.num_divisors)?;
        for (i, gate) in self.gates.iter().enumerate() {
            let args: Vec<String> = gate.fanins.iter().map(|l| fmt_literal(*l)).collect();
            write!(
                f,
                "; {} = {}({})",
                1 + self.num_divisors as usize + i,
                gate.kind,
                args.join(", ")
            )?;
        }
        write!(f, "; out = {}}}", fmt_literal(self.output))
    }
}
