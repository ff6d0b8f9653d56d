// SPDX-License-Identifier: Apache-2.0

//! Small networks for tests: seeded random networks and a few hand-built
//! circuits with known redundancy.

use rand::Rng;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;

use crate::network::{GateKind, GateNetwork, LogicNetwork, Signal};

/// Random network mixing AND, XOR and MAJ gates.
pub fn random_network(seed: u64, num_pis: usize, num_gates: usize, num_pos: usize) -> GateNetwork {
    random_network_with_kinds(
        seed,
        num_pis,
        num_gates,
        num_pos,
        &[GateKind::And2, GateKind::Xor2, GateKind::Maj3],
    )
}

/// Random network over the given gate kinds. Fanins are drawn with a bias
/// toward recent signals so that the result has some depth. Structural
/// hashing may fold attempts, so the gate count can be below `num_gates`.
pub fn random_network_with_kinds(
    seed: u64,
    num_pis: usize,
    num_gates: usize,
    num_pos: usize,
    kinds: &[GateKind],
) -> GateNetwork {
    assert!(num_pis > 0 && !kinds.is_empty());
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
    let mut ntk = GateNetwork::new(&format!("random_{}", seed));
    let mut signals: Vec<Signal> = (0..num_pis)
        .map(|i| ntk.add_input(&format!("i{}", i)))
        .collect();

    for _ in 0..num_gates {
        let kind = kinds[rng.gen_range(0..kinds.len())];
        let window = signals.len().min(12);
        let fanins: Vec<Signal> = (0..kind.arity())
            .map(|_| {
                let pick = if rng.gen_bool(0.7) {
                    signals.len() - 1 - rng.gen_range(0..window)
                } else {
                    rng.gen_range(0..signals.len())
                };
                signals[pick].negate_if(rng.r#gen::<bool>())
            })
            .collect();
        let s = ntk.create_gate(kind, &fanins);
        if !s.is_constant() && !signals.contains(&s) && !signals.contains(&s.negate()) {
            signals.push(s);
        }
    }

    for i in 0..num_pos {
        let s = if i == 0 {
            signals[signals.len() - 1]
        } else {
            signals[rng.gen_range(num_pis.min(signals.len() - 1)..signals.len())]
        };
        ntk.add_output(&format!("o{}", i), s.negate_if(rng.r#gen::<bool>()));
    }
    // Dangling gates would make size comparisons noisy.
    for node in ntk.gates() {
        if !ntk.is_dead(node) && ntk.fanout_size(node) == 0 {
            ntk.take_out_node(node);
        }
    }
    ntk
}

/// `o = (a & b) | (a & c)` next to an existing `a & (b | c)`; the first
/// output is redundant given the second.
pub fn shared_factor_network() -> GateNetwork {
    let mut ntk = GateNetwork::new("shared_factor");
    let a = ntk.add_input("a");
    let b = ntk.add_input("b");
    let c = ntk.add_input("c");
    let ab = ntk.and(a, b);
    let ac = ntk.and(a, c);
    let o1 = ntk.or(ab, ac);
    let b_or_c = ntk.or(b, c);
    let o2 = ntk.and(a, b_or_c);
    ntk.add_output("o1", o1);
    ntk.add_output("o2", o2);
    ntk
}

/// Full adder built from AND gates only.
pub fn aig_full_adder() -> GateNetwork {
    let mut ntk = GateNetwork::new("aig_full_adder");
    let a = ntk.add_input("a");
    let b = ntk.add_input("b");
    let cin = ntk.add_input("cin");
    let ab_xor = aig_xor(&mut ntk, a, b);
    let sum = aig_xor(&mut ntk, ab_xor, cin);
    let ab = ntk.and(a, b);
    let t = ntk.and(ab_xor, cin);
    let carry = ntk.or(ab, t);
    ntk.add_output("sum", sum);
    ntk.add_output("carry", carry);
    ntk
}

fn aig_xor(ntk: &mut GateNetwork, a: Signal, b: Signal) -> Signal {
    let x = ntk.and(a, b.negate());
    let y = ntk.and(a.negate(), b);
    ntk.or(x, y)
}
