// SPDX-License-Identifier: Apache-2.0

//! Whole-network simulation: single patterns, 64-pattern words, and
//! exhaustive truth tables over the primary inputs.

use bitvec::vec::BitVec;
use rand::Rng;

use crate::network::topo::topo_sort;
use crate::network::{GateValue, LogicNetwork, Signal};
use crate::resub::params::MAX_WINDOW_VARS;
use crate::truth_table::TruthTable;

/// Evaluates every live node given one value per primary input. Dead slots
/// hold `zero`.
fn simulate_nodes<N: LogicNetwork, V: GateValue>(ntk: &N, zero: &V, pi_values: &[V]) -> Vec<V> {
    assert_eq!(
        pi_values.len(),
        ntk.pis().len(),
        "simulate: expected {} input values, got {}",
        ntk.pis().len(),
        pi_values.len()
    );
    let mut values: Vec<V> = vec![zero.clone(); ntk.size()];
    for (pi, value) in ntk.pis().iter().zip(pi_values.iter()) {
        values[pi.id] = value.clone();
    }
    for node in topo_sort(ntk) {
        if !ntk.is_gate(node) {
            continue;
        }
        let fanin_values: Vec<V> = ntk
            .fanins(node)
            .iter()
            .map(|f| values[f.node.id].clone())
            .collect();
        values[node.id] = ntk.compute(node, &fanin_values);
    }
    values
}

fn signal_value<V: GateValue>(values: &[V], signal: Signal) -> V {
    values[signal.node.id].complement_if(signal.negated)
}

/// Single-pattern simulation; bit `i` of the result is the value of node `i`.
pub fn simulate_values<N: LogicNetwork>(ntk: &N, pi_values: &[bool]) -> BitVec {
    let values = simulate_nodes(ntk, &false, pi_values);
    let mut bits = BitVec::repeat(false, values.len());
    for (i, v) in values.into_iter().enumerate() {
        bits.set(i, v);
    }
    bits
}

/// 64 patterns at once; returns one word per node.
pub fn simulate_words<N: LogicNetwork>(ntk: &N, pi_words: &[u64]) -> Vec<u64> {
    simulate_nodes(ntk, &0u64, pi_words)
}

/// Exhaustive simulation: the truth table of every node over all primary
/// inputs. Panics for networks with more than 16 inputs.
pub fn simulate_truth_tables<N: LogicNetwork>(ntk: &N) -> Vec<TruthTable> {
    let num_vars = ntk.pis().len() as u32;
    assert!(
        num_vars <= MAX_WINDOW_VARS,
        "simulate_truth_tables: {} inputs exceed the limit of {}",
        num_vars,
        MAX_WINDOW_VARS
    );
    let pi_tables: Vec<TruthTable> = (0..num_vars)
        .map(|i| TruthTable::nth_var(num_vars, i))
        .collect();
    simulate_nodes(ntk, &TruthTable::const0(num_vars), &pi_tables)
}

/// Truth tables of the primary outputs, polarity applied.
pub fn output_truth_tables<N: LogicNetwork>(ntk: &N) -> Vec<TruthTable> {
    let tables = simulate_truth_tables(ntk);
    ntk.po_signals()
        .into_iter()
        .map(|s| signal_value(&tables, s))
        .collect()
}

/// Output words for `rounds` batches of 64 random input patterns, one vector
/// per output. Networks with equal signatures agree on all sampled patterns.
pub fn random_output_signatures<N: LogicNetwork>(
    ntk: &N,
    rounds: usize,
    rng: &mut impl Rng,
) -> Vec<Vec<u64>> {
    let outputs = ntk.po_signals();
    let mut signatures: Vec<Vec<u64>> = vec![Vec::with_capacity(rounds); outputs.len()];
    for _ in 0..rounds {
        let pi_words: Vec<u64> = (0..ntk.pis().len()).map(|_| rng.r#gen::<u64>()).collect();
        let values = simulate_words(ntk, &pi_words);
        for (signature, output) in signatures.iter_mut().zip(outputs.iter()) {
            signature.push(signal_value(&values, *output));
        }
    }
    signatures
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::GateNetwork;
    use pretty_assertions::assert_eq;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256PlusPlus;

    fn full_adder() -> GateNetwork {
        let mut ntk = GateNetwork::new("full_adder");
        let a = ntk.add_input("a");
        let b = ntk.add_input("b");
        let cin = ntk.add_input("cin");
        let ab = ntk.xor(a, b);
        let sum = ntk.xor(ab, cin);
        let carry = ntk.maj(a, b, cin);
        ntk.add_output("sum", sum);
        ntk.add_output("carry", carry);
        ntk
    }

    #[test]
    fn test_full_adder_truth_tables() {
        let ntk = full_adder();
        let outputs = output_truth_tables(&ntk);
        assert_eq!(outputs[0].words(), &[0x96]);
        assert_eq!(outputs[1].words(), &[0xE8]);
    }

    #[test]
    fn test_single_pattern_matches_truth_tables() {
        let ntk = full_adder();
        let tables = simulate_truth_tables(&ntk);
        for minterm in 0..8usize {
            let pis: Vec<bool> = (0..3).map(|j| (minterm >> j) & 1 == 1).collect();
            let values = simulate_values(&ntk, &pis);
            for node in ntk.gates() {
                assert_eq!(values[node.id], tables[node.id].get_bit(minterm));
            }
        }
    }

    #[test]
    fn test_random_signatures_are_deterministic_per_seed() {
        let ntk = full_adder();
        let mut rng1 = Xoshiro256PlusPlus::seed_from_u64(5);
        let mut rng2 = Xoshiro256PlusPlus::seed_from_u64(5);
        let s1 = random_output_signatures(&ntk, 4, &mut rng1);
        let s2 = random_output_signatures(&ntk, 4, &mut rng2);
        assert_eq!(s1, s2);
        assert_eq!(s1.len(), 2);
        assert_eq!(s1[0].len(), 4);
    }
}
