// SPDX-License-Identifier: Apache-2.0

//! Resynthesis functors: given the window function of a root and the divisor
//! tables, search for a small gate list over the divisors that matches the
//! root on the care set.
//!
//! Divisor `i` of a returned [`IndexList`] refers to `divisors[i]`, a slot of
//! the window simulation.

use crate::network::GateKind;
use crate::resub::index_list::{IndexList, Literal, make_literal};
use crate::resub::window_sim::WindowSimulation;
use crate::truth_table::TruthTable;

/// Literal pools are truncated to this many entries for the quadratic and
/// cubic searches.
const MAX_PAIR_POOL: usize = 64;
const MAX_MAJ_POOL: usize = 48;

pub trait ResynthesisFunctor {
    /// Returns a candidate with at most `max_inserts` gates whose function
    /// equals `target` wherever `care` is set.
    fn resynthesize(
        &mut self,
        target: &TruthTable,
        care: &TruthTable,
        divisors: &[usize],
        sim: &WindowSimulation,
        max_inserts: u32,
    ) -> Option<IndexList>;

    fn stats(&self) -> &ResynStats;
}

#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct ResynStats {
    pub num_calls: usize,
    pub num_constants: usize,
    pub num_div0: usize,
    pub num_one_gate: usize,
    pub num_two_gate: usize,
    pub num_failures: usize,
}

/// A divisor function in a given polarity.
#[derive(Debug, Clone)]
struct UnateLiteral {
    lit: Literal,
    tt: TruthTable,
}

/// Divisor functions plus the care set, shared by the searches below.
struct SearchContext<'a> {
    target: &'a TruthTable,
    care: &'a TruthTable,
    care_on: TruthTable,
    functions: Vec<TruthTable>,
}

impl<'a> SearchContext<'a> {
    fn new(
        target: &'a TruthTable,
        care: &'a TruthTable,
        divisors: &[usize],
        sim: &WindowSimulation,
    ) -> Self {
        Self {
            target,
            care,
            care_on: target & care,
            functions: divisors.iter().map(|slot| sim.function(*slot)).collect(),
        }
    }

    fn num_divisors(&self) -> u32 {
        self.functions.len() as u32
    }

    fn matches(&self, tt: &TruthTable) -> bool {
        tt.equal_on(self.target, self.care)
    }

    fn verified(&self, list: IndexList) -> Option<IndexList> {
        let zero = TruthTable::const0(self.target.num_vars());
        let value = list.evaluate(&zero, &self.functions);
        if self.matches(&value) {
            Some(list)
        } else {
            debug_assert!(false, "resynthesis produced a wrong candidate: {}", list);
            None
        }
    }

    fn constant(&self) -> Option<IndexList> {
        if self.care_on.is_const0() {
            return self.verified(IndexList::constant(self.num_divisors(), false));
        }
        if self.care.implies(self.target) {
            return self.verified(IndexList::constant(self.num_divisors(), true));
        }
        None
    }

    fn div0(&self) -> Option<IndexList> {
        for (i, tt) in self.functions.iter().enumerate() {
            if self.matches(tt) {
                return self.verified(IndexList::divisor(self.num_divisors(), i as u32, false));
            }
            if self.matches(&!tt) {
                return self.verified(IndexList::divisor(self.num_divisors(), i as u32, true));
            }
        }
        None
    }

    /// Splits the divisor literals into those that imply the target on the
    /// care set (usable under an OR) and those the target implies (usable
    /// under an AND).
    fn unate_literals(&self) -> (Vec<UnateLiteral>, Vec<UnateLiteral>) {
        let mut positive = Vec::new();
        let mut negative = Vec::new();
        for (i, tt) in self.functions.iter().enumerate() {
            for complemented in [false, true] {
                let f = if complemented { !tt } else { tt.clone() };
                let lit = make_literal(i as u32 + 1, complemented);
                if (&f & self.care).implies(self.target) {
                    positive.push(UnateLiteral { lit, tt: f.clone() });
                }
                if self.care_on.implies(&f) {
                    negative.push(UnateLiteral { lit, tt: f });
                }
            }
        }
        (positive, negative)
    }

    /// `l1 | l2` or `l1 & l2`.
    fn div1(&self, positive: &[UnateLiteral], negative: &[UnateLiteral]) -> Option<IndexList> {
        for (i, a) in positive.iter().enumerate() {
            for b in &positive[i + 1..] {
                if self.matches(&(&a.tt | &b.tt)) {
                    let mut list = IndexList::new(self.num_divisors());
                    let g = list.add_and(a.lit ^ 1, b.lit ^ 1);
                    list.set_output(g ^ 1);
                    return self.verified(list);
                }
            }
        }
        for (i, a) in negative.iter().enumerate() {
            for b in &negative[i + 1..] {
                if self.matches(&(&a.tt & &b.tt)) {
                    let mut list = IndexList::new(self.num_divisors());
                    let g = list.add_and(a.lit, b.lit);
                    list.set_output(g);
                    return self.verified(list);
                }
            }
        }
        None
    }

    /// `l1 ^ l2`, output complemented if needed.
    fn xor1(&self) -> Option<IndexList> {
        let n = self.functions.len().min(MAX_PAIR_POOL);
        for i in 0..n {
            for j in (i + 1)..n {
                let x = &self.functions[i] ^ &self.functions[j];
                for complemented in [false, true] {
                    let f = if complemented { !&x } else { x.clone() };
                    if self.matches(&f) {
                        let mut list = IndexList::new(self.num_divisors());
                        let g = list.add_xor(
                            make_literal(i as u32 + 1, false),
                            make_literal(j as u32 + 1, false),
                        );
                        list.set_output(g ^ complemented as u32);
                        return self.verified(list);
                    }
                }
            }
        }
        None
    }

    /// `l1 | (l2 & l3)` or `l1 & (l2 | l3)`.
    fn div12(&self, positive: &[UnateLiteral], negative: &[UnateLiteral]) -> Option<IndexList> {
        let pool = self.literal_pool(MAX_PAIR_POOL);

        // Pair products that imply the target.
        let mut products: Vec<(Literal, Literal, TruthTable)> = Vec::new();
        let mut sums: Vec<(Literal, Literal, TruthTable)> = Vec::new();
        for (i, a) in pool.iter().enumerate() {
            for b in &pool[i + 1..] {
                if a.lit >> 1 == b.lit >> 1 {
                    continue;
                }
                let product = &a.tt & &b.tt;
                if (&product & self.care).implies(self.target) {
                    products.push((a.lit, b.lit, product));
                }
                let sum = &a.tt | &b.tt;
                if self.care_on.implies(&sum) {
                    sums.push((a.lit, b.lit, sum));
                }
            }
        }

        for a in positive {
            for (l2, l3, product) in &products {
                if self.matches(&(&a.tt | product)) {
                    let mut list = IndexList::new(self.num_divisors());
                    let g1 = list.add_and(*l2, *l3);
                    let g2 = list.add_and(a.lit ^ 1, g1 ^ 1);
                    list.set_output(g2 ^ 1);
                    return self.verified(list);
                }
            }
        }
        for a in negative {
            for (l2, l3, sum) in &sums {
                if self.matches(&(&a.tt & sum)) {
                    let mut list = IndexList::new(self.num_divisors());
                    let g1 = list.add_and(*l2 ^ 1, *l3 ^ 1);
                    let g2 = list.add_and(a.lit, g1 ^ 1);
                    list.set_output(g2);
                    return self.verified(list);
                }
            }
        }
        None
    }

    /// `maj(l1, l2, l3)` where `l3` may also be a constant.
    fn maj1(&self) -> Option<IndexList> {
        let pool = self.literal_pool(MAX_MAJ_POOL);
        let num_vars = self.target.num_vars();
        let mut third: Vec<UnateLiteral> = vec![
            UnateLiteral {
                lit: make_literal(0, false),
                tt: TruthTable::const0(num_vars),
            },
            UnateLiteral {
                lit: make_literal(0, true),
                tt: TruthTable::const1(num_vars),
            },
        ];
        third.extend(pool.iter().cloned());

        for (i, a) in pool.iter().enumerate() {
            for b in &pool[i + 1..] {
                if a.lit >> 1 == b.lit >> 1 {
                    continue;
                }
                // Where a and b agree they decide the majority; elsewhere the
                // third input must match the target.
                let differ = &(&a.tt ^ &b.tt) & self.care;
                let agree = &!&(&a.tt ^ &b.tt) & self.care;
                if !a.tt.equal_on(self.target, &agree) {
                    continue;
                }
                for c in &third {
                    if c.lit >> 1 == a.lit >> 1 || c.lit >> 1 == b.lit >> 1 {
                        continue;
                    }
                    if c.tt.equal_on(self.target, &differ) {
                        let mut list = IndexList::new(self.num_divisors());
                        let g = list.add_maj(a.lit, b.lit, c.lit);
                        list.set_output(g);
                        return self.verified(list);
                    }
                }
            }
        }
        None
    }

    /// Both polarities of the first `max_divisors` divisors.
    fn literal_pool(&self, max_literals: usize) -> Vec<UnateLiteral> {
        let mut pool = Vec::new();
        for (i, tt) in self.functions.iter().enumerate() {
            if pool.len() + 2 > max_literals {
                break;
            }
            pool.push(UnateLiteral {
                lit: make_literal(i as u32 + 1, false),
                tt: tt.clone(),
            });
            pool.push(UnateLiteral {
                lit: make_literal(i as u32 + 1, true),
                tt: !tt,
            });
        }
        pool
    }
}

/// Finds constants and existing divisors equal to the target (up to
/// complement); never inserts gates.
#[derive(Debug, Default)]
pub struct Div0Resynthesis {
    stats: ResynStats,
}

impl Div0Resynthesis {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ResynthesisFunctor for Div0Resynthesis {
    fn resynthesize(
        &mut self,
        target: &TruthTable,
        care: &TruthTable,
        divisors: &[usize],
        sim: &WindowSimulation,
        _max_inserts: u32,
    ) -> Option<IndexList> {
        self.stats.num_calls += 1;
        let ctx = SearchContext::new(target, care, divisors, sim);
        if let Some(list) = ctx.constant() {
            self.stats.num_constants += 1;
            return Some(list);
        }
        if let Some(list) = ctx.div0() {
            self.stats.num_div0 += 1;
            return Some(list);
        }
        self.stats.num_failures += 1;
        None
    }

    fn stats(&self) -> &ResynStats {
        &self.stats
    }
}

/// AND/inverter search: constants, single divisors, one AND/OR gate over
/// unate divisors, and two-gate `l1 | (l2 & l3)` / `l1 & (l2 | l3)`.
#[derive(Debug, Default)]
pub struct AigResynthesis {
    stats: ResynStats,
}

impl AigResynthesis {
    pub fn new() -> Self {
        Self::default()
    }
}

fn aig_search(
    ctx: &SearchContext,
    stats: &mut ResynStats,
    max_inserts: u32,
    with_xor: bool,
) -> Option<IndexList> {
    if let Some(list) = ctx.constant() {
        stats.num_constants += 1;
        return Some(list);
    }
    if let Some(list) = ctx.div0() {
        stats.num_div0 += 1;
        return Some(list);
    }
    if max_inserts == 0 {
        return None;
    }
    let (positive, negative) = ctx.unate_literals();
    if let Some(list) = ctx.div1(&positive, &negative) {
        stats.num_one_gate += 1;
        return Some(list);
    }
    if with_xor {
        if let Some(list) = ctx.xor1() {
            stats.num_one_gate += 1;
            return Some(list);
        }
    }
    if max_inserts == 1 {
        return None;
    }
    if let Some(list) = ctx.div12(&positive, &negative) {
        stats.num_two_gate += 1;
        return Some(list);
    }
    None
}

impl ResynthesisFunctor for AigResynthesis {
    fn resynthesize(
        &mut self,
        target: &TruthTable,
        care: &TruthTable,
        divisors: &[usize],
        sim: &WindowSimulation,
        max_inserts: u32,
    ) -> Option<IndexList> {
        self.stats.num_calls += 1;
        let ctx = SearchContext::new(target, care, divisors, sim);
        let result = aig_search(&ctx, &mut self.stats, max_inserts, false);
        if result.is_none() {
            self.stats.num_failures += 1;
        }
        result
    }

    fn stats(&self) -> &ResynStats {
        &self.stats
    }
}

/// AIG search plus a single XOR of two divisors.
#[derive(Debug, Default)]
pub struct XagResynthesis {
    stats: ResynStats,
}

impl XagResynthesis {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ResynthesisFunctor for XagResynthesis {
    fn resynthesize(
        &mut self,
        target: &TruthTable,
        care: &TruthTable,
        divisors: &[usize],
        sim: &WindowSimulation,
        max_inserts: u32,
    ) -> Option<IndexList> {
        self.stats.num_calls += 1;
        let ctx = SearchContext::new(target, care, divisors, sim);
        let result = aig_search(&ctx, &mut self.stats, max_inserts, true);
        if result.is_none() {
            self.stats.num_failures += 1;
        }
        result
    }

    fn stats(&self) -> &ResynStats {
        &self.stats
    }
}

/// Majority search: constants, single divisors, and one MAJ gate.
#[derive(Debug, Default)]
pub struct MigResynthesis {
    stats: ResynStats,
}

impl MigResynthesis {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ResynthesisFunctor for MigResynthesis {
    fn resynthesize(
        &mut self,
        target: &TruthTable,
        care: &TruthTable,
        divisors: &[usize],
        sim: &WindowSimulation,
        max_inserts: u32,
    ) -> Option<IndexList> {
        self.stats.num_calls += 1;
        let ctx = SearchContext::new(target, care, divisors, sim);
        if let Some(list) = ctx.constant() {
            self.stats.num_constants += 1;
            return Some(list);
        }
        if let Some(list) = ctx.div0() {
            self.stats.num_div0 += 1;
            return Some(list);
        }
        if max_inserts >= 1 {
            if let Some(list) = ctx.maj1() {
                debug_assert!(list.gates().iter().all(|g| g.kind == GateKind::Maj3));
                self.stats.num_one_gate += 1;
                return Some(list);
            }
        }
        self.stats.num_failures += 1;
        None
    }

    fn stats(&self) -> &ResynStats {
        &self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::{GateNetwork, LogicNetwork, NodeRef, Signal};
    use pretty_assertions::assert_eq;

    /// Simulates `nodes` over three inputs and returns (sim, divisor slots of
    /// `divs`, target table of `root`).
    fn window(
        ntk: &GateNetwork,
        leaves: &[Signal],
        nodes: &[Signal],
        divs: &[Signal],
        root: Signal,
    ) -> (WindowSimulation, Vec<usize>, TruthTable) {
        let leaves: Vec<NodeRef> = leaves.iter().map(|s| s.node).collect();
        let nodes: Vec<NodeRef> = nodes.iter().map(|s| s.node).collect();
        let sim = WindowSimulation::simulate(ntk, &leaves, &nodes, true).unwrap();
        let slots = divs.iter().map(|d| sim.slot(d.node).unwrap()).collect();
        let target = sim.node_function(root.node).unwrap();
        (sim, slots, target)
    }

    #[test]
    fn test_div0_finds_existing_divisor() {
        // d0 = a & b, root = !( !a | !b ) built as a separate gate.
        let mut ntk = GateNetwork::new("t");
        let a = ntk.add_input("a");
        let b = ntk.add_input("b");
        let c = ntk.add_input("c");
        let d0 = ntk.and(a, b);
        let x = ntk.xor(a, c);
        let root = ntk.maj(a, b, Signal::constant(false));
        ntk.add_output("o", root);
        let (sim, slots, target) =
            window(&ntk, &[a, b, c], &[d0, x, root], &[a, b, c, x, d0], root);
        let care = TruthTable::const1(3);
        let mut functor = Div0Resynthesis::new();
        let list = functor
            .resynthesize(&target, &care, &slots, &sim, 0)
            .unwrap();
        assert_eq!(list.num_gates(), 0);
        assert_eq!(list, IndexList::divisor(5, 4, false));
        assert_eq!(functor.stats().num_div0, 1);
    }

    #[test]
    fn test_div0_detects_constants_on_care_set() {
        let mut ntk = GateNetwork::new("t");
        let a = ntk.add_input("a");
        let b = ntk.add_input("b");
        let ab = ntk.and(a, b);
        let (sim, slots, target) = window(&ntk, &[a, b], &[ab], &[a, b], ab);
        // Only a = b = 1 is a care minterm, where the root is 1.
        let mut care = TruthTable::const0(2);
        care.set_bit(3, true);
        let list = Div0Resynthesis::new()
            .resynthesize(&target, &care, &slots, &sim, 0)
            .unwrap();
        assert_eq!(list, IndexList::constant(2, true));
    }

    #[test]
    fn test_aig_one_gate_and_within_budget() {
        // root = a & b built as maj(a, b, 0); divisors a, b, a | b.
        let mut ntk = GateNetwork::new("t");
        let a = ntk.add_input("a");
        let b = ntk.add_input("b");
        let a_or_b = ntk.or(a, b);
        let root = ntk.maj(a, b, Signal::constant(false));
        let (sim, slots, target) = window(&ntk, &[a, b], &[a_or_b, root], &[a, b, a_or_b], root);
        let care = TruthTable::const1(2);
        let mut functor = AigResynthesis::new();
        assert_eq!(functor.resynthesize(&target, &care, &slots, &sim, 0), None);
        let list = functor
            .resynthesize(&target, &care, &slots, &sim, 1)
            .unwrap();
        assert_eq!(list.num_gates(), 1);
        let values: Vec<TruthTable> = slots.iter().map(|slot| sim.function(*slot)).collect();
        assert_eq!(list.evaluate(&TruthTable::const0(2), &values), target);
    }

    #[test]
    fn test_aig_two_gate_or_of_and() {
        // root = a | (b & c) built from majority gates.
        let mut ntk = GateNetwork::new("t");
        let a = ntk.add_input("a");
        let b = ntk.add_input("b");
        let c = ntk.add_input("c");
        let bc = ntk.maj(b, c, Signal::constant(false));
        let root = ntk.maj(a, bc, Signal::constant(true));
        let (sim, slots, target) = window(&ntk, &[a, b, c], &[bc, root], &[a, b, c], root);
        let care = TruthTable::const1(3);
        let mut functor = AigResynthesis::new();
        assert_eq!(functor.resynthesize(&target, &care, &slots, &sim, 1), None);
        let list = functor
            .resynthesize(&target, &care, &slots, &sim, 2)
            .unwrap();
        assert_eq!(list.num_gates(), 2);
        assert_eq!(functor.stats().num_two_gate, 1);
    }

    #[test]
    fn test_xag_finds_xor() {
        let mut ntk = GateNetwork::new("t");
        let a = ntk.add_input("a");
        let b = ntk.add_input("b");
        let n1 = ntk.and(a, b.negate());
        let n2 = ntk.and(a.negate(), b);
        let root = ntk.or(n1, n2);
        let (sim, slots, target) = window(&ntk, &[a, b], &[n1, n2, root], &[a, b], root);
        let care = TruthTable::const1(2);
        assert_eq!(
            AigResynthesis::new().resynthesize(&target, &care, &slots, &sim, 1),
            None
        );
        let list = XagResynthesis::new()
            .resynthesize(&target, &care, &slots, &sim, 1)
            .unwrap();
        assert_eq!(list.gates()[0].kind, GateKind::Xor2);
    }

    #[test]
    fn test_mig_finds_majority() {
        // root = (a & b) | (a & c) | (b & c) from AND gates.
        let mut ntk = GateNetwork::new("t");
        let a = ntk.add_input("a");
        let b = ntk.add_input("b");
        let c = ntk.add_input("c");
        let ab = ntk.and(a, b);
        let ac = ntk.and(a, c);
        let bc = ntk.and(b, c);
        let t = ntk.or(ab, ac);
        let root = ntk.or(t, bc);
        let (sim, slots, target) =
            window(&ntk, &[a, b, c], &[ab, ac, bc, t, root], &[a, b, c], root);
        let care = TruthTable::const1(3);
        let list = MigResynthesis::new()
            .resynthesize(&target, &care, &slots, &sim, 1)
            .unwrap();
        assert_eq!(list.num_gates(), 1);
        assert_eq!(list.gates()[0].kind, GateKind::Maj3);
        // The root node computes the complement of the majority.
        assert_eq!(target.words(), &[0x17]);
    }
}
