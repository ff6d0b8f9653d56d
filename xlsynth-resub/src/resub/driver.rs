// SPDX-License-Identifier: Apache-2.0

//! The resubstitution pass.
//!
//! Every gate present when the pass starts is visited once, in index order.
//! For each root a window is built (cut, MFFC, divisors), simulated, and
//! handed to a resynthesis functor. An accepted candidate is inserted over
//! the divisors and replaces the root.

use std::time::{Duration, Instant};

use crate::error::ResubError;
use crate::network::{
    LevelContext, LogicNetwork, NetworkEvent, NodeRef, ScopedSubscriptions, Signal,
};
use crate::resub::divisors::DivisorCollector;
use crate::resub::dont_cares::satisfiability_dont_cares;
use crate::resub::index_list::IndexList;
use crate::resub::mffc::MffcCollector;
use crate::resub::params::{ResubParams, ResubStats};
use crate::resub::reconv_cut::ReconvergenceCut;
use crate::resub::resyn::{
    AigResynthesis, Div0Resynthesis, MigResynthesis, ResynthesisFunctor, XagResynthesis,
};
use crate::resub::validator::{CircuitValidator, ValidationOutcome};
use crate::resub::window_sim::WindowSimulation;
use crate::sim::simulate_values;
use crate::truth_table::TruthTable;

/// What to do with an accepted candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResubCallback {
    /// Insert the candidate and substitute the root.
    Substitute,
    /// Log the candidate and leave the network untouched.
    ReportOnly,
}

/// Level of `node` from its live fanins.
fn level_from_fanins(ctx: &dyn LevelContext, node: NodeRef) -> u32 {
    ctx.fanins(node)
        .iter()
        .filter(|f| !ctx.is_dead(f.node))
        .map(|f| ctx.level(f.node))
        .max()
        .unwrap_or(0)
        .saturating_add(1)
}

/// Re-levels `node` and its immediate fanouts. Deeper fanouts are left stale.
fn update_levels(ctx: &mut dyn LevelContext, node: NodeRef) {
    let level = level_from_fanins(&*ctx, node);
    ctx.set_level(node, level);
    let fanouts: Vec<NodeRef> = ctx.fanouts(node).to_vec();
    for fanout in fanouts {
        if ctx.is_dead(fanout) {
            continue;
        }
        let level = level_from_fanins(&*ctx, fanout);
        ctx.set_level(fanout, level);
    }
}

fn on_network_event(event: &NetworkEvent, ctx: &mut dyn LevelContext) {
    match event {
        NetworkEvent::Add(node) | NetworkEvent::Modified { node, .. } => update_levels(ctx, *node),
        NetworkEvent::Delete(node) => ctx.set_level(*node, u32::MAX),
    }
}

#[derive(Debug, Default)]
struct PhaseTimers {
    cuts: Duration,
    mffc: Duration,
    divs: Duration,
    simulation: Duration,
    dont_cares: Duration,
    resynthesis: Duration,
    validation: Duration,
    substitution: Duration,
}

/// Per-pass state: reusable traversal marks and accumulated statistics.
pub struct Resubstitution<'a, F: ResynthesisFunctor> {
    params: &'a ResubParams,
    functor: &'a mut F,
    callback: ResubCallback,
    cutter: ReconvergenceCut,
    mffc: MffcCollector,
    divisors: DivisorCollector,
    validator: CircuitValidator,
    stats: ResubStats,
    timers: PhaseTimers,
}

/// A candidate that passed resynthesis (and validation, if enabled).
struct Accepted {
    root: NodeRef,
    divisors: Vec<NodeRef>,
    candidate: IndexList,
    gain: u32,
}

impl<'a, F: ResynthesisFunctor> Resubstitution<'a, F> {
    pub fn new(params: &'a ResubParams, functor: &'a mut F, callback: ResubCallback) -> Self {
        Self {
            params,
            functor,
            callback,
            cutter: ReconvergenceCut::new(params.max_pis as usize, params.max_fanout_to_expand),
            mffc: MffcCollector::new(),
            divisors: DivisorCollector::new(),
            validator: CircuitValidator::new(params.max_clauses),
            stats: ResubStats::default(),
            timers: PhaseTimers::default(),
        }
    }

    pub fn run<N: LogicNetwork>(mut self, ntk: &mut N) -> Result<ResubStats, ResubError> {
        self.params.validate()?;
        let t0 = Instant::now();
        self.stats.initial_size = ntk.num_gates();
        log::info!(
            "resubstitution: start gates={} max_pis={} max_divisors={} max_inserts={}",
            self.stats.initial_size,
            self.params.max_pis,
            self.params.max_divisors,
            self.params.max_inserts
        );
        log::debug!(
            "resubstitution: dont_cares={} validate={} preserve_depth={}",
            self.params.use_dont_cares,
            self.params.validate_candidates,
            self.params.preserve_depth
        );

        {
            let mut ntk = ScopedSubscriptions::new(ntk);
            ntk.subscribe(Box::new(on_network_event));

            // Gates created by substitutions are not revisited.
            let size = ntk.size();
            for id in 0..size {
                let root = NodeRef { id };
                if !ntk.is_gate(root) || ntk.is_dead(root) {
                    continue;
                }
                if ntk.fanout_size(root) > self.params.skip_fanout_limit_for_roots {
                    self.stats.num_skipped_fanout += 1;
                    continue;
                }
                self.stats.num_roots_visited += 1;
                let Some(accepted) = self.evaluate_root(&mut *ntk, root) else {
                    continue;
                };
                self.apply(&mut *ntk, accepted);
            }
        }

        self.stats.final_size = ntk.num_gates();
        self.stats.resyn = self.functor.stats().clone();
        self.stats.time_cuts_ms = self.timers.cuts.as_millis();
        self.stats.time_mffc_ms = self.timers.mffc.as_millis();
        self.stats.time_divs_ms = self.timers.divs.as_millis();
        self.stats.time_simulation_ms = self.timers.simulation.as_millis();
        self.stats.time_dont_cares_ms = self.timers.dont_cares.as_millis();
        self.stats.time_resynthesis_ms = self.timers.resynthesis.as_millis();
        self.stats.time_validation_ms = self.timers.validation.as_millis();
        self.stats.time_substitution_ms = self.timers.substitution.as_millis();
        self.stats.time_total_ms = t0.elapsed().as_millis();
        log::info!(
            "resubstitution: done gates={} -> {} resubs={} estimated_gain={} elapsed_ms={}",
            self.stats.initial_size,
            self.stats.final_size,
            self.stats.num_resub,
            self.stats.estimated_gain,
            self.stats.time_total_ms
        );
        log::debug!(
            "resubstitution: skipped_budget={} skipped_fanout={}",
            self.stats.num_skipped_budget,
            self.stats.num_skipped_fanout
        );
        Ok(self.stats)
    }

    /// Builds the window of `root` and searches for a replacement.
    fn evaluate_root<N: LogicNetwork>(&mut self, ntk: &mut N, root: NodeRef) -> Option<Accepted> {
        let t = Instant::now();
        let cut = self.cutter.run(ntk, &[root]);
        self.timers.cuts += t.elapsed();
        let cut = match cut {
            Ok(cut) => cut,
            Err(e) => {
                log::trace!("resubstitution: skipping {}: {}", root, e);
                self.stats.num_skipped_budget += 1;
                return None;
            }
        };
        if cut.leaves.contains(&root) {
            return None;
        }
        let leaves = cut.leaves;

        let t = Instant::now();
        let mffc = self.mffc.run(ntk, root, &leaves);
        self.timers.mffc += t.elapsed();
        if mffc.gain == 0 {
            return None;
        }

        let t = Instant::now();
        let divs = self
            .divisors
            .run(ntk, root, &leaves, &mffc.nodes, self.params);
        self.timers.divs += t.elapsed();
        let divs = match divs {
            Ok(divs) => divs,
            Err(e) => {
                log::trace!("resubstitution: skipping {}: {}", root, e);
                self.stats.num_skipped_budget += 1;
                return None;
            }
        };
        self.stats.num_total_leaves += leaves.len();
        self.stats.num_total_divisors += divs.len();

        let t = Instant::now();
        let mut window_nodes: Vec<NodeRef> = divs[leaves.len()..].to_vec();
        window_nodes.extend_from_slice(&mffc.nodes);
        let sim = WindowSimulation::simulate(ntk, &leaves, &window_nodes, true);
        self.timers.simulation += t.elapsed();
        let sim = match sim {
            Ok(sim) => sim,
            Err(e) => {
                debug_assert!(false, "window of {} is incomplete: {}", root, e);
                log::warn!("resubstitution: skipping {}: {}", root, e);
                return None;
            }
        };

        let t = Instant::now();
        let mut care = if self.params.use_dont_cares {
            !satisfiability_dont_cares(
                ntk,
                &leaves,
                self.params.window_size,
                self.params.max_fanout_to_expand,
            )
        } else {
            TruthTable::const1(leaves.len() as u32)
        };
        self.timers.dont_cares += t.elapsed();

        let target = sim.node_function(root)?;
        let slots: Vec<usize> = divs.iter().filter_map(|d| sim.slot(*d)).collect();
        debug_assert_eq!(slots.len(), divs.len());
        let max_inserts = self.params.max_inserts.min(mffc.gain - 1);
        log::trace!(
            "resubstitution: root={} leaves={} divisors={} mffc={} max_inserts={}",
            root,
            leaves.len(),
            divs.len(),
            mffc.gain,
            max_inserts
        );

        let trials = if self.params.validate_candidates {
            self.params.max_trials.max(1)
        } else {
            1
        };
        for _ in 0..trials {
            let t = Instant::now();
            let candidate = self
                .functor
                .resynthesize(&target, &care, &slots, &sim, max_inserts);
            self.timers.resynthesis += t.elapsed();
            let candidate = candidate?;
            debug_assert!(candidate.num_gates() <= max_inserts);

            if !self.params.validate_candidates {
                return Some(Accepted {
                    root,
                    divisors: divs,
                    candidate,
                    gain: mffc.gain,
                });
            }

            let t = Instant::now();
            let outcome = self.validator.validate(ntk, root, &divs, &candidate);
            self.timers.validation += t.elapsed();
            match outcome {
                ValidationOutcome::Equivalent => {
                    return Some(Accepted {
                        root,
                        divisors: divs,
                        candidate,
                        gain: mffc.gain,
                    });
                }
                ValidationOutcome::CounterExample(pi_values) => {
                    self.stats.num_rejected_by_validator += 1;
                    let values = simulate_values(ntk, &pi_values);
                    let minterm = leaves
                        .iter()
                        .enumerate()
                        .filter(|(_, leaf)| values[leaf.id])
                        .fold(0usize, |m, (j, _)| m | (1 << j));
                    if care.get_bit(minterm) {
                        log::warn!(
                            "resubstitution: counterexample for {} is already a care minterm",
                            root
                        );
                        return None;
                    }
                    care.set_bit(minterm, true);
                }
                ValidationOutcome::Unknown => {
                    self.stats.num_validator_unknown += 1;
                    log::debug!("resubstitution: validator gave up on {}", root);
                    return None;
                }
            }
        }
        None
    }

    fn apply<N: LogicNetwork>(&mut self, ntk: &mut N, accepted: Accepted) {
        let Accepted {
            root,
            divisors,
            candidate,
            gain,
        } = accepted;

        if self.callback == ResubCallback::ReportOnly {
            log::info!(
                "resubstitution: candidate for {} with {} gates (gain {}): {}",
                root,
                candidate.num_gates(),
                gain,
                candidate
            );
            self.stats.num_resub += 1;
            self.stats.estimated_gain += u64::from(gain - candidate.num_gates());
            return;
        }

        let t = Instant::now();
        let first_fresh = ntk.size();
        let signals: Vec<Signal> = divisors.iter().map(|d| Signal::from(*d)).collect();
        let replacement = candidate.insert(ntk, &signals);
        if replacement.node != root {
            ntk.substitute_node(root, replacement);
            self.stats.num_resub += 1;
            self.stats.estimated_gain += u64::from(gain - candidate.num_gates());
            log::debug!(
                "resubstitution: {} -> {} gates={} gain={}",
                root,
                replacement,
                candidate.num_gates(),
                gain
            );
        }
        // Gates the candidate built but nothing ended up using.
        for id in (first_fresh..ntk.size()).rev() {
            let node = NodeRef { id };
            if !ntk.is_dead(node) && ntk.fanout_size(node) == 0 {
                ntk.take_out_node(node);
            }
        }
        self.timers.substitution += t.elapsed();
    }
}

/// Runs one resubstitution pass over `ntk` with the given functor.
pub fn resubstitution<N: LogicNetwork, F: ResynthesisFunctor>(
    ntk: &mut N,
    params: &ResubParams,
    functor: &mut F,
) -> Result<ResubStats, ResubError> {
    Resubstitution::new(params, functor, ResubCallback::Substitute).run(ntk)
}

pub fn resubstitution_with_callback<N: LogicNetwork, F: ResynthesisFunctor>(
    ntk: &mut N,
    params: &ResubParams,
    functor: &mut F,
    callback: ResubCallback,
) -> Result<ResubStats, ResubError> {
    Resubstitution::new(params, functor, callback).run(ntk)
}

/// Resubstitution with constants and existing divisors only.
pub fn default_resubstitution<N: LogicNetwork>(
    ntk: &mut N,
    params: &ResubParams,
) -> Result<ResubStats, ResubError> {
    resubstitution(ntk, params, &mut Div0Resynthesis::new())
}

pub fn aig_resubstitution<N: LogicNetwork>(
    ntk: &mut N,
    params: &ResubParams,
) -> Result<ResubStats, ResubError> {
    resubstitution(ntk, params, &mut AigResynthesis::new())
}

pub fn xag_resubstitution<N: LogicNetwork>(
    ntk: &mut N,
    params: &ResubParams,
) -> Result<ResubStats, ResubError> {
    resubstitution(ntk, params, &mut XagResynthesis::new())
}

pub fn mig_resubstitution<N: LogicNetwork>(
    ntk: &mut N,
    params: &ResubParams,
) -> Result<ResubStats, ResubError> {
    resubstitution(ntk, params, &mut MigResynthesis::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::{GateKind, GateNetwork};
    use crate::sim::output_truth_tables;
    use crate::test_utils::{random_network, random_network_with_kinds, shared_factor_network};
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    #[test]
    fn test_duplicate_function_is_merged_by_div0() {
        let _ = env_logger::builder().is_test(true).try_init();
        // o1 = a & b as AND, o2 = a & b as MAJ(a, b, 0).
        let mut ntk = GateNetwork::new("t");
        let a = ntk.add_input("a");
        let b = ntk.add_input("b");
        let c = ntk.add_input("c");
        let ab = ntk.and(a, b);
        let o1 = ntk.xor(ab, c);
        let m = ntk.maj(a, b, Signal::constant(false));
        let o2 = ntk.xor(m, c.negate());
        ntk.add_output("o1", o1);
        ntk.add_output("o2", o2);
        let before = output_truth_tables(&ntk);

        let stats = default_resubstitution(&mut ntk, &ResubParams::default()).unwrap();
        assert_eq!(output_truth_tables(&ntk), before);
        assert!(stats.num_resub >= 1);
        assert_eq!(ntk.num_gates(), 2);
        assert_eq!(stats.final_size, 2);
        assert_eq!(stats.initial_size, 4);
    }

    #[test]
    fn test_report_only_leaves_network_unchanged() {
        let mut ntk = shared_factor_network();
        let before = ntk.to_string();
        let stats = resubstitution_with_callback(
            &mut ntk,
            &ResubParams::default(),
            &mut AigResynthesis::new(),
            ResubCallback::ReportOnly,
        )
        .unwrap();
        assert_eq!(ntk.to_string(), before);
        assert!(stats.num_resub >= 1);
        assert_eq!(stats.initial_size, stats.final_size);
    }

    #[test]
    fn test_invalid_params_are_rejected_before_editing() {
        let mut ntk = shared_factor_network();
        let params = ResubParams {
            max_pis: 0,
            ..ResubParams::default()
        };
        let err = aig_resubstitution(&mut ntk, &params).unwrap_err();
        assert!(matches!(err, ResubError::InvalidParams(_)));
    }

    #[test]
    fn test_live_gates_keep_finite_levels() {
        let mut ntk = random_network(3, 6, 60, 4);
        aig_resubstitution(&mut ntk, &ResubParams::default()).unwrap();
        for node in ntk.gates() {
            assert_ne!(ntk.level(node), u32::MAX, "node {}", node);
            assert!(ntk.level(node) >= 1);
        }
        ntk.recompute_levels();
        for node in ntk.gates() {
            let expected = ntk
                .fanins(node)
                .iter()
                .map(|f| ntk.level(f.node))
                .max()
                .unwrap_or(0)
                + 1;
            assert_eq!(ntk.level(node), expected, "node {}", node);
        }
    }

    #[test]
    fn test_lazy_levels_update_one_level_outward() {
        // g1 -> g2 -> g3 -> g4 is a chain; replacing g1 by the level-3 node
        // h3 modifies g2 in place, so g2 and its direct fanout g3 are
        // re-levelled while g4 keeps its stale level.
        let mut ntk = GateNetwork::new("t");
        let a = ntk.add_input("a");
        let b = ntk.add_input("b");
        let c = ntk.add_input("c");
        let d = ntk.add_input("d");
        let e = ntk.add_input("e");
        let g1 = ntk.and(a, b);
        let g2 = ntk.and(g1, c);
        let g3 = ntk.and(g2, d);
        let g4 = ntk.and(g3, e);
        let h1 = ntk.and(a, c);
        let h2 = ntk.and(h1, d);
        let h3 = ntk.and(h2, e);
        ntk.add_output("o", g4);
        ntk.add_output("h", h3);
        assert_eq!(ntk.level(g4.node), 4);
        assert_eq!(ntk.level(h3.node), 3);

        {
            let mut scoped = ScopedSubscriptions::new(&mut ntk);
            scoped.subscribe(Box::new(on_network_event));
            scoped.substitute_node(g1.node, h3);
        }
        assert!(ntk.is_dead(g1.node));
        assert_eq!(ntk.level(g1.node), u32::MAX);
        assert_eq!(ntk.level(g2.node), 4);
        assert_eq!(ntk.level(g3.node), 5);
        assert_eq!(ntk.level(g4.node), 4, "two hops out stays stale");

        ntk.recompute_levels();
        assert_eq!(ntk.level(g3.node), 5);
        assert_eq!(ntk.level(g4.node), 6);
        assert_eq!(ntk.depth(), 6);
    }

    #[test_case(119, true ; "aig seed 119")]
    #[test_case(97, false ; "mixed seed 97")]
    fn test_default_pass_keeps_fanout_accounting(seed: u64, and_only: bool) {
        let _ = env_logger::builder().is_test(true).try_init();
        let mut ntk = if and_only {
            random_network_with_kinds(seed, 9, 149, 5, &[GateKind::And2])
        } else {
            random_network(seed, 9, 149, 5)
        };
        let before = output_truth_tables(&ntk);
        default_resubstitution(&mut ntk, &ResubParams::default()).unwrap();
        assert_eq!(ntk.check_integrity(), Ok(()));
        assert_eq!(output_truth_tables(&ntk), before);
        aig_resubstitution(&mut ntk, &ResubParams::default()).unwrap();
        assert_eq!(ntk.check_integrity(), Ok(()));
        assert_eq!(output_truth_tables(&ntk), before);
    }

    #[test]
    fn test_subscriptions_are_released_after_pass() {
        let mut ntk = shared_factor_network();
        aig_resubstitution(&mut ntk, &ResubParams::default()).unwrap();
        // A fresh subscription gets the next id and there is nothing else
        // registered to unsubscribe.
        let id = ntk.subscribe(Box::new(|_: &NetworkEvent, _: &mut dyn LevelContext| {}));
        assert!(ntk.unsubscribe(id));
        assert!(!ntk.unsubscribe(id));
    }
}
