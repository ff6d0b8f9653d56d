// SPDX-License-Identifier: Apache-2.0

//! SAT-based check that a candidate computes the same function as the root
//! it replaces, over the primary inputs.
//!
//! The fanin cones of the root and of the candidate's divisors are encoded
//! with Tseitin clauses, the candidate gates are added on top, and a miter
//! asks the solver for an input assignment on which the two differ.

use std::collections::{HashMap, HashSet};

use varisat::ExtendFormula;

use crate::error::ResubError;
use crate::network::topo::postorder_from;
use crate::network::{GateKind, LogicNetwork, NodeRef};
use crate::resub::index_list::{IndexList, Literal, literal_complemented, literal_index};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationOutcome {
    Equivalent,
    /// Primary input values (in `pis()` order) on which root and candidate
    /// differ.
    CounterExample(Vec<bool>),
    /// Clause budget exceeded or the solver failed.
    Unknown,
}

// Tseitin clauses for: output <=> a AND b
fn add_tseitin_and(
    solver: &mut impl ExtendFormula,
    a: varisat::Lit,
    b: varisat::Lit,
    output: varisat::Lit,
) {
    solver.add_clause(&[!a, !b, output]);
    solver.add_clause(&[a, !output]);
    solver.add_clause(&[b, !output]);
}

// output <=> a XOR b
fn add_tseitin_xor(
    solver: &mut impl ExtendFormula,
    a: varisat::Lit,
    b: varisat::Lit,
    output: varisat::Lit,
) {
    solver.add_clause(&[!a, !b, !output]);
    solver.add_clause(&[a, b, !output]);
    solver.add_clause(&[a, !b, output]);
    solver.add_clause(&[!a, b, output]);
}

// output <=> MAJ(a, b, c): any two true inputs force it true, any two false
// inputs force it false.
fn add_tseitin_maj(
    solver: &mut impl ExtendFormula,
    a: varisat::Lit,
    b: varisat::Lit,
    c: varisat::Lit,
    output: varisat::Lit,
) {
    solver.add_clause(&[!a, !b, output]);
    solver.add_clause(&[!a, !c, output]);
    solver.add_clause(&[!b, !c, output]);
    solver.add_clause(&[a, b, !output]);
    solver.add_clause(&[a, c, !output]);
    solver.add_clause(&[b, c, !output]);
}

fn clause_count(kind: GateKind) -> usize {
    match kind {
        GateKind::And2 => 3,
        GateKind::Xor2 => 4,
        GateKind::Maj3 => 6,
    }
}

fn add_gate_clauses(
    solver: &mut impl ExtendFormula,
    kind: GateKind,
    inputs: &[varisat::Lit],
    output: varisat::Lit,
) {
    match kind {
        GateKind::And2 => add_tseitin_and(solver, inputs[0], inputs[1], output),
        GateKind::Xor2 => add_tseitin_xor(solver, inputs[0], inputs[1], output),
        GateKind::Maj3 => add_tseitin_maj(solver, inputs[0], inputs[1], inputs[2], output),
    }
}

fn resolve_literal(lits: &[varisat::Lit], lit: Literal) -> varisat::Lit {
    let base = lits[literal_index(lit) as usize];
    if literal_complemented(lit) {
        !base
    } else {
        base
    }
}

#[derive(Debug, Clone)]
pub struct CircuitValidator {
    max_clauses: usize,
}

impl CircuitValidator {
    pub fn new(max_clauses: u32) -> Self {
        Self {
            max_clauses: max_clauses as usize,
        }
    }

    /// Checks that `candidate`, built over `divisors`, is equivalent to
    /// `root` for every primary input assignment.
    pub fn validate<N: LogicNetwork>(
        &self,
        ntk: &N,
        root: NodeRef,
        divisors: &[NodeRef],
        candidate: &IndexList,
    ) -> ValidationOutcome {
        debug_assert_eq!(divisors.len(), candidate.num_divisors() as usize);
        let mut roots: Vec<NodeRef> = vec![root];
        roots.extend_from_slice(divisors);
        let cone = postorder_from(ntk, &roots, &HashSet::new());

        let mut num_clauses = 1;
        for node in &cone {
            if let Some(kind) = ntk.gate_kind(*node) {
                num_clauses += clause_count(kind);
            } else if ntk.is_constant(*node) {
                num_clauses += 1;
            }
        }
        num_clauses += candidate
            .gates()
            .iter()
            .map(|g| clause_count(g.kind))
            .sum::<usize>();
        num_clauses += clause_count(GateKind::Xor2);
        if num_clauses > self.max_clauses {
            log::debug!(
                "validator: {} clauses for root {} exceed the budget of {}",
                num_clauses,
                root,
                self.max_clauses
            );
            return ValidationOutcome::Unknown;
        }

        let mut solver = varisat::Solver::new();
        let mut node_to_lit: HashMap<NodeRef, varisat::Lit> = HashMap::new();
        for node in &cone {
            let lit = solver.new_lit();
            node_to_lit.insert(*node, lit);
            if ntk.is_constant(*node) {
                solver.add_clause(&[!lit]);
                continue;
            }
            let Some(kind) = ntk.gate_kind(*node) else {
                // Primary input: unconstrained.
                continue;
            };
            let inputs: Vec<varisat::Lit> = ntk
                .fanins(*node)
                .iter()
                .map(|f| {
                    let base = node_to_lit[&f.node];
                    if f.negated { !base } else { base }
                })
                .collect();
            add_gate_clauses(&mut solver, kind, &inputs, lit);
        }

        // Candidate: literal index 0 is constant false, then the divisors,
        // then the candidate gates.
        let false_lit = solver.new_lit();
        solver.add_clause(&[!false_lit]);
        let mut cand_lits: Vec<varisat::Lit> =
            Vec::with_capacity(1 + divisors.len() + candidate.gates().len());
        cand_lits.push(false_lit);
        cand_lits.extend(divisors.iter().map(|d| node_to_lit[d]));
        for gate in candidate.gates() {
            let inputs: Vec<varisat::Lit> = gate
                .fanins
                .iter()
                .map(|l| resolve_literal(&cand_lits, *l))
                .collect();
            let output = solver.new_lit();
            add_gate_clauses(&mut solver, gate.kind, &inputs, output);
            cand_lits.push(output);
        }
        let cand_out = resolve_literal(&cand_lits, candidate.output());

        let miter = solver.new_lit();
        add_tseitin_xor(&mut solver, node_to_lit[&root], cand_out, miter);
        solver.assume(&[miter]);

        match solve(&mut solver) {
            Ok(false) => ValidationOutcome::Equivalent,
            Ok(true) => {
                let Some(model) = solver.model() else {
                    return ValidationOutcome::Unknown;
                };
                let model_set: HashSet<varisat::Lit> = model.into_iter().collect();
                let pi_values = ntk
                    .pis()
                    .iter()
                    .map(|pi| {
                        node_to_lit
                            .get(pi)
                            .is_some_and(|lit| model_set.contains(lit))
                    })
                    .collect();
                ValidationOutcome::CounterExample(pi_values)
            }
            Err(e) => {
                log::warn!("validator: root {}: {}", root, e);
                ValidationOutcome::Unknown
            }
        }
    }
}

fn solve(solver: &mut varisat::Solver<'_>) -> Result<bool, ResubError> {
    Ok(solver.solve()?)
}
