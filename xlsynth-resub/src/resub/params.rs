// SPDX-License-Identifier: Apache-2.0

//! Resubstitution options and per-pass statistics.

use serde::{Deserialize, Serialize};

use crate::error::ResubError;
use crate::resub::resyn::ResynStats;

/// Largest window (in leaves) that is simulated with complete truth tables.
pub const MAX_WINDOW_VARS: u32 = 16;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResubParams {
    /// Maximum number of cut leaves (window inputs).
    pub max_pis: u32,
    /// Maximum number of divisors, leaves included.
    pub max_divisors: u32,
    /// Maximum number of gates a candidate may insert.
    pub max_inserts: u32,
    /// Roots with more fanouts than this are skipped.
    pub skip_fanout_limit_for_roots: u32,
    /// Wing nodes with more fanouts than this are not admitted as divisors.
    pub skip_fanout_limit_for_divisors: u32,
    /// Cut leaves with more fanouts than this are not expanded.
    pub max_fanout_to_expand: u32,
    /// Compute satisfiability don't-cares for every window.
    pub use_dont_cares: bool,
    /// Leaf bound of the don't-care window grown above the cut.
    pub window_size: u32,
    /// Never admit a divisor deeper than the root.
    pub preserve_depth: bool,
    /// Prove every candidate with the SAT validator before accepting it.
    pub validate_candidates: bool,
    pub max_clauses: u32,
    /// Resynthesis attempts per root when the validator keeps refuting.
    pub max_trials: u32,
}

impl Default for ResubParams {
    fn default() -> Self {
        Self {
            max_pis: 8,
            max_divisors: 150,
            max_inserts: 2,
            skip_fanout_limit_for_roots: 1000,
            skip_fanout_limit_for_divisors: 100,
            max_fanout_to_expand: 1000,
            use_dont_cares: false,
            window_size: 12,
            preserve_depth: false,
            validate_candidates: false,
            max_clauses: 1000,
            max_trials: 100,
        }
    }
}

impl ResubParams {
    /// Parses a JSON options record; absent fields take their default values.
    pub fn from_json_str(text: &str) -> Result<Self, ResubError> {
        let params: ResubParams = serde_json::from_str(text)?;
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> Result<(), ResubError> {
        if self.max_pis == 0 {
            return Err(ResubError::InvalidParams(
                "max_pis must be at least 1".to_string(),
            ));
        }
        if self.max_pis > MAX_WINDOW_VARS {
            return Err(ResubError::InvalidParams(format!(
                "max_pis={} exceeds the simulation limit of {} variables",
                self.max_pis, MAX_WINDOW_VARS
            )));
        }
        if self.max_divisors < self.max_pis {
            return Err(ResubError::InvalidParams(format!(
                "max_divisors={} must be at least max_pis={}",
                self.max_divisors, self.max_pis
            )));
        }
        if self.use_dont_cares && self.window_size < self.max_pis {
            return Err(ResubError::InvalidParams(format!(
                "window_size={} must be at least max_pis={} when use_dont_cares is set",
                self.window_size, self.max_pis
            )));
        }
        if self.use_dont_cares && self.window_size > MAX_WINDOW_VARS {
            return Err(ResubError::InvalidParams(format!(
                "window_size={} exceeds the simulation limit of {} variables",
                self.window_size, MAX_WINDOW_VARS
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResubStats {
    /// Live gates before the pass.
    pub initial_size: usize,
    /// Live gates after the pass.
    pub final_size: usize,
    pub num_roots_visited: usize,
    pub num_skipped_fanout: usize,
    pub num_skipped_budget: usize,
    pub num_total_leaves: usize,
    pub num_total_divisors: usize,
    /// Accepted candidates.
    pub num_resub: usize,
    pub num_rejected_by_validator: usize,
    pub num_validator_unknown: usize,
    pub estimated_gain: u64,
    /// Counters of the resynthesis functor used for the pass.
    pub resyn: ResynStats,

    pub time_cuts_ms: u128,
    pub time_mffc_ms: u128,
    pub time_divs_ms: u128,
    pub time_simulation_ms: u128,
    pub time_dont_cares_ms: u128,
    pub time_resynthesis_ms: u128,
    pub time_validation_ms: u128,
    pub time_substitution_ms: u128,
    pub time_total_ms: u128,
}

impl ResubStats {
    pub fn to_json(&self) -> Result<String, ResubError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    #[test]
    fn test_from_json_fills_defaults() {
        let params = ResubParams::from_json_str(r#"{"max_inserts": 1, "preserve_depth": true}"#)
            .expect("valid params");
        assert_eq!(
            params,
            ResubParams {
                max_inserts: 1,
                preserve_depth: true,
                ..ResubParams::default()
            }
        );
    }

    #[test]
    fn test_from_json_rejects_garbage() {
        let err = ResubParams::from_json_str("{max_pis: }").unwrap_err();
        assert!(matches!(err, ResubError::Config(_)), "got {:?}", err);
    }

    #[test_case(r#"{"max_pis": 0}"# ; "zero pis")]
    #[test_case(r#"{"max_pis": 17, "max_divisors": 200}"# ; "too many pis")]
    #[test_case(r#"{"max_pis": 10, "max_divisors": 9}"# ; "divisors below pis")]
    #[test_case(r#"{"use_dont_cares": true, "window_size": 4}"# ; "window below pis")]
    fn test_validate_rejects(text: &str) {
        let err = ResubParams::from_json_str(text).unwrap_err();
        assert!(matches!(err, ResubError::InvalidParams(_)), "got {:?}", err);
    }

    #[test]
    fn test_stats_serialize() {
        let stats = ResubStats {
            initial_size: 10,
            final_size: 7,
            num_resub: 2,
            estimated_gain: 3,
            ..ResubStats::default()
        };
        let json = stats.to_json().expect("serializable");
        let value: serde_json::Value = serde_json::from_str(&json).expect("valid json");
        assert_eq!(value["initial_size"], 10);
        assert_eq!(value["final_size"], 7);
        assert_eq!(value["estimated_gain"], 3);
    }
}
