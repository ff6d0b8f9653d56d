// SPDX-License-Identifier: Apache-2.0

use crate::network::NodeRef;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResubError {
    /// Parameters rejected by `ResubParams::validate`.
    InvalidParams(String),
    /// More cut pivots than the cut may have leaves.
    CutOverflow {
        pivots: usize,
        max_leaves: usize,
    },
    /// The transitive fanin cone of a root does not fit the divisor budget.
    DivisorBudgetExceeded {
        window_nodes: usize,
        budget: usize,
    },
    /// A window node's fanin had no truth table.
    WindowIncomplete { node: NodeRef },
    Solver(String),
    Config(String),
}

impl std::fmt::Display for ResubError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResubError::InvalidParams(msg) => {
                write!(f, "invalid resubstitution parameters: {}", msg)
            }
            ResubError::CutOverflow { pivots, max_leaves } => write!(
                f,
                "cut overflow: {} pivots exceed the leaf bound of {}",
                pivots, max_leaves
            ),
            ResubError::DivisorBudgetExceeded {
                window_nodes,
                budget,
            } => write!(
                f,
                "divisor budget exceeded: window has {} nodes, budget is {}",
                window_nodes, budget
            ),
            ResubError::WindowIncomplete { node } => {
                write!(f, "window simulation is missing a truth table for {}", node)
            }
            ResubError::Solver(msg) => write!(f, "SAT solver error: {}", msg),
            ResubError::Config(msg) => write!(f, "could not parse configuration: {}", msg),
        }
    }
}

impl std::error::Error for ResubError {}

impl From<serde_json::Error> for ResubError {
    fn from(e: serde_json::Error) -> Self {
        ResubError::Config(e.to_string())
    }
}

impl From<varisat::solver::SolverError> for ResubError {
    fn from(e: varisat::solver::SolverError) -> Self {
        ResubError::Solver(format!("{:?}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_display_messages() {
        assert_eq!(
            ResubError::DivisorBudgetExceeded {
                window_nodes: 12,
                budget: 10
            }
            .to_string(),
            "divisor budget exceeded: window has 12 nodes, budget is 10"
        );
        assert_eq!(
            ResubError::Solver("Interrupted".to_string()).to_string(),
            "SAT solver error: Interrupted"
        );
    }

    #[test]
    fn test_json_error_converts_to_config() {
        let err: ResubError = serde_json::from_str::<u32>("nope").unwrap_err().into();
        assert!(matches!(err, ResubError::Config(_)), "got {:?}", err);
    }
}
