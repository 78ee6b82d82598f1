//! Error types for the layout engine

use thiserror::Error;

use super::solver::SolverError;
use super::tree::NodeId;
use super::types::Bounds;

/// Errors that can occur while inferring, evaluating, or solving a layout
#[derive(Debug, Error)]
pub enum LayoutError {
    /// Fixed content plus spacing and padding exceed the stack's extent
    #[error("over-constrained stack: {reserved} reserved in an extent of {extent}")]
    OverConstrained { extent: f64, reserved: f64 },

    /// No assignment meets the hard constraints
    #[error("unsatisfiable constraints: {reason}")]
    Unsatisfiable { reason: String },

    /// The search budget ran out before any feasible assignment was found
    #[error("no solution found within budget ({explored} candidates explored)")]
    BudgetExhausted { explored: usize },

    /// Nothing to partition or evaluate
    #[error("empty input")]
    EmptyInput,

    /// A rectangle with non-positive width or height
    #[error("degenerate rectangle at input position {index}")]
    DegenerateGeometry { index: usize },

    /// Rectangles that cannot be separated on either axis
    #[error("{count} overlapping elements cannot be arranged in stacks")]
    OverlappingElements { count: usize },

    /// Rounded constraints no longer reproduce the observed geometry
    #[error("rounded constraints place child {child} at {actual:?}, observed {expected:?}")]
    RoundTripMismatch {
        child: usize,
        expected: Bounds,
        actual: Bounds,
    },

    /// The node exists but is a leaf
    #[error("node {0:?} is not a stack")]
    NotAStack(NodeId),

    /// The node id does not belong to this tree
    #[error("node {0:?} not found")]
    UnknownNode(NodeId),

    /// Constraint solver error
    #[error("constraint solver error: {0}")]
    Solver(#[from] SolverError),
}

impl LayoutError {
    /// Create an over-constrained error
    pub fn over_constrained(extent: f64, reserved: f64) -> Self {
        Self::OverConstrained { extent, reserved }
    }

    /// Create an unsatisfiable error
    pub fn unsatisfiable(reason: impl Into<String>) -> Self {
        Self::Unsatisfiable {
            reason: reason.into(),
        }
    }

    /// True for failures that say "no layout exists" rather than
    /// "the search gave up" or "the input was bad"
    pub fn is_unsatisfiable(&self) -> bool {
        matches!(self, Self::Unsatisfiable { .. } | Self::OverConstrained { .. })
    }
}
