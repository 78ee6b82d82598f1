//! Layout recovery engine
//!
//! Takes a sketch of flat rectangles and recovers a nested stack layout:
//! hierarchy inference, geometric cleansing, forward evaluation of
//! constraints, and the inverse search that finds the constraints.

pub mod cleanse;
pub mod config;
pub mod describe;
pub mod error;
pub mod evaluate;
pub mod optimize;
pub mod partition;
pub mod solver;
pub mod tree;
pub mod types;

pub use cleanse::cleanse;
pub use config::{ConfigError, FailurePolicy, LayoutConfig, SolveBudget};
pub use describe::{describe, ViewDescriptor};
pub use error::LayoutError;
pub use evaluate::constraint_to_coords;
pub use optimize::{solve_level, solve_tree, LevelFailure, LevelSolution, SolveReport};
pub use partition::infer_hierarchy;
pub use tree::{LayoutTree, Node, NodeId, NodeKind};
pub use types::*;
