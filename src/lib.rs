//! Stack Sketch - recover nested stack layouts from sketched rectangles
//!
//! This library turns a flat set of rectangles drawn inside a container into
//! a tree of vertical and horizontal stacks, tidies the geometry, and solves
//! for the spacing, padding, frame and alignment values that reproduce it.
//!
//! # Example
//!
//! ```rust
//! use stack_sketch::layout::Bounds;
//! use stack_sketch::sketch::{Sketch, SketchElement};
//! use stack_sketch::recover_layout;
//!
//! let sketch = Sketch::new(
//!     Bounds::from_edges(0.0, 0.0, 100.0, 100.0),
//!     vec![
//!         SketchElement::unframed(Bounds::from_edges(10.0, 10.0, 90.0, 40.0)),
//!         SketchElement::unframed(Bounds::from_edges(10.0, 60.0, 90.0, 90.0)),
//!     ],
//! );
//!
//! let recovered = recover_layout(&sketch).unwrap();
//! assert!(recovered.report.is_complete());
//! assert!(recovered.describe().is_some());
//! ```

pub mod layout;
pub mod sketch;

pub use layout::{LayoutConfig, LayoutError, LayoutTree, NodeId, SolveReport, ViewDescriptor};
pub use sketch::{Sketch, SketchElement};

use thiserror::Error;
use tracing::{debug, instrument};

use layout::{FailurePolicy, LevelFailure, SolveBudget};

/// Errors that can occur during the recovery pipeline
#[derive(Debug, Error)]
pub enum RecoverError {
    /// Error during inference or cleansing
    #[error("layout error: {0}")]
    Layout(#[from] LayoutError),

    /// A stack level could not be solved
    #[error("stack {node:?}: {source}")]
    Level {
        node: NodeId,
        #[source]
        source: LayoutError,
    },
}

impl From<LevelFailure> for RecoverError {
    fn from(failure: LevelFailure) -> Self {
        RecoverError::Level {
            node: failure.node,
            source: failure.error,
        }
    }
}

/// Configuration for the complete recovery pipeline
#[derive(Debug, Clone, Default)]
pub struct RecoverConfig {
    /// Layout configuration
    pub layout: LayoutConfig,
    /// Skip the cleansing pass and solve the raw geometry
    pub skip_cleanse: bool,
}

impl RecoverConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the layout configuration
    pub fn with_layout(mut self, config: LayoutConfig) -> Self {
        self.layout = config;
        self
    }

    pub fn with_budget(mut self, budget: SolveBudget) -> Self {
        self.layout = self.layout.with_budget(budget);
        self
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.layout = self.layout.with_failure_policy(policy);
        self
    }

    pub fn with_skip_cleanse(mut self, skip: bool) -> Self {
        self.skip_cleanse = skip;
        self
    }
}

/// A solved tree and the per-level outcome
#[derive(Debug)]
pub struct RecoveredLayout {
    pub tree: LayoutTree,
    pub report: SolveReport,
    /// Cleansing passes run before solving
    pub cleanse_passes: usize,
}

impl RecoveredLayout {
    /// Framework-neutral outline of the solved tree
    pub fn describe(&self) -> Option<ViewDescriptor> {
        layout::describe(&self.tree)
    }
}

/// Recover a layout with default configuration
///
/// This is the main entry point for the library. It infers the stack
/// hierarchy, cleanses the geometry, and solves every stack level.
pub fn recover_layout(sketch: &Sketch) -> Result<RecoveredLayout, RecoverError> {
    recover_layout_with_config(sketch, &RecoverConfig::default())
}

/// Recover a layout with custom configuration
///
/// # Example
///
/// ```rust
/// use stack_sketch::layout::{Bounds, FailurePolicy, LayoutConfig};
/// use stack_sketch::{recover_layout_with_config, RecoverConfig, Sketch, SketchElement};
///
/// let config = RecoverConfig::new()
///     .with_layout(LayoutConfig::default().with_rounding_decimals(2))
///     .with_failure_policy(FailurePolicy::Collect);
///
/// let sketch = Sketch::new(
///     Bounds::from_edges(0.0, 0.0, 50.0, 50.0),
///     vec![SketchElement::framed(Bounds::from_edges(10.0, 10.0, 40.0, 40.0))],
/// );
/// let recovered = recover_layout_with_config(&sketch, &config).unwrap();
/// assert_eq!(recovered.tree.stack_count(), 1);
/// ```
#[instrument(level = "debug", skip_all, fields(elements = sketch.elements.len()))]
pub fn recover_layout_with_config(
    sketch: &Sketch,
    config: &RecoverConfig,
) -> Result<RecoveredLayout, RecoverError> {
    let mut tree = layout::infer_hierarchy(sketch)?;
    debug!(stacks = tree.stack_count(), "hierarchy inferred");

    let cleanse_passes = if config.skip_cleanse {
        0
    } else {
        layout::cleanse(&mut tree, &config.layout)
    };

    let report = layout::solve_tree(&mut tree, &config.layout)?;
    debug!(
        solved = report.solved.len(),
        failed = report.failures.len(),
        "layout recovered"
    );

    Ok(RecoveredLayout {
        tree,
        report,
        cleanse_passes,
    })
}
