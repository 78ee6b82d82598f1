//! Configuration for the layout engine
//!
//! Every tunable constant used by cleansing and solving lives here with its
//! documented default. Configurations can be built in code or loaded from a
//! TOML file where any omitted key keeps its default.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use super::types::Alignment;

/// Errors that can occur when loading a configuration file
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse config TOML: {0}")]
    ParseError(#[from] toml::de::Error),
}

/// What a tree-wide solve does when one level cannot be solved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Stop at the first failing level
    #[default]
    Abort,
    /// Keep going and report every failing level
    Collect,
}

/// Search limits for the constraint optimizer
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SolveBudget {
    /// Maximum number of candidate branches handed to the solver per level
    pub max_candidates: usize,
    /// Wall-clock limit per level, in milliseconds
    pub time_limit_ms: Option<u64>,
}

impl Default for SolveBudget {
    fn default() -> Self {
        Self {
            max_candidates: 4096,
            time_limit_ms: None,
        }
    }
}

impl SolveBudget {
    pub fn time_limit(&self) -> Option<Duration> {
        self.time_limit_ms.map(Duration::from_millis)
    }
}

/// Configuration options for cleansing and solving
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Largest population variance of sizes admitted into one size cluster
    pub size_tolerance: f64,

    /// Largest distance between a gap and its group's running average
    pub gap_tolerance: f64,

    /// Where the cleanser snaps children on a stack's minor axis
    pub minor_snap: Alignment,

    /// Upper bound on whole-tree cleansing passes
    pub max_cleanse_passes: usize,

    /// Decimal places kept when writing solved values back
    pub rounding_decimals: u32,

    /// Largest edge error accepted when re-evaluating a solved level
    pub verify_tolerance: f64,

    /// Smallest value a frame may take when it is fixed
    pub min_frame: f64,

    /// Optimizer search limits
    pub budget: SolveBudget,

    /// Behaviour of a tree-wide solve on a failing level
    pub failure_policy: FailurePolicy,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            size_tolerance: 50.0,
            gap_tolerance: 50.0,
            minor_snap: Alignment::Center,
            max_cleanse_passes: 10,
            rounding_decimals: 1,
            verify_tolerance: 0.1,
            min_frame: 0.1,
            budget: SolveBudget::default(),
            failure_policy: FailurePolicy::Abort,
        }
    }
}

impl LayoutConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Load a configuration from a TOML string
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Set the size clustering tolerance
    pub fn with_size_tolerance(mut self, tolerance: f64) -> Self {
        self.size_tolerance = tolerance;
        self
    }

    /// Set the gap clustering tolerance
    pub fn with_gap_tolerance(mut self, tolerance: f64) -> Self {
        self.gap_tolerance = tolerance;
        self
    }

    /// Set the minor-axis snapping mode
    pub fn with_minor_snap(mut self, alignment: Alignment) -> Self {
        self.minor_snap = alignment;
        self
    }

    /// Set the rounding precision
    pub fn with_rounding_decimals(mut self, decimals: u32) -> Self {
        self.rounding_decimals = decimals;
        self
    }

    /// Set the optimizer budget
    pub fn with_budget(mut self, budget: SolveBudget) -> Self {
        self.budget = budget;
        self
    }

    /// Set the tree-wide failure policy
    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    /// Round a solved value to the configured precision
    pub fn round(&self, value: f64) -> f64 {
        let scale = 10f64.powi(self.rounding_decimals as i32);
        let rounded = (value * scale).round() / scale;
        // Avoid writing back -0.0
        if rounded == 0.0 {
            0.0
        } else {
            rounded
        }
    }

    /// Round toward negative infinity at the configured precision
    pub fn round_down(&self, value: f64) -> f64 {
        let scale = 10f64.powi(self.rounding_decimals as i32);
        // 2.3 * 10 is 22.999999999999996
        let rounded = (value * scale + 1e-9).floor() / scale;
        if rounded == 0.0 {
            0.0
        } else {
            rounded
        }
    }
}
