//! Constraint solver integration for inverse layout
//!
//! This module provides a wrapper around the kasuari Cassowary constraint solver,
//! naming the decision variables of one stack level and translating linear
//! equations over them into the solver's format.

use std::collections::HashMap;

use kasuari::{
    Expression, Solver as KasuariSolver, Strength, Variable as KasuariVariable,
    WeightedRelation::*,
};
use thiserror::Error;

use super::types::{Axis, Side};

/// Decision variables of one stack level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SolverVariable {
    /// Shared gap between consecutive children
    Spacing,
    /// Extent given to each child without a major-axis frame
    FlexibleSize,
    /// `padding[axis][side]` of one child
    Padding { child: usize, axis: Axis, side: Side },
    /// `frame[axis]` of one child, zero when flexible
    Frame { child: usize, axis: Axis },
}

impl SolverVariable {
    pub fn padding(child: usize, axis: Axis, side: Side) -> Self {
        Self::Padding { child, axis, side }
    }

    pub fn frame(child: usize, axis: Axis) -> Self {
        Self::Frame { child, axis }
    }
}

/// Relation used by [`LinearConstraint`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    Equal,
    GreaterOrEqual,
    LessOrEqual,
}

/// `Σ coefficient·variable  <relation>  constant`
#[derive(Debug, Clone)]
pub struct LinearConstraint {
    pub terms: Vec<(SolverVariable, f64)>,
    pub relation: Relation,
    pub constant: f64,
    /// Human-readable description for error messages
    pub description: String,
}

impl LinearConstraint {
    pub fn new(
        terms: Vec<(SolverVariable, f64)>,
        relation: Relation,
        constant: f64,
        description: impl Into<String>,
    ) -> Self {
        Self {
            terms,
            relation,
            constant,
            description: description.into(),
        }
    }

    /// `variable = value`
    pub fn fixed(variable: SolverVariable, value: f64, description: impl Into<String>) -> Self {
        Self::new(vec![(variable, 1.0)], Relation::Equal, value, description)
    }

    /// `variable >= value`
    pub fn at_least(variable: SolverVariable, value: f64, description: impl Into<String>) -> Self {
        Self::new(
            vec![(variable, 1.0)],
            Relation::GreaterOrEqual,
            value,
            description,
        )
    }

    /// `a = b`
    pub fn equal(a: SolverVariable, b: SolverVariable, description: impl Into<String>) -> Self {
        Self::new(vec![(a, 1.0), (b, -1.0)], Relation::Equal, 0.0, description)
    }
}

/// Errors from the constraint solver
#[derive(Debug, Error)]
pub enum SolverError {
    #[error("Unsatisfiable constraints: {reason}")]
    Unsatisfiable { reason: String },

    #[error("Internal solver error: {0}")]
    Internal(String),
}

/// Wrapper around kasuari solver
pub struct ConstraintSolver {
    solver: KasuariSolver,
    /// Maps our variables to kasuari variables
    variables: HashMap<SolverVariable, KasuariVariable>,
    /// Reverse of `variables`, for reading solved values back
    lookup: HashMap<KasuariVariable, SolverVariable>,
    /// Descriptions of the required constraints added so far
    required: Vec<String>,
}

impl ConstraintSolver {
    pub fn new() -> Self {
        Self {
            solver: KasuariSolver::new(),
            variables: HashMap::new(),
            lookup: HashMap::new(),
            required: Vec::new(),
        }
    }

    /// Get or create a kasuari variable
    fn get_or_create_var(&mut self, var: SolverVariable) -> KasuariVariable {
        if let Some(&kvar) = self.variables.get(&var) {
            return kvar;
        }
        let kvar = KasuariVariable::new();
        self.variables.insert(var, kvar);
        self.lookup.insert(kvar, var);
        kvar
    }

    fn expression(&mut self, terms: &[(SolverVariable, f64)]) -> Expression {
        let mut expr = Expression::from_constant(0.0);
        for &(var, coefficient) in terms {
            if coefficient == 0.0 {
                continue;
            }
            let kvar = self.get_or_create_var(var);
            expr = expr + kvar * coefficient;
        }
        expr
    }

    /// Convert a kasuari error to a SolverError with context
    fn convert_kasuari_error(&self, e: kasuari::AddConstraintError, desc: &str) -> SolverError {
        match e {
            kasuari::AddConstraintError::UnsatisfiableConstraint => SolverError::Unsatisfiable {
                reason: format!(
                    "Cannot satisfy {}: conflicts with {} existing constraints",
                    desc,
                    self.required.len()
                ),
            },
            kasuari::AddConstraintError::DuplicateConstraint => {
                SolverError::Internal(format!("Duplicate constraint: {}", desc))
            }
            kasuari::AddConstraintError::InternalSolverError(msg) => {
                SolverError::Internal(format!("Internal solver error for {}: {}", desc, msg))
            }
        }
    }

    fn add(&mut self, constraint: &LinearConstraint, strength: Strength) -> Result<(), SolverError> {
        let expr = self.expression(&constraint.terms);
        let value = constraint.constant;
        let kconstraint = match constraint.relation {
            Relation::Equal => expr | EQ(strength) | value,
            Relation::GreaterOrEqual => expr | GE(strength) | value,
            Relation::LessOrEqual => expr | LE(strength) | value,
        };
        self.solver
            .add_constraint(kconstraint)
            .map_err(|e| self.convert_kasuari_error(e, &constraint.description))
    }

    /// Add a hard constraint
    pub fn require(&mut self, constraint: LinearConstraint) -> Result<(), SolverError> {
        self.add(&constraint, Strength::REQUIRED)?;
        self.required.push(constraint.description);
        Ok(())
    }

    /// Add a preference the solver violates as little as possible
    pub fn prefer(
        &mut self,
        constraint: LinearConstraint,
        strength: Strength,
    ) -> Result<(), SolverError> {
        self.add(&constraint, strength)
    }

    /// Number of hard constraints added so far
    pub fn required_count(&self) -> usize {
        self.required.len()
    }
}

impl Default for ConstraintSolver {
    fn default() -> Self {
        Self::new()
    }
}

/// Solution from the constraint solver
#[derive(Debug, Clone, Default)]
pub struct Solution {
    pub values: HashMap<SolverVariable, f64>,
}

impl Solution {
    /// Value of a variable; variables the solver never moved are zero
    pub fn get(&self, var: SolverVariable) -> f64 {
        self.values.get(&var).copied().unwrap_or(0.0)
    }
}

impl ConstraintSolver {
    /// Read the solved values
    ///
    /// Constraints are checked as they are added, so by now the system is
    /// known to be satisfiable.
    pub fn solve(&mut self) -> Solution {
        // kasuari only reports variables whose value changed from zero
        let values = self
            .solver
            .fetch_changes()
            .iter()
            .filter_map(|(kvar, value)| self.lookup.get(kvar).map(|var| (*var, *value)))
            .collect();
        Solution { values }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_constraint() {
        let mut solver = ConstraintSolver::new();
        let var = SolverVariable::Spacing;

        solver
            .require(LinearConstraint::fixed(var, 12.0, "spacing = 12"))
            .unwrap();
        let solution = solver.solve();

        assert!((solution.get(var) - 12.0).abs() < 0.001);
    }

    #[test]
    fn test_untouched_variable_is_zero() {
        let mut solver = ConstraintSolver::new();
        let var = SolverVariable::frame(0, Axis::Vertical);
        solver
            .require(LinearConstraint::fixed(var, 0.0, "frame = 0"))
            .unwrap();
        let solution = solver.solve();
        assert_eq!(solution.get(var), 0.0);
        assert_eq!(solution.get(SolverVariable::Spacing), 0.0);
    }

    #[test]
    fn test_sum_constraint_with_preference() {
        let mut solver = ConstraintSolver::new();
        let before = SolverVariable::padding(0, Axis::Vertical, Side::Before);
        let after = SolverVariable::padding(0, Axis::Vertical, Side::After);

        // before + after = 20, both non-negative, prefer symmetric
        solver
            .require(LinearConstraint::new(
                vec![(before, 1.0), (after, 1.0)],
                Relation::Equal,
                20.0,
                "padding sum",
            ))
            .unwrap();
        solver
            .require(LinearConstraint::at_least(before, 0.0, "before >= 0"))
            .unwrap();
        solver
            .require(LinearConstraint::at_least(after, 0.0, "after >= 0"))
            .unwrap();
        solver
            .prefer(
                LinearConstraint::equal(before, after, "symmetric"),
                Strength::MEDIUM,
            )
            .unwrap();

        let solution = solver.solve();
        assert!((solution.get(before) - 10.0).abs() < 0.001);
        assert!((solution.get(after) - 10.0).abs() < 0.001);
    }

    #[test]
    fn test_weak_preference_pushes_upward() {
        let mut solver = ConstraintSolver::new();
        let spacing = SolverVariable::Spacing;
        let pad = SolverVariable::padding(0, Axis::Horizontal, Side::After);

        // pad + spacing = 30, prefer spacing as large as possible
        solver
            .require(LinearConstraint::new(
                vec![(pad, 1.0), (spacing, 1.0)],
                Relation::Equal,
                30.0,
                "gap",
            ))
            .unwrap();
        solver
            .require(LinearConstraint::at_least(pad, 0.0, "pad >= 0"))
            .unwrap();
        solver
            .require(LinearConstraint::at_least(spacing, 0.0, "spacing >= 0"))
            .unwrap();
        solver
            .prefer(
                LinearConstraint::fixed(spacing, 1000.0, "spacing target"),
                Strength::WEAK,
            )
            .unwrap();

        let solution = solver.solve();
        assert!((solution.get(spacing) - 30.0).abs() < 0.001);
        assert!(solution.get(pad).abs() < 0.001);
    }

    #[test]
    fn test_values_map_back_to_their_variables() {
        let mut solver = ConstraintSolver::new();
        let vars: Vec<SolverVariable> = (0..4)
            .map(|i| SolverVariable::frame(i, Axis::Horizontal))
            .chain([SolverVariable::Spacing, SolverVariable::FlexibleSize])
            .collect();

        for (i, &var) in vars.iter().enumerate() {
            let value = 5.0 * (i + 1) as f64;
            solver
                .require(LinearConstraint::fixed(var, value, format!("var {}", i)))
                .unwrap();
        }
        let solution = solver.solve();

        for (i, &var) in vars.iter().enumerate() {
            assert!((solution.get(var) - 5.0 * (i + 1) as f64).abs() < 0.001);
        }
        assert_eq!(solution.values.len(), vars.len());
    }

    #[test]
    fn test_conflicting_constraints_error() {
        let mut solver = ConstraintSolver::new();
        let var = SolverVariable::FlexibleSize;

        solver
            .require(LinearConstraint::at_least(var, 200.0, "ge constraint"))
            .unwrap();
        let result = solver.require(LinearConstraint::new(
            vec![(var, 1.0)],
            Relation::LessOrEqual,
            100.0,
            "le constraint",
        ));

        match result.unwrap_err() {
            SolverError::Unsatisfiable { reason } => {
                assert!(reason.contains("conflicts"));
                assert!(reason.contains("le constraint"));
            }
            other => panic!("Expected Unsatisfiable error, got: {:?}", other),
        }
        assert_eq!(solver.required_count(), 1);
    }
}
