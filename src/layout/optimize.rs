//! Inverse layout: recover constraints from observed geometry
//!
//! For one stack level the unknowns are the shared spacing and alignment
//! plus every child's padding and frames. The equations tying them to the
//! observed edges are those of [`constraint_to_coords`], but they are
//! conditional: whether a child is flexible decides which extent it gets,
//! and the number of flexible children (an indicator sum over the frame
//! variables) appears inside the flexible size itself.
//!
//! The search case-splits on those indicators and on the alignment. Each
//! branch fixes which frame variables are zero, which turns the system into
//! plain linear real arithmetic that kasuari solves with the hard equations
//! as required constraints and the softer preferences weighted below them.
//! Feasible branches are then ranked on the exact objective counts.
//!
//! Inside a branch the symmetry preference is an approximation: kasuari
//! minimizes the summed error `Σ |before − after|`, not the number of
//! asymmetric sides. A vertex that spreads asymmetry over several sides can
//! win over one that concentrates it on a single side. The count only
//! decides between branches, through [`Score::symmetric_sides`].
//!
//! Only a linear number of branches is tried (see `candidate_branches`),
//! and every one of them counts against
//! [`SolveBudget::max_candidates`](super::config::SolveBudget::max_candidates).

use std::cmp::Ordering;
use std::time::Instant;

use kasuari::Strength;
use thiserror::Error;
use tracing::{debug, instrument, trace, warn};

use super::config::{FailurePolicy, LayoutConfig};
use super::error::LayoutError;
use super::evaluate::constraint_to_coords;
use super::solver::{ConstraintSolver, LinearConstraint, Relation, SolverError, SolverVariable};
use super::tree::{LayoutTree, NodeId};
use super::types::{Alignment, Axis, Bounds, Constraints, FrameMode, Side};

/// Two values closer than this are considered equal when scoring
const SCORE_EPSILON: f64 = 1e-6;

/// Float noise allowed on top of `verify_tolerance`
const VERIFY_SLACK: f64 = 1e-9;

/// Passes spent settling the last trailing padding after rounding
const SETTLE_PASSES: usize = 3;

/// Observed geometry of one stack level
#[derive(Debug, Clone)]
pub struct LevelProblem {
    pub bounds: Bounds,
    pub major_axis: Axis,
    pub children: Vec<(Bounds, FrameMode)>,
}

impl LevelProblem {
    /// Read a stack level out of the tree
    pub fn from_tree(tree: &LayoutTree, id: NodeId) -> Result<Self, LayoutError> {
        let stack = tree.stack(id)?;
        let major_axis = stack.major_axis().ok_or(LayoutError::NotAStack(id))?;
        let children = stack
            .children()
            .iter()
            .map(|&child| {
                tree.node(child)
                    .map(|n| (n.bounds, n.mode()))
                    .ok_or(LayoutError::UnknownNode(child))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            bounds: stack.bounds,
            major_axis,
            children,
        })
    }
}

/// Objective values of a solution, compared lexicographically
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Score {
    /// Child pairs whose (height, width) frames are equal
    pub equal_frame_pairs: usize,
    /// Child/axis pairs with equal padding on both sides
    pub symmetric_sides: usize,
    pub centered: bool,
    /// Spacing, counted only when there is more than one child
    pub spacing: f64,
}

impl Score {
    fn compare(&self, other: &Score) -> Ordering {
        (self.equal_frame_pairs, self.symmetric_sides, self.centered)
            .cmp(&(other.equal_frame_pairs, other.symmetric_sides, other.centered))
            .then_with(|| {
                if (self.spacing - other.spacing).abs() <= SCORE_EPSILON {
                    Ordering::Equal
                } else {
                    self.spacing.total_cmp(&other.spacing)
                }
            })
    }
}

/// Solved constraints for one stack level
#[derive(Debug, Clone)]
pub struct LevelSolution {
    pub spacing: f64,
    pub alignment: Alignment,
    /// Padding and frames per child; other fields are left at their defaults
    pub children: Vec<Constraints>,
    pub score: Score,
    /// Candidate branches handed to the solver
    pub explored: usize,
}

impl LevelSolution {
    /// Stack-side constraints (spacing and alignment)
    pub fn stack_constraints(&self) -> Constraints {
        Constraints::default()
            .with_spacing(self.spacing)
            .with_alignment(self.alignment)
    }

    fn rounded(&self, config: &LayoutConfig) -> LevelSolution {
        let children = self
            .children
            .iter()
            .map(|c| {
                let mut out = Constraints::default();
                for axis in Axis::ALL {
                    for side in Side::ALL {
                        out.set_padding(axis, side, config.round(c.padding(axis, side)));
                    }
                    out.set_frame(
                        axis,
                        c.frame(axis).map(|f| config.round(f).max(config.min_frame)),
                    );
                }
                out
            })
            .collect();
        LevelSolution {
            spacing: config.round(self.spacing),
            children,
            ..self.clone()
        }
    }

    /// Re-anchor major-axis paddings on the observed leading edges
    ///
    /// Rounding every value on its own lets the errors add up along the
    /// stack, and the reserved extent can end up larger than the stack.
    /// Leading paddings are recomputed against the rounded running offset
    /// and the last trailing padding takes the remainder.
    fn settle_major(&mut self, problem: &LevelProblem, config: &LayoutConfig) {
        let major = problem.major_axis;
        let origin = problem.bounds.lead(major);
        let extent = problem.bounds.size(major);
        let Some(last) = self.children.len().checked_sub(1) else {
            return;
        };
        let flexible: Vec<usize> = (0..self.children.len())
            .filter(|&i| !self.children[i].is_framed(major))
            .collect();
        let target = flexible
            .first()
            .and_then(|&i| problem.children.get(i))
            .map(|(bounds, _)| bounds.size(major));
        let mut flexible_size = target.unwrap_or(0.0);

        let spacing = self.spacing;
        for _ in 0..SETTLE_PASSES {
            let mut cursor = origin;
            let observed = problem.children.iter().map(|(bounds, _)| bounds);
            for (i, (observed, child)) in observed.zip(self.children.iter_mut()).enumerate() {
                if i > 0 {
                    cursor += spacing;
                }
                let before = config.round(observed.lead(major) - cursor).max(0.0);
                child.set_padding(major, Side::Before, before);
                cursor += before + child.frame(major).unwrap_or(flexible_size);
                if i < last {
                    cursor += child.padding(major, Side::After);
                }
            }

            // Everything but the flexible extents and the last trailing padding
            let shared = flexible.len() as f64 * flexible_size;
            let fixed = cursor - origin - shared;
            let after = match target {
                Some(size) => config.round(extent - fixed - flexible.len() as f64 * size),
                None => {
                    let current = self.children[last].padding(major, Side::After);
                    config.round(current).min(config.round_down(extent - fixed))
                }
            }
            .max(0.0);
            if let Some(child) = self.children.last_mut() {
                child.set_padding(major, Side::After, after);
            }
            if !flexible.is_empty() {
                flexible_size = (extent - fixed - after) / flexible.len() as f64;
            }
        }
    }

    /// Check that the solution reproduces the observed child geometry
    ///
    /// Every child edge must land within `verify_tolerance` of where it was
    /// observed.
    pub fn verify(&self, problem: &LevelProblem, config: &LayoutConfig) -> Result<(), LayoutError> {
        let placed = constraint_to_coords(
            &problem.bounds,
            problem.major_axis,
            &self.stack_constraints(),
            &self.children,
        )?;
        for (child, (actual, (expected, _))) in placed.iter().zip(&problem.children).enumerate() {
            if actual.max_edge_delta(expected) > config.verify_tolerance + VERIFY_SLACK {
                return Err(LayoutError::RoundTripMismatch {
                    child,
                    expected: *expected,
                    actual: *actual,
                });
            }
        }
        Ok(())
    }
}

/// Which frame variables are non-zero in one branch
#[derive(Debug, Clone, PartialEq)]
struct Branch {
    major_framed: Vec<bool>,
    minor_framed: Vec<bool>,
    alignment: Alignment,
}

impl Branch {
    /// `Σ [frame_major = 0]`, the number of children sharing leftover space
    fn flexible_count(&self) -> usize {
        self.major_framed.iter().filter(|framed| !**framed).count()
    }
}

/// Indices of `Unframed` children grouped by observed major size
///
/// Classes come in order of their first member.
fn size_classes(problem: &LevelProblem) -> Vec<Vec<usize>> {
    let major = problem.major_axis;
    let mut classes: Vec<(f64, Vec<usize>)> = Vec::new();
    for (i, (bounds, mode)) in problem.children.iter().enumerate() {
        if *mode == FrameMode::Framed {
            continue;
        }
        let size = bounds.size(major);
        match classes
            .iter_mut()
            .find(|(class_size, _)| (class_size - size).abs() <= SCORE_EPSILON)
        {
            Some((_, members)) => members.push(i),
            None => classes.push((size, vec![i])),
        }
    }
    classes.into_iter().map(|(_, members)| members).collect()
}

/// Frame indicator assignments worth solving, in a fixed order
///
/// Flexible children share one extent, so a flexible set is drawn from a
/// single size class: either a whole class or nobody. On the minor axis an
/// `Unframed` child is framed either never, always, or when it sits off
/// center toward the aligned edge. `Framed` children have both indicators
/// set. This keeps the branch count linear in the number of children.
fn candidate_branches(problem: &LevelProblem) -> Vec<Branch> {
    let n = problem.children.len();
    let minor = problem.major_axis.orthogonal();
    let start = problem.bounds.lead(minor);
    let end = problem.bounds.trail(minor);
    let fixed: Vec<bool> = problem
        .children
        .iter()
        .map(|(_, mode)| *mode == FrameMode::Framed)
        .collect();

    let mut majors: Vec<Vec<bool>> = size_classes(problem)
        .into_iter()
        .map(|class| {
            let mut framed = vec![true; n];
            for i in class {
                framed[i] = false;
            }
            framed
        })
        .collect();
    majors.push(vec![true; n]);

    let toward_edge = |alignment: Alignment| -> Vec<bool> {
        problem
            .children
            .iter()
            .zip(&fixed)
            .map(|((bounds, _), &is_fixed)| {
                let before = bounds.lead(minor) - start;
                let after = end - bounds.trail(minor);
                is_fixed
                    || match alignment {
                        Alignment::Leading => before < after - SCORE_EPSILON,
                        Alignment::Trailing => after < before - SCORE_EPSILON,
                        Alignment::Center => false,
                    }
            })
            .collect()
    };

    let mut minors: Vec<(Vec<bool>, Alignment)> = Vec::new();
    for alignment in [Alignment::Center, Alignment::Leading, Alignment::Trailing] {
        for framed in [fixed.clone(), toward_edge(alignment), vec![true; n]] {
            // Alignment only moves framed children
            if alignment != Alignment::Center && !framed.iter().any(|f| *f) {
                continue;
            }
            let candidate = (framed, alignment);
            if !minors.contains(&candidate) {
                minors.push(candidate);
            }
        }
    }

    let mut branches = Vec::with_capacity(majors.len() * minors.len());
    for major_framed in &majors {
        for (minor_framed, alignment) in &minors {
            branches.push(Branch {
                major_framed: major_framed.clone(),
                minor_framed: minor_framed.clone(),
                alignment: *alignment,
            });
        }
    }
    branches
}

/// Search the candidate branches within budget and return the best
/// unrounded solution
#[instrument(level = "debug", skip(problem, config), fields(children = problem.children.len()))]
pub fn optimize(problem: &LevelProblem, config: &LayoutConfig) -> Result<LevelSolution, LayoutError> {
    if problem.children.is_empty() {
        return Err(LayoutError::EmptyInput);
    }

    let started = Instant::now();
    let time_limit = config.budget.time_limit();
    let branches = candidate_branches(problem);
    debug!(branches = branches.len(), "enumerated candidate branches");

    let mut best: Option<LevelSolution> = None;
    let mut explored = 0usize;
    let mut cut_short = false;

    for branch in &branches {
        let over_time = time_limit.is_some_and(|limit| started.elapsed() >= limit);
        if explored >= config.budget.max_candidates || over_time {
            cut_short = true;
            break;
        }
        explored += 1;

        let Some(candidate) = solve_branch(problem, branch, config)? else {
            continue;
        };
        trace!(?branch, score = ?candidate.score, "feasible branch");

        let improves = best
            .as_ref()
            .map_or(true, |b| candidate.score.compare(&b.score) == Ordering::Greater);
        if improves {
            best = Some(candidate);
        }
    }

    match best {
        Some(mut solution) => {
            if cut_short {
                warn!(explored, "budget exhausted, keeping best solution found so far");
            }
            solution.explored = explored;
            debug!(explored, score = ?solution.score, "level optimized");
            Ok(solution)
        }
        None if cut_short => Err(LayoutError::BudgetExhausted { explored }),
        None => Err(LayoutError::unsatisfiable(format!(
            "no assignment reproduces the observed geometry ({} branches tried)",
            explored
        ))),
    }
}

/// Build and solve the linear system of one branch
///
/// Returns `Ok(None)` when the branch is infeasible.
fn solve_branch(
    problem: &LevelProblem,
    branch: &Branch,
    config: &LayoutConfig,
) -> Result<Option<LevelSolution>, LayoutError> {
    let mut solver = ConstraintSolver::new();
    match add_branch_constraints(&mut solver, problem, branch, config) {
        Ok(()) => {}
        Err(SolverError::Unsatisfiable { reason }) => {
            trace!(%reason, "branch infeasible");
            return Ok(None);
        }
        Err(e) => return Err(e.into()),
    }
    let solution = solver.solve();

    let children: Vec<Constraints> = (0..problem.children.len())
        .map(|i| {
            let mut c = Constraints::default();
            for axis in Axis::ALL {
                for side in Side::ALL {
                    let value = solution.get(SolverVariable::padding(i, axis, side));
                    c.set_padding(axis, side, value.max(0.0));
                }
                let frame = solution.get(SolverVariable::frame(i, axis));
                c.set_frame(axis, Some(frame).filter(|f| *f > SCORE_EPSILON));
            }
            c
        })
        .collect();
    let spacing = solution.get(SolverVariable::Spacing).max(0.0);

    Ok(Some(LevelSolution {
        score: score(&children, spacing, branch.alignment),
        spacing,
        alignment: branch.alignment,
        children,
        explored: 0,
    }))
}

fn add_branch_constraints(
    solver: &mut ConstraintSolver,
    problem: &LevelProblem,
    branch: &Branch,
    config: &LayoutConfig,
) -> Result<(), SolverError> {
    use SolverVariable::{FlexibleSize, Spacing};

    let n = problem.children.len();
    let major = problem.major_axis;
    let minor = major.orthogonal();
    let origin = problem.bounds.lead(major);
    let extent = problem.bounds.size(major);

    solver.require(LinearConstraint::at_least(Spacing, 0.0, "spacing >= 0"))?;
    for i in 0..n {
        for axis in Axis::ALL {
            for side in Side::ALL {
                solver.require(LinearConstraint::at_least(
                    SolverVariable::padding(i, axis, side),
                    0.0,
                    format!("child {} padding {:?} {:?} >= 0", i, axis, side),
                ))?;
            }
        }
    }

    // Frame indicators
    for i in 0..n {
        for (axis, framed) in [
            (major, branch.major_framed[i]),
            (minor, branch.minor_framed[i]),
        ] {
            let frame = SolverVariable::frame(i, axis);
            if framed {
                solver.require(LinearConstraint::at_least(
                    frame,
                    config.min_frame,
                    format!("child {} frame {:?} fixed", i, axis),
                ))?;
            } else {
                solver.require(LinearConstraint::fixed(
                    frame,
                    0.0,
                    format!("child {} frame {:?} flexible", i, axis),
                ))?;
            }
        }
    }

    // Major axis: extent bookkeeping
    let flexible_count = branch.flexible_count();
    let mut reserved: Vec<(SolverVariable, f64)> = vec![(Spacing, (n - 1) as f64)];
    for i in 0..n {
        reserved.push((SolverVariable::padding(i, major, Side::Before), 1.0));
        reserved.push((SolverVariable::padding(i, major, Side::After), 1.0));
        if branch.major_framed[i] {
            reserved.push((SolverVariable::frame(i, major), 1.0));
        }
    }
    if flexible_count > 0 {
        let mut terms = reserved;
        terms.push((FlexibleSize, flexible_count as f64));
        solver.require(LinearConstraint::new(
            terms,
            Relation::Equal,
            extent,
            "flexible children share the remaining extent",
        ))?;
    } else {
        solver.require(LinearConstraint::new(
            reserved,
            Relation::LessOrEqual,
            extent,
            "fixed content fits the stack",
        ))?;
        solver.require(LinearConstraint::fixed(FlexibleSize, 0.0, "no flexible children"))?;
    }

    // Major axis: edge equations, accumulated child by child
    let mut offset: Vec<(SolverVariable, f64)> = Vec::new();
    for (i, (observed, _)) in problem.children.iter().enumerate() {
        if i > 0 {
            offset.push((Spacing, 1.0));
        }
        offset.push((SolverVariable::padding(i, major, Side::Before), 1.0));
        solver.require(LinearConstraint::new(
            offset.clone(),
            Relation::Equal,
            observed.lead(major) - origin,
            format!("child {} leading edge", i),
        ))?;

        let size_var = if branch.major_framed[i] {
            SolverVariable::frame(i, major)
        } else {
            FlexibleSize
        };
        offset.push((size_var, 1.0));
        solver.require(LinearConstraint::new(
            offset.clone(),
            Relation::Equal,
            observed.trail(major) - origin,
            format!("child {} trailing edge", i),
        ))?;
        offset.push((SolverVariable::padding(i, major, Side::After), 1.0));
    }

    // Minor axis: one of four placements per child
    let start = problem.bounds.lead(minor);
    let end = problem.bounds.trail(minor);
    for (i, (observed, _)) in problem.children.iter().enumerate() {
        let before = SolverVariable::padding(i, minor, Side::Before);
        let after = SolverVariable::padding(i, minor, Side::After);
        let frame = SolverVariable::frame(i, minor);
        let lo = observed.lead(minor);
        let hi = observed.trail(minor);

        let equations: [(Vec<(SolverVariable, f64)>, f64); 2] = if !branch.minor_framed[i] {
            [
                (vec![(before, 1.0)], lo - start),
                (vec![(after, 1.0)], end - hi),
            ]
        } else {
            match branch.alignment {
                Alignment::Leading => [
                    (vec![(before, 1.0)], lo - start),
                    (vec![(before, 1.0), (frame, 1.0)], hi - start),
                ],
                Alignment::Trailing => [
                    (vec![(after, 1.0)], end - hi),
                    (vec![(after, 1.0), (frame, 1.0)], end - lo),
                ],
                Alignment::Center => [
                    // 2·lo = start + end + before − after − frame
                    (
                        vec![(before, 1.0), (after, -1.0), (frame, -1.0)],
                        2.0 * lo - start - end,
                    ),
                    (
                        vec![(before, 1.0), (after, -1.0), (frame, 1.0)],
                        2.0 * hi - start - end,
                    ),
                ],
            }
        };
        if branch.minor_framed[i] {
            solver.require(LinearConstraint::new(
                vec![(before, 1.0), (frame, 1.0), (after, 1.0)],
                Relation::LessOrEqual,
                end - start,
                format!("child {} frame fits its region", i),
            ))?;
        }
        for (terms, constant) in equations {
            solver.require(LinearConstraint::new(
                terms,
                Relation::Equal,
                constant,
                format!("child {} minor placement", i),
            ))?;
        }
    }

    // Preferences below the hard constraints: symmetric padding, then spacing
    for i in 0..n {
        for axis in Axis::ALL {
            solver.prefer(
                LinearConstraint::equal(
                    SolverVariable::padding(i, axis, Side::Before),
                    SolverVariable::padding(i, axis, Side::After),
                    format!("child {} symmetric {:?} padding", i, axis),
                ),
                Strength::MEDIUM,
            )?;
        }
    }
    let spacing_target = if n > 1 { extent } else { 0.0 };
    solver.prefer(
        LinearConstraint::fixed(Spacing, spacing_target, "spacing preference"),
        Strength::WEAK,
    )?;

    Ok(())
}

fn score(children: &[Constraints], spacing: f64, alignment: Alignment) -> Score {
    let frames: Vec<[f64; 2]> = children
        .iter()
        .map(|c| Axis::ALL.map(|axis| c.frame(axis).unwrap_or(0.0)))
        .collect();
    let mut equal_frame_pairs = 0;
    for i in 0..frames.len() {
        for j in i + 1..frames.len() {
            let same = (0..2).all(|k| (frames[i][k] - frames[j][k]).abs() <= SCORE_EPSILON);
            if same {
                equal_frame_pairs += 1;
            }
        }
    }

    let symmetric_sides = children
        .iter()
        .flat_map(|c| {
            Axis::ALL.map(|axis| {
                (c.padding(axis, Side::Before) - c.padding(axis, Side::After)).abs()
                    <= SCORE_EPSILON
            })
        })
        .filter(|symmetric| *symmetric)
        .count();

    Score {
        equal_frame_pairs,
        symmetric_sides,
        centered: alignment == Alignment::Center,
        spacing: if children.len() > 1 { spacing } else { 0.0 },
    }
}

/// Solve one stack level and write the result onto the tree
///
/// The optimized values are rounded, re-evaluated, and only written back
/// when they reproduce the observed child geometry. When rounding alone
/// breaks the round trip the full-precision values are checked and written
/// instead.
#[instrument(level = "debug", skip(tree, config))]
pub fn solve_level(
    tree: &mut LayoutTree,
    id: NodeId,
    config: &LayoutConfig,
) -> Result<LevelSolution, LayoutError> {
    let problem = LevelProblem::from_tree(tree, id)?;
    let exact = optimize(&problem, config)?;
    let mut rounded = exact.rounded(config);
    rounded.settle_major(&problem, config);

    let solution = match rounded.verify(&problem, config) {
        Ok(()) => rounded,
        Err(error) => {
            debug!(%error, "rounded values drift, keeping full precision");
            exact.verify(&problem, config)?;
            exact
        }
    };

    if let Some(stack) = tree.node_mut(id) {
        stack.constraints.spacing = solution.spacing;
        stack.constraints.alignment = solution.alignment;
    }
    let children = tree.children(id).to_vec();
    for (child, solved) in children.into_iter().zip(&solution.children) {
        if let Some(node) = tree.node_mut(child) {
            node.constraints.padding = solved.padding;
            node.constraints.frame = solved.frame;
        }
    }
    Ok(solution)
}

/// A stack level that could not be solved
#[derive(Debug, Error)]
#[error("level {node:?} could not be solved: {error}")]
pub struct LevelFailure {
    pub node: NodeId,
    #[source]
    pub error: LayoutError,
}

/// Outcome of solving every level of a tree
#[derive(Debug, Default)]
pub struct SolveReport {
    pub solved: Vec<NodeId>,
    pub failures: Vec<LevelFailure>,
}

impl SolveReport {
    /// Every level was solved
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn is_solved(&self, id: NodeId) -> bool {
        self.solved.contains(&id)
    }
}

/// Solve every stack level, parents first
///
/// With [`FailurePolicy::Abort`] the first failing level is returned as the
/// error; with [`FailurePolicy::Collect`] failures are gathered in the report
/// and the remaining levels are still solved.
#[instrument(level = "debug", skip(tree, config))]
pub fn solve_tree(tree: &mut LayoutTree, config: &LayoutConfig) -> Result<SolveReport, LevelFailure> {
    let mut report = SolveReport::default();
    for id in tree.stacks() {
        if tree.children(id).is_empty() {
            debug!(?id, "skipping empty stack");
            continue;
        }
        match solve_level(tree, id, config) {
            Ok(_) => report.solved.push(id),
            Err(error) => match config.failure_policy {
                FailurePolicy::Abort => return Err(LevelFailure { node: id, error }),
                FailurePolicy::Collect => {
                    warn!(?id, %error, "level left unsolved");
                    report.failures.push(LevelFailure { node: id, error });
                }
            },
        }
    }
    Ok(report)
}
