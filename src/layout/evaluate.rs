//! Forward layout: stack constraints to child coordinates
//!
//! This is the deterministic half of the solver. Given a stack's bounds,
//! spacing, and alignment together with each child's padding and frames, it
//! computes where every child ends up. The optimizer uses it as the oracle
//! for a successful solve.

use super::error::LayoutError;
use super::types::{Alignment, Axis, Bounds, Constraints, Side};

/// Slack allowed before a negative remaining extent counts as over-constrained
const OVERFLOW_EPSILON: f64 = 1e-9;

/// Lay out one stack level
///
/// Children sit one after another along `major_axis`. Children without a
/// major-axis frame share whatever extent is left after spacing, padding,
/// and fixed frames. On the minor axis an unframed child fills its padded
/// region, while a framed child keeps its frame and is placed in that region
/// according to the stack's alignment.
pub fn constraint_to_coords(
    bounds: &Bounds,
    major_axis: Axis,
    stack: &Constraints,
    children: &[Constraints],
) -> Result<Vec<Bounds>, LayoutError> {
    if children.is_empty() {
        return Err(LayoutError::EmptyInput);
    }

    let minor_axis = major_axis.orthogonal();
    let extent = bounds.size(major_axis);

    let gaps = (children.len() - 1) as f64 * stack.spacing;
    let padding: f64 = children.iter().map(|c| c.padding_total(major_axis)).sum();
    let fixed: f64 = children.iter().filter_map(|c| c.frame(major_axis)).sum();
    let reserved = gaps + padding + fixed;

    let remaining = extent - reserved;
    if remaining < -OVERFLOW_EPSILON {
        return Err(LayoutError::over_constrained(extent, reserved));
    }

    let flexible_count = children.iter().filter(|c| !c.is_framed(major_axis)).count();
    let flexible_size = if flexible_count == 0 {
        0.0
    } else {
        remaining.max(0.0) / flexible_count as f64
    };

    let mut offset = bounds.lead(major_axis);
    let mut placed = Vec::with_capacity(children.len());
    for child in children {
        let mut out = Bounds::new([0.0; 2], [0.0; 2]);

        offset += child.padding(major_axis, Side::Before);
        let size = child.frame(major_axis).unwrap_or(flexible_size);
        out.top_left[major_axis.index()] = offset;
        out.bot_right[major_axis.index()] = offset + size;
        offset += size + child.padding(major_axis, Side::After) + stack.spacing;

        let (lead, trail) = place_minor(bounds, minor_axis, stack.alignment, child)?;
        out.top_left[minor_axis.index()] = lead;
        out.bot_right[minor_axis.index()] = trail;

        placed.push(out);
    }
    Ok(placed)
}

/// Minor-axis span of one child
fn place_minor(
    bounds: &Bounds,
    axis: Axis,
    alignment: Alignment,
    child: &Constraints,
) -> Result<(f64, f64), LayoutError> {
    let start = bounds.lead(axis) + child.padding(axis, Side::Before);
    let end = bounds.trail(axis) - child.padding(axis, Side::After);

    match child.frame(axis) {
        Some(size) => Ok(match alignment {
            Alignment::Leading => (start, start + size),
            Alignment::Center => {
                let mid = (start + end) / 2.0;
                (mid - size / 2.0, mid + size / 2.0)
            }
            Alignment::Trailing => (end - size, end),
        }),
        None if end < start - OVERFLOW_EPSILON => Err(LayoutError::over_constrained(
            bounds.size(axis),
            child.padding_total(axis),
        )),
        None => Ok((start, end.max(start))),
    }
}
