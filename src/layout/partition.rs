//! Hierarchy inference: flat rectangles to nested stacks
//!
//! Rectangles are split into bands of mutually overlapping intervals along
//! one axis. Each band with more than one member is split again along the
//! other axis. Both starting axes are tried and the grouping that needs
//! fewer stacks wins.

use tracing::{debug, instrument, trace};

use crate::sketch::Sketch;

use super::error::LayoutError;
use super::tree::{LayoutTree, Node, NodeId};
use super::types::{Axis, Bounds};

/// Stack structure computed before anything is written to a tree
#[derive(Debug, Clone, PartialEq)]
struct Partition {
    axis: Axis,
    parts: Vec<Part>,
}

#[derive(Debug, Clone, PartialEq)]
enum Part {
    /// Index into the sketch's elements
    Leaf(usize),
    Stack(Partition),
}

/// Running state of one partitioning attempt
struct Divider<'a> {
    rects: &'a [Bounds],
    /// Number of stacks created so far
    complexity: usize,
}

impl Divider<'_> {
    /// Split `items` into bands along `axis`
    ///
    /// `must_split` is set for bands produced by a previous split: such a
    /// band already overlaps on the other axis, so failing to split here
    /// means its members overlap on both axes.
    fn divide_views(
        &mut self,
        mut items: Vec<usize>,
        axis: Axis,
        must_split: bool,
    ) -> Result<Partition, LayoutError> {
        self.complexity += 1;
        items.sort_by(|&a, &b| self.rects[a].trail(axis).total_cmp(&self.rects[b].trail(axis)));

        let mut bands: Vec<Vec<usize>> = Vec::new();
        let mut remaining = items;
        while !remaining.is_empty() {
            let seed = remaining.remove(0);
            let mut band_trail = self.rects[seed].trail(axis);
            let mut band = vec![seed];
            while let Some(pos) = remaining
                .iter()
                .position(|&i| self.rects[i].lead(axis) < band_trail)
            {
                let member = remaining.remove(pos);
                band_trail = band_trail.max(self.rects[member].trail(axis));
                band.push(member);
            }
            bands.push(band);
        }

        if must_split && bands.len() == 1 && bands[0].len() > 1 {
            return Err(LayoutError::OverlappingElements {
                count: bands[0].len(),
            });
        }

        let mut parts = Vec::with_capacity(bands.len());
        for mut band in bands {
            if band.len() == 1 {
                parts.push(Part::Leaf(band[0]));
            } else {
                // Ties on the next axis fall back to input order
                band.sort_unstable();
                parts.push(Part::Stack(self.divide_views(
                    band,
                    axis.orthogonal(),
                    true,
                )?));
            }
        }
        trace!(?axis, bands = parts.len(), "divided");
        Ok(Partition { axis, parts })
    }
}

/// Partition `rects` starting with `axis`, returning the structure and its
/// complexity
fn partition_from(rects: &[Bounds], axis: Axis) -> Result<(Partition, usize), LayoutError> {
    let mut divider = Divider {
        rects,
        complexity: 0,
    };
    let partition = divider.divide_views((0..rects.len()).collect(), axis, false)?;
    Ok((partition, divider.complexity))
}

/// Build a stack tree from a sketch
///
/// The root stack takes the container's bounds; nested stacks take the
/// bounding box of their children. Leaf geometry is copied unchanged.
#[instrument(level = "debug", skip(sketch), fields(elements = sketch.elements.len()))]
pub fn infer_hierarchy(sketch: &Sketch) -> Result<LayoutTree, LayoutError> {
    sketch.validate()?;
    let rects: Vec<Bounds> = sketch.elements.iter().map(|e| e.bounds).collect();

    let chosen = match (
        partition_from(&rects, Axis::Vertical),
        partition_from(&rects, Axis::Horizontal),
    ) {
        (Ok((vertical, vertical_complexity)), Ok((horizontal, horizontal_complexity))) => {
            debug!(
                vertical_complexity,
                horizontal_complexity, "candidate partitions"
            );
            if vertical_complexity <= horizontal_complexity {
                vertical
            } else {
                horizontal
            }
        }
        (Ok((vertical, _)), Err(_)) => vertical,
        (Err(_), Ok((horizontal, _))) => horizontal,
        (Err(e), Err(_)) => return Err(e),
    };

    let mut tree = LayoutTree::new();
    let root = tree.insert(Node::stack(sketch.container, chosen.axis), None)?;
    materialize(sketch, &chosen, &mut tree, root)?;
    Ok(tree)
}

fn materialize(
    sketch: &Sketch,
    partition: &Partition,
    tree: &mut LayoutTree,
    parent: NodeId,
) -> Result<(), LayoutError> {
    for part in &partition.parts {
        match part {
            Part::Leaf(index) => {
                let element = &sketch.elements[*index];
                tree.insert(Node::leaf(element.bounds, element.mode, *index), Some(parent))?;
            }
            Part::Stack(inner) => {
                let bbox = bounding_box(sketch, inner);
                let id = tree.insert(Node::stack(bbox, inner.axis), Some(parent))?;
                materialize(sketch, inner, tree, id)?;
            }
        }
    }
    Ok(())
}

fn bounding_box(sketch: &Sketch, partition: &Partition) -> Bounds {
    let mut boxes = partition.parts.iter().map(|part| match part {
        Part::Leaf(index) => sketch.elements[*index].bounds,
        Part::Stack(inner) => bounding_box(sketch, inner),
    });
    let first = boxes.next().unwrap_or(sketch.container);
    boxes.fold(first, |acc, b| acc.union(&b))
}
