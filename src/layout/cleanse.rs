//! Geometry cleansing
//!
//! Hand-drawn rectangles are never quite the same size or quite evenly
//! spaced. Before solving, each stack level is normalized so that leaves of
//! nearly equal size become equal, nearly equal gaps become equal, and every
//! child lines up with the stack on the minor axis. Levels are processed top
//! down and only look at their direct children.

use tracing::{debug, instrument, trace};

use super::config::LayoutConfig;
use super::tree::{LayoutTree, NodeId};
use super::types::{Alignment, Axis, Bounds};

/// Largest edge movement that still counts as "unchanged"
const CONVERGENCE_EPSILON: f64 = 1e-9;

/// Leaves whose sizes on one axis are treated as equal
#[derive(Debug, Default)]
struct SizeCluster {
    members: Vec<NodeId>,
    sizes: Vec<f64>,
}

impl SizeCluster {
    fn mean(&self) -> f64 {
        self.sizes.iter().sum::<f64>() / self.sizes.len() as f64
    }

    /// Population variance of the member sizes if `size` joined
    fn variance_with(&self, size: f64) -> f64 {
        let count = (self.sizes.len() + 1) as f64;
        let mean = (self.sizes.iter().sum::<f64>() + size) / count;
        let squares: f64 = self
            .sizes
            .iter()
            .chain(std::iter::once(&size))
            .map(|s| (s - mean).powi(2))
            .sum();
        squares / count
    }

    fn push(&mut self, id: NodeId, size: f64) {
        self.members.push(id);
        self.sizes.push(size);
    }
}

/// Running average of a group of gaps
#[derive(Debug, Clone, Copy)]
struct GapGroup {
    total: f64,
    count: usize,
}

impl GapGroup {
    fn average(&self) -> f64 {
        self.total / self.count as f64
    }
}

/// Normalize the whole tree in place
///
/// Whole-tree passes repeat until nothing moves (or the configured pass
/// limit is hit), so cleansing an already cleansed tree is a no-op. Returns
/// the number of passes run.
#[instrument(level = "debug", skip(tree, config))]
pub fn cleanse(tree: &mut LayoutTree, config: &LayoutConfig) -> usize {
    let Some(root) = tree.root() else {
        return 0;
    };

    let mut passes = 0;
    while passes < config.max_cleanse_passes {
        let before = snapshot(tree);
        cleanse_stack(tree, root, config);
        passes += 1;

        let moved = before
            .iter()
            .filter_map(|(id, bounds)| tree.node(*id).map(|n| n.bounds.max_edge_delta(bounds)))
            .fold(0.0, f64::max);
        trace!(passes, moved, "cleanse pass");
        if moved <= CONVERGENCE_EPSILON {
            break;
        }
    }
    debug!(passes, "cleansed");
    passes
}

fn snapshot(tree: &LayoutTree) -> Vec<(NodeId, Bounds)> {
    tree.stacks()
        .into_iter()
        .chain(tree.leaves())
        .filter_map(|id| tree.node(id).map(|n| (id, n.bounds)))
        .collect()
}

/// One stack level, then its nested stacks
fn cleanse_stack(tree: &mut LayoutTree, id: NodeId, config: &LayoutConfig) {
    let Some(major_axis) = tree.node(id).and_then(|n| n.major_axis()) else {
        return;
    };

    for axis in Axis::ALL {
        agree_sizes(tree, id, axis, config.size_tolerance);
    }
    snap_major(tree, id, major_axis, config.gap_tolerance);
    snap_minor(tree, id, major_axis.orthogonal(), config.minor_snap);

    let children = tree.children(id).to_vec();
    for child in children {
        if tree.node(child).is_some_and(|n| n.is_stack()) {
            cleanse_stack(tree, child, config);
            tree.refresh_bounds(child);
        }
    }
}

/// Cluster the direct leaf children by size and give each cluster its mean
fn agree_sizes(tree: &mut LayoutTree, id: NodeId, axis: Axis, tolerance: f64) {
    let mut clusters: Vec<SizeCluster> = Vec::new();

    for &child in tree.children(id) {
        let Some(node) = tree.node(child) else {
            continue;
        };
        if node.is_stack() {
            continue;
        }
        let size = node.bounds.size(axis);

        let closest = clusters
            .iter_mut()
            .min_by(|a, b| (a.mean() - size).abs().total_cmp(&(b.mean() - size).abs()));
        match closest {
            Some(cluster) if cluster.variance_with(size) <= tolerance => cluster.push(child, size),
            _ => {
                let mut cluster = SizeCluster::default();
                cluster.push(child, size);
                clusters.push(cluster);
            }
        }
    }

    trace!(?axis, clusters = clusters.len(), "size clusters");
    for cluster in &clusters {
        let mean = cluster.mean();
        for &member in &cluster.members {
            if let Some(node) = tree.node_mut(member) {
                node.bounds.set_size(axis, mean);
            }
        }
    }
}

/// Equalize similar gaps along the major axis and re-lay children
fn snap_major(tree: &mut LayoutTree, id: NodeId, axis: Axis, tolerance: f64) {
    let children = tree.children(id).to_vec();
    if children.len() < 2 {
        return;
    }

    let bounds: Vec<Bounds> = children
        .iter()
        .filter_map(|&c| tree.node(c).map(|n| n.bounds))
        .collect();
    let gaps: Vec<f64> = bounds
        .windows(2)
        .map(|pair| pair[1].lead(axis) - pair[0].trail(axis))
        .collect();

    let mut groups: Vec<GapGroup> = Vec::new();
    let mut assignment = Vec::with_capacity(gaps.len());
    for &gap in &gaps {
        let closest = groups
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| {
                (a.average() - gap)
                    .abs()
                    .total_cmp(&(b.average() - gap).abs())
            })
            .map(|(index, group)| (index, group.average()));
        match closest {
            Some((index, average)) if (gap - average).abs() <= tolerance => {
                groups[index].total += gap;
                groups[index].count += 1;
                assignment.push(index);
            }
            _ => {
                groups.push(GapGroup {
                    total: gap,
                    count: 1,
                });
                assignment.push(groups.len() - 1);
            }
        }
    }
    trace!(?axis, groups = groups.len(), "gap groups");

    // The first child stays put; everything after it follows the snapped gaps
    let mut cursor = bounds[0].trail(axis);
    for (i, &child) in children.iter().enumerate().skip(1) {
        let gap = groups[assignment[i - 1]].average().max(0.0);
        let Some(current) = tree.node(child).map(|n| n.bounds) else {
            continue;
        };
        let target = cursor + gap;
        tree.translate_subtree(child, axis, target - current.lead(axis));
        cursor = target + current.size(axis);
    }
}

/// Line every child up with the stack on the minor axis
fn snap_minor(tree: &mut LayoutTree, id: NodeId, axis: Axis, snap: Alignment) {
    let Some(stack) = tree.node(id).map(|n| n.bounds) else {
        return;
    };
    let children = tree.children(id).to_vec();
    for child in children {
        let Some(current) = tree.node(child).map(|n| n.bounds) else {
            continue;
        };
        let delta = match snap {
            Alignment::Leading => stack.lead(axis) - current.lead(axis),
            Alignment::Center => stack.center(axis) - current.center(axis),
            Alignment::Trailing => stack.trail(axis) - current.trail(axis),
        };
        tree.translate_subtree(child, axis, delta);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::partition::infer_hierarchy;
    use crate::layout::types::FrameMode;
    use crate::sketch::{Sketch, SketchElement};

    const EPS: f64 = 1e-6;

    fn leaf_bounds(tree: &LayoutTree) -> Vec<Bounds> {
        tree.leaves()
            .into_iter()
            .map(|id| tree.node(id).unwrap().bounds)
            .collect()
    }

    fn column_sketch() -> Sketch {
        Sketch::new(
            Bounds::from_edges(0.0, 0.0, 100.0, 100.0),
            vec![
                SketchElement::new(Bounds::from_edges(10.0, 20.0, 30.0, 80.0), FrameMode::Unframed),
                SketchElement::new(Bounds::from_edges(40.0, 25.0, 62.0, 75.0), FrameMode::Unframed),
                SketchElement::new(Bounds::from_edges(71.0, 22.0, 91.0, 78.0), FrameMode::Unframed),
            ],
        )
    }

    #[test]
    fn test_similar_sizes_agree() {
        let mut tree = infer_hierarchy(&column_sketch()).unwrap();
        cleanse(&mut tree, &LayoutConfig::default());

        let leaves = leaf_bounds(&tree);
        for axis in Axis::ALL {
            let first = leaves[0].size(axis);
            for leaf in &leaves {
                assert!((leaf.size(axis) - first).abs() < EPS, "{:?}", leaves);
            }
        }
    }

    #[test]
    fn test_distinct_sizes_stay_apart() {
        let mut tree = infer_hierarchy(&Sketch::new(
            Bounds::from_edges(0.0, 0.0, 100.0, 200.0),
            vec![
                SketchElement::unframed(Bounds::from_edges(10.0, 10.0, 90.0, 30.0)),
                SketchElement::unframed(Bounds::from_edges(10.0, 50.0, 90.0, 150.0)),
            ],
        ))
        .unwrap();
        cleanse(&mut tree, &LayoutConfig::default());

        let leaves = leaf_bounds(&tree);
        assert!((leaves[0].size(Axis::Horizontal) - 20.0).abs() < EPS);
        assert!((leaves[1].size(Axis::Horizontal) - 100.0).abs() < EPS);
    }

    #[test]
    fn test_gaps_snap_and_first_child_stays() {
        let mut tree = infer_hierarchy(&column_sketch()).unwrap();
        cleanse(&mut tree, &LayoutConfig::default());

        let leaves = leaf_bounds(&tree);
        assert!((leaves[0].lead(Axis::Vertical) - 10.0).abs() < EPS);
        let gap_a = leaves[1].lead(Axis::Vertical) - leaves[0].trail(Axis::Vertical);
        let gap_b = leaves[2].lead(Axis::Vertical) - leaves[1].trail(Axis::Vertical);
        assert!((gap_a - gap_b).abs() < EPS, "gaps {} vs {}", gap_a, gap_b);
    }

    #[test]
    fn test_children_centered_on_minor_axis() {
        let mut tree = infer_hierarchy(&column_sketch()).unwrap();
        cleanse(&mut tree, &LayoutConfig::default());

        for leaf in leaf_bounds(&tree) {
            assert!((leaf.center(Axis::Horizontal) - 50.0).abs() < EPS);
        }
    }

    #[test]
    fn test_leading_minor_snap() {
        let mut tree = infer_hierarchy(&column_sketch()).unwrap();
        cleanse(
            &mut tree,
            &LayoutConfig::default().with_minor_snap(Alignment::Leading),
        );

        for leaf in leaf_bounds(&tree) {
            assert!(leaf.lead(Axis::Horizontal).abs() < EPS);
        }
    }

    #[test]
    fn test_cleanse_is_idempotent() {
        let mut tree = infer_hierarchy(&Sketch::new(
            Bounds::from_edges(0.0, 0.0, 200.0, 120.0),
            vec![
                SketchElement::unframed(Bounds::from_edges(8.0, 10.0, 30.0, 110.0)),
                SketchElement::unframed(Bounds::from_edges(42.0, 12.0, 90.0, 52.0)),
                SketchElement::unframed(Bounds::from_edges(44.0, 66.0, 88.0, 108.0)),
                SketchElement::unframed(Bounds::from_edges(101.0, 30.0, 121.0, 90.0)),
            ],
        ))
        .unwrap();
        let config = LayoutConfig::default();
        cleanse(&mut tree, &config);
        let once = snapshot(&tree);

        let passes = cleanse(&mut tree, &config);

        assert_eq!(passes, 1);
        for (id, bounds) in once {
            let again = tree.node(id).unwrap().bounds;
            assert!(again.max_edge_delta(&bounds) < EPS, "{:?} moved", id);
        }
    }

    #[test]
    fn test_nested_stack_moves_rigidly() {
        let mut tree = infer_hierarchy(&Sketch::new(
            Bounds::from_edges(0.0, 0.0, 100.0, 100.0),
            vec![
                SketchElement::unframed(Bounds::from_edges(5.0, 5.0, 20.0, 95.0)),
                SketchElement::unframed(Bounds::from_edges(30.0, 5.0, 90.0, 45.0)),
                SketchElement::unframed(Bounds::from_edges(30.0, 55.0, 90.0, 95.0)),
            ],
        ))
        .unwrap();
        cleanse(&mut tree, &LayoutConfig::default());

        let root = tree.root().unwrap();
        let row = tree.children(root)[1];
        let row_bounds = tree.node(row).unwrap().bounds;
        let inner: Vec<Bounds> = tree
            .children(row)
            .iter()
            .map(|&c| tree.node(c).unwrap().bounds)
            .collect();
        let bbox = inner[0].union(&inner[1]);
        assert!(row_bounds.max_edge_delta(&bbox) < EPS);
        assert!((row_bounds.center(Axis::Horizontal) - 50.0).abs() < EPS);
    }
}
