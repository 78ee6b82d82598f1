//! Arena-backed stack tree
//!
//! Nodes live in a generational arena and refer to their children by index.
//! Parent links are kept in a separate lookup table so no node owns or
//! borrows its parent.

use std::collections::HashMap;
use std::fmt;

use generational_arena::{Arena, Index};
use tracing::instrument;

use super::error::LayoutError;
use super::evaluate::constraint_to_coords;
use super::types::{Axis, Bounds, Constraints, FrameMode};

/// Handle to a node in a [`LayoutTree`]
pub type NodeId = Index;

/// Leaf or stack payload
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// A sketched element
    Leaf {
        mode: FrameMode,
        /// Position of the element in the input list (container excluded)
        source: usize,
    },
    /// A container arranging children along `major_axis`
    Stack {
        major_axis: Axis,
        children: Vec<NodeId>,
    },
}

/// Geometry plus constraints for one node
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub bounds: Bounds,
    pub constraints: Constraints,
    pub kind: NodeKind,
}

impl Node {
    pub fn leaf(bounds: Bounds, mode: FrameMode, source: usize) -> Self {
        Self {
            bounds,
            constraints: Constraints::default(),
            kind: NodeKind::Leaf { mode, source },
        }
    }

    pub fn stack(bounds: Bounds, major_axis: Axis) -> Self {
        Self {
            bounds,
            constraints: Constraints::default(),
            kind: NodeKind::Stack {
                major_axis,
                children: Vec::new(),
            },
        }
    }

    pub fn is_stack(&self) -> bool {
        matches!(self.kind, NodeKind::Stack { .. })
    }

    pub fn major_axis(&self) -> Option<Axis> {
        match self.kind {
            NodeKind::Stack { major_axis, .. } => Some(major_axis),
            NodeKind::Leaf { .. } => None,
        }
    }

    /// Children of a stack, empty for leaves
    pub fn children(&self) -> &[NodeId] {
        match &self.kind {
            NodeKind::Stack { children, .. } => children,
            NodeKind::Leaf { .. } => &[],
        }
    }

    /// Sizing hint; stacks are always free to choose
    pub fn mode(&self) -> FrameMode {
        match self.kind {
            NodeKind::Leaf { mode, .. } => mode,
            NodeKind::Stack { .. } => FrameMode::Unframed,
        }
    }
}

/// Nested stack hierarchy
#[derive(Debug, Clone, Default)]
pub struct LayoutTree {
    arena: Arena<Node>,
    parents: HashMap<NodeId, NodeId>,
    root: Option<NodeId>,
}

impl LayoutTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a node, appending it to `parent`'s children
    ///
    /// The first node inserted without a parent becomes the root.
    #[instrument(level = "trace", skip(self, node))]
    pub fn insert(&mut self, node: Node, parent: Option<NodeId>) -> Result<NodeId, LayoutError> {
        if let Some(parent_id) = parent {
            match self.arena.get(parent_id) {
                Some(p) if p.is_stack() => {}
                Some(_) => return Err(LayoutError::NotAStack(parent_id)),
                None => return Err(LayoutError::UnknownNode(parent_id)),
            }
        }

        let id = self.arena.insert(node);
        match parent {
            Some(parent_id) => {
                if let Some(Node {
                    kind: NodeKind::Stack { children, .. },
                    ..
                }) = self.arena.get_mut(parent_id)
                {
                    children.push(id);
                }
                self.parents.insert(id, parent_id);
            }
            None => {
                if self.root.is_none() {
                    self.root = Some(id);
                }
            }
        }
        Ok(id)
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.arena.get(id)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.arena.get_mut(id)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.parents.get(&id).copied()
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.node(id).map(Node::children).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    /// Look up a stack, failing for leaves and foreign ids
    pub fn stack(&self, id: NodeId) -> Result<&Node, LayoutError> {
        match self.node(id) {
            Some(node) if node.is_stack() => Ok(node),
            Some(_) => Err(LayoutError::NotAStack(id)),
            None => Err(LayoutError::UnknownNode(id)),
        }
    }

    /// All stacks, parents before children
    pub fn stacks(&self) -> Vec<NodeId> {
        self.preorder()
            .into_iter()
            .filter(|&id| self.node(id).is_some_and(Node::is_stack))
            .collect()
    }

    /// All leaves in reading order
    pub fn leaves(&self) -> Vec<NodeId> {
        self.preorder()
            .into_iter()
            .filter(|&id| self.node(id).is_some_and(|n| !n.is_stack()))
            .collect()
    }

    pub fn stack_count(&self) -> usize {
        self.arena.iter().filter(|(_, n)| n.is_stack()).count()
    }

    fn preorder(&self) -> Vec<NodeId> {
        let mut out = Vec::with_capacity(self.arena.len());
        let mut pending: Vec<NodeId> = self.root.into_iter().collect();
        while let Some(id) = pending.pop() {
            out.push(id);
            pending.extend(self.children(id).iter().rev().copied());
        }
        out
    }

    /// Move a node and all of its descendants along one axis
    pub fn translate_subtree(&mut self, id: NodeId, axis: Axis, delta: f64) {
        if delta == 0.0 {
            return;
        }
        let mut pending = vec![id];
        while let Some(current) = pending.pop() {
            if let Some(node) = self.arena.get_mut(current) {
                node.bounds.translate(axis, delta);
                pending.extend(node.children().iter().copied());
            }
        }
    }

    /// Recompute a stack's bounds as the bounding box of its children
    ///
    /// The root keeps the container bounds it was given.
    pub fn refresh_bounds(&mut self, id: NodeId) {
        if Some(id) == self.root {
            return;
        }
        let bbox = self
            .children(id)
            .iter()
            .filter_map(|&child| self.node(child).map(|n| n.bounds))
            .reduce(|acc, b| acc.union(&b));
        if let (Some(bbox), Some(node)) = (bbox, self.arena.get_mut(id)) {
            node.bounds = bbox;
        }
    }

    /// Forward-evaluate a stack's constraints into child coordinates
    pub fn evaluate(&self, id: NodeId) -> Result<Vec<Bounds>, LayoutError> {
        let stack = self.stack(id)?;
        let major_axis = stack.major_axis().ok_or(LayoutError::NotAStack(id))?;
        let children = stack
            .children()
            .iter()
            .map(|&child| {
                self.node(child)
                    .map(|n| n.constraints)
                    .ok_or(LayoutError::UnknownNode(child))
            })
            .collect::<Result<Vec<_>, _>>()?;
        constraint_to_coords(&stack.bounds, major_axis, &stack.constraints, &children)
    }

    fn write_outline(&self, f: &mut fmt::Formatter<'_>, id: NodeId, depth: usize) -> fmt::Result {
        let Some(node) = self.node(id) else {
            return Ok(());
        };
        let indent = "  ".repeat(depth);
        let b = &node.bounds;
        let label = match &node.kind {
            NodeKind::Stack {
                major_axis: Axis::Vertical,
                ..
            } => "vstack".to_string(),
            NodeKind::Stack {
                major_axis: Axis::Horizontal,
                ..
            } => "hstack".to_string(),
            NodeKind::Leaf { source, .. } => format!("leaf #{}", source),
        };
        writeln!(
            f,
            "{}[{}] v={:.1}..{:.1} h={:.1}..{:.1}",
            indent, label, b.top_left[0], b.bot_right[0], b.top_left[1], b.bot_right[1]
        )?;
        for &child in node.children() {
            self.write_outline(f, child, depth + 1)?;
        }
        Ok(())
    }
}

impl fmt::Display for LayoutTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.root {
            Some(root) => self.write_outline(f, root, 0),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (LayoutTree, NodeId, NodeId, NodeId) {
        let mut tree = LayoutTree::new();
        let root = tree
            .insert(
                Node::stack(Bounds::from_edges(0.0, 0.0, 100.0, 100.0), Axis::Vertical),
                None,
            )
            .unwrap();
        let a = tree
            .insert(
                Node::leaf(Bounds::from_edges(10.0, 10.0, 40.0, 90.0), FrameMode::Unframed, 0),
                Some(root),
            )
            .unwrap();
        let b = tree
            .insert(
                Node::leaf(Bounds::from_edges(60.0, 10.0, 90.0, 90.0), FrameMode::Framed, 1),
                Some(root),
            )
            .unwrap();
        (tree, root, a, b)
    }

    #[test]
    fn test_parent_lookup() {
        let (tree, root, a, b) = sample();
        assert_eq!(tree.root(), Some(root));
        assert_eq!(tree.parent(a), Some(root));
        assert_eq!(tree.parent(b), Some(root));
        assert_eq!(tree.parent(root), None);
        assert_eq!(tree.children(root), &[a, b]);
    }

    #[test]
    fn test_insert_under_leaf_fails() {
        let (mut tree, _, a, _) = sample();
        let result = tree.insert(
            Node::leaf(Bounds::from_edges(0.0, 0.0, 1.0, 1.0), FrameMode::Unframed, 2),
            Some(a),
        );
        assert!(matches!(result, Err(LayoutError::NotAStack(_))));
    }

    #[test]
    fn test_translate_subtree_moves_descendants() {
        let (mut tree, root, a, _) = sample();
        tree.translate_subtree(root, Axis::Horizontal, 5.0);
        let leaf = tree.node(a).unwrap();
        assert_eq!(leaf.bounds, Bounds::from_edges(10.0, 15.0, 40.0, 95.0));
    }

    #[test]
    fn test_refresh_bounds_skips_root() {
        let (mut tree, root, _, _) = sample();
        tree.refresh_bounds(root);
        assert_eq!(
            tree.node(root).unwrap().bounds,
            Bounds::from_edges(0.0, 0.0, 100.0, 100.0)
        );
    }

    #[test]
    fn test_stacks_and_leaves() {
        let (tree, root, a, b) = sample();
        assert_eq!(tree.stacks(), vec![root]);
        assert_eq!(tree.leaves(), vec![a, b]);
        assert_eq!(tree.stack_count(), 1);
        assert_eq!(tree.len(), 3);
    }

    #[test]
    fn test_outline() {
        let (tree, _, _, _) = sample();
        insta::assert_snapshot!(tree.to_string().trim_end(), @r"
        [vstack] v=0.0..100.0 h=0.0..100.0
          [leaf #0] v=10.0..40.0 h=10.0..90.0
          [leaf #1] v=60.0..90.0 h=10.0..90.0
        ");
    }
}
