//! Framework-neutral description of a solved tree
//!
//! Converts stacks and their constraints into a view outline: stack kind,
//! alignment label, spacing, padding and frame modifiers. Zero-valued
//! modifiers are left out.

use std::fmt;

use serde::Serialize;

use super::tree::{LayoutTree, NodeId, NodeKind};
use super::types::{Alignment, Axis, Constraints};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ViewKind {
    VStack,
    HStack,
    Element { source: usize },
}

/// Padding collapsed to the shortest form that still describes it
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PaddingDescriptor {
    All(f64),
    Axis {
        #[serde(skip_serializing_if = "Option::is_none")]
        vertical: Option<f64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        horizontal: Option<f64>,
    },
    Edges {
        #[serde(skip_serializing_if = "Option::is_none")]
        top: Option<f64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        bottom: Option<f64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        leading: Option<f64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        trailing: Option<f64>,
    },
}

impl PaddingDescriptor {
    pub fn from_constraints(constraints: &Constraints) -> Option<Self> {
        let [[top, bottom], [leading, trailing]] = constraints.padding;
        let nonzero = |v: f64| Some(v).filter(|v| *v != 0.0);

        if [top, bottom, leading, trailing].iter().all(|v| *v == 0.0) {
            None
        } else if [bottom, leading, trailing].iter().all(|v| *v == top) {
            Some(Self::All(top))
        } else if top == bottom && leading == trailing {
            Some(Self::Axis {
                vertical: nonzero(top),
                horizontal: nonzero(leading),
            })
        } else {
            Some(Self::Edges {
                top: nonzero(top),
                bottom: nonzero(bottom),
                leading: nonzero(leading),
                trailing: nonzero(trailing),
            })
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FrameDescriptor {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
}

/// One view in the outline
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewDescriptor {
    pub kind: ViewKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alignment: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spacing: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub padding: Option<PaddingDescriptor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frame: Option<FrameDescriptor>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ViewDescriptor>,
}

/// Alignment label as seen from inside a stack
///
/// A vertical stack aligns its children horizontally and the other way
/// round.
pub fn alignment_label(major_axis: Axis, alignment: Alignment) -> &'static str {
    match (major_axis, alignment) {
        (_, Alignment::Center) => "center",
        (Axis::Vertical, Alignment::Leading) => "leading",
        (Axis::Vertical, Alignment::Trailing) => "trailing",
        (Axis::Horizontal, Alignment::Leading) => "top",
        (Axis::Horizontal, Alignment::Trailing) => "bottom",
    }
}

/// Describe the tree from its root
pub fn describe(tree: &LayoutTree) -> Option<ViewDescriptor> {
    tree.root().and_then(|root| describe_node(tree, root))
}

fn describe_node(tree: &LayoutTree, id: NodeId) -> Option<ViewDescriptor> {
    let node = tree.node(id)?;
    let c = &node.constraints;

    let frame = FrameDescriptor {
        height: c.frame(Axis::Vertical),
        width: c.frame(Axis::Horizontal),
    };
    let frame = (frame.height.is_some() || frame.width.is_some()).then_some(frame);

    let (kind, alignment, spacing, children) = match &node.kind {
        NodeKind::Leaf { source, .. } => (ViewKind::Element { source: *source }, None, None, Vec::new()),
        NodeKind::Stack {
            major_axis,
            children,
        } => {
            let kind = match major_axis {
                Axis::Vertical => ViewKind::VStack,
                Axis::Horizontal => ViewKind::HStack,
            };
            let children = children
                .iter()
                .filter_map(|&child| describe_node(tree, child))
                .collect();
            (
                kind,
                Some(alignment_label(*major_axis, c.alignment)),
                Some(c.spacing).filter(|s| *s != 0.0),
                children,
            )
        }
    };

    Some(ViewDescriptor {
        kind,
        alignment,
        spacing,
        padding: PaddingDescriptor::from_constraints(c),
        frame,
        children,
    })
}

impl fmt::Display for PaddingDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields: Vec<String> = match self {
            Self::All(v) => return write!(f, "padding={}", v),
            Self::Axis {
                vertical,
                horizontal,
            } => [("vertical", vertical), ("horizontal", horizontal)]
                .iter()
                .filter_map(|(name, v)| v.map(|v| format!("{}={}", name, v)))
                .collect(),
            Self::Edges {
                top,
                bottom,
                leading,
                trailing,
            } => [
                ("top", top),
                ("bottom", bottom),
                ("leading", leading),
                ("trailing", trailing),
            ]
            .iter()
            .filter_map(|(name, v)| v.map(|v| format!("{}={}", name, v)))
            .collect(),
        };
        write!(f, "padding({})", fields.join(", "))
    }
}

impl ViewDescriptor {
    fn fmt_indented(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        write!(f, "{}", "  ".repeat(depth))?;
        match self.kind {
            ViewKind::VStack => write!(f, "VStack")?,
            ViewKind::HStack => write!(f, "HStack")?,
            ViewKind::Element { source } => write!(f, "element #{}", source)?,
        }
        if let Some(alignment) = self.alignment {
            write!(f, " alignment={}", alignment)?;
        }
        if let Some(spacing) = self.spacing {
            write!(f, " spacing={}", spacing)?;
        }
        if let Some(padding) = &self.padding {
            write!(f, " {}", padding)?;
        }
        if let Some(frame) = &self.frame {
            let mut parts = Vec::new();
            if let Some(h) = frame.height {
                parts.push(format!("height={}", h));
            }
            if let Some(w) = frame.width {
                parts.push(format!("width={}", w));
            }
            write!(f, " frame({})", parts.join(", "))?;
        }
        writeln!(f)?;
        for child in &self.children {
            child.fmt_indented(f, depth + 1)?;
        }
        Ok(())
    }
}

impl fmt::Display for ViewDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_indented(f, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::tree::Node;
    use crate::layout::types::{Bounds, FrameMode, Side};
    use pretty_assertions::assert_eq;

    fn padded(top: f64, bottom: f64, leading: f64, trailing: f64) -> Constraints {
        let mut c = Constraints::default();
        c.set_padding(Axis::Vertical, Side::Before, top);
        c.set_padding(Axis::Vertical, Side::After, bottom);
        c.set_padding(Axis::Horizontal, Side::Before, leading);
        c.set_padding(Axis::Horizontal, Side::After, trailing);
        c
    }

    #[test]
    fn test_padding_collapses() {
        assert_eq!(PaddingDescriptor::from_constraints(&padded(0.0, 0.0, 0.0, 0.0)), None);
        assert_eq!(
            PaddingDescriptor::from_constraints(&padded(10.0, 10.0, 10.0, 10.0)),
            Some(PaddingDescriptor::All(10.0))
        );
        assert_eq!(
            PaddingDescriptor::from_constraints(&padded(5.0, 5.0, 0.0, 0.0)),
            Some(PaddingDescriptor::Axis {
                vertical: Some(5.0),
                horizontal: None
            })
        );
        assert_eq!(
            PaddingDescriptor::from_constraints(&padded(5.0, 0.0, 2.0, 2.0)),
            Some(PaddingDescriptor::Edges {
                top: Some(5.0),
                bottom: None,
                leading: Some(2.0),
                trailing: Some(2.0)
            })
        );
    }

    #[test]
    fn test_alignment_labels_follow_stack_axis() {
        assert_eq!(alignment_label(Axis::Vertical, Alignment::Leading), "leading");
        assert_eq!(alignment_label(Axis::Horizontal, Alignment::Leading), "top");
        assert_eq!(alignment_label(Axis::Horizontal, Alignment::Trailing), "bottom");
        assert_eq!(alignment_label(Axis::Vertical, Alignment::Center), "center");
    }

    #[test]
    fn test_describe_outline() {
        let mut tree = LayoutTree::new();
        let mut root = Node::stack(Bounds::from_edges(0.0, 0.0, 100.0, 100.0), Axis::Vertical);
        root.constraints = Constraints::default()
            .with_spacing(10.0)
            .with_alignment(Alignment::Leading);
        let root = tree.insert(root, None).unwrap();

        let mut header = Node::leaf(
            Bounds::from_edges(0.0, 0.0, 20.0, 100.0),
            FrameMode::Unframed,
            0,
        );
        header.constraints = padded(0.0, 0.0, 10.0, 10.0);
        tree.insert(header, Some(root)).unwrap();

        let row = Node::stack(Bounds::from_edges(30.0, 0.0, 100.0, 100.0), Axis::Horizontal);
        let row = tree.insert(row, Some(root)).unwrap();
        let mut card = Node::leaf(
            Bounds::from_edges(30.0, 0.0, 100.0, 40.0),
            FrameMode::Framed,
            1,
        );
        card.constraints = padded(5.0, 5.0, 5.0, 5.0).with_frame(Some(60.0), Some(30.0));
        tree.insert(card, Some(row)).unwrap();
        tree.insert(
            Node::leaf(
                Bounds::from_edges(30.0, 50.0, 100.0, 100.0),
                FrameMode::Unframed,
                2,
            ),
            Some(row),
        )
        .unwrap();

        let view = describe(&tree).unwrap();
        assert_eq!(view.kind, ViewKind::VStack);
        assert_eq!(view.children.len(), 2);
        insta::assert_snapshot!(view.to_string().trim_end(), @r"
        VStack alignment=leading spacing=10
          element #0 padding(horizontal=10)
          HStack alignment=center
            element #1 padding=5 frame(height=60, width=30)
            element #2
        ");
    }

    #[test]
    fn test_describe_empty_tree() {
        assert_eq!(describe(&LayoutTree::new()), None);
    }
}
