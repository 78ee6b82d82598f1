//! Core geometry and constraint types shared by every layout stage

use serde::{Deserialize, Serialize};

/// One of the two layout axes
///
/// Coordinates are stored as `[vertical, horizontal]` pairs, so an axis
/// doubles as an index into them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    /// Height / rows (index 0)
    Vertical,
    /// Width / columns (index 1)
    Horizontal,
}

impl Axis {
    pub const ALL: [Axis; 2] = [Axis::Vertical, Axis::Horizontal];

    pub fn index(self) -> usize {
        match self {
            Axis::Vertical => 0,
            Axis::Horizontal => 1,
        }
    }

    /// The cross axis
    pub fn orthogonal(self) -> Axis {
        match self {
            Axis::Vertical => Axis::Horizontal,
            Axis::Horizontal => Axis::Vertical,
        }
    }
}

/// Edge of an element on a given axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    /// Top or left
    Before,
    /// Bottom or right
    After,
}

impl Side {
    pub const ALL: [Side; 2] = [Side::Before, Side::After];

    pub fn index(self) -> usize {
        match self {
            Side::Before => 0,
            Side::After => 1,
        }
    }
}

/// Minor-axis placement of a stack's children
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    Leading,
    #[default]
    Center,
    Trailing,
}

impl Alignment {
    pub const ALL: [Alignment; 3] = [Alignment::Leading, Alignment::Center, Alignment::Trailing];

    /// Numeric code used by downstream serializers (0, 1, 2)
    pub fn code(self) -> u8 {
        match self {
            Alignment::Leading => 0,
            Alignment::Center => 1,
            Alignment::Trailing => 2,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Alignment::Leading),
            1 => Some(Alignment::Center),
            2 => Some(Alignment::Trailing),
            _ => None,
        }
    }
}

/// Sketch hint telling whether an element has a fixed size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrameMode {
    /// Both frames must be fixed (strictly positive)
    Framed,
    /// The solver decides per axis
    #[default]
    Unframed,
}

/// Axis-aligned rectangle in the sketch coordinate space
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    /// `[vertical, horizontal]` of the top-left corner
    pub top_left: [f64; 2],
    /// `[vertical, horizontal]` of the bottom-right corner
    pub bot_right: [f64; 2],
}

impl Bounds {
    pub fn new(top_left: [f64; 2], bot_right: [f64; 2]) -> Self {
        Self { top_left, bot_right }
    }

    /// Build from `(top, left)` and `(bottom, right)` scalars
    pub fn from_edges(top: f64, left: f64, bottom: f64, right: f64) -> Self {
        Self::new([top, left], [bottom, right])
    }

    pub fn lead(&self, axis: Axis) -> f64 {
        self.top_left[axis.index()]
    }

    pub fn trail(&self, axis: Axis) -> f64 {
        self.bot_right[axis.index()]
    }

    pub fn size(&self, axis: Axis) -> f64 {
        self.trail(axis) - self.lead(axis)
    }

    pub fn center(&self, axis: Axis) -> f64 {
        (self.lead(axis) + self.trail(axis)) / 2.0
    }

    /// Both extents strictly positive
    pub fn is_positive(&self) -> bool {
        Axis::ALL.iter().all(|&axis| self.size(axis) > 0.0)
    }

    /// Move rigidly along one axis
    pub fn translate(&mut self, axis: Axis, delta: f64) {
        self.top_left[axis.index()] += delta;
        self.bot_right[axis.index()] += delta;
    }

    /// Resize along one axis, keeping the leading edge
    pub fn set_size(&mut self, axis: Axis, size: f64) {
        self.bot_right[axis.index()] = self.top_left[axis.index()] + size;
    }

    /// Smallest box containing both
    pub fn union(&self, other: &Bounds) -> Bounds {
        Bounds::new(
            [
                self.top_left[0].min(other.top_left[0]),
                self.top_left[1].min(other.top_left[1]),
            ],
            [
                self.bot_right[0].max(other.bot_right[0]),
                self.bot_right[1].max(other.bot_right[1]),
            ],
        )
    }

    /// Largest edge distance to another box
    pub fn max_edge_delta(&self, other: &Bounds) -> f64 {
        Axis::ALL
            .iter()
            .flat_map(|&axis| {
                [
                    (self.lead(axis) - other.lead(axis)).abs(),
                    (self.trail(axis) - other.trail(axis)).abs(),
                ]
            })
            .fold(0.0, f64::max)
    }
}

/// Layout constraints carried by every node
///
/// Which fields matter depends on the node's role: `spacing` and
/// `alignment` describe a stack, while `padding` and `frame` describe the
/// node as a child of its parent stack.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Constraints {
    pub spacing: f64,
    /// `padding[axis][side]`
    pub padding: [[f64; 2]; 2],
    /// Fixed extent per axis; `None` or zero means flexible
    pub frame: [Option<f64>; 2],
    pub alignment: Alignment,
}

impl Constraints {
    pub fn padding(&self, axis: Axis, side: Side) -> f64 {
        self.padding[axis.index()][side.index()]
    }

    /// Sum of both paddings on an axis
    pub fn padding_total(&self, axis: Axis) -> f64 {
        self.padding(axis, Side::Before) + self.padding(axis, Side::After)
    }

    pub fn set_padding(&mut self, axis: Axis, side: Side, value: f64) {
        self.padding[axis.index()][side.index()] = value;
    }

    /// Fixed extent on this axis, if any
    pub fn frame(&self, axis: Axis) -> Option<f64> {
        self.frame[axis.index()].filter(|&value| value > 0.0)
    }

    pub fn is_framed(&self, axis: Axis) -> bool {
        self.frame(axis).is_some()
    }

    pub fn set_frame(&mut self, axis: Axis, value: Option<f64>) {
        self.frame[axis.index()] = value.filter(|&v| v > 0.0);
    }

    // Shorthands mirroring how a sketch author states constraints

    /// Uniform padding on all four sides
    pub fn with_padding(mut self, amount: f64) -> Self {
        self.padding = [[amount, amount], [amount, amount]];
        self
    }

    pub fn with_frame(mut self, height: Option<f64>, width: Option<f64>) -> Self {
        self.set_frame(Axis::Vertical, height);
        self.set_frame(Axis::Horizontal, width);
        self
    }

    pub fn with_spacing(mut self, spacing: f64) -> Self {
        self.spacing = spacing;
        self
    }

    pub fn with_alignment(mut self, alignment: Alignment) -> Self {
        self.alignment = alignment;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_axis_indices() {
        assert_eq!(Axis::Vertical.index(), 0);
        assert_eq!(Axis::Horizontal.index(), 1);
        assert_eq!(Axis::Vertical.orthogonal(), Axis::Horizontal);
    }

    #[test]
    fn test_bounds_accessors() {
        let b = Bounds::from_edges(10.0, 20.0, 40.0, 90.0);
        assert_eq!(b.size(Axis::Vertical), 30.0);
        assert_eq!(b.size(Axis::Horizontal), 70.0);
        assert_eq!(b.center(Axis::Horizontal), 55.0);
        assert!(b.is_positive());
    }

    #[test]
    fn test_translate_keeps_size() {
        let mut b = Bounds::from_edges(0.0, 0.0, 10.0, 10.0);
        b.translate(Axis::Horizontal, 5.0);
        assert_eq!(b, Bounds::from_edges(0.0, 5.0, 10.0, 15.0));
    }

    #[test]
    fn test_set_size_keeps_leading_edge() {
        let mut b = Bounds::from_edges(5.0, 5.0, 10.0, 10.0);
        b.set_size(Axis::Vertical, 20.0);
        assert_eq!(b, Bounds::from_edges(5.0, 5.0, 25.0, 10.0));
    }

    #[test]
    fn test_union() {
        let a = Bounds::from_edges(0.0, 0.0, 10.0, 10.0);
        let b = Bounds::from_edges(5.0, 20.0, 30.0, 25.0);
        assert_eq!(a.union(&b), Bounds::from_edges(0.0, 0.0, 30.0, 25.0));
    }

    #[test]
    fn test_zero_frame_is_flexible() {
        let c = Constraints::default().with_frame(Some(0.0), Some(12.0));
        assert!(!c.is_framed(Axis::Vertical));
        assert_eq!(c.frame(Axis::Horizontal), Some(12.0));
    }

    #[test]
    fn test_alignment_codes() {
        for alignment in Alignment::ALL {
            assert_eq!(Alignment::from_code(alignment.code()), Some(alignment));
        }
        assert_eq!(Alignment::from_code(3), None);
    }
}
