//! Sketch input: the container and the rectangles drawn inside it

use serde::{Deserialize, Serialize};

use crate::layout::{Bounds, FrameMode, LayoutError};

/// One drawn element
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SketchElement {
    pub bounds: Bounds,
    #[serde(default)]
    pub mode: FrameMode,
}

impl SketchElement {
    pub fn new(bounds: Bounds, mode: FrameMode) -> Self {
        Self { bounds, mode }
    }

    pub fn unframed(bounds: Bounds) -> Self {
        Self::new(bounds, FrameMode::Unframed)
    }

    pub fn framed(bounds: Bounds) -> Self {
        Self::new(bounds, FrameMode::Framed)
    }
}

/// A container and the elements sketched inside it, in one coordinate space
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sketch {
    pub container: Bounds,
    pub elements: Vec<SketchElement>,
}

impl Sketch {
    pub fn new(container: Bounds, elements: Vec<SketchElement>) -> Self {
        Self {
            container,
            elements,
        }
    }

    /// Build from an ordered list whose first entry is the container
    ///
    /// The container's mode is ignored.
    pub fn from_ordered(mut rects: Vec<SketchElement>) -> Result<Self, LayoutError> {
        if rects.is_empty() {
            return Err(LayoutError::EmptyInput);
        }
        let container = rects.remove(0).bounds;
        Ok(Self::new(container, rects))
    }

    /// Check that the container and every element have positive extents
    ///
    /// Index 0 is the container; element `i` is reported as `i + 1`, matching
    /// the ordered-list form.
    pub fn validate(&self) -> Result<(), LayoutError> {
        if !self.container.is_positive() {
            return Err(LayoutError::DegenerateGeometry { index: 0 });
        }
        match self.elements.iter().position(|e| !e.bounds.is_positive()) {
            Some(pos) => Err(LayoutError::DegenerateGeometry { index: pos + 1 }),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_ordered_splits_container() {
        let sketch = Sketch::from_ordered(vec![
            SketchElement::unframed(Bounds::from_edges(0.0, 0.0, 100.0, 100.0)),
            SketchElement::framed(Bounds::from_edges(10.0, 10.0, 40.0, 90.0)),
        ])
        .unwrap();

        assert_eq!(sketch.container, Bounds::from_edges(0.0, 0.0, 100.0, 100.0));
        assert_eq!(sketch.elements.len(), 1);
        assert_eq!(sketch.elements[0].mode, FrameMode::Framed);
    }

    #[test]
    fn test_from_ordered_empty() {
        assert!(matches!(
            Sketch::from_ordered(Vec::new()),
            Err(LayoutError::EmptyInput)
        ));
    }

    #[test]
    fn test_validate_reports_degenerate_element() {
        let sketch = Sketch::new(
            Bounds::from_edges(0.0, 0.0, 100.0, 100.0),
            vec![
                SketchElement::unframed(Bounds::from_edges(10.0, 10.0, 20.0, 20.0)),
                SketchElement::unframed(Bounds::from_edges(30.0, 10.0, 30.0, 20.0)),
            ],
        );
        assert!(matches!(
            sketch.validate(),
            Err(LayoutError::DegenerateGeometry { index: 2 })
        ));
    }

    #[test]
    fn test_validate_reports_degenerate_container() {
        let sketch = Sketch::new(Bounds::from_edges(0.0, 0.0, 0.0, 100.0), Vec::new());
        assert!(matches!(
            sketch.validate(),
            Err(LayoutError::DegenerateGeometry { index: 0 })
        ));
    }
}
