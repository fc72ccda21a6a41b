//! Detector output types.
//!
//! A detection is produced fresh every frame by the external detector and is
//! never mutated afterwards. Boxes are in capture space.

use serde::{Deserialize, Serialize};

use crate::geometry::Point2D;

/// One candidate target's bounding box and confidence for a single frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// Left edge (capture pixels).
    pub x: f64,
    /// Top edge (capture pixels).
    pub y: f64,
    pub width: f64,
    pub height: f64,
    /// Detector confidence in `[0.0, 1.0]`.
    pub confidence: f64,
    /// Optional class label emitted by the model.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_id: Option<u32>,
}

impl Detection {
    pub fn new(x: f64, y: f64, width: f64, height: f64, confidence: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
            confidence,
            class_id: None,
        }
    }

    /// Build from a corner-style box (`x1, y1, x2, y2`) as most YOLO heads emit.
    pub fn from_corners(x1: f64, y1: f64, x2: f64, y2: f64, confidence: f64) -> Self {
        Self::new(
            x1.min(x2),
            y1.min(y2),
            (x2 - x1).abs(),
            (y2 - y1).abs(),
            confidence,
        )
    }

    pub fn with_class(mut self, class_id: u32) -> Self {
        self.class_id = Some(class_id);
        self
    }

    pub fn center(&self) -> Point2D {
        Point2D::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Whether a capture-space point lies inside the box (edges inclusive).
    pub fn contains(&self, point: &Point2D) -> bool {
        point.x >= self.x
            && point.x <= self.x + self.width
            && point.y >= self.y
            && point.y <= self.y + self.height
    }

    /// A detection is usable only if its geometry and score are finite.
    pub fn is_well_formed(&self) -> bool {
        self.x.is_finite()
            && self.y.is_finite()
            && self.width.is_finite()
            && self.height.is_finite()
            && self.width >= 0.0
            && self.height >= 0.0
            && self.confidence.is_finite()
    }
}
