//! Points, vectors, and the capture region.

use std::ops::{Add, Mul, Sub};

use serde::{Deserialize, Serialize};

/// A point in capture space (detection frame pixels).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point2D {
    pub x: f64,
    pub y: f64,
}

impl Point2D {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point.
    pub fn distance_to(&self, other: &Point2D) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

/// A point in actuation space (absolute screen pixels).
///
/// Pointers move in whole pixels, so actuation space is integral.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ScreenPoint {
    pub x: i32,
    pub y: i32,
}

impl ScreenPoint {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Displacement from `self` to `target`.
    pub fn offset_to(&self, target: &ScreenPoint) -> Vector2 {
        Vector2::new(
            f64::from(target.x) - f64::from(self.x),
            f64::from(target.y) - f64::from(self.y),
        )
    }
}

/// A displacement in screen pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vector2 {
    pub x: f64,
    pub y: f64,
}

impl Vector2 {
    pub const ZERO: Vector2 = Vector2 { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn magnitude(&self) -> f64 {
        self.x.hypot(self.y)
    }

    pub fn scale(&self, factor: f64) -> Vector2 {
        Vector2::new(self.x * factor, self.y * factor)
    }

    /// Shrink the vector along its own direction so its length is at most `max`.
    ///
    /// Direction is preserved; diagonal motion is limited to the same speed as
    /// axis-aligned motion.
    pub fn clamp_magnitude(&self, max: f64) -> Vector2 {
        let len = self.magnitude();
        if len <= max || len == 0.0 {
            return *self;
        }
        self.scale(max / len)
    }
}

impl Add for Vector2 {
    type Output = Vector2;

    fn add(self, rhs: Vector2) -> Vector2 {
        Vector2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Vector2 {
    type Output = Vector2;

    fn sub(self, rhs: Vector2) -> Vector2 {
        Vector2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f64> for Vector2 {
    type Output = Vector2;

    fn mul(self, rhs: f64) -> Vector2 {
        self.scale(rhs)
    }
}

/// The screen rectangle that the capture collaborator grabs each frame.
///
/// `left`/`top` are absolute screen pixels; `width`/`height` are the size of
/// the grabbed area before any downscaling for the detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureRegion {
    pub left: i32,
    pub top: i32,
    pub width: u32,
    pub height: u32,
}

impl CaptureRegion {
    pub fn new(left: i32, top: i32, width: u32, height: u32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// Rightmost pixel column that still belongs to the region.
    pub fn right(&self) -> i32 {
        self.left + self.width.saturating_sub(1) as i32
    }

    /// Bottom pixel row that still belongs to the region.
    pub fn bottom(&self) -> i32 {
        self.top + self.height.saturating_sub(1) as i32
    }

    pub fn contains(&self, point: &ScreenPoint) -> bool {
        point.x >= self.left
            && point.x <= self.right()
            && point.y >= self.top
            && point.y <= self.bottom()
    }

    /// Clamp a screen point onto the region's edges.
    pub fn clamp(&self, point: ScreenPoint) -> ScreenPoint {
        ScreenPoint::new(
            point.x.clamp(self.left, self.right()),
            point.y.clamp(self.top, self.bottom()),
        )
    }

    /// Center of the region in screen pixels.
    pub fn center(&self) -> ScreenPoint {
        ScreenPoint::new(
            self.left + (self.width / 2) as i32,
            self.top + (self.height / 2) as i32,
        )
    }
}

impl Default for CaptureRegion {
    fn default() -> Self {
        Self::new(0, 0, 1920, 1080)
    }
}
