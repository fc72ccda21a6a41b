//! Pursuit Data Model
//!
//! Defines the data contracts shared by every Pursuit crate:
//! - **Geometry:** capture-space points, integral screen points, displacement vectors,
//!   and the capture region rectangle
//! - **Detections:** per-frame bounding boxes produced by the external detector
//! - **Commands:** the per-tick pointer displacement and the metrics emitted alongside it
//!
//! Capture-space coordinates are pixels of the frame handed to the detector.
//! Actuation-space coordinates are absolute screen pixels.

pub mod command;
pub mod detection;
pub mod geometry;

pub use command::*;
pub use detection::*;
pub use geometry::*;
