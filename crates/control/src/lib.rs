//! Pursuit Control Core
//!
//! Turns one frame's detections into one pointer displacement:
//! - **Mapping:** convert between capture-space and screen-space coordinates
//! - **Selection:** pick a single target and keep its identity across frames
//! - **Control:** proportional-derivative command with exponential smoothing,
//!   a dead zone, and a hard speed ceiling
//!
//! This crate is pure computation with no I/O and no async.
//! State lives in explicit structs owned by the caller's control stage.

pub mod controller;
pub mod mapping;
pub mod selector;

pub use controller::{ControlMode, ControlState, MotionController};
pub use mapping::CoordinateMapper;
pub use selector::{Selection, TargetSelector, TrackState};
