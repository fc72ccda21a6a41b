//! Per-tick outputs of the control stage.

use serde::{Deserialize, Serialize};

use crate::geometry::Vector2;

/// A single relative pointer displacement in screen pixels.
///
/// Emitted once per control tick and consumed exactly once by the pointer
/// device. Its magnitude never exceeds the configured maximum speed.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PointerCommand {
    pub dx: f64,
    pub dy: f64,
}

impl PointerCommand {
    pub const ZERO: PointerCommand = PointerCommand { dx: 0.0, dy: 0.0 };

    pub fn new(dx: f64, dy: f64) -> Self {
        Self { dx, dy }
    }

    pub fn magnitude(&self) -> f64 {
        self.dx.hypot(self.dy)
    }

    pub fn is_zero(&self) -> bool {
        self.dx == 0.0 && self.dy == 0.0
    }

    /// Whole-pixel step as most injection APIs expect.
    pub fn rounded(&self) -> (i32, i32) {
        (self.dx.round() as i32, self.dy.round() as i32)
    }
}

impl From<Vector2> for PointerCommand {
    fn from(v: Vector2) -> Self {
        Self::new(v.x, v.y)
    }
}

impl From<PointerCommand> for Vector2 {
    fn from(cmd: PointerCommand) -> Self {
        Vector2::new(cmd.dx, cmd.dy)
    }
}

/// Metrics reported to the telemetry sink and overlay once per control tick.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TickMetrics {
    /// Sequence number of the frame this tick acted on.
    pub frame_seq: u64,

    /// Detections returned by the detector for that frame.
    pub detection_count: usize,

    /// Time spent inside the detector (ms).
    pub inference_ms: f64,

    /// Capture-to-command latency (ms).
    pub total_latency_ms: f64,

    /// Effective control-loop FPS.
    pub fps: f64,

    /// Whether engagement was on for this tick.
    pub engaged: bool,

    /// Identifier of the selected track, if any.
    pub track_id: Option<u64>,

    /// Displacement emitted this tick.
    pub command: PointerCommand,
}
