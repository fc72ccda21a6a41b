//! Contracts for the peripherals the pipeline drives.
//!
//! Screen capture, the detection model, pointer injection, and the overlay
//! live outside this workspace. The pipeline only talks to them through these
//! traits, and treats every failure they report as transient.

use std::sync::Arc;
use std::time::Instant;

use pursuit_common::error::{PursuitError, PursuitResult};
use pursuit_control::Selection;
use pursuit_model::{CaptureRegion, Detection, PointerCommand, ScreenPoint, TickMetrics};

/// One grabbed frame as handed over by the capture collaborator.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Width of the (possibly downscaled) image in pixels.
    pub width: u32,
    /// Height of the (possibly downscaled) image in pixels.
    pub height: u32,
    /// Packed pixel data in whatever layout the detector expects.
    pub pixels: Arc<[u8]>,
    /// Screen rectangle the frame was grabbed from.
    pub region: CaptureRegion,
}

impl Frame {
    /// A frame without pixel data, for detectors that do not look at pixels.
    pub fn blank(region: CaptureRegion, width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: Arc::from(Vec::new()),
            region,
        }
    }
}

/// A frame stamped by the capture stage.
#[derive(Debug, Clone)]
pub struct CapturedFrame {
    /// Monotonic sequence number, starting at 1.
    pub seq: u64,
    /// When the capture stage received the frame.
    pub captured_at: Instant,
    pub frame: Frame,
}

/// What the overlay receives each tick.
#[derive(Debug, Clone)]
pub struct OverlayFrame {
    pub detections: Arc<Vec<Detection>>,
    pub selection: Selection,
    pub metrics: TickMetrics,
}

/// Source of frames (screen grabber).
#[async_trait::async_trait]
pub trait FrameSource: Send {
    /// Wait for the next frame. May block briefly; must not wait indefinitely.
    async fn next_frame(&mut self) -> PursuitResult<Frame>;

    /// Name for logging.
    fn name(&self) -> &str {
        "frame-source"
    }
}

/// The detection model.
#[async_trait::async_trait]
pub trait Detector: Send {
    /// Run inference on one frame. Boxes are in frame pixels.
    async fn detect(&mut self, frame: &CapturedFrame) -> PursuitResult<Vec<Detection>>;

    /// Name for logging.
    fn name(&self) -> &str {
        "detector"
    }
}

/// Pointer injection. Shared by the control stage (reads) and the
/// actuation stage (writes), hence `&self`.
#[async_trait::async_trait]
pub trait PointerDevice: Send + Sync {
    /// Current absolute pointer position.
    async fn position(&self) -> PursuitResult<ScreenPoint>;

    /// Apply a relative displacement. Best effort.
    async fn move_by(&self, command: PointerCommand) -> PursuitResult<()>;
}

/// Visualization of detections and metrics. Purely observational.
#[async_trait::async_trait]
pub trait OverlaySink: Send {
    async fn render(&mut self, frame: &OverlayFrame) -> PursuitResult<()>;
}

/// Receiver of per-tick metrics and actuation failures.
pub trait TelemetrySink: Send + Sync {
    fn record(&self, metrics: &TickMetrics);

    fn actuation_failed(&self, error: &PursuitError);
}

/// Everything the orchestrator needs to run.
pub struct Collaborators {
    pub source: Box<dyn FrameSource>,
    pub detector: Box<dyn Detector>,
    pub pointer: Arc<dyn PointerDevice>,
    pub overlay: Option<Box<dyn OverlaySink>>,
    pub telemetry: Arc<dyn TelemetrySink>,
}
