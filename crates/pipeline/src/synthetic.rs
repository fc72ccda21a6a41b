//! In-process collaborators for simulation and testing.
//!
//! [`SyntheticSource`] paces blank frames, [`ScriptedDetector`] reports a
//! target moving along a [`TargetMotion`], and [`VirtualPointer`] integrates
//! commands into a cursor position. Together they close the loop without
//! touching a real screen or input device.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use pursuit_common::error::{PursuitError, PursuitResult};
use pursuit_model::{CaptureRegion, Detection, Point2D, PointerCommand, ScreenPoint};
use tokio::time::{Interval, MissedTickBehavior};

use crate::collaborators::{
    CapturedFrame, Detector, Frame, FrameSource, OverlayFrame, OverlaySink, PointerDevice,
};

/// Frame source producing blank frames at a fixed rate.
pub struct SyntheticSource {
    region: CaptureRegion,
    width: u32,
    height: u32,
    period: Duration,
    interval: Option<Interval>,
}

impl SyntheticSource {
    pub fn new(region: CaptureRegion, width: u32, height: u32, fps: f64) -> Self {
        let fps = if fps.is_finite() && fps > 0.0 { fps } else { 60.0 };
        Self {
            region,
            width,
            height,
            period: Duration::from_secs_f64(1.0 / fps),
            interval: None,
        }
    }
}

#[async_trait::async_trait]
impl FrameSource for SyntheticSource {
    async fn next_frame(&mut self) -> PursuitResult<Frame> {
        let period = self.period;
        let interval = self.interval.get_or_insert_with(|| {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            interval
        });
        interval.tick().await;
        Ok(Frame::blank(self.region, self.width, self.height))
    }

    fn name(&self) -> &str {
        "synthetic"
    }
}

/// Path followed by a scripted target, in capture pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TargetMotion {
    /// Stays put.
    Static(Point2D),
    /// Moves by `velocity` pixels per frame.
    Linear { start: Point2D, velocity: Point2D },
    /// Circles `center` at `radius`, advancing `step` radians per frame.
    Orbit {
        center: Point2D,
        radius: f64,
        step: f64,
    },
}

impl TargetMotion {
    /// Target centre on frame `n` (1-based).
    pub fn position(&self, n: u64) -> Point2D {
        let t = n.saturating_sub(1) as f64;
        match *self {
            TargetMotion::Static(p) => p,
            TargetMotion::Linear { start, velocity } => {
                Point2D::new(start.x + velocity.x * t, start.y + velocity.y * t)
            }
            TargetMotion::Orbit {
                center,
                radius,
                step,
            } => Point2D::new(
                center.x + radius * (step * t).cos(),
                center.y + radius * (step * t).sin(),
            ),
        }
    }
}

/// Detector that reports one box along a scripted path.
pub struct ScriptedDetector {
    motion: TargetMotion,
    box_size: f64,
    confidence: f64,
    latency: Option<Duration>,
    distractors: Vec<Detection>,
    calls: u64,
}

impl ScriptedDetector {
    pub fn new(motion: TargetMotion) -> Self {
        Self {
            motion,
            box_size: 24.0,
            confidence: 0.9,
            latency: None,
            distractors: Vec::new(),
            calls: 0,
        }
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence;
        self
    }

    /// Simulated inference time per frame.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Extra boxes reported on every frame.
    pub fn with_distractor(mut self, detection: Detection) -> Self {
        self.distractors.push(detection);
        self
    }
}

#[async_trait::async_trait]
impl Detector for ScriptedDetector {
    async fn detect(&mut self, _frame: &CapturedFrame) -> PursuitResult<Vec<Detection>> {
        self.calls += 1;
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let center = self.motion.position(self.calls);
        let half = self.box_size / 2.0;
        let mut detections = vec![Detection::new(
            center.x - half,
            center.y - half,
            self.box_size,
            self.box_size,
            self.confidence,
        )];
        detections.extend(self.distractors.iter().cloned());
        Ok(detections)
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

#[derive(Debug)]
struct PointerState {
    x: f64,
    y: f64,
    moves: u64,
    max_step: f64,
}

/// Snapshot of a [`VirtualPointer`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerSnapshot {
    pub position: ScreenPoint,
    pub moves: u64,
    /// Largest single displacement applied.
    pub max_step: f64,
}

/// Cursor that integrates relative moves, bounded to a screen rectangle.
///
/// Sub-pixel remainders are kept, so many small commands add up.
#[derive(Debug)]
pub struct VirtualPointer {
    bounds: CaptureRegion,
    state: Mutex<PointerState>,
}

impl VirtualPointer {
    pub fn new(start: ScreenPoint, bounds: CaptureRegion) -> Self {
        let start = bounds.clamp(start);
        Self {
            bounds,
            state: Mutex::new(PointerState {
                x: f64::from(start.x),
                y: f64::from(start.y),
                moves: 0,
                max_step: 0.0,
            }),
        }
    }

    pub fn snapshot(&self) -> PointerSnapshot {
        let state = self.lock();
        PointerSnapshot {
            position: to_point(state.x, state.y),
            moves: state.moves,
            max_step: state.max_step,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, PointerState> {
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }
}

fn to_point(x: f64, y: f64) -> ScreenPoint {
    ScreenPoint::new(x.round() as i32, y.round() as i32)
}

#[async_trait::async_trait]
impl PointerDevice for VirtualPointer {
    async fn position(&self) -> PursuitResult<ScreenPoint> {
        let state = self.lock();
        Ok(to_point(state.x, state.y))
    }

    async fn move_by(&self, command: PointerCommand) -> PursuitResult<()> {
        if !command.dx.is_finite() || !command.dy.is_finite() {
            return Err(PursuitError::actuation("non-finite displacement"));
        }
        let mut state = self.lock();
        let (left, right) = (f64::from(self.bounds.left), f64::from(self.bounds.right()));
        let (top, bottom) = (f64::from(self.bounds.top), f64::from(self.bounds.bottom()));
        state.x = (state.x + command.dx).clamp(left, right);
        state.y = (state.y + command.dy).clamp(top, bottom);
        state.moves += 1;
        state.max_step = state.max_step.max(command.magnitude());
        Ok(())
    }
}

/// Overlay that only counts what it is shown.
#[derive(Debug, Clone, Default)]
pub struct CountingOverlay {
    rendered: Arc<AtomicU64>,
    locked: Arc<AtomicU64>,
}

impl CountingOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Frames rendered so far.
    pub fn rendered(&self) -> u64 {
        self.rendered.load(Ordering::Relaxed)
    }

    /// Frames rendered while a target was locked.
    pub fn locked(&self) -> u64 {
        self.locked.load(Ordering::Relaxed)
    }
}

#[async_trait::async_trait]
impl OverlaySink for CountingOverlay {
    async fn render(&mut self, frame: &OverlayFrame) -> PursuitResult<()> {
        self.rendered.fetch_add(1, Ordering::Relaxed);
        if frame.selection.is_locked() {
            self.locked.fetch_add(1, Ordering::Relaxed);
        }
        Ok(())
    }
}
