//! Clock and timing utilities for the tracking loop.
//!
//! Every stage timestamps its output against one monotonic epoch recorded
//! when the pipeline starts, so latencies can be compared across stages.

use std::time::Instant;

/// A monotonic clock anchored to the moment the pipeline started.
#[derive(Debug, Clone)]
pub struct PipelineClock {
    epoch: Instant,

    /// Wall-clock time at epoch (RFC 3339).
    epoch_wall: String,
}

impl PipelineClock {
    /// Create a new clock anchored to now.
    pub fn start() -> Self {
        Self {
            epoch: Instant::now(),
            epoch_wall: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Nanoseconds elapsed since the epoch.
    pub fn elapsed_ns(&self) -> u64 {
        self.epoch.elapsed().as_nanos() as u64
    }

    /// Nanoseconds between the epoch and `instant`. Instants before the epoch map to 0.
    pub fn ns_at(&self, instant: Instant) -> u64 {
        instant.saturating_duration_since(self.epoch).as_nanos() as u64
    }

    /// Wall-clock time at pipeline start.
    pub fn epoch_wall(&self) -> &str {
        &self.epoch_wall
    }

    /// Convert a nanosecond span to milliseconds.
    pub fn ns_to_ms(ns: u64) -> f64 {
        ns as f64 / 1_000_000.0
    }

    /// Convert a nanosecond span to seconds.
    pub fn ns_to_secs(ns: u64) -> f64 {
        ns as f64 / 1_000_000_000.0
    }
}

/// Effective frame rate over rolling one-second windows.
///
/// Reports the rate of the last completed window; 0.0 until the first window closes.
#[derive(Debug, Default)]
pub struct FpsCounter {
    window_start_ns: Option<u64>,
    frames_in_window: u32,
    fps: f64,
}

impl FpsCounter {
    const WINDOW_NS: u64 = 1_000_000_000;

    pub fn new() -> Self {
        Self::default()
    }

    /// Count one frame at `now_ns` and return the current FPS estimate.
    pub fn tick(&mut self, now_ns: u64) -> f64 {
        let start = *self.window_start_ns.get_or_insert(now_ns);
        self.frames_in_window += 1;

        let elapsed = now_ns.saturating_sub(start);
        if elapsed >= Self::WINDOW_NS {
            self.fps = self.frames_in_window as f64 / (elapsed as f64 / 1_000_000_000.0);
            self.frames_in_window = 0;
            self.window_start_ns = Some(now_ns);
        }
        self.fps
    }

    pub fn fps(&self) -> f64 {
        self.fps
    }
}
