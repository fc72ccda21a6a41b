//! Runtime counters shared by the pipeline stages.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Snapshot of pipeline statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PipelineStats {
    /// Frames delivered by the capture collaborator.
    pub frames_captured: u64,

    /// Frames replaced in the slot before inference picked them up.
    pub frames_dropped: u64,

    /// Capture calls that returned an error.
    pub capture_failures: u64,

    /// Frames treated as empty because the detector failed.
    pub detection_failures: u64,

    /// Detection batches replaced before the control stage picked them up.
    pub batches_dropped: u64,

    /// Control ticks executed.
    pub ticks: u64,

    /// Non-zero commands handed to the actuation stage.
    pub commands_issued: u64,

    /// Commands replaced before the actuation stage applied them.
    pub commands_dropped: u64,

    /// Commands the pointer device accepted.
    pub commands_applied: u64,

    /// Commands the pointer device rejected.
    pub actuation_failures: u64,

    /// Overlay render calls that failed.
    pub overlay_failures: u64,
}

impl PipelineStats {
    /// Frame drop rate as a percentage of captured frames.
    pub fn drop_rate(&self) -> f64 {
        if self.frames_captured == 0 {
            return 0.0;
        }
        self.frames_dropped as f64 / self.frames_captured as f64 * 100.0
    }
}

#[derive(Debug, Default)]
pub(crate) struct StatsCounters {
    pub frames_captured: AtomicU64,
    pub frames_dropped: AtomicU64,
    pub capture_failures: AtomicU64,
    pub detection_failures: AtomicU64,
    pub batches_dropped: AtomicU64,
    pub ticks: AtomicU64,
    pub commands_issued: AtomicU64,
    pub commands_dropped: AtomicU64,
    pub commands_applied: AtomicU64,
    pub actuation_failures: AtomicU64,
    pub overlay_failures: AtomicU64,
}

impl StatsCounters {
    pub fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> PipelineStats {
        let get = |c: &AtomicU64| c.load(Ordering::Relaxed);
        PipelineStats {
            frames_captured: get(&self.frames_captured),
            frames_dropped: get(&self.frames_dropped),
            capture_failures: get(&self.capture_failures),
            detection_failures: get(&self.detection_failures),
            batches_dropped: get(&self.batches_dropped),
            ticks: get(&self.ticks),
            commands_issued: get(&self.commands_issued),
            commands_dropped: get(&self.commands_dropped),
            commands_applied: get(&self.commands_applied),
            actuation_failures: get(&self.actuation_failures),
            overlay_failures: get(&self.overlay_failures),
        }
    }
}
