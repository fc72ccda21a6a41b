//! Pipeline lifecycle: start, engagement, live reconfiguration, shutdown.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use pursuit_common::clock::PipelineClock;
use pursuit_common::config::TrackingConfig;
use pursuit_common::error::{PursuitError, PursuitResult};
use pursuit_control::{MotionController, TargetSelector};
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::collaborators::Collaborators;
use crate::slot::latest_slot;
use crate::stages::{self, ControlLoop, ShutdownSignal};
use crate::stats::{PipelineStats, StatsCounters};

/// Lifecycle state of an [`Orchestrator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    /// Created, stages not spawned yet.
    Idle,
    /// Stages running.
    Running,
    /// Shut down. An orchestrator cannot be restarted.
    Stopped,
}

/// Shared engagement switch.
///
/// Cloned handles all refer to the same flag. The control stage reads it
/// once at the start of every tick.
#[derive(Debug, Clone, Default)]
pub struct EngagementHandle(Arc<AtomicBool>);

impl EngagementHandle {
    pub fn is_engaged(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    pub fn set(&self, engaged: bool) {
        self.0.store(engaged, Ordering::Release);
    }

    /// Flip the flag. Returns the new value.
    pub fn toggle(&self) -> bool {
        !self.0.fetch_xor(true, Ordering::AcqRel)
    }
}

/// Outcome of a completed run.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineSummary {
    pub stats: PipelineStats,
    /// Wall-clock start time (RFC 3339).
    pub started_at: String,
    pub uptime_secs: f64,
}

/// Owns the stage tasks and the handles used to steer them.
pub struct Orchestrator {
    state: PipelineState,
    config_tx: watch::Sender<TrackingConfig>,
    shutdown_tx: watch::Sender<bool>,
    engagement: EngagementHandle,
    stats: Arc<StatsCounters>,
    clock: Option<PipelineClock>,
    tasks: Vec<(&'static str, JoinHandle<()>)>,
}

impl Orchestrator {
    /// Create an orchestrator. Fails if `config` is invalid.
    pub fn new(config: TrackingConfig) -> PursuitResult<Self> {
        config.validate()?;
        let (config_tx, _) = watch::channel(config);
        let (shutdown_tx, _) = watch::channel(false);
        Ok(Self {
            state: PipelineState::Idle,
            config_tx,
            shutdown_tx,
            engagement: EngagementHandle::default(),
            stats: Arc::new(StatsCounters::default()),
            clock: None,
            tasks: Vec::new(),
        })
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Spawn the stages. Must be called from within a Tokio runtime.
    pub fn start(&mut self, collaborators: Collaborators) -> PursuitResult<()> {
        if self.state != PipelineState::Idle {
            return Err(PursuitError::pipeline("Pipeline already started"));
        }
        tokio::runtime::Handle::try_current()
            .map_err(|e| PursuitError::pipeline(format!("No async runtime: {e}")))?;

        let Collaborators {
            source,
            detector,
            pointer,
            overlay,
            telemetry,
        } = collaborators;

        let clock = PipelineClock::start();
        let mut config_rx = self.config_tx.subscribe();
        let config = config_rx.borrow_and_update().clone();
        let shutdown = ShutdownSignal::new(self.shutdown_tx.subscribe());

        tracing::info!(
            region = ?config.region,
            frame_width = config.frame_width,
            frame_height = config.frame_height,
            overlay = overlay.is_some(),
            "Starting pipeline"
        );

        let (frame_tx, frame_rx) = latest_slot();
        let (batch_tx, batch_rx) = latest_slot();
        let (command_tx, command_rx) = latest_slot();

        let overlay_tx = match overlay {
            Some(sink) => {
                let (tx, rx) = latest_slot();
                self.tasks.push((
                    "overlay",
                    tokio::spawn(stages::run_overlay(
                        sink,
                        rx,
                        shutdown.clone(),
                        self.stats.clone(),
                    )),
                ));
                Some(tx)
            }
            None => None,
        };

        self.tasks.push((
            "capture",
            tokio::spawn(stages::run_capture(
                source,
                frame_tx,
                shutdown.clone(),
                self.stats.clone(),
            )),
        ));
        self.tasks.push((
            "inference",
            tokio::spawn(stages::run_inference(
                detector,
                frame_rx,
                batch_tx,
                shutdown.clone(),
                self.stats.clone(),
            )),
        ));

        let control = ControlLoop {
            selector: TargetSelector::new(),
            controller: MotionController::new(),
            config,
            config_rx,
            engagement: self.engagement.clone(),
            pointer: pointer.clone(),
            telemetry: telemetry.clone(),
            commands: command_tx,
            overlay: overlay_tx,
            clock: clock.clone(),
            stats: self.stats.clone(),
        };
        self.tasks.push((
            "control",
            tokio::spawn(control.run(batch_rx, shutdown.clone())),
        ));
        self.tasks.push((
            "actuation",
            tokio::spawn(stages::run_actuation(
                pointer,
                command_rx,
                telemetry,
                shutdown,
                self.stats.clone(),
            )),
        ));

        self.clock = Some(clock);
        self.state = PipelineState::Running;
        tracing::info!(stages = self.tasks.len(), "Pipeline started");
        Ok(())
    }

    /// Handle for toggling engagement from other tasks (hotkeys, signals).
    pub fn engagement(&self) -> EngagementHandle {
        self.engagement.clone()
    }

    pub fn is_engaged(&self) -> bool {
        self.engagement.is_engaged()
    }

    pub fn set_engagement(&self, engaged: bool) {
        self.engagement.set(engaged);
        tracing::info!(engaged, "Engagement set");
    }

    /// Flip engagement. Returns the new state.
    pub fn toggle_engagement(&self) -> bool {
        let engaged = self.engagement.toggle();
        tracing::info!(engaged, "Engagement toggled");
        engaged
    }

    /// Replace the tracking configuration.
    ///
    /// The control stage adopts it at the start of its next tick. An invalid
    /// configuration is rejected and the current one stays in effect.
    pub fn update_config(&self, config: TrackingConfig) -> PursuitResult<()> {
        config.validate()?;
        self.config_tx.send_replace(config);
        tracing::info!("Tracking configuration updated");
        Ok(())
    }

    /// The configuration most recently accepted.
    pub fn config(&self) -> TrackingConfig {
        self.config_tx.borrow().clone()
    }

    pub fn stats(&self) -> PipelineStats {
        self.stats.snapshot()
    }

    /// Stop all stages and wait for them to finish.
    ///
    /// Engagement is cleared first so no further motion is produced. A
    /// command that has not reached the pointer yet is discarded.
    pub async fn shutdown(&mut self) -> PursuitResult<PipelineSummary> {
        if self.state != PipelineState::Running {
            return Err(PursuitError::pipeline("Pipeline not running"));
        }

        tracing::info!("Stopping pipeline");
        self.engagement.set(false);
        self.shutdown_tx.send_replace(true);

        let mut failure = None;
        for (stage, task) in self.tasks.drain(..) {
            if let Err(e) = task.await {
                tracing::error!(stage, error = %e, "Stage task failed");
                failure.get_or_insert_with(|| {
                    PursuitError::pipeline(format!("{stage} stage failed: {e}"))
                });
            }
        }
        self.state = PipelineState::Stopped;

        if let Some(e) = failure {
            return Err(e);
        }

        let (started_at, uptime_secs) = match &self.clock {
            Some(clock) => (
                clock.epoch_wall().to_string(),
                PipelineClock::ns_to_secs(clock.elapsed_ns()),
            ),
            None => (String::new(), 0.0),
        };
        let stats = self.stats.snapshot();
        tracing::info!(
            ticks = stats.ticks,
            frames_dropped = stats.frames_dropped,
            uptime_secs,
            "Pipeline stopped"
        );

        Ok(PipelineSummary {
            stats,
            started_at,
            uptime_secs,
        })
    }
}

impl Drop for Orchestrator {
    fn drop(&mut self) {
        if self.state == PipelineState::Running {
            // Stages observe this and exit on their own.
            self.engagement.set(false);
            self.shutdown_tx.send_replace(true);
        }
    }
}
