//! The stage loops spawned by the orchestrator.
//!
//! Each stage only suspends while waiting on its upstream slot or on the
//! shutdown signal. Work that has started (a detector call, a control tick,
//! a pointer move) always runs to completion before the stop is observed.

use std::sync::Arc;
use std::time::{Duration, Instant};

use pursuit_common::clock::{FpsCounter, PipelineClock};
use pursuit_common::config::TrackingConfig;
use pursuit_common::error::PursuitError;
use pursuit_control::{CoordinateMapper, MotionController, Selection, TargetSelector};
use pursuit_model::{CaptureRegion, Detection, PointerCommand, TickMetrics};
use tokio::sync::watch;

use crate::collaborators::{
    CapturedFrame, Detector, FrameSource, OverlayFrame, OverlaySink, PointerDevice, TelemetrySink,
};
use crate::orchestrator::EngagementHandle;
use crate::slot::{SlotReader, SlotWriter};
use crate::stats::StatsCounters;

/// Pause after a failed capture before asking for the next frame.
const CAPTURE_RETRY_DELAY: Duration = Duration::from_millis(5);

/// Detector output for one frame, with the geometry it was captured in.
#[derive(Debug, Clone)]
pub(crate) struct DetectionBatch {
    pub seq: u64,
    pub captured_at: Instant,
    pub region: CaptureRegion,
    pub frame_width: u32,
    pub frame_height: u32,
    pub detections: Arc<Vec<Detection>>,
    pub inference: Duration,
}

/// Log a collaborator failure. Peripheral errors are expected now and then;
/// anything else points at a broken collaborator and is logged louder.
fn report_failure(stage: &'static str, error: &PursuitError, message: &'static str) {
    if error.is_transient() {
        tracing::warn!(stage, error = %error, "{message}");
    } else {
        tracing::error!(stage, error = %error, "{message}");
    }
}

/// Cooperative stop signal observed at every suspension point.
#[derive(Debug, Clone)]
pub(crate) struct ShutdownSignal {
    rx: watch::Receiver<bool>,
}

impl ShutdownSignal {
    pub fn new(rx: watch::Receiver<bool>) -> Self {
        Self { rx }
    }

    /// Resolves once shutdown is requested or the orchestrator is gone.
    pub async fn wait(&mut self) {
        let _ = self.rx.wait_for(|stop| *stop).await;
    }
}

pub(crate) async fn run_capture(
    mut source: Box<dyn FrameSource>,
    frames: SlotWriter<CapturedFrame>,
    mut shutdown: ShutdownSignal,
    stats: Arc<StatsCounters>,
) {
    tracing::info!(stage = "capture", source = source.name(), "Stage started");
    let mut seq = 0u64;

    loop {
        let result = tokio::select! {
            biased;
            _ = shutdown.wait() => break,
            result = source.next_frame() => result,
        };

        match result {
            Ok(frame) => {
                seq += 1;
                StatsCounters::bump(&stats.frames_captured);
                let replaced = frames.publish(CapturedFrame {
                    seq,
                    captured_at: Instant::now(),
                    frame,
                });
                if replaced {
                    StatsCounters::bump(&stats.frames_dropped);
                    tracing::debug!(stage = "capture", frame = seq, "Replaced unprocessed frame");
                }
            }
            Err(e) => {
                StatsCounters::bump(&stats.capture_failures);
                report_failure("capture", &e, "Frame capture failed");
                tokio::select! {
                    biased;
                    _ = shutdown.wait() => break,
                    _ = tokio::time::sleep(CAPTURE_RETRY_DELAY) => {}
                }
            }
        }
    }

    tracing::info!(stage = "capture", frames = seq, "Stage stopped");
}

pub(crate) async fn run_inference(
    mut detector: Box<dyn Detector>,
    mut frames: SlotReader<CapturedFrame>,
    batches: SlotWriter<DetectionBatch>,
    mut shutdown: ShutdownSignal,
    stats: Arc<StatsCounters>,
) {
    tracing::info!(stage = "inference", detector = detector.name(), "Stage started");

    loop {
        let frame = tokio::select! {
            biased;
            _ = shutdown.wait() => break,
            frame = frames.take() => match frame {
                Some(frame) => frame,
                None => break,
            },
        };

        let started = Instant::now();
        let detections = match detector.detect(&frame).await {
            Ok(detections) => detections,
            Err(e) => {
                StatsCounters::bump(&stats.detection_failures);
                tracing::debug!(stage = "inference", frame = frame.seq, "Treating frame as empty");
                report_failure("inference", &e, "Detection failed");
                Vec::new()
            }
        };

        let replaced = batches.publish(DetectionBatch {
            seq: frame.seq,
            captured_at: frame.captured_at,
            region: frame.frame.region,
            frame_width: frame.frame.width,
            frame_height: frame.frame.height,
            detections: Arc::new(detections),
            inference: started.elapsed(),
        });
        if replaced {
            StatsCounters::bump(&stats.batches_dropped);
        }
    }

    tracing::info!(stage = "inference", "Stage stopped");
}

/// Selection and control. Sole owner of the track and control state.
pub(crate) struct ControlLoop {
    pub selector: TargetSelector,
    pub controller: MotionController,
    pub config: TrackingConfig,
    pub config_rx: watch::Receiver<TrackingConfig>,
    pub engagement: EngagementHandle,
    pub pointer: Arc<dyn PointerDevice>,
    pub telemetry: Arc<dyn TelemetrySink>,
    pub commands: SlotWriter<PointerCommand>,
    pub overlay: Option<SlotWriter<OverlayFrame>>,
    pub clock: PipelineClock,
    pub stats: Arc<StatsCounters>,
}

impl ControlLoop {
    pub async fn run(mut self, mut batches: SlotReader<DetectionBatch>, mut shutdown: ShutdownSignal) {
        tracing::info!(stage = "control", "Stage started");
        let mut fps = FpsCounter::new();
        let mut geometry = None;

        loop {
            let batch = tokio::select! {
                biased;
                _ = shutdown.wait() => break,
                batch = batches.take() => match batch {
                    Some(batch) => batch,
                    None => break,
                },
            };

            // Configuration only changes between ticks.
            if self.config_rx.has_changed().unwrap_or(false) {
                self.config = self.config_rx.borrow_and_update().clone();
                tracing::info!(stage = "control", "Adopted new tracking configuration");
            }

            // Map with the geometry the frame was actually captured in.
            let mapper = CoordinateMapper::new(batch.region, batch.frame_width, batch.frame_height);
            if geometry != Some(mapper) {
                if mapper != CoordinateMapper::from_config(&self.config) {
                    tracing::warn!(
                        stage = "control",
                        region = ?batch.region,
                        frame_width = batch.frame_width,
                        frame_height = batch.frame_height,
                        "Capture geometry differs from configuration; following the frame"
                    );
                }
                geometry = Some(mapper);
            }

            // Engagement is sampled once per tick.
            let engaged = self.engagement.is_engaged();
            let (selection, command) = self.tick(&batch, &mapper, engaged).await;
            let fps = fps.tick(self.clock.elapsed_ns());
            self.report(&batch, selection, command, engaged, fps);
        }

        self.controller.reset();
        self.selector.reset();
        tracing::info!(stage = "control", "Stage stopped");
    }

    async fn tick(
        &mut self,
        batch: &DetectionBatch,
        mapper: &CoordinateMapper,
        engaged: bool,
    ) -> (Selection, PointerCommand) {
        let selection =
            self.selector
                .select_around(&batch.detections, mapper.capture_center(), &self.config);
        let target = selection.target().map(|center| mapper.to_screen(center));

        let command = match target {
            Some(_) if engaged => match self.pointer.position().await {
                Ok(pointer) => self.controller.step(true, target, pointer, &self.config),
                Err(e) => {
                    tracing::warn!(stage = "control", error = %e, "Pointer position unavailable");
                    PointerCommand::ZERO
                }
            },
            _ => {
                self.controller.reset();
                PointerCommand::ZERO
            }
        };

        // A command still waiting for the actuator is stale once disengaged.
        if !engaged && self.commands.clear() {
            StatsCounters::bump(&self.stats.commands_dropped);
        }

        if !command.is_zero() {
            StatsCounters::bump(&self.stats.commands_issued);
            if self.commands.publish(command) {
                StatsCounters::bump(&self.stats.commands_dropped);
            }
        }

        (selection, command)
    }

    fn report(
        &mut self,
        batch: &DetectionBatch,
        selection: Selection,
        command: PointerCommand,
        engaged: bool,
        fps: f64,
    ) {
        StatsCounters::bump(&self.stats.ticks);
        let metrics = TickMetrics {
            frame_seq: batch.seq,
            detection_count: batch.detections.len(),
            inference_ms: batch.inference.as_secs_f64() * 1000.0,
            total_latency_ms: PipelineClock::ns_to_ms(
                self.clock
                    .elapsed_ns()
                    .saturating_sub(self.clock.ns_at(batch.captured_at)),
            ),
            fps,
            engaged,
            track_id: selection.track_id(),
            command,
        };
        self.telemetry.record(&metrics);

        if let Some(overlay) = &self.overlay {
            overlay.publish(OverlayFrame {
                detections: batch.detections.clone(),
                selection,
                metrics,
            });
        }
    }
}

pub(crate) async fn run_actuation(
    pointer: Arc<dyn PointerDevice>,
    mut commands: SlotReader<PointerCommand>,
    telemetry: Arc<dyn TelemetrySink>,
    mut shutdown: ShutdownSignal,
    stats: Arc<StatsCounters>,
) {
    tracing::info!(stage = "actuation", "Stage started");

    loop {
        // Biased toward shutdown: a pending command is discarded, not applied.
        let command = tokio::select! {
            biased;
            _ = shutdown.wait() => break,
            command = commands.take() => match command {
                Some(command) => command,
                None => break,
            },
        };

        match pointer.move_by(command).await {
            Ok(()) => StatsCounters::bump(&stats.commands_applied),
            Err(e) => {
                StatsCounters::bump(&stats.actuation_failures);
                telemetry.actuation_failed(&e);
            }
        }
    }

    tracing::info!(stage = "actuation", "Stage stopped");
}

pub(crate) async fn run_overlay(
    mut overlay: Box<dyn OverlaySink>,
    mut frames: SlotReader<OverlayFrame>,
    mut shutdown: ShutdownSignal,
    stats: Arc<StatsCounters>,
) {
    tracing::info!(stage = "overlay", "Stage started");

    loop {
        let frame = tokio::select! {
            biased;
            _ = shutdown.wait() => break,
            frame = frames.take() => match frame {
                Some(frame) => frame,
                None => break,
            },
        };

        if let Err(e) = overlay.render(&frame).await {
            StatsCounters::bump(&stats.overlay_failures);
            tracing::debug!(stage = "overlay", error = %e, "Overlay render failed");
        }
    }

    tracing::info!(stage = "overlay", "Stage stopped");
}
