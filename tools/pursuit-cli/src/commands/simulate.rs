//! Run the pipeline against synthetic collaborators.

use std::sync::Arc;
use std::time::Duration;

use pursuit_common::config::Settings;
use pursuit_control::CoordinateMapper;
use pursuit_pipeline::synthetic::{
    CountingOverlay, ScriptedDetector, SyntheticSource, TargetMotion, VirtualPointer,
};
use pursuit_pipeline::{Collaborators, Orchestrator, TracingTelemetry};

/// Angular speed of the synthetic target, radians per frame.
const ORBIT_STEP: f64 = 0.02;

pub async fn run(settings: Settings, ticks: u64, fps: f64, engage_after: u64) -> anyhow::Result<()> {
    let tracking = settings.tracking.clone();
    let mapper = CoordinateMapper::from_config(&tracking);

    let radius = f64::from(tracking.frame_width.min(tracking.frame_height)) / 4.0;
    let motion = TargetMotion::Orbit {
        center: mapper.capture_center(),
        radius,
        step: ORBIT_STEP,
    };

    let pointer = Arc::new(VirtualPointer::new(
        tracking.region.center(),
        tracking.region,
    ));
    let telemetry = Arc::new(TracingTelemetry::new(&settings.telemetry));
    let overlay = CountingOverlay::new();

    println!("Simulating pursuit of an orbiting target");
    println!(
        "  Region: {}x{} at ({}, {})",
        tracking.region.width, tracking.region.height, tracking.region.left, tracking.region.top
    );
    println!("  Frame: {}x{} @ {fps} FPS", tracking.frame_width, tracking.frame_height);
    println!("  Orbit radius: {radius:.0} px");
    if ticks == 0 {
        println!("  Ticks: unlimited");
    } else {
        println!("  Ticks: {ticks}");
    }
    println!("  Engage after: {engage_after} ticks");
    println!();
    println!("Press Ctrl+C to stop...");
    println!();

    let mut orchestrator = Orchestrator::new(tracking.clone())?;
    orchestrator.start(Collaborators {
        source: Box::new(SyntheticSource::new(
            tracking.region,
            tracking.frame_width,
            tracking.frame_height,
            fps,
        )),
        detector: Box::new(ScriptedDetector::new(motion)),
        pointer: pointer.clone(),
        overlay: Some(Box::new(overlay.clone())),
        telemetry: telemetry.clone(),
    })?;

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut poll = tokio::time::interval(Duration::from_millis(20));

    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                tracing::info!("Interrupted");
                break;
            }
            _ = poll.tick() => {
                let done = orchestrator.stats().ticks;
                if !orchestrator.is_engaged() && done >= engage_after {
                    orchestrator.set_engagement(true);
                }
                if ticks > 0 && done >= ticks {
                    break;
                }
            }
        }
    }

    let summary = orchestrator.shutdown().await?;
    let report = telemetry.summary();
    let final_pointer = pointer.snapshot();
    let stats = &summary.stats;

    println!("Simulation finished");
    println!("  Started: {}", summary.started_at);
    println!("  Uptime: {:.2}s", summary.uptime_secs);
    println!("  Ticks: {} ({} engaged)", stats.ticks, report.engaged_ticks);
    println!(
        "  Frames: {} captured, {} dropped ({:.1}%)",
        stats.frames_captured,
        stats.frames_dropped,
        stats.drop_rate()
    );
    println!(
        "  Commands: {} issued, {} applied, {} failed",
        stats.commands_issued, stats.commands_applied, stats.actuation_failures
    );
    println!(
        "  Latency: {:.2} ms avg, {:.2} ms max",
        report.avg_latency_ms, report.max_latency_ms
    );
    println!("  FPS: {:.1} avg", report.avg_fps);
    println!("  Overlay: {} frames, {} locked", overlay.rendered(), overlay.locked());
    println!(
        "  Pointer: ({}, {}) after {} moves, largest step {:.2} px",
        final_pointer.position.x, final_pointer.position.y, final_pointer.moves, final_pointer.max_step
    );

    let orbit_center = mapper.to_screen(mapper.capture_center());
    let offset = final_pointer.position.offset_to(&orbit_center).magnitude();
    let orbit_radius = radius * mapper.scale_factors().0;
    println!(
        "  Distance from orbit: {:.1} px",
        (offset - orbit_radius).abs()
    );

    Ok(())
}
