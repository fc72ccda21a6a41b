//! Telemetry sinks.

use std::sync::Mutex;

use pursuit_common::config::TelemetryConfig;
use pursuit_common::error::PursuitError;
use pursuit_model::TickMetrics;
use serde::Serialize;

use crate::collaborators::TelemetrySink;

/// Running averages over a whole run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TelemetrySummary {
    pub ticks: u64,
    pub engaged_ticks: u64,
    pub avg_detections: f64,
    pub avg_inference_ms: f64,
    pub avg_latency_ms: f64,
    pub max_latency_ms: f64,
    pub avg_fps: f64,
    pub actuation_failures: u64,
}

#[derive(Debug, Default)]
struct Accumulator {
    ticks: u64,
    engaged_ticks: u64,
    detections: u64,
    inference_ms: f64,
    latency_ms: f64,
    max_latency_ms: f64,
    fps_sum: f64,
    fps_samples: u64,
    actuation_failures: u64,
}

/// Telemetry sink that writes to `tracing` and keeps run statistics.
///
/// Every tick is logged at `trace`; every `log_interval` ticks an `info`
/// summary of the averages so far is emitted.
#[derive(Debug)]
pub struct TracingTelemetry {
    log_interval: u64,
    acc: Mutex<Accumulator>,
}

impl TracingTelemetry {
    pub fn new(config: &TelemetryConfig) -> Self {
        Self {
            log_interval: config.log_interval,
            acc: Mutex::new(Accumulator::default()),
        }
    }

    pub fn summary(&self) -> TelemetrySummary {
        let acc = self.lock();
        let per_tick = |total: f64| {
            if acc.ticks == 0 {
                0.0
            } else {
                total / acc.ticks as f64
            }
        };
        TelemetrySummary {
            ticks: acc.ticks,
            engaged_ticks: acc.engaged_ticks,
            avg_detections: per_tick(acc.detections as f64),
            avg_inference_ms: per_tick(acc.inference_ms),
            avg_latency_ms: per_tick(acc.latency_ms),
            max_latency_ms: acc.max_latency_ms,
            avg_fps: if acc.fps_samples == 0 {
                0.0
            } else {
                acc.fps_sum / acc.fps_samples as f64
            },
            actuation_failures: acc.actuation_failures,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Accumulator> {
        self.acc.lock().unwrap_or_else(|p| p.into_inner())
    }
}

impl Default for TracingTelemetry {
    fn default() -> Self {
        Self::new(&TelemetryConfig::default())
    }
}

impl TelemetrySink for TracingTelemetry {
    fn record(&self, metrics: &TickMetrics) {
        tracing::trace!(
            frame = metrics.frame_seq,
            detections = metrics.detection_count,
            inference_ms = metrics.inference_ms,
            latency_ms = metrics.total_latency_ms,
            fps = metrics.fps,
            engaged = metrics.engaged,
            track = ?metrics.track_id,
            dx = metrics.command.dx,
            dy = metrics.command.dy,
            "tick"
        );

        let ticks = {
            let mut acc = self.lock();
            acc.ticks += 1;
            if metrics.engaged {
                acc.engaged_ticks += 1;
            }
            acc.detections += metrics.detection_count as u64;
            acc.inference_ms += metrics.inference_ms;
            acc.latency_ms += metrics.total_latency_ms;
            acc.max_latency_ms = acc.max_latency_ms.max(metrics.total_latency_ms);
            // FPS reads 0 until the first one-second window closes.
            if metrics.fps > 0.0 {
                acc.fps_sum += metrics.fps;
                acc.fps_samples += 1;
            }
            acc.ticks
        };

        if self.log_interval > 0 && ticks % self.log_interval == 0 {
            let summary = self.summary();
            tracing::info!(
                ticks,
                avg_inference_ms = summary.avg_inference_ms,
                avg_latency_ms = summary.avg_latency_ms,
                avg_fps = summary.avg_fps,
                "Telemetry"
            );
        }
    }

    fn actuation_failed(&self, error: &PursuitError) {
        tracing::warn!(error = %error, "Pointer command dropped");
        self.lock().actuation_failures += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(inference_ms: f64, latency_ms: f64, fps: f64) -> TickMetrics {
        TickMetrics {
            detection_count: 2,
            inference_ms,
            total_latency_ms: latency_ms,
            fps,
            engaged: true,
            ..TickMetrics::default()
        }
    }

    #[test]
    fn test_summary_averages() {
        let telemetry = TracingTelemetry::new(&TelemetryConfig { log_interval: 0 });
        telemetry.record(&metrics(4.0, 10.0, 0.0));
        telemetry.record(&metrics(6.0, 20.0, 60.0));

        let summary = telemetry.summary();
        assert_eq!(summary.ticks, 2);
        assert_eq!(summary.engaged_ticks, 2);
        assert!((summary.avg_detections - 2.0).abs() < 1e-9);
        assert!((summary.avg_inference_ms - 5.0).abs() < 1e-9);
        assert!((summary.avg_latency_ms - 15.0).abs() < 1e-9);
        assert_eq!(summary.max_latency_ms, 20.0);
        assert!((summary.avg_fps - 60.0).abs() < 1e-9);
    }

    #[test]
    fn test_actuation_failures_counted() {
        let telemetry = TracingTelemetry::default();
        telemetry.actuation_failed(&PursuitError::actuation("device unplugged"));
        assert_eq!(telemetry.summary().actuation_failures, 1);
    }

    #[test]
    fn test_empty_summary() {
        assert_eq!(TracingTelemetry::default().summary(), TelemetrySummary::default());
    }
}
