//! Settings snapshot loading and validation.
//!
//! The tracking parameters are loaded once, validated, and then shared
//! read-only. Invalid gains or thresholds are rejected here, before the
//! pipeline starts, never at control time.

use std::path::{Path, PathBuf};

use pursuit_model::CaptureRegion;
use serde::{Deserialize, Serialize};

use crate::error::{PursuitError, PursuitResult};

/// Global application settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Tracking and control parameters.
    pub tracking: TrackingConfig,

    /// Telemetry reporting.
    pub telemetry: TelemetryConfig,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Tunable tracking-and-control parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    /// Proportional gain.
    pub kp: f64,

    /// Derivative gain.
    pub kd: f64,

    /// Output smoothing factor in `[0, 1)`. Higher keeps more of the previous output.
    pub alpha: f64,

    /// Radius (screen px) around the pointer inside which no correction is applied.
    pub dead_zone: f64,

    /// Hard ceiling on the per-tick displacement magnitude (screen px).
    pub max_speed: f64,

    /// Detections below this confidence are ignored.
    pub confidence_threshold: f64,

    /// Maximum frame-to-frame target displacement (capture px) for a track to continue.
    pub gating_radius: f64,

    /// Frames a track may go unmatched before it is dropped.
    pub max_staleness: u32,

    /// Ignore boxes that contain the capture center (the player's own model
    /// in third-person views).
    pub ignore_center_boxes: bool,

    /// Screen rectangle grabbed by the capture collaborator.
    pub region: CaptureRegion,

    /// Width of the frame handed to the detector.
    pub frame_width: u32,

    /// Height of the frame handed to the detector.
    pub frame_height: u32,
}

/// Telemetry reporting parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Emit an info-level summary every N control ticks. 0 disables summaries.
    pub log_interval: u64,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "pursuit_pipeline=trace,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            kp: 0.15,
            kd: 0.05,
            alpha: 0.85,
            dead_zone: 5.0,
            max_speed: 30.0,
            confidence_threshold: 0.5,
            gating_radius: 64.0,
            max_staleness: 5,
            ignore_center_boxes: false,
            region: CaptureRegion::default(),
            frame_width: 640,
            frame_height: 360,
        }
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self { log_interval: 100 }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl TrackingConfig {
    /// Reject configurations the controller or selector cannot run with.
    pub fn validate(&self) -> PursuitResult<()> {
        let finite = [
            ("kp", self.kp),
            ("kd", self.kd),
            ("alpha", self.alpha),
            ("dead_zone", self.dead_zone),
            ("max_speed", self.max_speed),
            ("confidence_threshold", self.confidence_threshold),
            ("gating_radius", self.gating_radius),
        ];
        for (field, value) in finite {
            if !value.is_finite() {
                return Err(PursuitError::config(field, format!("{value} is not finite")));
            }
        }

        if self.kp < 0.0 {
            return Err(PursuitError::config("kp", "must be >= 0"));
        }
        if self.kd < 0.0 {
            return Err(PursuitError::config("kd", "must be >= 0"));
        }
        if !(0.0..1.0).contains(&self.alpha) {
            return Err(PursuitError::config(
                "alpha",
                format!("{} is outside [0, 1)", self.alpha),
            ));
        }
        if self.dead_zone < 0.0 {
            return Err(PursuitError::config("dead_zone", "must be >= 0"));
        }
        if self.max_speed <= 0.0 {
            return Err(PursuitError::config("max_speed", "must be > 0"));
        }
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(PursuitError::config(
                "confidence_threshold",
                format!("{} is outside [0, 1]", self.confidence_threshold),
            ));
        }
        if self.gating_radius <= 0.0 {
            return Err(PursuitError::config("gating_radius", "must be > 0"));
        }
        if self.region.width == 0 || self.region.height == 0 {
            return Err(PursuitError::config(
                "region",
                format!(
                    "capture region {}x{} is empty",
                    self.region.width, self.region.height
                ),
            ));
        }
        if i32::try_from(self.region.width).is_err() || i32::try_from(self.region.height).is_err()
        {
            return Err(PursuitError::config("region", "capture region is too large"));
        }
        if self.frame_width == 0 || self.frame_height == 0 {
            return Err(PursuitError::config(
                "frame_width/frame_height",
                format!(
                    "detection frame {}x{} is empty",
                    self.frame_width, self.frame_height
                ),
            ));
        }
        Ok(())
    }
}

impl Settings {
    /// Load settings from the standard location, falling back to defaults.
    ///
    /// A file that exists but fails validation is still an error; only a
    /// missing or unreadable file falls back.
    pub fn load() -> PursuitResult<Self> {
        let config_path = config_file_path();
        if !config_path.exists() {
            return Ok(Self::default());
        }
        match Self::load_from(&config_path) {
            Err(PursuitError::Io(e)) => {
                tracing::warn!("Failed to read config at {:?}: {}", config_path, e);
                Ok(Self::default())
            }
            other => other,
        }
    }

    /// Load and validate settings from an explicit path.
    pub fn load_from(path: &Path) -> PursuitResult<Self> {
        if !path.exists() {
            return Err(PursuitError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let content = std::fs::read_to_string(path)?;
        let settings: Settings = serde_json::from_str(&content)?;
        settings.tracking.validate()?;
        tracing::debug!(path = %path.display(), "Loaded settings");
        Ok(settings)
    }

    /// Save settings as pretty JSON.
    pub fn save_to(&self, path: &Path) -> PursuitResult<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Save settings to the standard location.
    pub fn save(&self) -> PursuitResult<()> {
        self.save_to(&config_file_path())
    }
}

/// Standard config file location.
pub fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("pursuit").join("config.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("pursuit-config-{}", std::process::id()))
            .join(name)
    }

    #[test]
    fn test_defaults_are_valid() {
        TrackingConfig::default().validate().unwrap();
    }

    #[test]
    fn test_alpha_must_be_below_one() {
        let cfg = TrackingConfig {
            alpha: 1.0,
            ..TrackingConfig::default()
        };
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("alpha"));

        let cfg = TrackingConfig {
            alpha: -0.1,
            ..TrackingConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_rejects_bad_gains_and_limits() {
        let bad = [
            TrackingConfig {
                kp: -1.0,
                ..TrackingConfig::default()
            },
            TrackingConfig {
                kd: f64::NAN,
                ..TrackingConfig::default()
            },
            TrackingConfig {
                max_speed: 0.0,
                ..TrackingConfig::default()
            },
            TrackingConfig {
                confidence_threshold: 1.5,
                ..TrackingConfig::default()
            },
            TrackingConfig {
                gating_radius: 0.0,
                ..TrackingConfig::default()
            },
            TrackingConfig {
                frame_width: 0,
                ..TrackingConfig::default()
            },
            TrackingConfig {
                region: CaptureRegion::new(0, 0, 0, 1080),
                ..TrackingConfig::default()
            },
        ];
        for cfg in bad {
            assert!(cfg.validate().is_err(), "{cfg:?} should be rejected");
        }
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let settings: Settings =
            serde_json::from_str(r#"{"tracking":{"kp":0.3,"dead_zone":2.0}}"#).unwrap();
        assert_eq!(settings.tracking.kp, 0.3);
        assert_eq!(settings.tracking.kd, 0.05);
        assert_eq!(settings.tracking.frame_width, 640);
        assert_eq!(settings.telemetry.log_interval, 100);
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let path = scratch_path("roundtrip.json");
        let mut settings = Settings::default();
        settings.tracking.max_speed = 12.0;
        settings.save_to(&path).unwrap();

        let loaded = Settings::load_from(&path).unwrap();
        assert_eq!(loaded.tracking, settings.tracking);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_save_uses_config_home() {
        let home = scratch_path("xdg");
        std::env::set_var("XDG_CONFIG_HOME", &home);
        assert_eq!(config_file_path(), home.join("pursuit").join("config.json"));

        let mut settings = Settings::default();
        settings.tracking.dead_zone = 3.0;
        settings.save().unwrap();
        let loaded = Settings::load().unwrap();
        std::env::remove_var("XDG_CONFIG_HOME");

        assert_eq!(loaded.tracking.dead_zone, 3.0);
        std::fs::remove_dir_all(&home).ok();
    }

    #[test]
    fn test_load_rejects_invalid_file() {
        let path = scratch_path("invalid.json");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, r#"{"tracking":{"alpha":1.2}}"#).unwrap();

        let err = Settings::load_from(&path).unwrap_err();
        assert!(matches!(err, PursuitError::Config { .. }));
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_load_missing_file() {
        let err = Settings::load_from(&scratch_path("does-not-exist.json")).unwrap_err();
        assert!(matches!(err, PursuitError::FileNotFound { .. }));
    }
}
