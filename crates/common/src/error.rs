//! Error types shared across Pursuit crates.

use std::path::PathBuf;

/// Top-level error type for Pursuit operations.
///
/// Peripheral variants (`Capture`, `Detection`, `Actuation`, `Overlay`) are
/// reported and absorbed by the pipeline. Only `Config` and `Pipeline`
/// errors stop it.
#[derive(Debug, thiserror::Error)]
pub enum PursuitError {
    #[error("Capture error: {message}")]
    Capture { message: String },

    #[error("Detection error: {message}")]
    Detection { message: String },

    #[error("Actuation error: {message}")]
    Actuation { message: String },

    #[error("Overlay error: {message}")]
    Overlay { message: String },

    #[error("Configuration error: {field}: {message}")]
    Config { field: String, message: String },

    #[error("Pipeline error: {message}")]
    Pipeline { message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using PursuitError.
pub type PursuitResult<T> = Result<T, PursuitError>;

impl PursuitError {
    pub fn capture(msg: impl Into<String>) -> Self {
        Self::Capture {
            message: msg.into(),
        }
    }

    pub fn detection(msg: impl Into<String>) -> Self {
        Self::Detection {
            message: msg.into(),
        }
    }

    pub fn actuation(msg: impl Into<String>) -> Self {
        Self::Actuation {
            message: msg.into(),
        }
    }

    pub fn overlay(msg: impl Into<String>) -> Self {
        Self::Overlay {
            message: msg.into(),
        }
    }

    pub fn config(field: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Config {
            field: field.into(),
            message: msg.into(),
        }
    }

    pub fn pipeline(msg: impl Into<String>) -> Self {
        Self::Pipeline {
            message: msg.into(),
        }
    }

    /// Whether the error belongs to a best-effort peripheral and must not
    /// stop the control loop.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Capture { .. }
                | Self::Detection { .. }
                | Self::Actuation { .. }
                | Self::Overlay { .. }
        )
    }
}
