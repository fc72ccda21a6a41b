//! Pursuit Common Utilities
//!
//! Shared infrastructure for all Pursuit crates:
//! - Error types and result aliases
//! - Monotonic clock and FPS measurement
//! - Tracing/logging initialization
//! - Settings loading and validation

pub mod clock;
pub mod config;
pub mod error;
pub mod logging;

pub use clock::*;
pub use config::*;
pub use error::*;
