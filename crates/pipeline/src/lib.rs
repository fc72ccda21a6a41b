//! Pursuit Pipeline
//!
//! Runs the tracking loop as concurrent stages joined by single-slot,
//! latest-wins handoffs. A slow stage never queues work: it picks up the
//! newest value when it is ready and older ones are counted as dropped.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────┐  frame  ┌───────────┐  batch  ┌─────────┐ command ┌───────────┐
//! │ Capture ├────────▶│ Inference ├────────▶│ Control ├────────▶│ Actuation │
//! └─────────┘         └───────────┘         └────┬────┘         └───────────┘
//!                                                │ overlay frame
//!                                                ▼
//!                                           ┌─────────┐
//!                                           │ Overlay │
//!                                           └─────────┘
//! ```
//!
//! The [`Orchestrator`] owns the stages, the engagement flag, and the
//! configuration channel. Peripheral failures are logged and absorbed.

pub mod collaborators;
pub mod orchestrator;
pub mod slot;
mod stages;
pub mod stats;
pub mod synthetic;
pub mod telemetry;

pub use collaborators::*;
pub use orchestrator::{EngagementHandle, Orchestrator, PipelineState, PipelineSummary};
pub use slot::{latest_slot, SlotReader, SlotWriter};
pub use stats::PipelineStats;
pub use telemetry::{TelemetrySummary, TracingTelemetry};
