//! # Stage SDK
//!
//! Building blocks shared by the three pipeline stages and the gateway.
//!
//! This crate provides:
//!
//! - `capability`: the provider traits a stage wraps, with lifecycle hooks
//! - `pipeline`: the `Stage` trait and the `execute` routine every stage runs
//! - `hop`: the single-attempt, timeout-bounded call into the next stage
//! - `upload`: multipart image parsing
//! - `server`: rejections, health, request ids and graceful serving
//!
//! ## Architecture
//!
//! A stage validates its input, runs `execute`, and serializes the resulting
//! `Envelope`. Faults below the stage come back from `execute` inside the
//! envelope; only malformed input turns into an error response.

pub mod capability;
pub mod hop;
pub mod pipeline;
pub mod server;
pub mod upload;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

#[cfg(test)]
mod tests;

pub use capability::{AnalysisReport, Analyzer, CapabilityError, Classifier, Lifecycle, Summarizer};
pub use hop::{HopClient, HopError};
pub use pipeline::{execute, Stage};
pub use server::{request_id, serve, serve_on, with_common_layers, ServiceInfo, StageRejection};
pub use upload::{ensure_allowed_type, ImageForm, UploadError};
