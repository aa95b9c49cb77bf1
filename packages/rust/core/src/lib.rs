//! Capture run orchestration for DocCapture.
//!
//! This crate ties together navigation, extraction, asset fetching, and
//! translation into a single sequential run (see [`run_capture`]).

pub mod context;
pub mod orchestrator;

pub use context::{MANIFEST_FILE_NAME, RunContext};
pub use orchestrator::{ProgressReporter, SilentProgress, run_capture};
