//! Shared types, error model, and configuration for DocCapture.
//!
//! This crate is the foundation depended on by all other DocCapture crates.
//! It provides:
//! - [`CaptureError`] — the unified error type
//! - Domain types ([`NavigationTarget`], [`ImageRef`], [`CaptureResult`], [`CaptureManifest`])
//! - Configuration ([`AppConfig`], [`CaptureConfig`], config loading)
//! - Label sanitization and atomic artifact writes

pub mod config;
pub mod error;
pub mod fs;
pub mod label;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, BrowserConfig, CaptureConfig, DEFAULT_DISCOVER_SELECTOR, DEFAULT_TRANSLATION_MARKER,
    FetchConfig, NavigationConfig, OutputConfig, RetryPolicy, SettleConfig, SettlePolicy,
    SiteConfig, TargetSource, TranslationConfig, TranslatorKind, config_dir, config_file_path,
    init_config, load_config, load_config_from,
};
pub use error::{CaptureError, Result};
pub use label::{LabelPolicy, sanitize_label, unique_stems};
pub use types::{
    CURRENT_SCHEMA_VERSION, CaptureManifest, CaptureResult, CapturedPage, ContentMode,
    ElementRef, ImageRef, NavigationTarget, Outcome, RunSummary, Stage, StageError,
    is_inline_data,
};
