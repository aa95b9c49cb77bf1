//! Core domain types for a capture run.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

/// Current schema version for the run manifest format.
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

// ---------------------------------------------------------------------------
// Navigation
// ---------------------------------------------------------------------------

/// Opaque locator for a navigation element in the live page.
///
/// Re-resolved on every activation: SPAs routinely re-render their sidebar,
/// so a handle captured at discovery time may be stale by the time it is clicked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementRef {
    /// CSS selector the element is matched by.
    pub selector: String,
    /// Position among the selector's matches at discovery time.
    /// `None` for statically configured labels (resolved by text).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nth: Option<usize>,
}

/// One named section of the documentation site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigationTarget {
    /// Visible label as configured or read from the page.
    pub label: String,
    /// Sanitized, run-unique stem used for every output file of this target.
    pub file_stem: String,
    /// Position in the run's target list.
    pub ordinal: usize,
    /// Locator for the element that activates this target.
    pub element: ElementRef,
}

// ---------------------------------------------------------------------------
// Extraction
// ---------------------------------------------------------------------------

/// How the content region is rendered into the primary artifact.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentMode {
    /// Raw inner HTML of the content region, unmodified.
    #[default]
    Markup,
    /// Tag-stripped, flattened plain text.
    Text,
    /// HTML converted to Markdown.
    Markdown,
}

impl std::fmt::Display for ContentMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Markup => "markup",
            Self::Text => "text",
            Self::Markdown => "markdown",
        })
    }
}

impl std::str::FromStr for ContentMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "markup" | "html" => Ok(Self::Markup),
            "text" => Ok(Self::Text),
            "markdown" | "md" => Ok(Self::Markdown),
            other => Err(format!(
                "unknown content mode '{other}': expected markup, text, or markdown"
            )),
        }
    }
}

/// An image element found inside the content region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef {
    /// The `src` attribute exactly as found in markup.
    pub source_attr: String,
    /// Absolute URL to fetch. `None` for inline `data:` sources, which are never fetched.
    pub resolved_url: Option<Url>,
    /// Position among all `img` elements of the region.
    pub ordinal: usize,
}

impl ImageRef {
    /// Whether the source is an inline `data:` URI.
    pub fn is_inline(&self) -> bool {
        is_inline_data(&self.source_attr)
    }
}

/// Whether a `src` value uses the inline-data scheme.
pub fn is_inline_data(src: &str) -> bool {
    src.trim_start()
        .get(..5)
        .is_some_and(|scheme| scheme.eq_ignore_ascii_case("data:"))
}

/// Content pulled from the page for one target.
#[derive(Debug, Clone)]
pub struct CapturedPage {
    pub target: NavigationTarget,
    /// Primary payload, already rendered per the run's [`ContentMode`].
    pub raw_content: String,
    pub image_refs: Vec<ImageRef>,
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// Pipeline stage an error was raised in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Navigate,
    Extract,
    Persist,
    FetchAsset,
    Translate,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Navigate => "navigate",
            Self::Extract => "extract",
            Self::Persist => "persist",
            Self::FetchAsset => "fetch_asset",
            Self::Translate => "translate",
        })
    }
}

/// A recorded per-stage failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageError {
    pub stage: Stage,
    pub message: String,
}

/// Classification of a finished target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Every stage succeeded.
    Succeeded,
    /// The primary artifact was written but something else failed.
    Partial,
    /// No primary artifact was written.
    Failed,
}

/// Per-target record in the run manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureResult {
    /// Target label.
    pub target: String,
    pub file_stem: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_path: Option<PathBuf>,
    /// SHA-256 of the primary artifact.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_sha256: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub localized_content_path: Option<PathBuf>,
    #[serde(default)]
    pub image_paths: Vec<PathBuf>,
    #[serde(default)]
    pub errors: Vec<StageError>,
}

impl CaptureResult {
    /// Empty result for a target, before any stage has run.
    pub fn new(target: &NavigationTarget) -> Self {
        Self {
            target: target.label.clone(),
            file_stem: target.file_stem.clone(),
            content_path: None,
            content_sha256: None,
            localized_content_path: None,
            image_paths: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// Record a stage failure.
    pub fn record(&mut self, stage: Stage, err: impl std::fmt::Display) {
        self.errors.push(StageError {
            stage,
            message: err.to_string(),
        });
    }

    pub fn outcome(&self) -> Outcome {
        match (&self.content_path, self.errors.is_empty()) {
            (None, _) => Outcome::Failed,
            (Some(_), true) => Outcome::Succeeded,
            (Some(_), false) => Outcome::Partial,
        }
    }
}

// ---------------------------------------------------------------------------
// Manifest
// ---------------------------------------------------------------------------

/// The per-run record of target outcomes, optionally written as `manifest.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureManifest {
    /// Schema version for forward compatibility.
    pub schema_version: u32,
    /// Time-sortable run identifier.
    pub run_id: Uuid,
    pub base_url: String,
    pub content_mode: ContentMode,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub results: Vec<CaptureResult>,
}

/// Outcome counts across a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub succeeded: usize,
    pub partial: usize,
    pub failed: usize,
}

impl RunSummary {
    /// Targets with at least one recorded error.
    pub fn failures(&self) -> usize {
        self.partial + self.failed
    }

    pub fn total(&self) -> usize {
        self.succeeded + self.partial + self.failed
    }
}

impl CaptureManifest {
    pub fn new(base_url: &Url, content_mode: ContentMode) -> Self {
        Self {
            schema_version: CURRENT_SCHEMA_VERSION,
            run_id: Uuid::now_v7(),
            base_url: base_url.to_string(),
            content_mode,
            started_at: Utc::now(),
            finished_at: None,
            results: Vec::new(),
        }
    }

    /// Append a completed target. Results are never revised afterwards.
    pub fn push(&mut self, result: CaptureResult) {
        self.results.push(result);
    }

    pub fn summary(&self) -> RunSummary {
        let mut summary = RunSummary::default();
        for result in &self.results {
            match result.outcome() {
                Outcome::Succeeded => summary.succeeded += 1,
                Outcome::Partial => summary.partial += 1,
                Outcome::Failed => summary.failed += 1,
            }
        }
        summary
    }
}
