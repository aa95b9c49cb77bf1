//! Error types for DocCapture.
//!
//! Library crates use [`CaptureError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all DocCapture operations.
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Browser engine failure (launch, navigation, DOM access).
    #[error("browser error: {0}")]
    Browser(String),

    /// The navigation label has no resolvable element in the host page.
    #[error("navigation target not found: {label}")]
    NavigationTargetNotFound { label: String },

    /// The content region is missing or unreadable.
    #[error("extraction failed: {message}")]
    ExtractionFailed { message: String },

    /// A single image could not be retrieved or written.
    #[error(
        "asset fetch failed for {url}{suffix}: {message}",
        suffix = .status.map(|s| format!(" (HTTP {s})")).unwrap_or_default()
    )]
    AssetFetchFailed {
        url: String,
        status: Option<u16>,
        message: String,
    },

    /// The translation backend returned an error or timed out.
    #[error("translation failed: {0}")]
    TranslationFailed(String),

    /// Filesystem write error for an output artifact.
    #[error("persistence failed at {path:?}: {source}")]
    PersistenceFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    /// HTML-to-Markdown conversion error.
    #[error("conversion error: {0}")]
    Conversion(String),
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, CaptureError>;

impl CaptureError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create an extraction error from any displayable message.
    pub fn extraction(msg: impl Into<String>) -> Self {
        Self::ExtractionFailed {
            message: msg.into(),
        }
    }

    pub fn target_not_found(label: impl Into<String>) -> Self {
        Self::NavigationTargetNotFound {
            label: label.into(),
        }
    }

    /// Create an asset fetch error.
    pub fn asset(url: impl Into<String>, status: Option<u16>, msg: impl Into<String>) -> Self {
        Self::AssetFetchFailed {
            url: url.into(),
            status,
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with the path that failed to be written.
    pub fn persistence(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::PersistenceFailed {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = CaptureError::config("missing base_url");
        assert_eq!(err.to_string(), "config error: missing base_url");

        let err = CaptureError::target_not_found("Data Flow");
        assert_eq!(err.to_string(), "navigation target not found: Data Flow");
    }

    #[test]
    fn asset_error_includes_status_when_known() {
        let err = CaptureError::asset("https://docs.example/a.png", Some(404), "not found");
        assert_eq!(
            err.to_string(),
            "asset fetch failed for https://docs.example/a.png (HTTP 404): not found"
        );

        let err = CaptureError::asset("https://docs.example/a.png", None, "timed out");
        assert!(!err.to_string().contains("HTTP"));
    }
}
