//! Rendering of captured content regions into primary artifacts.
//!
//! The content region's inner HTML is turned into one of three payloads,
//! selected by [`ContentMode`]:
//! - `markup`: the HTML unmodified
//! - `text`: [`flatten`]ed plain text
//! - `markdown`: converted with `htmd`, then run through the cleanup passes

mod cleanup;
mod flatten;

use tracing::{debug, instrument};
use url::Url;

use doccapture_shared::{CaptureError, ContentMode, Result};

pub use flatten::flatten;

/// Tags dropped entirely during Markdown conversion.
const SKIP_TAGS: &[&str] = &["script", "style", "nav", "iframe", "noscript", "svg"];

/// Render a content region's inner HTML per `mode`.
pub fn render(html: &str, mode: ContentMode, base_url: &Url) -> Result<String> {
    match mode {
        ContentMode::Markup => Ok(html.to_string()),
        ContentMode::Text => Ok(flatten(html)),
        ContentMode::Markdown => to_markdown(html, base_url),
    }
}

/// Convert region HTML to clean Markdown.
#[instrument(skip(html), fields(base = %base_url, len = html.len()))]
pub fn to_markdown(html: &str, base_url: &Url) -> Result<String> {
    let converter = htmd::HtmlToMarkdown::builder()
        .skip_tags(SKIP_TAGS.to_vec())
        .build();

    let raw = converter
        .convert(html)
        .map_err(|e| CaptureError::Conversion(format!("htmd conversion failed: {e}")))?;

    let cleaned = cleanup::run_pipeline(&raw, base_url);
    debug!(raw_len = raw.len(), final_len = cleaned.len(), "markdown conversion complete");

    Ok(cleaned)
}
