//! Text localization backends.
//!
//! The capture pipeline only sees the [`Translator`] trait; backends are
//! chosen from [`TranslatorKind`] at run start:
//! - [`PlaceholderTranslator`] — appends a fixed marker, no external calls
//! - [`BridgeTranslator`] — delegates to a subprocess over JSON lines

mod bridge;
mod placeholder;

use async_trait::async_trait;
use tracing::warn;

use doccapture_shared::{CaptureError, Result, RetryPolicy, TranslatorKind};

pub use bridge::BridgeTranslator;
pub use placeholder::PlaceholderTranslator;

/// Maps source text to its localized form.
#[async_trait]
pub trait Translator: Send + Sync {
    /// Backend name for logs and progress output.
    fn name(&self) -> &str;

    async fn translate(&self, text: &str) -> Result<String>;

    /// Release backend resources. Called once after the last translation.
    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }
}

/// Build the translator described by `kind`.
pub async fn from_kind(kind: &TranslatorKind, target_locale: &str) -> Result<Box<dyn Translator>> {
    match kind {
        TranslatorKind::Placeholder { marker } => {
            Ok(Box::new(PlaceholderTranslator::new(marker.clone())))
        }
        TranslatorKind::Bridge { cmd, args } => {
            let bridge = BridgeTranslator::spawn(cmd, args, target_locale).await?;
            Ok(Box::new(bridge))
        }
    }
}

/// Translate under `policy`: each attempt is bounded by `policy.timeout`, and
/// failed attempts are retried `policy.retries` times with linear backoff.
pub async fn translate_with_policy(
    translator: &dyn Translator,
    text: &str,
    policy: &RetryPolicy,
) -> Result<String> {
    let mut attempt = 0;
    loop {
        let result = match tokio::time::timeout(policy.timeout, translator.translate(text)).await {
            Ok(result) => result,
            Err(_) => Err(CaptureError::TranslationFailed(format!(
                "{} timed out after {}ms",
                translator.name(),
                policy.timeout.as_millis()
            ))),
        };

        match result {
            Ok(translated) => return Ok(translated),
            Err(e) if attempt < policy.retries => {
                attempt += 1;
                let delay = policy.delay_for(attempt);
                warn!(backend = translator.name(), error = %e, attempt, "translation failed, retrying");
                tokio::time::sleep(delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}
