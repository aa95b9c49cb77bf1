//! Binary asset download.
//!
//! Each fetch writes to a hidden sibling and renames into place, so an
//! interrupted download never leaves a truncated image behind.

use std::path::Path;

use reqwest::Client;
use tracing::{debug, instrument, warn};
use url::Url;

use doccapture_shared::fs::write_atomic;
use doccapture_shared::{CaptureError, Result, RetryPolicy};

/// User-Agent string for asset requests.
const USER_AGENT: &str = concat!("DocCapture/", env!("CARGO_PKG_VERSION"));

/// Fallback extension when the URL path carries none usable.
const DEFAULT_EXTENSION: &str = ".png";

/// Downloads images referenced by captured pages.
#[derive(Debug, Clone)]
pub struct AssetFetcher {
    client: Client,
    policy: RetryPolicy,
}

impl AssetFetcher {
    pub fn new(policy: RetryPolicy) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(5))
            .timeout(policy.timeout)
            .build()
            .map_err(|e| CaptureError::config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client, policy })
    }

    /// Download `url` to `destination`, returning the number of bytes written.
    ///
    /// Transport errors and 5xx responses are retried up to `policy.retries`
    /// times; client errors fail immediately.
    #[instrument(skip(self), fields(url = %url, dest = %destination.display()))]
    pub async fn fetch(&self, url: &Url, destination: &Path) -> Result<u64> {
        if !matches!(url.scheme(), "http" | "https") {
            return Err(CaptureError::asset(
                url.as_str(),
                None,
                format!("unsupported scheme '{}'", url.scheme()),
            ));
        }

        let mut attempt = 0;
        loop {
            match self.fetch_once(url, destination).await {
                Ok(bytes) => {
                    debug!(bytes, attempt, "asset written");
                    return Ok(bytes);
                }
                Err(e) if attempt < self.policy.retries && is_retryable(&e) => {
                    attempt += 1;
                    let delay = self.policy.delay_for(attempt);
                    warn!(error = %e, attempt, delay_ms = delay.as_millis() as u64, "asset fetch failed, retrying");
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn fetch_once(&self, url: &Url, destination: &Path) -> Result<u64> {
        let download = async {
            let response = self
                .client
                .get(url.as_str())
                .send()
                .await
                .map_err(|e| CaptureError::asset(url.as_str(), None, e.to_string()))?;

            let status = response.status();
            if !status.is_success() {
                return Err(CaptureError::asset(
                    url.as_str(),
                    Some(status.as_u16()),
                    status.canonical_reason().unwrap_or("unexpected status"),
                ));
            }

            response.bytes().await.map_err(|e| {
                CaptureError::asset(url.as_str(), None, format!("body read failed: {e}"))
            })
        };

        let body = tokio::time::timeout(self.policy.timeout, download)
            .await
            .map_err(|_| {
                CaptureError::asset(
                    url.as_str(),
                    None,
                    format!("timed out after {}ms", self.policy.timeout.as_millis()),
                )
            })??;

        write_atomic(destination, &body)?;
        Ok(body.len() as u64)
    }
}

fn is_retryable(err: &CaptureError) -> bool {
    match err {
        CaptureError::AssetFetchFailed { status: None, .. } => true,
        CaptureError::AssetFetchFailed {
            status: Some(code), ..
        } => *code >= 500,
        _ => false,
    }
}

/// Extension (with leading dot) for a downloaded image.
///
/// Taken from the last path segment when it is alphanumeric and at most
/// eight characters long; otherwise `.png`.
pub fn image_extension(url: &Url) -> String {
    url.path_segments()
        .and_then(|mut segments| segments.next_back())
        .and_then(|name| name.rsplit_once('.'))
        .map(|(_, ext)| ext)
        .filter(|ext| !ext.is_empty() && ext.len() <= 8 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|ext| format!(".{ext}"))
        .unwrap_or_else(|| DEFAULT_EXTENSION.to_string())
}

/// File name for image `ordinal` of the target with stem `stem`.
pub fn destination_name(stem: &str, ordinal: usize, url: &Url) -> String {
    format!("{stem}_{ordinal}{}", image_extension(url))
}
