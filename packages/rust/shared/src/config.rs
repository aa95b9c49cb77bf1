//! Application configuration for DocCapture.
//!
//! User config lives at `~/.doccapture/doccapture.toml` unless `--config` points elsewhere.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{CaptureError, Result};
use crate::types::ContentMode;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "doccapture.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".doccapture";

/// Navigation container used when discovery is requested without a selector.
pub const DEFAULT_DISCOVER_SELECTOR: &str = "nav a, aside a";

/// Marker appended by the placeholder translator.
pub const DEFAULT_TRANSLATION_MARKER: &str = "[此处为中文翻译，需接入翻译API]";

// ---------------------------------------------------------------------------
// Config structs (matching doccapture.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub site: SiteConfig,

    #[serde(default)]
    pub navigation: NavigationConfig,

    #[serde(default)]
    pub settle: SettleConfig,

    #[serde(default)]
    pub output: OutputConfig,

    #[serde(default)]
    pub fetch: FetchConfig,

    #[serde(default)]
    pub translation: TranslationConfig,

    #[serde(default)]
    pub browser: BrowserConfig,
}

/// `[site]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Documentation site entry URL. Relative image sources resolve against it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Selector for the content region.
    #[serde(default = "default_content_selector")]
    pub content_selector: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            content_selector: default_content_selector(),
        }
    }
}

fn default_content_selector() -> String {
    "main".into()
}

/// `[navigation]` section. Exactly one of `labels` / `discover_selector` must be set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavigationConfig {
    /// Static, ordered list of link labels.
    #[serde(default)]
    pub labels: Vec<String>,

    /// Selector enumerating navigation links once at run start.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discover_selector: Option<String>,

    /// Selector used to resolve static labels to clickable elements.
    #[serde(default = "default_link_selector")]
    pub link_selector: String,
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            labels: Vec::new(),
            discover_selector: None,
            link_selector: default_link_selector(),
        }
    }
}

fn default_link_selector() -> String {
    r#"a, [role="link"]"#.into()
}

/// `[settle]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettleConfig {
    /// `"fixed"` or `"stabilize"`.
    #[serde(default = "default_settle_strategy")]
    pub strategy: String,

    /// Fixed wait after activation.
    #[serde(default = "default_settle_delay")]
    pub delay_ms: u64,

    /// Poll interval for the stabilize strategy.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    /// Upper bound for the stabilize strategy.
    #[serde(default = "default_settle_timeout")]
    pub timeout_ms: u64,
}

impl Default for SettleConfig {
    fn default() -> Self {
        Self {
            strategy: default_settle_strategy(),
            delay_ms: default_settle_delay(),
            poll_interval_ms: default_poll_interval(),
            timeout_ms: default_settle_timeout(),
        }
    }
}

fn default_settle_strategy() -> String {
    "stabilize".into()
}
fn default_settle_delay() -> u64 {
    500
}
fn default_poll_interval() -> u64 {
    150
}
fn default_settle_timeout() -> u64 {
    5_000
}

/// `[output]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_dir")]
    pub dir: String,

    #[serde(default = "default_images_subdir")]
    pub images_subdir: String,

    #[serde(default)]
    pub content_mode: ContentMode,

    /// Locale suffix for translated artifacts (`<stem>.<locale>.md`).
    #[serde(default = "default_locale")]
    pub locale: String,

    /// Persist the run manifest as `manifest.json`.
    #[serde(default = "default_true")]
    pub write_manifest: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            images_subdir: default_images_subdir(),
            content_mode: ContentMode::default(),
            locale: default_locale(),
            write_manifest: true,
        }
    }
}

fn default_output_dir() -> String {
    "docs/capture".into()
}
fn default_images_subdir() -> String {
    "images".into()
}
fn default_locale() -> String {
    "zh".into()
}
fn default_true() -> bool {
    true
}

/// `[fetch]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    #[serde(default = "default_fetch_timeout")]
    pub timeout_secs: u64,

    /// Extra attempts after a transport error or 5xx. `0` disables retry.
    #[serde(default)]
    pub retries: u32,

    #[serde(default = "default_backoff")]
    pub retry_backoff_ms: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_fetch_timeout(),
            retries: 0,
            retry_backoff_ms: default_backoff(),
        }
    }
}

fn default_fetch_timeout() -> u64 {
    30
}
fn default_backoff() -> u64 {
    500
}

/// `[translation]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// `"placeholder"` or `"bridge"`.
    #[serde(default = "default_backend")]
    pub backend: String,

    /// Target locale passed to the backend. Falls back to `output.locale`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_locale: Option<String>,

    #[serde(default = "default_marker")]
    pub marker: String,

    /// Bridge executable (e.g. `bun`, `python3`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bridge_cmd: Option<String>,

    #[serde(default)]
    pub bridge_args: Vec<String>,

    #[serde(default = "default_translation_timeout")]
    pub timeout_secs: u64,

    #[serde(default)]
    pub retries: u32,

    #[serde(default = "default_backoff")]
    pub retry_backoff_ms: u64,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            backend: default_backend(),
            target_locale: None,
            marker: default_marker(),
            bridge_cmd: None,
            bridge_args: Vec::new(),
            timeout_secs: default_translation_timeout(),
            retries: 0,
            retry_backoff_ms: default_backoff(),
        }
    }
}

fn default_backend() -> String {
    "placeholder".into()
}
fn default_marker() -> String {
    DEFAULT_TRANSLATION_MARKER.into()
}
fn default_translation_timeout() -> u64 {
    120
}

/// `[browser]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserConfig {
    /// Path to a Chrome/Chromium binary. Auto-detected when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executable: Option<String>,

    /// DevTools websocket URL of an already running browser.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_url: Option<String>,

    #[serde(default = "default_true")]
    pub headless: bool,

    #[serde(default = "default_navigation_timeout")]
    pub navigation_timeout_secs: u64,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            executable: None,
            remote_url: None,
            headless: true,
            navigation_timeout_secs: default_navigation_timeout(),
        }
    }
}

fn default_navigation_timeout() -> u64 {
    30
}

// ---------------------------------------------------------------------------
// Capture config (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Where the navigation targets come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetSource {
    /// Configured labels, resolved by link text.
    Static {
        labels: Vec<String>,
        link_selector: String,
    },
    /// Labels read once from every element matching `selector`.
    Discover { selector: String },
}

/// How the walker decides that the content region has settled after a click.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettlePolicy {
    /// Sleep for a fixed delay.
    Fixed { delay: Duration },
    /// Hash the region every `interval` until two consecutive reads agree,
    /// giving up (and proceeding) after `timeout`.
    Stabilize { interval: Duration, timeout: Duration },
}

/// Bounded-retry policy for external calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub timeout: Duration,
    pub retries: u32,
    pub backoff: Duration,
}

impl RetryPolicy {
    /// Delay before the given retry attempt (1-based). Linear backoff.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.backoff.saturating_mul(attempt)
    }
}

/// Which translator backs the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranslatorKind {
    Placeholder { marker: String },
    Bridge { cmd: String, args: Vec<String> },
}

/// Runtime capture configuration, validated and merged from config file + CLI flags.
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    pub base_url: Url,
    pub content_selector: String,
    pub targets: TargetSource,
    pub settle: SettlePolicy,
    pub output_dir: PathBuf,
    pub images_subdir: String,
    pub content_mode: ContentMode,
    pub locale: String,
    pub write_manifest: bool,
    pub fetch: RetryPolicy,
    /// `None` disables the translation stage.
    pub translator: Option<TranslatorKind>,
    pub target_locale: String,
    pub translation: RetryPolicy,
}

impl TryFrom<&AppConfig> for CaptureConfig {
    type Error = CaptureError;

    fn try_from(config: &AppConfig) -> Result<Self> {
        let raw_url = config
            .site
            .base_url
            .as_deref()
            .ok_or_else(|| CaptureError::config("site.base_url is required"))?;
        let base_url = Url::parse(raw_url)
            .map_err(|e| CaptureError::config(format!("invalid base_url '{raw_url}': {e}")))?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(CaptureError::config(format!(
                "base_url must be http(s), got '{}'",
                base_url.scheme()
            )));
        }

        let nav = &config.navigation;
        let targets = match (nav.labels.is_empty(), &nav.discover_selector) {
            (false, Some(_)) => {
                return Err(CaptureError::config(
                    "navigation.labels and navigation.discover_selector are mutually exclusive",
                ));
            }
            (true, None) => {
                return Err(CaptureError::config(
                    "set navigation.labels or navigation.discover_selector",
                ));
            }
            (false, None) => TargetSource::Static {
                labels: nav.labels.clone(),
                link_selector: nav.link_selector.clone(),
            },
            (true, Some(selector)) => TargetSource::Discover {
                selector: selector.clone(),
            },
        };

        let settle = match config.settle.strategy.as_str() {
            "fixed" => SettlePolicy::Fixed {
                delay: Duration::from_millis(config.settle.delay_ms),
            },
            "stabilize" => {
                if config.settle.poll_interval_ms == 0 || config.settle.timeout_ms == 0 {
                    return Err(CaptureError::config(
                        "settle.poll_interval_ms and settle.timeout_ms must be non-zero",
                    ));
                }
                SettlePolicy::Stabilize {
                    interval: Duration::from_millis(config.settle.poll_interval_ms),
                    timeout: Duration::from_millis(config.settle.timeout_ms),
                }
            }
            other => {
                return Err(CaptureError::config(format!(
                    "unknown settle.strategy '{other}': expected 'fixed' or 'stabilize'"
                )));
            }
        };

        validate_locale(&config.output.locale)?;

        if config.fetch.timeout_secs == 0 || config.translation.timeout_secs == 0 {
            return Err(CaptureError::config("timeouts must be non-zero"));
        }

        let t = &config.translation;
        let translator = if !t.enabled {
            None
        } else {
            match t.backend.as_str() {
                "placeholder" => Some(TranslatorKind::Placeholder {
                    marker: t.marker.clone(),
                }),
                "bridge" => {
                    let cmd = t.bridge_cmd.clone().ok_or_else(|| {
                        CaptureError::config("translation.bridge_cmd is required for backend 'bridge'")
                    })?;
                    Some(TranslatorKind::Bridge {
                        cmd,
                        args: t.bridge_args.clone(),
                    })
                }
                other => {
                    return Err(CaptureError::config(format!(
                        "unknown translation.backend '{other}': expected 'placeholder' or 'bridge'"
                    )));
                }
            }
        };

        Ok(Self {
            base_url,
            content_selector: config.site.content_selector.clone(),
            targets,
            settle,
            output_dir: PathBuf::from(&config.output.dir),
            images_subdir: config.output.images_subdir.clone(),
            content_mode: config.output.content_mode,
            locale: config.output.locale.clone(),
            write_manifest: config.output.write_manifest,
            fetch: RetryPolicy {
                timeout: Duration::from_secs(config.fetch.timeout_secs),
                retries: config.fetch.retries,
                backoff: Duration::from_millis(config.fetch.retry_backoff_ms),
            },
            translator,
            target_locale: t
                .target_locale
                .clone()
                .unwrap_or_else(|| config.output.locale.clone()),
            translation: RetryPolicy {
                timeout: Duration::from_secs(t.timeout_secs),
                retries: t.retries,
                backoff: Duration::from_millis(t.retry_backoff_ms),
            },
        })
    }
}

/// Locale suffixes become part of file names.
fn validate_locale(locale: &str) -> Result<()> {
    let valid = !locale.is_empty()
        && locale
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(CaptureError::config(format!("invalid locale suffix '{locale}'")))
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.doccapture/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| CaptureError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.doccapture/doccapture.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        CaptureError::config(format!("failed to read {}: {e}", path.display()))
    })?;

    toml::from_str(&content)
        .map_err(|e| CaptureError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    crate::fs::ensure_dir(&dir)?;

    let path = dir.join(CONFIG_FILE_NAME);
    let content = toml::to_string_pretty(&AppConfig::default())
        .map_err(|e| CaptureError::config(e.to_string()))?;

    crate::fs::write_atomic(&path, content)?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal() -> AppConfig {
        let mut config = AppConfig::default();
        config.site.base_url = Some("https://docs.example/".into());
        config.navigation.labels = vec!["Overview".into(), "Configuration".into()];
        config
    }

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("content_selector"));
        assert!(toml_str.contains("images_subdir"));
    }

    #[test]
    fn config_roundtrip() {
        let toml_str = toml::to_string_pretty(&minimal()).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.site.content_selector, "main");
        assert_eq!(parsed.navigation.labels.len(), 2);
        assert_eq!(parsed.output.locale, "zh");
    }

    #[test]
    fn config_from_toml() {
        let toml_str = r#"
[site]
base_url = "https://deepwiki.com/ArvinLovegood/go-stock/1-overview"

[navigation]
discover_selector = "nav a, aside a"

[settle]
strategy = "fixed"
delay_ms = 800

[output]
content_mode = "text"
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        let capture = CaptureConfig::try_from(&config).expect("valid");
        assert_eq!(
            capture.targets,
            TargetSource::Discover {
                selector: "nav a, aside a".into()
            }
        );
        assert_eq!(
            capture.settle,
            SettlePolicy::Fixed {
                delay: Duration::from_millis(800)
            }
        );
        assert_eq!(capture.content_mode, ContentMode::Text);
        assert!(capture.write_manifest);
    }

    #[test]
    fn capture_config_defaults() {
        let capture = CaptureConfig::try_from(&minimal()).expect("valid");
        assert_eq!(capture.base_url.as_str(), "https://docs.example/");
        assert_eq!(capture.output_dir, PathBuf::from("docs/capture"));
        assert_eq!(capture.fetch.retries, 0);
        assert!(matches!(capture.settle, SettlePolicy::Stabilize { .. }));
        assert!(matches!(
            capture.translator,
            Some(TranslatorKind::Placeholder { .. })
        ));
    }

    #[test]
    fn missing_base_url_rejected() {
        let mut config = minimal();
        config.site.base_url = None;
        let err = CaptureConfig::try_from(&config).unwrap_err();
        assert!(err.to_string().contains("base_url is required"));
    }

    #[test]
    fn labels_and_discovery_are_exclusive() {
        let mut config = minimal();
        config.navigation.discover_selector = Some("nav a".into());
        assert!(CaptureConfig::try_from(&config).is_err());

        config.navigation.labels.clear();
        config.navigation.discover_selector = None;
        assert!(CaptureConfig::try_from(&config).is_err());
    }

    #[test]
    fn bridge_backend_requires_command() {
        let mut config = minimal();
        config.translation.backend = "bridge".into();
        assert!(CaptureConfig::try_from(&config).is_err());

        config.translation.bridge_cmd = Some("python3".into());
        config.translation.bridge_args = vec!["translate.py".into()];
        let capture = CaptureConfig::try_from(&config).expect("valid");
        assert_eq!(
            capture.translator,
            Some(TranslatorKind::Bridge {
                cmd: "python3".into(),
                args: vec!["translate.py".into()],
            })
        );
    }

    #[test]
    fn disabled_translation_yields_none() {
        let mut config = minimal();
        config.translation.enabled = false;
        let capture = CaptureConfig::try_from(&config).expect("valid");
        assert!(capture.translator.is_none());
    }

    #[test]
    fn target_locale_follows_output_locale() {
        let mut config = minimal();
        config.output.locale = "ja".into();
        let capture = CaptureConfig::try_from(&config).expect("valid");
        assert_eq!(capture.target_locale, "ja");

        config.translation.target_locale = Some("ja-JP".into());
        let capture = CaptureConfig::try_from(&config).expect("valid");
        assert_eq!(capture.locale, "ja");
        assert_eq!(capture.target_locale, "ja-JP");
    }

    #[test]
    fn translation_retry_timing_is_independent() {
        let config: AppConfig = toml::from_str(
            r#"
            [site]
            base_url = "https://docs.example/"

            [navigation]
            labels = ["Overview"]

            [fetch]
            retries = 2
            retry_backoff_ms = 100

            [translation]
            retries = 1
            retry_backoff_ms = 2000
            "#,
        )
        .expect("parses");
        let capture = CaptureConfig::try_from(&config).expect("valid");
        assert_eq!(capture.fetch.backoff, Duration::from_millis(100));
        assert_eq!(capture.translation.retries, 1);
        assert_eq!(capture.translation.backoff, Duration::from_millis(2000));
    }

    #[test]
    fn locale_must_be_filename_safe() {
        let mut config = minimal();
        config.output.locale = "../zh".into();
        assert!(CaptureConfig::try_from(&config).is_err());
    }

    #[test]
    fn retry_backoff_is_linear() {
        let policy = RetryPolicy {
            timeout: Duration::from_secs(1),
            retries: 3,
            backoff: Duration::from_millis(200),
        };
        assert_eq!(policy.delay_for(1), Duration::from_millis(200));
        assert_eq!(policy.delay_for(3), Duration::from_millis(600));
    }
}
