//! CLI command definitions, routing, and tracing setup.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::Result;
use doccapture_browser::{BrowserView, ChromiumView};
use doccapture_core::{ProgressReporter, run_capture};
use doccapture_shared::{
    AppConfig, CaptureConfig, CaptureManifest, CaptureResult, ContentMode,
    DEFAULT_DISCOVER_SELECTOR, Outcome, init_config, load_config, load_config_from,
};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// DocCapture: save a documentation web app as Markdown, images, and translations.
#[derive(Parser)]
#[command(
    name = "doccapture",
    version,
    about = "Walk a documentation SPA's navigation and capture every page to disk.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Capture every navigation target of a documentation site.
    Run(RunArgs),

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Flags for `doccapture run`. Each one overrides its config file value.
#[derive(Args, Debug, Default)]
pub(crate) struct RunArgs {
    /// Config file to use instead of ~/.doccapture/doccapture.toml.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Documentation site entry URL.
    #[arg(long, env = "DOCCAPTURE_BASE_URL")]
    pub base_url: Option<String>,

    /// Navigation label to capture (repeatable, in order).
    #[arg(long = "label", conflicts_with = "discover")]
    pub labels: Vec<String>,

    /// Discover targets from every element matching this selector
    /// (`nav a, aside a` when given without a value).
    #[arg(long, num_args = 0..=1, default_missing_value = DEFAULT_DISCOVER_SELECTOR)]
    pub discover: Option<String>,

    /// Selector of the content region.
    #[arg(long)]
    pub content: Option<String>,

    /// Output directory.
    #[arg(short, long)]
    pub out: Option<PathBuf>,

    /// Content mode: markup, text, or markdown.
    #[arg(long)]
    pub mode: Option<ContentMode>,

    /// Locale suffix for translated files; also the locale requested from the backend.
    #[arg(long)]
    pub locale: Option<String>,

    /// Skip the translation stage.
    #[arg(long)]
    pub no_translate: bool,

    /// Do not write manifest.json.
    #[arg(long)]
    pub no_manifest: bool,

    /// Attach to a running browser at this DevTools websocket URL.
    #[arg(long)]
    pub remote_browser: Option<String>,

    /// Show the browser window.
    #[arg(long)]
    pub headful: bool,
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show {
        /// Config file to show instead of the default location.
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "doccapture=info",
        1 => "doccapture=debug",
        _ => "doccapture=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Run(args) => cmd_run(args).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show { config } => cmd_config_show(config),
        },
    }
}

fn load(path: Option<&PathBuf>) -> Result<AppConfig> {
    Ok(match path {
        Some(p) => load_config_from(p)?,
        None => load_config()?,
    })
}

/// Fold command-line flags into the loaded config.
fn apply_overrides(config: &mut AppConfig, args: &RunArgs) {
    if let Some(url) = &args.base_url {
        config.site.base_url = Some(url.clone());
    }
    if !args.labels.is_empty() {
        config.navigation.labels = args.labels.clone();
        config.navigation.discover_selector = None;
    }
    if let Some(selector) = &args.discover {
        config.navigation.discover_selector = Some(selector.clone());
        config.navigation.labels.clear();
    }
    if let Some(selector) = &args.content {
        config.site.content_selector = selector.clone();
    }
    if let Some(out) = &args.out {
        config.output.dir = out.to_string_lossy().into_owned();
    }
    if let Some(mode) = args.mode {
        config.output.content_mode = mode;
    }
    if let Some(locale) = &args.locale {
        config.output.locale = locale.clone();
        config.translation.target_locale = Some(locale.clone());
    }
    if args.no_translate {
        config.translation.enabled = false;
    }
    if args.no_manifest {
        config.output.write_manifest = false;
    }
    if let Some(ws_url) = &args.remote_browser {
        config.browser.remote_url = Some(ws_url.clone());
    }
    if args.headful {
        config.browser.headless = false;
    }
}

async fn cmd_run(args: RunArgs) -> Result<()> {
    let mut config = load(args.config.as_ref())?;
    apply_overrides(&mut config, &args);
    let capture = CaptureConfig::try_from(&config)?;

    info!(
        base_url = %capture.base_url,
        out = %capture.output_dir.display(),
        mode = %capture.content_mode,
        translate = capture.translator.is_some(),
        "starting capture"
    );

    let translator = match &capture.translator {
        Some(kind) => Some(doccapture_translate::from_kind(kind, &capture.target_locale).await?),
        None => None,
    };

    let mut view = match ChromiumView::launch(&config.browser).await {
        Ok(view) => view,
        Err(e) => {
            shutdown_translator(translator.as_deref()).await;
            return Err(e.into());
        }
    };

    let reporter = CliProgress::new();
    let outcome = run_capture(&capture, &mut view, translator.as_deref(), &reporter).await;
    reporter.clear();

    shutdown_translator(translator.as_deref()).await;
    if let Err(e) = Box::new(view).close().await {
        warn!(error = %e, "browser shutdown failed");
    }

    let manifest = outcome?;
    print_summary(&manifest, &capture);
    Ok(())
}

async fn shutdown_translator(translator: Option<&dyn doccapture_translate::Translator>) {
    let Some(translator) = translator else {
        return;
    };
    if let Err(e) = translator.shutdown().await {
        warn!(backend = translator.name(), error = %e, "translator shutdown failed");
    }
}

fn print_summary(manifest: &CaptureManifest, capture: &CaptureConfig) {
    let summary = manifest.summary();

    println!();
    if summary.failures() == 0 {
        println!("  Capture completed.");
    } else {
        println!("  Capture completed with {} failures.", summary.failures());
    }
    println!("  Run:       {}", manifest.run_id);
    println!("  Succeeded: {}", summary.succeeded);
    println!("  Partial:   {}", summary.partial);
    println!("  Failed:    {}", summary.failed);
    println!("  Output:    {}", capture.output_dir.display());
    if let Some(finished) = manifest.finished_at {
        let elapsed = finished - manifest.started_at;
        println!(
            "  Time:      {:.1}s",
            elapsed.num_milliseconds() as f64 / 1000.0
        );
    }

    for result in manifest.results.iter().filter(|r| !r.errors.is_empty()) {
        println!();
        println!("  {} ({})", result.target, outcome_label(result));
        for err in &result.errors {
            println!("    [{}] {}", err.stage, err.message);
        }
    }
    println!();
}

fn outcome_label(result: &CaptureResult) -> &'static str {
    match result.outcome() {
        Outcome::Succeeded => "ok",
        Outcome::Partial => "partial",
        Outcome::Failed => "failed",
    }
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        spinner.set_style(style);
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }

    fn clear(&self) {
        if !self.spinner.is_finished() {
            self.spinner.finish_and_clear();
        }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn target_started(&self, label: &str, current: usize, total: usize) {
        self.spinner
            .set_message(format!("Capturing [{current}/{total}] {label}"));
    }

    fn target_finished(&self, result: &CaptureResult) {
        if result.outcome() != Outcome::Succeeded {
            self.spinner.println(format!(
                "  {} {} ({} errors)",
                outcome_label(result),
                result.target,
                result.errors.len()
            ));
        }
    }

    fn done(&self, _manifest: &CaptureManifest) {
        self.spinner.finish_and_clear();
    }
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(path: Option<PathBuf>) -> Result<()> {
    let config = load(path.as_ref())?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}
