//! End-to-end capture run: base URL → targets → per-target stages → manifest.
//!
//! Targets are processed strictly one after another against the single
//! browser view. A failing stage is recorded on that target's
//! [`CaptureResult`] and never aborts the run; only setup (output
//! directories, base navigation, target listing) is fatal.

use std::time::Instant;

use tracing::{debug, info, instrument, warn};

use doccapture_browser::BrowserView;
use doccapture_capture::{AssetFetcher, ContentExtractor, NavigationWalker, destination_name};
use doccapture_shared::fs::{sha256_hex, write_atomic, write_json};
use doccapture_shared::{
    CaptureConfig, CaptureManifest, CaptureResult, CapturedPage, NavigationTarget, Result,
    RetryPolicy, Stage,
};
use doccapture_translate::{Translator, translate_with_policy};

use crate::context::RunContext;

/// Progress callback for reporting run status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called before a target's stages run.
    fn target_started(&self, label: &str, current: usize, total: usize);
    /// Called with the finished record of a target.
    fn target_finished(&self, result: &CaptureResult);
    /// Called when the run completes.
    fn done(&self, manifest: &CaptureManifest);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn target_started(&self, _label: &str, _current: usize, _total: usize) {}
    fn target_finished(&self, _result: &CaptureResult) {}
    fn done(&self, _manifest: &CaptureManifest) {}
}

/// Per-run stage wiring.
struct CaptureOrchestrator<'a> {
    ctx: RunContext,
    walker: NavigationWalker,
    extractor: ContentExtractor,
    fetcher: AssetFetcher,
    translator: Option<&'a dyn Translator>,
    translation_policy: RetryPolicy,
    locale: String,
}

/// Run a full capture.
///
/// Pass `translator: None` to skip the localization stage.
#[instrument(skip_all, fields(base_url = %config.base_url, mode = %config.content_mode))]
pub async fn run_capture(
    config: &CaptureConfig,
    view: &mut dyn BrowserView,
    translator: Option<&dyn Translator>,
    progress: &dyn ProgressReporter,
) -> Result<CaptureManifest> {
    let start = Instant::now();

    // --- Initializing ---
    progress.phase("Preparing output directories");
    let ctx = RunContext::from_config(config);
    ctx.prepare()?;

    let orchestrator = CaptureOrchestrator {
        walker: NavigationWalker::from_config(config),
        extractor: ContentExtractor::from_config(config),
        fetcher: AssetFetcher::new(config.fetch)?,
        translator,
        translation_policy: config.translation,
        locale: config.locale.clone(),
        ctx,
    };

    progress.phase("Loading documentation site");
    view.goto(&config.base_url).await?;

    progress.phase("Listing navigation targets");
    let targets = orchestrator.walker.list_targets(view).await?;

    // --- Walking targets ---
    progress.phase("Capturing pages");
    let mut manifest = CaptureManifest::new(&config.base_url, config.content_mode);
    let total = targets.len();

    for (i, target) in targets.iter().enumerate() {
        progress.target_started(&target.label, i + 1, total);
        let result = orchestrator.capture_target(view, target).await;
        progress.target_finished(&result);
        manifest.push(result);
    }

    manifest.finished_at = Some(chrono::Utc::now());

    if config.write_manifest {
        progress.phase("Writing manifest");
        write_json(&orchestrator.ctx.manifest_path(), &manifest)?;
    }

    let summary = manifest.summary();
    info!(
        run_id = %manifest.run_id,
        targets = summary.total(),
        succeeded = summary.succeeded,
        partial = summary.partial,
        failed = summary.failed,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "capture run complete"
    );

    progress.done(&manifest);
    Ok(manifest)
}

impl CaptureOrchestrator<'_> {
    /// Run every stage for one target, recording failures instead of returning them.
    #[instrument(skip_all, fields(label = %target.label, stem = %target.file_stem))]
    async fn capture_target(
        &self,
        view: &mut dyn BrowserView,
        target: &NavigationTarget,
    ) -> CaptureResult {
        let mut result = CaptureResult::new(target);

        if let Err(e) = self.walker.activate(view, target).await {
            warn!(error = %e, "navigation failed, skipping target");
            result.record(Stage::Navigate, e);
            return result;
        }

        let page = match self.extractor.extract(view, target).await {
            Ok(page) => page,
            Err(e) => {
                warn!(error = %e, "extraction failed, skipping target");
                result.record(Stage::Extract, e);
                return result;
            }
        };

        let content_path = self.ctx.content_path(&target.file_stem);
        if let Err(e) = write_atomic(&content_path, &page.raw_content) {
            warn!(error = %e, "could not persist content, skipping target");
            result.record(Stage::Persist, e);
            return result;
        }
        result.content_sha256 = Some(sha256_hex(&page.raw_content));
        result.content_path = Some(content_path);

        self.fetch_images(&page, &mut result).await;

        if let Some(translator) = self.translator {
            self.localize(translator, &page, &mut result).await;
        }

        debug!(
            outcome = ?result.outcome(),
            images = result.image_paths.len(),
            errors = result.errors.len(),
            "target finished"
        );
        result
    }

    /// Fetch every non-inline image in document order.
    async fn fetch_images(&self, page: &CapturedPage, result: &mut CaptureResult) {
        for image in &page.image_refs {
            if image.is_inline() {
                debug!(ordinal = image.ordinal, "skipping inline image");
                continue;
            }

            let Some(url) = &image.resolved_url else {
                warn!(src = %image.source_attr, "unresolvable image source");
                result.record(
                    Stage::FetchAsset,
                    format!("could not resolve image source '{}'", image.source_attr),
                );
                continue;
            };

            let destination = self
                .ctx
                .image_path(destination_name(&page.target.file_stem, image.ordinal, url));
            match self.fetcher.fetch(url, &destination).await {
                Ok(_) => result.image_paths.push(destination),
                Err(e) => {
                    warn!(%url, error = %e, "image fetch failed");
                    result.record(Stage::FetchAsset, e);
                }
            }
        }
    }

    /// Translate the primary artifact and write the localized copy.
    async fn localize(
        &self,
        translator: &dyn Translator,
        page: &CapturedPage,
        result: &mut CaptureResult,
    ) {
        let translated =
            match translate_with_policy(translator, &page.raw_content, &self.translation_policy)
                .await
            {
                Ok(text) => text,
                Err(e) => {
                    warn!(backend = translator.name(), error = %e, "translation failed");
                    result.record(Stage::Translate, e);
                    return;
                }
            };

        let path = self.ctx.localized_path(&page.target.file_stem, &self.locale);
        match write_atomic(&path, translated) {
            Ok(()) => result.localized_content_path = Some(path),
            Err(e) => {
                warn!(error = %e, "could not persist localized content");
                result.record(Stage::Persist, e);
            }
        }
    }
}
