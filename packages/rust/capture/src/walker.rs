//! Navigation target listing and activation.
//!
//! Targets are either a configured label list (resolved by link text on each
//! activation) or read once from the page's navigation container. Activation
//! clicks the resolved element and then waits for the content region to settle.

use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

use doccapture_browser::BrowserView;
use doccapture_shared::fs::sha256_hex;
use doccapture_shared::{
    CaptureConfig, CaptureError, ElementRef, LabelPolicy, NavigationTarget, Result,
    SettlePolicy, TargetSource, unique_stems,
};

/// Owns the target source and the settle policy for one run.
#[derive(Debug, Clone)]
pub struct NavigationWalker {
    source: TargetSource,
    content_selector: String,
    settle: SettlePolicy,
}

impl NavigationWalker {
    pub fn new(source: TargetSource, content_selector: impl Into<String>, settle: SettlePolicy) -> Self {
        Self {
            source,
            content_selector: content_selector.into(),
            settle,
        }
    }

    pub fn from_config(config: &CaptureConfig) -> Self {
        Self::new(
            config.targets.clone(),
            config.content_selector.clone(),
            config.settle,
        )
    }

    /// Build the ordered target list for this run.
    ///
    /// Static labels are not looked up here; a label missing from the page
    /// surfaces on [`activate`](Self::activate) for that target alone.
    #[instrument(skip_all)]
    pub async fn list_targets(&self, view: &mut dyn BrowserView) -> Result<Vec<NavigationTarget>> {
        let targets = match &self.source {
            TargetSource::Static {
                labels,
                link_selector,
            } => {
                let stems = unique_stems(labels, LabelPolicy::Whitespace);
                labels
                    .iter()
                    .zip(stems)
                    .enumerate()
                    .map(|(ordinal, (label, file_stem))| NavigationTarget {
                        label: label.trim().to_string(),
                        file_stem,
                        ordinal,
                        element: ElementRef {
                            selector: link_selector.clone(),
                            nth: None,
                        },
                    })
                    .collect::<Vec<_>>()
            }
            TargetSource::Discover { selector } => {
                let labels: Vec<String> = view
                    .texts(selector)
                    .await?
                    .into_iter()
                    .map(|text| text.trim().to_string())
                    .collect();
                let stems = unique_stems(&labels, LabelPolicy::Strict);
                labels
                    .into_iter()
                    .zip(stems)
                    .enumerate()
                    .map(|(ordinal, (label, file_stem))| NavigationTarget {
                        label,
                        file_stem,
                        ordinal,
                        element: ElementRef {
                            selector: selector.clone(),
                            nth: Some(ordinal),
                        },
                    })
                    .collect()
            }
        };

        info!(count = targets.len(), "navigation targets listed");
        Ok(targets)
    }

    /// Click `target` in the live page and wait for the content region to settle.
    #[instrument(skip_all, fields(label = %target.label, ordinal = target.ordinal))]
    pub async fn activate(&self, view: &mut dyn BrowserView, target: &NavigationTarget) -> Result<()> {
        let selector = &target.element.selector;
        let texts = view.texts(selector).await?;

        let index = resolve_index(&texts, &target.label, target.element.nth)
            .ok_or_else(|| CaptureError::target_not_found(&target.label))?;
        debug!(selector = %selector, index, "resolved navigation element");

        match self.settle {
            SettlePolicy::Fixed { delay } => {
                view.click(selector, index).await?;
                tokio::time::sleep(delay).await;
                Ok(())
            }
            SettlePolicy::Stabilize { interval, timeout } => {
                let before = self.region_hash(view).await?;
                view.click(selector, index).await?;
                self.wait_until_stable(view, &before, interval, timeout).await
            }
        }
    }

    /// Poll the content region until it differs from `before` and two
    /// consecutive reads hash the same.
    ///
    /// A region that never changes (the target shows the same markup as the
    /// previous one) runs into the timeout and proceeds.
    async fn wait_until_stable(
        &self,
        view: &mut dyn BrowserView,
        before: &str,
        interval: Duration,
        timeout: Duration,
    ) -> Result<()> {
        let deadline = Instant::now() + timeout;
        let mut previous: Option<String> = None;
        let mut polls = 0u32;

        loop {
            let current = self.region_hash(view).await?;
            polls += 1;
            if current != before && previous.as_deref() == Some(current.as_str()) {
                debug!(polls, "content region settled");
                return Ok(());
            }
            previous = Some(current);

            if Instant::now() + interval > deadline {
                warn!(
                    timeout_ms = timeout.as_millis() as u64,
                    polls, "content region did not settle, proceeding"
                );
                return Ok(());
            }
            tokio::time::sleep(interval).await;
        }
    }

    /// Hash of the region markup; a missing region hashes as empty so the
    /// extractor reports it rather than the walker.
    async fn region_hash(&self, view: &mut dyn BrowserView) -> Result<String> {
        let html = view.inner_html(&self.content_selector).await?;
        Ok(sha256_hex(html.unwrap_or_default()))
    }
}

/// Pick the element to click among `texts` (the visible text of every match).
///
/// Order: the recorded position if its text still equals the label, then the
/// first exact match, then the first case-insensitive substring match.
fn resolve_index(texts: &[String], label: &str, nth: Option<usize>) -> Option<usize> {
    let label = label.trim();

    if let Some(n) = nth.filter(|&n| texts.get(n).is_some_and(|text| text.trim() == label)) {
        return Some(n);
    }

    if let Some(exact) = texts.iter().position(|text| text.trim() == label) {
        return Some(exact);
    }

    if label.is_empty() {
        return None;
    }
    let needle = label.to_lowercase();
    texts
        .iter()
        .position(|text| text.to_lowercase().contains(&needle))
}

#[cfg(test)]
mod tests {
    use super::*;
    use doccapture_browser::MemoryView;

    fn fixed() -> SettlePolicy {
        SettlePolicy::Fixed {
            delay: Duration::ZERO,
        }
    }

    fn static_walker(labels: &[&str]) -> NavigationWalker {
        NavigationWalker::new(
            TargetSource::Static {
                labels: labels.iter().map(|l| l.to_string()).collect(),
                link_selector: "nav a".into(),
            },
            "main",
            fixed(),
        )
    }

    fn site() -> MemoryView {
        MemoryView::new()
            .landing("<p>home</p>")
            .page("Overview", "<h1>Overview</h1>")
            .page("Stock Groups", "<h1>Groups</h1>")
            .page("Configuration", "<h1>Configuration</h1>")
    }

    #[test]
    fn resolve_prefers_recorded_position() {
        let texts: Vec<String> = ["Intro", "Setup", "Intro"].iter().map(|s| s.to_string()).collect();
        assert_eq!(resolve_index(&texts, "Intro", Some(2)), Some(2));
    }

    #[test]
    fn resolve_falls_back_to_text() {
        let texts: Vec<String> = ["Overview", "Setup"].iter().map(|s| s.to_string()).collect();
        // Position drifted after a re-render.
        assert_eq!(resolve_index(&texts, "Setup", Some(0)), Some(1));
        assert_eq!(resolve_index(&texts, " Setup ", None), Some(1));
        assert_eq!(resolve_index(&texts, "setu", None), Some(1));
        assert_eq!(resolve_index(&texts, "Missing", None), None);
        assert_eq!(resolve_index(&texts, "", None), None);
    }

    #[tokio::test]
    async fn static_targets_keep_order_and_sanitize() {
        let walker = static_walker(&["Overview", " Stock  Groups ", "Overview"]);
        let mut view = site();
        let targets = walker.list_targets(&mut view).await.unwrap();

        let stems: Vec<&str> = targets.iter().map(|t| t.file_stem.as_str()).collect();
        assert_eq!(stems, ["Overview", "Stock_Groups", "Overview_2"]);
        assert_eq!(targets[1].label, "Stock  Groups");
        assert!(targets.iter().all(|t| t.element.nth.is_none()));
        assert!(view.clicks().is_empty());
    }

    #[tokio::test]
    async fn discovery_reads_labels_in_document_order() {
        let walker = NavigationWalker::new(
            TargetSource::Discover {
                selector: "nav a".into(),
            },
            "main",
            fixed(),
        );
        let mut view = site().dead_link("FAQ / Help?");
        let targets = walker.list_targets(&mut view).await.unwrap();

        let stems: Vec<&str> = targets.iter().map(|t| t.file_stem.as_str()).collect();
        assert_eq!(stems, ["Overview", "Stock_Groups", "Configuration", "FAQ___Help"]);
        assert_eq!(targets[3].element.nth, Some(3));
    }

    #[tokio::test]
    async fn activate_clicks_matching_link() {
        let walker = static_walker(&["Configuration"]);
        let mut view = site();
        let targets = walker.list_targets(&mut view).await.unwrap();

        walker.activate(&mut view, &targets[0]).await.unwrap();
        assert_eq!(view.clicks(), ["Configuration"]);
        assert_eq!(
            view.inner_html("main").await.unwrap().as_deref(),
            Some("<h1>Configuration</h1>")
        );
    }

    #[tokio::test]
    async fn activate_missing_label_is_not_found() {
        let walker = static_walker(&["Changelog"]);
        let mut view = site();
        let targets = walker.list_targets(&mut view).await.unwrap();

        let err = walker.activate(&mut view, &targets[0]).await.unwrap_err();
        assert!(matches!(err, CaptureError::NavigationTargetNotFound { .. }));
        assert!(view.clicks().is_empty());
    }

    fn stabilizing_walker(interval: Duration, timeout: Duration) -> NavigationWalker {
        NavigationWalker::new(
            TargetSource::Static {
                labels: vec!["Overview".into()],
                link_selector: "nav a".into(),
            },
            "main",
            SettlePolicy::Stabilize { interval, timeout },
        )
    }

    #[tokio::test]
    async fn stabilize_waits_out_render_lag() {
        for lag in [0, 1, 2, 4] {
            let walker = stabilizing_walker(Duration::from_millis(1), Duration::from_secs(5));
            let mut view = site().render_lag(lag);
            let targets = walker.list_targets(&mut view).await.unwrap();

            walker.activate(&mut view, &targets[0]).await.unwrap();
            assert_eq!(
                view.inner_html("main").await.unwrap().as_deref(),
                Some("<h1>Overview</h1>"),
                "render lag {lag}"
            );
        }
    }

    #[tokio::test]
    async fn stabilize_ignores_unchanged_region_before_swap() {
        let walker = stabilizing_walker(Duration::from_millis(1), Duration::from_secs(5));
        let mut view = site().render_lag(2);
        let targets = walker.list_targets(&mut view).await.unwrap();
        let extractor = crate::ContentExtractor::new(
            "main",
            doccapture_shared::ContentMode::Markup,
            url::Url::parse("https://docs.example/").unwrap(),
        );

        walker.activate(&mut view, &targets[0]).await.unwrap();
        let page = extractor.extract(&mut view, &targets[0]).await.unwrap();
        assert_eq!(page.raw_content, "<h1>Overview</h1>");
    }

    #[tokio::test]
    async fn stabilize_unchanged_region_times_out_and_proceeds() {
        let walker = stabilizing_walker(Duration::from_millis(1), Duration::from_millis(20));
        let mut view = MemoryView::new()
            .landing("<h1>Overview</h1>")
            .page("Overview", "<h1>Overview</h1>");
        let targets = walker.list_targets(&mut view).await.unwrap();

        assert!(walker.activate(&mut view, &targets[0]).await.is_ok());
        assert_eq!(view.clicks(), ["Overview"]);
    }

    #[tokio::test]
    async fn stabilize_timeout_proceeds() {
        let walker = stabilizing_walker(Duration::from_millis(10), Duration::from_millis(5));
        let mut view = site();
        let targets = walker.list_targets(&mut view).await.unwrap();
        assert!(walker.activate(&mut view, &targets[0]).await.is_ok());
    }
}
