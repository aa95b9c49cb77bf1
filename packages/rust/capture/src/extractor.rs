//! Content region extraction.

use std::sync::LazyLock;

use scraper::{Html, Selector};
use tracing::{debug, instrument};
use url::Url;

use doccapture_browser::BrowserView;
use doccapture_shared::{
    CaptureConfig, CaptureError, CapturedPage, ContentMode, ImageRef, NavigationTarget, Result,
    is_inline_data,
};

static IMG_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("img").expect("valid selector"));

/// Reads the content region of the currently activated target.
#[derive(Debug, Clone)]
pub struct ContentExtractor {
    content_selector: String,
    mode: ContentMode,
    base_url: Url,
}

impl ContentExtractor {
    pub fn new(content_selector: impl Into<String>, mode: ContentMode, base_url: Url) -> Self {
        Self {
            content_selector: content_selector.into(),
            mode,
            base_url,
        }
    }

    pub fn from_config(config: &CaptureConfig) -> Self {
        Self::new(
            config.content_selector.clone(),
            config.content_mode,
            config.base_url.clone(),
        )
    }

    /// Capture the region's payload and its image references.
    ///
    /// Images are always enumerated from the region's markup, whatever the
    /// content mode.
    #[instrument(skip_all, fields(label = %target.label, mode = %self.mode))]
    pub async fn extract(
        &self,
        view: &mut dyn BrowserView,
        target: &NavigationTarget,
    ) -> Result<CapturedPage> {
        let html = view.inner_html(&self.content_selector).await?.ok_or_else(|| {
            CaptureError::extraction(format!(
                "content region '{}' not found",
                self.content_selector
            ))
        })?;

        let images = image_refs(&html, &self.base_url);
        let raw_content = doccapture_markdown::render(&html, self.mode, &self.base_url)
            .map_err(|e| CaptureError::extraction(e.to_string()))?;

        debug!(
            html_len = html.len(),
            content_len = raw_content.len(),
            images = images.len(),
            "extracted content region"
        );

        Ok(CapturedPage {
            target: target.clone(),
            raw_content,
            image_refs: images,
        })
    }
}

/// Every `<img>` with a non-blank `src` in `html`, in document order.
///
/// `ordinal` is the position among all `img` elements, so an image without a
/// source (or with a blank one) leaves a gap. `data:` sources are kept but never resolved.
pub fn image_refs(html: &str, base_url: &Url) -> Vec<ImageRef> {
    let fragment = Html::parse_fragment(html);

    fragment
        .select(&IMG_SELECTOR)
        .enumerate()
        .filter_map(|(ordinal, img)| {
            let src = img.value().attr("src").filter(|src| !src.trim().is_empty())?;
            let resolved_url = if is_inline_data(src) {
                None
            } else {
                base_url.join(src.trim()).ok()
            };
            Some(ImageRef {
                source_attr: src.to_string(),
                resolved_url,
                ordinal,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use doccapture_browser::MemoryView;
    use doccapture_shared::ElementRef;

    fn base() -> Url {
        Url::parse("https://docs.example/").unwrap()
    }

    fn target(label: &str) -> NavigationTarget {
        NavigationTarget {
            label: label.into(),
            file_stem: label.into(),
            ordinal: 0,
            element: ElementRef {
                selector: "nav a".into(),
                nth: None,
            },
        }
    }

    #[test]
    fn images_resolve_against_base() {
        let html = r#"<p><img src="/img/a.png"><img src="b/c.jpg">
            <img src="https://cdn.example/x.svg"></p>"#;
        let refs = image_refs(html, &base());

        let urls: Vec<String> = refs
            .iter()
            .map(|r| r.resolved_url.as_ref().unwrap().to_string())
            .collect();
        assert_eq!(
            urls,
            [
                "https://docs.example/img/a.png",
                "https://docs.example/b/c.jpg",
                "https://cdn.example/x.svg",
            ]
        );
        assert_eq!(refs.iter().map(|r| r.ordinal).collect::<Vec<_>>(), [0, 1, 2]);
    }

    #[test]
    fn data_uris_are_never_resolved() {
        let html = r#"<img src="data:image/png;base64,iVBORw0KGgo="><img src="/a.png">"#;
        let refs = image_refs(html, &base());

        assert_eq!(refs.len(), 2);
        assert!(refs[0].is_inline());
        assert!(refs[0].resolved_url.is_none());
        assert_eq!(refs[0].source_attr, "data:image/png;base64,iVBORw0KGgo=");
        assert!(refs[1].resolved_url.is_some());
    }

    #[test]
    fn sourceless_images_keep_ordinal_gap() {
        let html = r#"<img alt="lazy"><img src="/later.png">"#;
        let refs = image_refs(html, &base());
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].ordinal, 1);
    }

    #[test]
    fn blank_sources_are_skipped() {
        let base = Url::parse("https://docs.example/guide/").unwrap();
        let html = r#"<img src=""><img src="   "><img src="shot.png">"#;
        let refs = image_refs(html, &base);
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].ordinal, 2);
        assert_eq!(
            refs[0].resolved_url.as_ref().map(Url::as_str),
            Some("https://docs.example/guide/shot.png")
        );
    }

    #[tokio::test]
    async fn extract_markup_is_verbatim() {
        let mut view = MemoryView::new().landing(r#"<h1>Overview</h1><img src="/img/a.png">"#);
        let extractor = ContentExtractor::new("main", ContentMode::Markup, base());

        let page = extractor.extract(&mut view, &target("Overview")).await.unwrap();
        assert_eq!(page.raw_content, r#"<h1>Overview</h1><img src="/img/a.png">"#);
        assert_eq!(page.image_refs.len(), 1);
        assert_eq!(page.target.label, "Overview");
    }

    #[tokio::test]
    async fn extract_text_mode_still_lists_images() {
        let mut view = MemoryView::new()
            .landing(r#"<h1>Overview</h1><style>h1{}</style><p>Body</p><img src="/img/a.png">"#);
        let extractor = ContentExtractor::new("main", ContentMode::Text, base());

        let page = extractor.extract(&mut view, &target("Overview")).await.unwrap();
        assert_eq!(page.raw_content, "OverviewBody");
        assert_eq!(page.image_refs.len(), 1);
    }

    #[tokio::test]
    async fn missing_region_fails_extraction() {
        let mut view = MemoryView::new().landing("<p>x</p>").without_region();
        let extractor = ContentExtractor::new("main", ContentMode::Markup, base());

        let err = extractor.extract(&mut view, &target("Overview")).await.unwrap_err();
        assert!(matches!(err, CaptureError::ExtractionFailed { .. }));
    }
}
