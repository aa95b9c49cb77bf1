//! Scripted in-memory site.
//!
//! Renders `<nav>` links plus a `<main>` region and evaluates selectors with
//! `scraper`, so walker/extractor logic runs against real selector semantics
//! without a browser. Clicking a link whose text has a registered route swaps
//! the region's content, optionally after a number of stale reads to mimic a
//! SPA that re-renders asynchronously.

use std::collections::HashMap;

use async_trait::async_trait;
use scraper::{Html, Selector};
use url::Url;

use doccapture_shared::{CaptureError, Result};

use crate::BrowserView;

#[derive(Debug, Clone)]
struct PendingSwap {
    content: String,
    stale_reads: usize,
}

/// In-memory [`BrowserView`] over a fixed navigation shell.
#[derive(Debug, Clone, Default)]
pub struct MemoryView {
    nav_links: Vec<String>,
    routes: HashMap<String, String>,
    current: String,
    pending: Option<PendingSwap>,
    render_lag: usize,
    has_region: bool,
    reachable: bool,
    visited: Vec<Url>,
    clicks: Vec<String>,
}

impl MemoryView {
    pub fn new() -> Self {
        Self {
            has_region: true,
            reachable: true,
            ..Self::default()
        }
    }

    /// Add a navigation link whose activation shows `content` in `<main>`.
    pub fn page(mut self, link_text: &str, content: &str) -> Self {
        self.nav_links.push(link_text.to_string());
        self.routes.insert(link_text.trim().to_string(), content.to_string());
        self
    }

    /// Add a navigation link with no route; clicking it leaves the region unchanged.
    pub fn dead_link(mut self, link_text: &str) -> Self {
        self.nav_links.push(link_text.to_string());
        self
    }

    /// Content shown before any link is clicked.
    pub fn landing(mut self, content: &str) -> Self {
        self.current = content.to_string();
        self
    }

    /// Serve this many stale region reads after every click.
    pub fn render_lag(mut self, reads: usize) -> Self {
        self.render_lag = reads;
        self
    }

    /// Render the shell without a `<main>` element.
    pub fn without_region(mut self) -> Self {
        self.has_region = false;
        self
    }

    /// Make every navigation fail.
    pub fn unreachable(mut self) -> Self {
        self.reachable = false;
        self
    }

    /// Link texts clicked so far, in order.
    pub fn clicks(&self) -> &[String] {
        &self.clicks
    }

    pub fn visited(&self) -> &[Url] {
        &self.visited
    }

    fn document(&self) -> Html {
        let nav: String = self
            .nav_links
            .iter()
            .map(|text| format!(r##"<a href="#">{text}</a>"##))
            .collect();
        let region = if self.has_region {
            format!("<main>{}</main>", self.current)
        } else {
            format!("<div class=\"body\">{}</div>", self.current)
        };
        Html::parse_document(&format!(
            "<html><body><nav>{nav}</nav>{region}</body></html>"
        ))
    }

    /// Advance a pending swap by one region read; the swap lands once its
    /// stale reads are used up.
    fn tick(&mut self) {
        if let Some(pending) = self.pending.as_mut() {
            if pending.stale_reads == 0 {
                let swap = self.pending.take().map(|p| p.content).unwrap_or_default();
                self.current = swap;
            } else {
                pending.stale_reads -= 1;
            }
        }
    }
}

fn parse_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector)
        .map_err(|e| CaptureError::Browser(format!("invalid selector '{selector}': {e}")))
}

#[async_trait]
impl BrowserView for MemoryView {
    async fn goto(&mut self, url: &Url) -> Result<()> {
        if !self.reachable {
            return Err(CaptureError::Browser(format!("navigation to {url} failed")));
        }
        self.visited.push(url.clone());
        Ok(())
    }

    async fn texts(&mut self, selector: &str) -> Result<Vec<String>> {
        let selector = parse_selector(selector)?;
        let doc = self.document();
        Ok(doc
            .select(&selector)
            .map(|el| el.text().collect::<String>())
            .collect())
    }

    async fn click(&mut self, selector: &str, nth: usize) -> Result<()> {
        let parsed = parse_selector(selector)?;
        let text = {
            let doc = self.document();
            doc.select(&parsed)
                .nth(nth)
                .map(|el| el.text().collect::<String>())
        };
        let text = text.ok_or_else(|| {
            CaptureError::Browser(format!("no element #{nth} for '{selector}'"))
        })?;

        if let Some(content) = self.routes.get(text.trim()) {
            self.pending = Some(PendingSwap {
                content: content.clone(),
                stale_reads: self.render_lag,
            });
        }
        self.clicks.push(text.trim().to_string());
        Ok(())
    }

    async fn inner_html(&mut self, selector: &str) -> Result<Option<String>> {
        let selector = parse_selector(selector)?;
        self.tick();
        let html = self
            .document()
            .select(&selector)
            .next()
            .map(|el| el.inner_html());
        Ok(html)
    }

    async fn close(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}
