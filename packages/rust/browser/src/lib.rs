//! Browser view abstraction for driving the documentation SPA.
//!
//! A [`BrowserView`] is one live page: the single mutable resource every
//! navigation and extraction step reads from. It is passed around as
//! `&mut dyn BrowserView`, so only one target can be observed at a time.
//!
//! Implementations:
//! - [`ChromiumView`] — headless Chromium over CDP (`chromiumoxide`)
//! - [`MemoryView`] — scripted in-memory site, for tests and dry runs

mod chromium;
mod memory;

use async_trait::async_trait;
use url::Url;

use doccapture_shared::Result;

pub use chromium::ChromiumView;
pub use memory::MemoryView;

/// The operations the capture pipeline needs from a browser page.
///
/// Elements are addressed by `(selector, nth)` and looked up again on every
/// call, so no handle outlives a re-render of the host page.
#[async_trait]
pub trait BrowserView: Send {
    /// Navigate to `url` and wait for the load to finish.
    async fn goto(&mut self, url: &Url) -> Result<()>;

    /// Visible text of every element matching `selector`, in document order.
    async fn texts(&mut self, selector: &str) -> Result<Vec<String>>;

    /// Click the `nth` element matching `selector`.
    async fn click(&mut self, selector: &str, nth: usize) -> Result<()>;

    /// Inner HTML of the first element matching `selector`, if any.
    async fn inner_html(&mut self, selector: &str) -> Result<Option<String>>;

    /// Release the page (and the browser, if this view launched it).
    async fn close(self: Box<Self>) -> Result<()>;
}
