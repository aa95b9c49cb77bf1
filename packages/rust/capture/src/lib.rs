//! Page-level capture steps driven against a [`BrowserView`].
//!
//! This crate provides:
//! - [`NavigationWalker`] — builds the target list and activates each target
//! - [`ContentExtractor`] — reads the content region and its image references
//! - [`AssetFetcher`] — downloads referenced images to disk
//!
//! [`BrowserView`]: doccapture_browser::BrowserView

pub mod extractor;
pub mod fetcher;
pub mod walker;

pub use extractor::{ContentExtractor, image_refs};
pub use fetcher::{AssetFetcher, destination_name, image_extension};
pub use walker::NavigationWalker;
