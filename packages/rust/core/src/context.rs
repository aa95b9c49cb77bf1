//! Output layout for one capture run.

use std::path::{Path, PathBuf};

use url::Url;

use doccapture_shared::fs::ensure_dir;
use doccapture_shared::{CaptureConfig, Result};

/// File name of the run manifest inside the output directory.
pub const MANIFEST_FILE_NAME: &str = "manifest.json";

/// Fixed paths every artifact of a run is written under.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub base_url: Url,
    pub output_dir: PathBuf,
    pub images_dir: PathBuf,
}

impl RunContext {
    pub fn new(base_url: Url, output_dir: impl Into<PathBuf>, images_subdir: &str) -> Self {
        let output_dir = output_dir.into();
        let images_dir = output_dir.join(images_subdir);
        Self {
            base_url,
            output_dir,
            images_dir,
        }
    }

    pub fn from_config(config: &CaptureConfig) -> Self {
        Self::new(
            config.base_url.clone(),
            &config.output_dir,
            &config.images_subdir,
        )
    }

    /// Create the output and image directories. Idempotent.
    pub fn prepare(&self) -> Result<()> {
        ensure_dir(&self.output_dir)?;
        ensure_dir(&self.images_dir)
    }

    /// `<out>/<stem>.md`
    pub fn content_path(&self, stem: &str) -> PathBuf {
        self.output_dir.join(format!("{stem}.md"))
    }

    /// `<out>/<stem>.<locale>.md`
    pub fn localized_path(&self, stem: &str, locale: &str) -> PathBuf {
        self.output_dir.join(format!("{stem}.{locale}.md"))
    }

    pub fn image_path(&self, file_name: impl AsRef<Path>) -> PathBuf {
        self.images_dir.join(file_name)
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.output_dir.join(MANIFEST_FILE_NAME)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(root: &Path) -> RunContext {
        RunContext::new(Url::parse("https://docs.example/").unwrap(), root, "images")
    }

    #[test]
    fn layout_paths() {
        let ctx = context(Path::new("/out"));
        assert_eq!(ctx.content_path("Overview"), Path::new("/out/Overview.md"));
        assert_eq!(ctx.localized_path("Overview", "zh"), Path::new("/out/Overview.zh.md"));
        assert_eq!(ctx.image_path("Overview_0.png"), Path::new("/out/images/Overview_0.png"));
        assert_eq!(ctx.manifest_path(), Path::new("/out/manifest.json"));
    }

    #[test]
    fn prepare_is_idempotent() {
        let root = std::env::temp_dir().join(format!("doccapture-ctx-{}", uuid::Uuid::now_v7()));
        let ctx = context(&root.join("nested"));

        ctx.prepare().unwrap();
        ctx.prepare().unwrap();
        assert!(ctx.images_dir.is_dir());

        let _ = std::fs::remove_dir_all(&root);
    }
}
