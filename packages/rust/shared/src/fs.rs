//! Filesystem helpers for output artifacts.

use std::path::Path;

use sha2::{Digest, Sha256};
use tracing::debug;

use crate::error::{CaptureError, Result};

/// Create a directory and its parents. Safe to call repeatedly.
pub fn ensure_dir(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir).map_err(|e| CaptureError::persistence(dir, e))
}

/// Write `contents` to `path` so that either the full payload lands or nothing does.
///
/// Writes to a hidden sibling first, then renames over the target.
pub fn write_atomic(path: &Path, contents: impl AsRef<[u8]>) -> Result<()> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| {
            CaptureError::persistence(
                path,
                std::io::Error::new(std::io::ErrorKind::InvalidInput, "path has no file name"),
            )
        })?;
    let temp = path.with_file_name(format!(".{file_name}.tmp"));

    if let Err(e) = std::fs::write(&temp, contents.as_ref()) {
        let _ = std::fs::remove_file(&temp);
        return Err(CaptureError::persistence(&temp, e));
    }

    if let Err(e) = std::fs::rename(&temp, path) {
        let _ = std::fs::remove_file(&temp);
        return Err(CaptureError::persistence(path, e));
    }

    debug!(path = %path.display(), bytes = contents.as_ref().len(), "wrote file");
    Ok(())
}

/// Write a JSON file (pretty-printed), atomically.
pub fn write_json<T: serde::Serialize>(path: &Path, data: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(data).map_err(|e| {
        CaptureError::persistence(path, std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    })?;
    write_atomic(path, json)
}

/// Hex-encoded SHA-256 of a byte payload.
pub fn sha256_hex(content: impl AsRef<[u8]>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_ref());
    format!("{:x}", hasher.finalize())
}
