//! Optional pass-through persistence of raw uploads.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised while saving an upload.
#[derive(Debug, Error)]
pub enum UploadError {
    /// The client-supplied name has no usable file name component.
    #[error("invalid upload filename: {0:?}")]
    InvalidFilename(String),
    /// Writing the file failed.
    #[error("failed to store upload: {0}")]
    Io(#[from] std::io::Error),
}

/// Reduce a client-supplied filename to its final path component.
///
/// Returns `None` for names that are empty or only consist of `.`/`..`.
pub fn sanitize_filename(raw: &str) -> Option<String> {
    let name = raw
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();
    match name {
        "" | "." | ".." => None,
        other => Some(other.to_string()),
    }
}

/// Directory where raw upload bytes are kept as `uploaded_{filename}`.
#[derive(Debug, Clone)]
pub struct UploadArchive {
    dir: PathBuf,
}

impl UploadArchive {
    /// Keep uploads under `dir`, created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Archive configured through `UPLOAD_DIR`, if any.
    pub fn from_config(config: &crate::config::Config) -> Option<Self> {
        config
            .upload_dir
            .as_deref()
            .filter(|dir| !dir.trim().is_empty())
            .map(Self::new)
    }

    /// Directory uploads are written to.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write `bytes` for `filename`, replacing an earlier upload with the same name.
    pub async fn persist(&self, filename: &str, bytes: &[u8]) -> Result<PathBuf, UploadError> {
        let name = sanitize_filename(filename)
            .ok_or_else(|| UploadError::InvalidFilename(filename.to_string()))?;
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.dir.join(format!("uploaded_{name}"));
        tokio::fs::write(&path, bytes).await?;
        tracing::debug!(path = %path.display(), bytes = bytes.len(), "Upload stored");
        Ok(path)
    }
}
