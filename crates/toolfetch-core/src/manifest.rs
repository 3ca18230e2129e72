//! Manifest materialisation.
//!
//! Writes manifest content to disk before a fetch. Single-shot: a failed
//! write is fatal to the workflow, there is no write retry.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{FetchError, Result};

/// Default manifest filename inside the working directory.
pub const DEFAULT_MANIFEST_NAME: &str = "tooltool.tt";

/// Writes manifest content under a working directory.
#[derive(Debug, Clone)]
pub struct ManifestWriter {
    work_dir: PathBuf,
}

impl ManifestWriter {
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        Self {
            work_dir: work_dir.into(),
        }
    }

    /// Write `content` verbatim to `path`, or to
    /// `<work_dir>/tooltool.tt` when no path is given. Parent directories
    /// are created as needed. Returns the path written.
    ///
    /// The file handle is scoped and flushed before return, so a reader
    /// never observes a partial manifest.
    pub fn write(&self, content: &str, path: Option<&Path>) -> Result<PathBuf> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => self.work_dir.join(DEFAULT_MANIFEST_NAME),
        };

        self.write_at(content, &path)
            .map_err(|source| FetchError::ManifestWrite {
                path: path.clone(),
                source,
            })?;

        debug!(event = "manifest.written", path = %path.display(), bytes = content.len());
        Ok(path)
    }

    fn write_at(&self, content: &str, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let mut file = fs::File::create(path)?;
        file.write_all(content.as_bytes())?;
        file.flush()
    }
}
