//! Per-run temporary workspace.
//!
//! A [`Workspace`] owns the directory that holds downloaded images and the
//! intermediate HTML for one pipeline run. [`Workspace::remove`] consumes the
//! value, so a workspace is released at most once; if a run unwinds before
//! reaching it, the underlying [`TempDir`] removes the directory on drop.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::{EpubError, Result};

/// Name prefix of every workspace directory.
pub const WORKSPACE_PREFIX: &str = "article-";

#[derive(Debug)]
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    /// Creates a uniquely named workspace under the system temp directory.
    pub fn create() -> Result<Self> {
        Self::create_in(&std::env::temp_dir())
    }

    /// Creates a uniquely named workspace under `root`.
    pub fn create_in(root: &Path) -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix(WORKSPACE_PREFIX)
            .tempdir_in(root)
            .map_err(|e| EpubError::Workspace(format!("cannot create workspace in {}: {e}", root.display())))?;

        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Recursively removes the workspace.
    ///
    /// A directory that is already gone counts as removed.
    pub async fn remove(self) -> Result<PathBuf> {
        let path = self.dir.keep();

        match tokio::fs::remove_dir_all(&path).await {
            Ok(()) => Ok(path),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(path),
            Err(e) => Err(EpubError::Io(e)),
        }
    }
}
