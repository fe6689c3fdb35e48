//! Whole-file persistence helpers.
//!
//! A writer takes an advisory lock on a sibling `<file>.lock` and holds it
//! across its read-modify-write cycle. New contents go to a temporary file in
//! the same directory that is renamed over the target, so readers see either
//! the old file or the new one.

use anyhow::{Context, Result};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Exclusive advisory lock on a persisted file, held for the guard's lifetime.
pub(crate) struct FileLock {
    file: File,
    lock_path: PathBuf,
    target: PathBuf,
    dir: PathBuf,
}

impl FileLock {
    /// Block until the lock for `target` is acquired. Creates the target's
    /// directory if needed.
    pub(crate) fn acquire(target: &Path) -> Result<Self> {
        let dir = match target.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create directory {}", dir.display()))?;

        let mut name = target.as_os_str().to_owned();
        name.push(".lock");
        let lock_path = PathBuf::from(name);
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&lock_path)
            .with_context(|| format!("failed to open lock file {}", lock_path.display()))?;
        file.lock_exclusive()
            .with_context(|| format!("failed to lock {}", lock_path.display()))?;
        Ok(Self {
            file,
            lock_path,
            target: target.to_path_buf(),
            dir,
        })
    }

    /// The locked file.
    pub(crate) fn target(&self) -> &Path {
        &self.target
    }

    /// Replace the locked file with `contents` (write-temp-then-rename).
    pub(crate) fn replace(&self, contents: &[u8]) -> Result<()> {
        let mut tmp = NamedTempFile::new_in(&self.dir).with_context(|| {
            format!("failed to create temporary file in {}", self.dir.display())
        })?;
        tmp.write_all(contents)
            .context("failed to write temporary file")?;
        tmp.as_file().sync_all().context("failed to sync temporary file")?;
        tmp.persist(&self.target)
            .map_err(|e| e.error)
            .with_context(|| format!("failed to replace {}", self.target.display()))?;
        Ok(())
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            tracing::warn!(lock = %self.lock_path.display(), error = %e, "Failed to release file lock");
        }
    }
}
