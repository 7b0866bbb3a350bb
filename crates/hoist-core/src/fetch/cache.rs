//! On-disk artifact cache.
//!
//! A flat directory keyed by final file name, write-once-then-immutable.
//! Transfers land in a `.part` temp file and are renamed into place, so a
//! partially-written artifact is never visible under its final name.
//! Same-name races across processes are outside the contract (single-process
//! assumption); concurrent writers for different names never block each other.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Temporary file suffix used before atomic rename.
pub const TEMP_SUFFIX: &str = ".part";

/// Directory-scoped artifact store.
#[derive(Debug, Clone)]
pub struct FetchCache {
    root: PathBuf,
}

impl FetchCache {
    /// Opens (creating if needed) a cache rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)
            .with_context(|| format!("failed to create cache dir {}", root.display()))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_of(&self, file_name: &str) -> PathBuf {
        self.root.join(file_name)
    }

    /// Temp path for an in-flight transfer of `file_name`.
    pub fn temp_path_of(&self, file_name: &str) -> PathBuf {
        self.root.join(format!("{}{}", file_name, TEMP_SUFFIX))
    }

    pub fn contains(&self, file_name: &str) -> bool {
        self.path_of(file_name).exists()
    }

    /// Atomically promotes the temp file for `file_name` to its final name.
    /// If the final name appeared in the meantime (another caller converged on
    /// the same artifact), the temp is discarded and the existing file wins.
    pub fn commit(&self, file_name: &str) -> Result<PathBuf> {
        let temp = self.temp_path_of(file_name);
        let dest = self.path_of(file_name);
        if dest.exists() {
            let _ = std::fs::remove_file(&temp);
            return Ok(dest);
        }
        std::fs::rename(&temp, &dest).with_context(|| {
            format!("failed to rename {} to {}", temp.display(), dest.display())
        })?;
        Ok(dest)
    }

    /// Removes a cached file if present.
    pub fn remove(&self, file_name: &str) -> Result<()> {
        let path = self.path_of(file_name);
        if path.exists() {
            std::fs::remove_file(&path)
                .with_context(|| format!("failed to remove {}", path.display()))?;
        }
        Ok(())
    }
}
