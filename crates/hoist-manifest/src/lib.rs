//! Wire model for the resolved dependency manifest.
//!
//! The build-time step resolves every declared artifact to a concrete
//! repository + file location and persists the result as JSON. At runtime the
//! engine consumes this file to download dependencies without re-running
//! coordinate resolution. Field names are the only contract that matters for
//! round-tripping, so they are pinned here with serde renames.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io;
use std::path::Path;

/// Conventional resource name for the manifest embedded next to a module.
pub const MANIFEST_FILE_NAME: &str = "hoist_dependencies.json";

/// One repository in the manifest: an ordered list of mirror base URLs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryEntry {
    #[serde(default)]
    pub urls: Vec<String>,
}

/// One resolved dependency: where it lives relative to a repository base and
/// what its cached file is called.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedEntry {
    pub relative_url: String,
    pub repository_id: String,
    pub file_name: String,
}

/// The persisted manifest: repositories by id plus the resolved entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedManifest {
    #[serde(default)]
    pub repositories: BTreeMap<String, RepositoryEntry>,
    #[serde(default)]
    pub dependencies: Vec<ResolvedEntry>,
}

/// Error reading or writing a manifest file.
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("manifest io: {0}")]
    Io(#[from] io::Error),
    #[error("manifest json: {0}")]
    Json(#[from] serde_json::Error),
}

impl ResolvedManifest {
    pub fn from_slice(bytes: &[u8]) -> Result<Self, ManifestError> {
        Ok(serde_json::from_slice(bytes)?)
    }

    pub fn from_path(path: &Path) -> Result<Self, ManifestError> {
        let bytes = std::fs::read(path)?;
        Self::from_slice(&bytes)
    }

    pub fn to_json(&self) -> Result<String, ManifestError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn write_path(&self, path: &Path) -> Result<(), ManifestError> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    /// Repository for an entry id, if the manifest defines one.
    pub fn repository(&self, id: &str) -> Option<&RepositoryEntry> {
        self.repositories.get(id)
    }
}

/// Repositories every producer and consumer agrees on without embedding URLs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WellKnownRepository {
    MavenLocal,
    MavenCentral,
}

impl WellKnownRepository {
    pub const ALL: [WellKnownRepository; 2] = [
        WellKnownRepository::MavenLocal,
        WellKnownRepository::MavenCentral,
    ];

    pub fn id(self) -> &'static str {
        match self {
            WellKnownRepository::MavenLocal => "MavenLocal",
            WellKnownRepository::MavenCentral => "MavenRepo",
        }
    }

    /// Mirror base URLs in fallback order. The local repository has none; the
    /// consumer resolves it against the local filesystem instead.
    pub fn mirrors(self) -> &'static [&'static str] {
        match self {
            WellKnownRepository::MavenLocal => &[],
            WellKnownRepository::MavenCentral => &[
                "https://maven-central.storage.googleapis.com/maven2/",
                "https://repo1.maven.org/maven2/",
                "https://repo.maven.apache.org/maven2/",
            ],
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|r| r.id() == id)
    }

    pub fn from_url(url: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|r| r.mirrors().iter().any(|m| *m == url))
    }
}
