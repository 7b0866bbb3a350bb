//! Error taxonomy and the per-run accumulator.
//!
//! Each pipeline phase returns `Result<(), ErrorList>`; the engine merges
//! lists at phase boundaries and skips forward once the aggregate is
//! non-empty. Nothing here is retried — the repository fallback loop inside a
//! single fetch is the only retry-like behavior, by design.

use crate::coordinate::ValidationError;
use std::fmt;
use std::path::PathBuf;

/// One failure in the resolve/fetch/relocate/activate pipeline.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// Malformed coordinate or declaration. Never retried.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// No configured repository had the artifact. Carries everything an
    /// operator needs to fetch it by hand.
    #[error(
        "could not resolve '{artifact}' from any configured repository \
         (tried: {tried:?}); download {manual_url} manually into {cache_path}"
    )]
    Unresolved {
        artifact: String,
        tried: Vec<String>,
        manual_url: String,
        cache_path: PathBuf,
    },

    /// A repository reported the artifact present but the transfer failed.
    #[error("transfer of '{artifact}' from {url} failed: {source}")]
    Transfer {
        artifact: String,
        url: String,
        #[source]
        source: anyhow::Error,
    },

    /// The resolved manifest could not be read or parsed.
    #[error("failed to read resolved manifest {path}: {source}")]
    Manifest {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    /// The rewrite engine failed on one artifact. Fatal for that artifact.
    #[error("relocation of '{artifact}' failed: {source}")]
    Relocation {
        artifact: String,
        #[source]
        source: anyhow::Error,
    },

    /// The rewrite engine's own dependencies could not be resolved or the
    /// sandbox refused to instantiate it. Fatal for the whole run.
    #[error("relocation engine bootstrap failed: {source}")]
    Bootstrap {
        #[source]
        source: anyhow::Error,
    },

    /// The host activation capability rejected a resolved artifact.
    #[error("activation of {path} failed: {source}")]
    Activation {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },
}

/// Ordered accumulation of pipeline failures for one engine run.
#[derive(Debug, Default)]
pub struct ErrorList {
    errors: Vec<LoadError>,
}

impl ErrorList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, error: LoadError) {
        self.errors.push(error);
    }

    pub fn merge(&mut self, other: ErrorList) {
        self.errors.extend(other.errors);
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LoadError> {
        self.errors.iter()
    }

    /// `Ok(())` when empty, otherwise `Err(self)`.
    pub fn into_result(self) -> Result<(), ErrorList> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl From<LoadError> for ErrorList {
    fn from(error: LoadError) -> Self {
        let mut list = ErrorList::new();
        list.push(error);
        list
    }
}

impl fmt::Display for ErrorList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} dependency error(s)", self.errors.len())?;
        for error in &self.errors {
            write!(f, "\n  - {}", error)?;
        }
        Ok(())
    }
}

impl std::error::Error for ErrorList {}
