//! Resolver for pre-computed resolved manifests.
//!
//! A build-time step can resolve every declared coordinate ahead of time and
//! ship the result as a manifest next to the module. At runtime this resolver
//! replays that manifest: no coordinate validation, no relocation — just
//! repository lookup by id, fetch, and ordered activation.

use anyhow::anyhow;
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;

use hoist_manifest::{ResolvedEntry, ResolvedManifest, WellKnownRepository};

use crate::error::{ErrorList, LoadError};
use crate::fetch::{self, FetchJob, FetchRequest};
use crate::provider::DeclarationSource;
use crate::repository::RepositoryInfo;

use super::{ResolveContext, Resolver, DEFAULT_PRIORITY};

/// Resolves the entries of a persisted `ResolvedManifest`. Its declaration
/// source is the manifest file itself, so the engine-supplied source is
/// ignored.
pub struct ManifestResolver {
    path: PathBuf,
    manifest: Option<ResolvedManifest>,
    priority: i32,
}

impl ManifestResolver {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            manifest: None,
            priority: DEFAULT_PRIORITY,
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Repositories for one entry: a well-known id brings its own mirror
    /// list, anything else must be defined by the manifest.
    fn repositories_for(
        manifest: &ResolvedManifest,
        entry: &ResolvedEntry,
    ) -> Result<RepositoryInfo, LoadError> {
        if let Some(known) = WellKnownRepository::from_id(&entry.repository_id) {
            if !known.mirrors().is_empty() {
                return Ok(RepositoryInfo::with_id(
                    known.id(),
                    known.mirrors().iter().map(|m| m.to_string()),
                ));
            }
        }
        match manifest.repository(&entry.repository_id) {
            Some(repository) if !repository.urls.is_empty() => Ok(RepositoryInfo::with_id(
                entry.repository_id.clone(),
                repository.urls.iter().cloned(),
            )),
            _ => Err(LoadError::Unresolved {
                artifact: entry.file_name.clone(),
                tried: Vec::new(),
                manual_url: manual_url_for(entry),
                cache_path: PathBuf::from(&entry.file_name),
            }),
        }
    }
}

fn manual_url_for(entry: &ResolvedEntry) -> String {
    let base = WellKnownRepository::MavenCentral.mirrors()[0];
    format!("{}{}", base, entry.relative_url)
}

fn request_for(entry: &ResolvedEntry) -> FetchRequest {
    FetchRequest {
        relative_path: entry.relative_url.clone(),
        file_name: entry.file_name.clone(),
        relocated_file_name: None,
        display: entry.file_name.clone(),
        manual_url: manual_url_for(entry),
    }
}

#[async_trait]
impl Resolver for ManifestResolver {
    fn priority(&self) -> i32 {
        self.priority
    }

    fn discover(&mut self, _source: &dyn DeclarationSource) -> Result<(), ErrorList> {
        let manifest = ResolvedManifest::from_path(&self.path).map_err(|e| {
            ErrorList::from(LoadError::Manifest {
                path: self.path.clone(),
                source: anyhow!(e),
            })
        })?;
        tracing::debug!(
            entries = manifest.dependencies.len(),
            "manifest resolver discovered {}",
            self.path.display()
        );
        self.manifest = Some(manifest);
        Ok(())
    }

    async fn download(&mut self, context: &ResolveContext) -> Result<(), ErrorList> {
        let Some(manifest) = &self.manifest else {
            return Ok(());
        };

        let mut errors = ErrorList::new();
        let mut jobs = Vec::new();
        for entry in &manifest.dependencies {
            match Self::repositories_for(manifest, entry) {
                Ok(repository) => jobs.push(FetchJob {
                    request: request_for(entry),
                    repositories: Arc::new(vec![repository]),
                }),
                Err(e) => errors.push(e),
            }
        }
        // entries with unknown repositories fail, but the rest still download
        match fetch::fetch_all(jobs, context.cache.clone(), context.options.clone()).await {
            Ok(_) => {}
            Err(fetch_errors) => errors.merge(fetch_errors),
        }
        errors.into_result()
    }

    async fn relocate(&mut self, _context: &ResolveContext) -> Result<(), ErrorList> {
        // manifests carry pre-resolved artifacts, never relocation rules
        Ok(())
    }

    fn activate(&mut self, context: &ResolveContext) -> Result<(), ErrorList> {
        let Some(manifest) = &self.manifest else {
            return Ok(());
        };
        for entry in &manifest.dependencies {
            let path = context.cache.path_of(&entry.file_name);
            tracing::info!("{}: activating {}", entry.file_name, path.display());
            context
                .host
                .activate(&path)
                .map_err(|source| ErrorList::from(LoadError::Activation { path, source }))?;
        }
        Ok(())
    }
}
