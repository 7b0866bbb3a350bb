//! The built-in exact-coordinate resolver.

use async_trait::async_trait;
use std::sync::Arc;

use crate::coordinate::ArtifactCoordinate;
use crate::error::{ErrorList, LoadError};
use crate::fetch::{self, FetchJob, FetchRequest};
use crate::provider::{DeclarationSource, DependencySet, DependencySetBuilder};
use crate::relocate::rule::RelocationRule;
use crate::repository::RepositoryInfo;

use super::{ResolveContext, Resolver, DEFAULT_PRIORITY};

/// Resolves declarations of exact (group, name, version) coordinates against
/// a set of repositories, with optional namespace relocation.
pub struct CoordinateResolver {
    artifacts: Vec<ArtifactCoordinate>,
    repositories: Vec<RepositoryInfo>,
    rules: Vec<RelocationRule>,
    priority: i32,
}

impl CoordinateResolver {
    /// Resolver with the central repository as its first candidate.
    pub fn new() -> Self {
        Self {
            artifacts: Vec::new(),
            repositories: vec![RepositoryInfo::central()],
            rules: Vec::new(),
            priority: DEFAULT_PRIORITY,
        }
    }

    /// Resolver with no default repository; only declared repositories are
    /// consulted.
    pub fn bare() -> Self {
        Self {
            repositories: Vec::new(),
            ..Self::new()
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn artifacts(&self) -> &[ArtifactCoordinate] {
        &self.artifacts
    }

    fn absorb(&mut self, set: DependencySet) {
        for repository in set.repositories {
            if !self.repositories.contains(&repository) {
                self.repositories.push(repository);
            }
        }
        for rule in set.rules {
            if !self.rules.contains(&rule) {
                self.rules.push(rule);
            }
        }
        for artifact in set.artifacts {
            if !self.artifacts.contains(&artifact) {
                self.artifacts.push(artifact);
            }
        }
    }
}

impl Default for CoordinateResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Resolver for CoordinateResolver {
    fn priority(&self) -> i32 {
        self.priority
    }

    fn discover(&mut self, source: &dyn DeclarationSource) -> Result<(), ErrorList> {
        let mut builder = DependencySetBuilder::new();
        source
            .collect_into(&mut builder)
            .map_err(|e| ErrorList::from(LoadError::Validation(e)))?;
        self.absorb(builder.build());
        tracing::debug!(
            artifacts = self.artifacts.len(),
            repositories = self.repositories.len(),
            rules = self.rules.len(),
            "coordinate resolver discovered"
        );
        Ok(())
    }

    async fn download(&mut self, context: &ResolveContext) -> Result<(), ErrorList> {
        if self.artifacts.is_empty() {
            return Ok(());
        }
        let repositories = Arc::new(self.repositories.clone());
        let jobs: Vec<FetchJob> = self
            .artifacts
            .iter()
            .map(|coordinate| FetchJob {
                request: FetchRequest::from_coordinate(coordinate),
                repositories: Arc::clone(&repositories),
            })
            .collect();
        fetch::fetch_all(jobs, context.cache.clone(), context.options.clone())
            .await
            .map(|_| ())
    }

    async fn relocate(&mut self, context: &ResolveContext) -> Result<(), ErrorList> {
        if self.rules.is_empty() {
            return Ok(());
        }
        let semaphore = Arc::new(tokio::sync::Semaphore::new(
            context.options.rewrite_parallelism.max(1),
        ));
        let mut join_set = tokio::task::JoinSet::new();
        for (index, coordinate) in self.artifacts.iter().cloned().enumerate() {
            let rules = self.rules.clone();
            let relocator = Arc::clone(&context.relocator);
            let cache = context.cache.clone();
            let semaphore = Arc::clone(&semaphore);
            join_set.spawn(async move {
                let _permit = semaphore.acquire_owned().await;
                (index, relocator.rewrite(&rules, &coordinate, &cache).await)
            });
        }

        let mut outcomes = Vec::new();
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => tracing::warn!("relocation task join: {}", e),
            }
        }
        outcomes.sort_by_key(|(index, _)| *index);

        let mut errors = ErrorList::new();
        for (_, outcome) in outcomes {
            if let Err(e) = outcome {
                errors.push(e);
            }
        }
        errors.into_result()
    }

    fn activate(&mut self, context: &ResolveContext) -> Result<(), ErrorList> {
        for coordinate in &self.artifacts {
            let relocated = context.cache.path_of(&coordinate.relocated_file_name());
            let path = if relocated.exists() {
                relocated
            } else {
                context.cache.path_of(&coordinate.file_name())
            };
            tracing::info!("{}: activating {}", coordinate, path.display());
            context
                .host
                .activate(&path)
                .map_err(|source| ErrorList::from(LoadError::Activation { path, source }))?;
        }
        Ok(())
    }
}
