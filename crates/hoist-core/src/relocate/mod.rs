//! Namespace relocation.
//!
//! Orchestrates the rewrite of downloaded artifacts: bootstraps the rewrite
//! engine (self-hosted through the same fetch machinery it serves), skips
//! work that is already done, and makes sure only the relocated copy of an
//! artifact remains on disk afterwards.

pub mod archive;
mod classfile;
pub mod rule;
pub mod sandbox;

use anyhow::anyhow;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::OnceCell;

use crate::coordinate::ArtifactCoordinate;
use crate::error::LoadError;
use crate::fetch::{self, FetchCache, FetchJob, FetchOptions, FetchRequest};
use crate::repository::RepositoryInfo;

use rule::{CanonicalRule, RelocationRule};
use sandbox::{RelocationEngine, Sandbox};

/// Drives namespace rewrites. Owns a dedicated cache area for the engine's
/// own artifacts so bootstrap and ordinary dependencies never contend on the
/// same keys.
pub struct Relocator {
    engine_cache: FetchCache,
    repositories: Arc<Vec<RepositoryInfo>>,
    options: FetchOptions,
    sandbox: Box<dyn Sandbox>,
    engine: OnceCell<Arc<dyn RelocationEngine>>,
}

impl Relocator {
    /// `engine_cache` holds the sandbox's bootstrapped engine artifacts;
    /// they resolve against the central repository.
    pub fn new(engine_cache: FetchCache, sandbox: Box<dyn Sandbox>, options: FetchOptions) -> Self {
        Self {
            engine_cache,
            repositories: Arc::new(vec![RepositoryInfo::central()]),
            options,
            sandbox,
            engine: OnceCell::new(),
        }
    }

    /// Overrides the repositories used for engine bootstrap.
    pub fn with_repositories(mut self, repositories: Vec<RepositoryInfo>) -> Self {
        self.repositories = Arc::new(repositories);
        self
    }

    /// Resolves the sandbox's declared engine artifacts and instantiates the
    /// engine, once per relocator. Any failure here is a bootstrap failure:
    /// no rewriting can happen at all.
    async fn engine(&self) -> Result<Arc<dyn RelocationEngine>, LoadError> {
        let engine = self
            .engine
            .get_or_try_init(|| async {
                let dependencies = self.sandbox.engine_dependencies();
                if !dependencies.is_empty() {
                    tracing::info!("bootstrapping relocation engine ({} artifacts)", dependencies.len());
                }
                let jobs: Vec<FetchJob> = dependencies
                    .iter()
                    .map(|coordinate| FetchJob {
                        request: FetchRequest::from_coordinate(coordinate),
                        repositories: Arc::clone(&self.repositories),
                    })
                    .collect();
                let paths = fetch::fetch_all(
                    jobs,
                    self.engine_cache.clone(),
                    self.options.clone(),
                )
                .await
                .map_err(|errors| LoadError::Bootstrap {
                    source: anyhow!(errors),
                })?;
                self.sandbox
                    .instantiate(&paths)
                    .map_err(|source| LoadError::Bootstrap { source })
            })
            .await?;
        Ok(Arc::clone(engine))
    }

    /// Rewrites one downloaded artifact in `cache` according to `rules`.
    /// Idempotent: when the relocated file already exists the engine is not
    /// consulted (nor bootstrapped). On success the pre-rewrite file is
    /// deleted so only the relocated copy ships.
    pub async fn rewrite(
        &self,
        rules: &[RelocationRule],
        coordinate: &ArtifactCoordinate,
        cache: &FetchCache,
    ) -> Result<PathBuf, LoadError> {
        let relocated_name = coordinate.relocated_file_name();
        if cache.contains(&relocated_name) {
            tracing::debug!("{}: already relocated", coordinate);
            return Ok(cache.path_of(&relocated_name));
        }

        let engine = self.engine().await?;
        let canonical: Vec<CanonicalRule> = rules.iter().map(|r| r.canonical()).collect();
        let artifact = coordinate.to_string();
        let input = cache.path_of(&coordinate.file_name());
        let temp = cache.temp_path_of(&relocated_name);

        let task_input = input.clone();
        let task_temp = temp.clone();
        let outcome = tokio::task::spawn_blocking(move || {
            engine.relocate(&task_input, &task_temp, &canonical)
        })
        .await
        .map_err(|e| anyhow!(e).context("relocation worker failed"))
        .and_then(|r| r);

        if let Err(source) = outcome {
            let _ = std::fs::remove_file(&temp);
            return Err(LoadError::Relocation { artifact, source });
        }

        let path = cache
            .commit(&relocated_name)
            .map_err(|source| LoadError::Relocation {
                artifact: artifact.clone(),
                source,
            })?;
        cache
            .remove(&coordinate.file_name())
            .map_err(|source| LoadError::Relocation { artifact, source })?;

        tracing::info!("{}: relocated to {}", coordinate, path.display());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingEngine {
        invocations: Arc<AtomicUsize>,
    }

    impl RelocationEngine for CountingEngine {
        fn relocate(&self, input: &Path, output: &Path, _rules: &[CanonicalRule]) -> anyhow::Result<()> {
            self.invocations.fetch_add(1, Ordering::SeqCst);
            std::fs::copy(input, output)?;
            Ok(())
        }
    }

    struct StubSandbox {
        instantiations: Arc<AtomicUsize>,
        invocations: Arc<AtomicUsize>,
    }

    impl Sandbox for StubSandbox {
        fn engine_dependencies(&self) -> Vec<ArtifactCoordinate> {
            Vec::new()
        }

        fn instantiate(&self, _artifacts: &[PathBuf]) -> anyhow::Result<Arc<dyn RelocationEngine>> {
            self.instantiations.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(CountingEngine {
                invocations: Arc::clone(&self.invocations),
            }))
        }
    }

    struct HungrySandbox;

    impl Sandbox for HungrySandbox {
        fn engine_dependencies(&self) -> Vec<ArtifactCoordinate> {
            vec![ArtifactCoordinate::parse("|", "org|ow2|asm", "asm", "9.7").unwrap()]
        }

        fn instantiate(&self, _artifacts: &[PathBuf]) -> anyhow::Result<Arc<dyn RelocationEngine>> {
            anyhow::bail!("should never instantiate");
        }
    }

    fn rules() -> Vec<RelocationRule> {
        vec![RelocationRule::new("org|acme", "com|host|acme", "|")]
    }

    fn coordinate() -> ArtifactCoordinate {
        ArtifactCoordinate::parse("|", "org|acme", "widget", "1.2.3").unwrap()
    }

    fn relocator(dir: &Path, sandbox: Box<dyn Sandbox>) -> Relocator {
        let engine_cache = FetchCache::new(dir.join("relocator")).unwrap();
        Relocator::new(engine_cache, sandbox, FetchOptions::default())
            .with_repositories(Vec::new())
    }

    #[tokio::test]
    async fn rewrites_and_deletes_original() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FetchCache::new(dir.path().join("cache")).unwrap();
        std::fs::write(cache.path_of("widget-1.2.3.jar"), b"artifact").unwrap();

        let invocations = Arc::new(AtomicUsize::new(0));
        let relocator = relocator(
            dir.path(),
            Box::new(StubSandbox {
                instantiations: Arc::new(AtomicUsize::new(0)),
                invocations: Arc::clone(&invocations),
            }),
        );

        let path = relocator.rewrite(&rules(), &coordinate(), &cache).await.unwrap();
        assert_eq!(path, cache.path_of("widget-1.2.3-relocated.jar"));
        assert!(cache.contains("widget-1.2.3-relocated.jar"));
        assert!(!cache.contains("widget-1.2.3.jar"));
        assert_eq!(invocations.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn skips_when_relocated_already_exists() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FetchCache::new(dir.path().join("cache")).unwrap();
        std::fs::write(cache.path_of("widget-1.2.3-relocated.jar"), b"done").unwrap();

        let instantiations = Arc::new(AtomicUsize::new(0));
        let invocations = Arc::new(AtomicUsize::new(0));
        let relocator = relocator(
            dir.path(),
            Box::new(StubSandbox {
                instantiations: Arc::clone(&instantiations),
                invocations: Arc::clone(&invocations),
            }),
        );

        let path = relocator.rewrite(&rules(), &coordinate(), &cache).await.unwrap();
        assert_eq!(path, cache.path_of("widget-1.2.3-relocated.jar"));
        // engine neither bootstrapped nor invoked
        assert_eq!(instantiations.load(Ordering::SeqCst), 0);
        assert_eq!(invocations.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn engine_instantiates_once_across_rewrites() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FetchCache::new(dir.path().join("cache")).unwrap();
        std::fs::write(cache.path_of("widget-1.2.3.jar"), b"a").unwrap();
        let other = ArtifactCoordinate::parse("|", "org|acme", "gadget", "2.0").unwrap();
        std::fs::write(cache.path_of("gadget-2.0.jar"), b"b").unwrap();

        let instantiations = Arc::new(AtomicUsize::new(0));
        let relocator = relocator(
            dir.path(),
            Box::new(StubSandbox {
                instantiations: Arc::clone(&instantiations),
                invocations: Arc::new(AtomicUsize::new(0)),
            }),
        );

        relocator.rewrite(&rules(), &coordinate(), &cache).await.unwrap();
        relocator.rewrite(&rules(), &other, &cache).await.unwrap();
        assert_eq!(instantiations.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unresolvable_engine_dependencies_are_a_bootstrap_error() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FetchCache::new(dir.path().join("cache")).unwrap();
        std::fs::write(cache.path_of("widget-1.2.3.jar"), b"artifact").unwrap();

        // No repositories configured, so the declared engine artifact can
        // never resolve.
        let relocator = relocator(dir.path(), Box::new(HungrySandbox));
        let err = relocator.rewrite(&rules(), &coordinate(), &cache).await.unwrap_err();
        assert!(matches!(err, LoadError::Bootstrap { .. }));
    }

    #[tokio::test]
    async fn engine_failure_reports_the_artifact() {
        struct FailingEngine;
        impl RelocationEngine for FailingEngine {
            fn relocate(&self, _i: &Path, _o: &Path, _r: &[CanonicalRule]) -> anyhow::Result<()> {
                anyhow::bail!("engine crash")
            }
        }
        struct FailingSandbox;
        impl Sandbox for FailingSandbox {
            fn engine_dependencies(&self) -> Vec<ArtifactCoordinate> {
                Vec::new()
            }
            fn instantiate(&self, _a: &[PathBuf]) -> anyhow::Result<Arc<dyn RelocationEngine>> {
                Ok(Arc::new(FailingEngine))
            }
        }

        let dir = tempfile::tempdir().unwrap();
        let cache = FetchCache::new(dir.path().join("cache")).unwrap();
        std::fs::write(cache.path_of("widget-1.2.3.jar"), b"artifact").unwrap();

        let relocator = relocator(dir.path(), Box::new(FailingSandbox));
        let err = relocator.rewrite(&rules(), &coordinate(), &cache).await.unwrap_err();
        match err {
            LoadError::Relocation { artifact, .. } => {
                assert_eq!(artifact, "org.acme:widget:1.2.3");
            }
            other => panic!("expected Relocation, got {other}"),
        }
        // failed rewrite leaves no temp or relocated file behind
        assert!(!cache.contains("widget-1.2.3-relocated.jar"));
        assert!(!cache.temp_path_of("widget-1.2.3-relocated.jar").exists());
    }
}
