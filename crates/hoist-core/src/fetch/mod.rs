//! Artifact fetching: cache-first, probe-then-transfer, repository fallback.
//!
//! A fetch never touches the network when the cache already holds the plain
//! or relocated file. Otherwise candidate repositories are probed in order
//! and the first one that reports the artifact present is transferred from —
//! the fallback loop is a deliberate part of resolution, not retry logic.

pub mod cache;
mod download;
mod probe;

pub use cache::FetchCache;

use anyhow::Context;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

use crate::coordinate::ArtifactCoordinate;
use crate::error::{ErrorList, LoadError};
use crate::repository::RepositoryInfo;

/// Identification header some hosts require before answering artifact
/// requests; bare client strings get rejected.
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows; U; Windows NT 6.0; en-US; rv:1.9.1.2) \
     Gecko/20090729 Firefox/3.5.2 (.NET CLR 3.5.30729)";

/// Network and pool parameters for fetching. Network-bound fetches get a
/// wider pool than CPU-bound rewrites.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub user_agent: String,
    pub connect_timeout: Duration,
    pub probe_timeout: Duration,
    pub transfer_timeout: Duration,
    pub fetch_parallelism: usize,
    pub rewrite_parallelism: usize,
}

impl Default for FetchOptions {
    fn default() -> Self {
        let cpus = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4);
        Self {
            user_agent: USER_AGENT.to_string(),
            connect_timeout: Duration::from_secs(10),
            probe_timeout: Duration::from_secs(10),
            transfer_timeout: Duration::from_secs(300),
            fetch_parallelism: (cpus * 2).clamp(4, 16),
            rewrite_parallelism: cpus,
        }
    }
}

/// One fetchable item: where it lives below a repository base and what the
/// cache calls it. Built from a coordinate or from a resolved-manifest entry.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    /// Path below a repository base URL.
    pub relative_path: String,
    /// Final cache file name.
    pub file_name: String,
    /// Cache name of the relocated form, if one can exist; its presence also
    /// counts as a cache hit.
    pub relocated_file_name: Option<String>,
    /// Identity used in errors and logs.
    pub display: String,
    /// Human-actionable fallback URL for manual download.
    pub manual_url: String,
}

impl FetchRequest {
    pub fn from_coordinate(coordinate: &ArtifactCoordinate) -> Self {
        let central_base = hoist_manifest::WellKnownRepository::MavenCentral.mirrors()[0];
        Self {
            relative_path: coordinate.remote_path(),
            file_name: coordinate.file_name(),
            relocated_file_name: Some(coordinate.relocated_file_name()),
            display: coordinate.to_string(),
            manual_url: coordinate.download_url(central_base),
        }
    }
}

fn join_url(base: &str, relative: &str) -> String {
    let slash = if base.ends_with('/') { "" } else { "/" };
    format!("{}{}{}", base, slash, relative)
}

/// Fetches one artifact with repository fallback. Blocking (curl); call from
/// `spawn_blocking` in async contexts. Idempotent: a cache hit on either the
/// plain or relocated file name returns without network access.
pub fn fetch_file(
    request: &FetchRequest,
    repositories: &[RepositoryInfo],
    cache: &FetchCache,
    options: &FetchOptions,
) -> Result<PathBuf, LoadError> {
    if let Some(relocated) = &request.relocated_file_name {
        if cache.contains(relocated) {
            tracing::debug!("{}: relocated cache hit", request.display);
            return Ok(cache.path_of(relocated));
        }
    }
    if cache.contains(&request.file_name) {
        tracing::debug!("{}: cache hit", request.display);
        return Ok(cache.path_of(&request.file_name));
    }

    let mut tried = Vec::new();
    let mut found: Option<String> = None;
    'repos: for repository in repositories {
        for base in repository.urls() {
            let candidate = join_url(base, &request.relative_path);
            if let Err(e) = Url::parse(&candidate) {
                tracing::warn!("{}: skipping malformed URL {}: {}", request.display, candidate, e);
                continue;
            }
            tried.push(candidate.clone());
            match probe::exists(&candidate, options) {
                Ok(true) => {
                    found = Some(candidate);
                    break 'repos;
                }
                Ok(false) => {}
                // Probe errors and timeouts count as "absent" for this mirror.
                Err(e) => {
                    tracing::debug!("{}: probe {} failed: {}", request.display, candidate, e);
                }
            }
        }
    }

    let Some(url) = found else {
        return Err(LoadError::Unresolved {
            artifact: request.display.clone(),
            tried,
            manual_url: request.manual_url.clone(),
            cache_path: cache.path_of(&request.file_name),
        });
    };

    tracing::info!("{}: downloading from {}", request.display, url);
    let temp = cache.temp_path_of(&request.file_name);
    if let Err(e) = download::to_file(&url, &temp, options) {
        let _ = std::fs::remove_file(&temp);
        return Err(LoadError::Transfer {
            artifact: request.display.clone(),
            url,
            source: e,
        });
    }

    cache
        .commit(&request.file_name)
        .map_err(|e| LoadError::Transfer {
            artifact: request.display.clone(),
            url,
            source: e,
        })
}

/// One unit of parallel fetch work: a request plus the repositories it may
/// resolve against.
#[derive(Debug, Clone)]
pub struct FetchJob {
    pub request: FetchRequest,
    pub repositories: Arc<Vec<RepositoryInfo>>,
}

/// Fetches every job concurrently, bounded by the configured fetch pool.
/// Best-effort: one failure never aborts in-flight siblings; after draining,
/// either all local paths (in job order) or every accumulated error is
/// returned.
pub async fn fetch_all(
    jobs: Vec<FetchJob>,
    cache: FetchCache,
    options: FetchOptions,
) -> Result<Vec<PathBuf>, ErrorList> {
    let semaphore = Arc::new(tokio::sync::Semaphore::new(options.fetch_parallelism.max(1)));
    let mut join_set = tokio::task::JoinSet::new();

    for (index, job) in jobs.into_iter().enumerate() {
        let cache = cache.clone();
        let options = options.clone();
        let semaphore = Arc::clone(&semaphore);
        join_set.spawn(async move {
            let _permit = semaphore.acquire_owned().await;
            let FetchJob {
                request,
                repositories,
            } = job;
            let display = request.display.clone();
            let result = tokio::task::spawn_blocking(move || {
                fetch_file(&request, repositories.as_slice(), &cache, &options)
            })
            .await
            .map_err(|e| LoadError::Transfer {
                artifact: display,
                url: "<worker>".to_string(),
                source: anyhow::anyhow!(e).context("fetch worker failed"),
            })
            .and_then(|r| r);
            (index, result)
        });
    }

    let mut outcomes: Vec<(usize, Result<PathBuf, LoadError>)> = Vec::new();
    while let Some(joined) = join_set.join_next().await {
        match joined.context("fetch task join") {
            Ok(outcome) => outcomes.push(outcome),
            Err(e) => {
                tracing::warn!("{}", e);
            }
        }
    }
    outcomes.sort_by_key(|(index, _)| *index);

    let mut errors = ErrorList::new();
    let mut paths = Vec::new();
    for (_, outcome) in outcomes {
        match outcome {
            Ok(path) => paths.push(path),
            Err(e) => errors.push(e),
        }
    }
    if errors.is_empty() {
        Ok(paths)
    } else {
        Err(errors)
    }
}
