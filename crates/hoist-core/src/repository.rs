//! Repository descriptors: named, ordered mirror lists.

use hoist_manifest::WellKnownRepository;

/// A repository to try when fetching artifacts: an optional id (manifests
/// reference repositories by id instead of re-embedding URLs) and an ordered,
/// deduplicated list of base URLs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryInfo {
    id: Option<String>,
    urls: Vec<String>,
}

impl RepositoryInfo {
    /// Repository with a single base URL and no id.
    pub fn of(url: impl Into<String>) -> Self {
        Self {
            id: None,
            urls: vec![url.into()],
        }
    }

    /// Repository with an id and mirror list. Order is preserved, duplicates dropped.
    pub fn with_id(id: impl Into<String>, urls: impl IntoIterator<Item = String>) -> Self {
        let mut repo = Self {
            id: Some(id.into()),
            urls: Vec::new(),
        };
        for url in urls {
            repo.push_url(url);
        }
        repo
    }

    /// The well-known central repository with its mirror set.
    pub fn central() -> Self {
        let central = WellKnownRepository::MavenCentral;
        Self::with_id(
            central.id(),
            central.mirrors().iter().map(|m| m.to_string()),
        )
    }

    pub fn push_url(&mut self, url: String) {
        if !self.urls.contains(&url) {
            self.urls.push(url);
        }
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Base URLs in fallback order.
    pub fn urls(&self) -> &[String] {
        &self.urls
    }
}
