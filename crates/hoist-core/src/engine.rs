//! The dependency engine.
//!
//! Owns the registered resolvers and drives them strictly in ascending
//! priority order, sequentially — later resolvers may depend on artifacts
//! activated by earlier ones, so resolver order is a correctness requirement
//! even though the work inside each resolver fans out.

use anyhow::Result;
use std::path::Path;
use std::sync::Arc;

use crate::activation::Activator;
use crate::error::ErrorList;
use crate::fetch::{FetchCache, FetchOptions};
use crate::provider::DeclarationSource;
use crate::relocate::sandbox::{InProcessSandbox, Sandbox};
use crate::relocate::Relocator;
use crate::resolver::{CoordinateResolver, ResolveContext, Resolver};

/// Subdirectory of the base path reserved for the rewrite engine's own
/// bootstrapped artifacts, so they never contend with ordinary cache keys.
const ENGINE_CACHE_DIR: &str = "relocator";

/// Registry kind of the built-in exact-coordinate resolver.
pub const COORDINATE_RESOLVER_KIND: &str = "coordinates";

struct Registered {
    kind: String,
    resolver: Box<dyn Resolver>,
}

/// Resolves, fetches, relocates, and activates module dependencies below one
/// base directory.
pub struct DependencyEngine {
    context: ResolveContext,
    resolvers: Vec<Registered>,
}

impl DependencyEngine {
    /// Engine with default options, the in-process rewrite sandbox, and the
    /// built-in coordinate resolver registered.
    pub fn new(base_path: &Path, host: Arc<dyn Activator>) -> Result<Self> {
        Self::with_sandbox(base_path, host, FetchOptions::default(), Box::new(InProcessSandbox))
    }

    pub fn with_options(
        base_path: &Path,
        host: Arc<dyn Activator>,
        options: FetchOptions,
    ) -> Result<Self> {
        Self::with_sandbox(base_path, host, options, Box::new(InProcessSandbox))
    }

    /// Engine with a host-supplied rewrite sandbox. The sandbox's engine
    /// artifacts bootstrap against the central repository.
    pub fn with_sandbox(
        base_path: &Path,
        host: Arc<dyn Activator>,
        options: FetchOptions,
        sandbox: Box<dyn Sandbox>,
    ) -> Result<Self> {
        let engine_cache = FetchCache::new(base_path.join(ENGINE_CACHE_DIR))?;
        let relocator = Relocator::new(engine_cache, sandbox, options.clone());
        Self::with_relocator(base_path, host, options, relocator)
    }

    /// Engine with a fully configured relocator (custom bootstrap
    /// repositories, custom sandbox).
    pub fn with_relocator(
        base_path: &Path,
        host: Arc<dyn Activator>,
        options: FetchOptions,
        relocator: Relocator,
    ) -> Result<Self> {
        let cache = FetchCache::new(base_path)?;
        let context = ResolveContext {
            cache,
            options,
            relocator: Arc::new(relocator),
            host,
        };
        let mut engine = Self {
            context,
            resolvers: Vec::new(),
        };
        engine.register(COORDINATE_RESOLVER_KIND, Box::new(CoordinateResolver::new()));
        Ok(engine)
    }

    /// Registers a resolver under `kind`, replacing any resolver already
    /// registered under that kind (its registry position is kept, so
    /// priority ties still break by first registration).
    pub fn register(&mut self, kind: impl Into<String>, resolver: Box<dyn Resolver>) {
        let kind = kind.into();
        if let Some(existing) = self.resolvers.iter_mut().find(|r| r.kind == kind) {
            existing.resolver = resolver;
        } else {
            self.resolvers.push(Registered { kind, resolver });
        }
    }

    /// The shared artifact cache.
    pub fn cache(&self) -> &FetchCache {
        &self.context.cache
    }

    /// Runs the full pipeline for one declaration source.
    ///
    /// Resolvers run in ascending priority; ties break by registration order.
    /// Once the aggregate error list is non-empty every remaining resolver is
    /// skipped entirely — first failure aborts the pipeline forward, it never
    /// unwinds the caller. The result is the aggregate: empty means success.
    pub async fn run(&mut self, source: &dyn DeclarationSource) -> Result<(), ErrorList> {
        let mut order: Vec<usize> = (0..self.resolvers.len()).collect();
        order.sort_by_key(|&i| self.resolvers[i].resolver.priority());

        let context = self.context.clone();
        let mut errors = ErrorList::new();
        for index in order {
            let entry = &mut self.resolvers[index];
            if !errors.is_empty() {
                tracing::warn!("skipping resolver '{}' after earlier failure", entry.kind);
                continue;
            }

            tracing::info!("running resolver '{}'", entry.kind);
            if let Err(e) = entry.resolver.discover(source) {
                errors.merge(e);
                continue;
            }
            if let Err(e) = entry.resolver.download(&context).await {
                errors.merge(e);
                continue;
            }
            if let Err(e) = entry.resolver.relocate(&context).await {
                errors.merge(e);
                continue;
            }
            if let Err(e) = entry.resolver.activate(&context) {
                errors.merge(e);
            }
        }
        errors.into_result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LoadError;
    use crate::provider::DependencySet;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct NoopActivator;
    impl Activator for NoopActivator {
        fn activate(&self, _artifact: &Path) -> anyhow::Result<()> {
            Ok(())
        }
    }

    /// Records every phase invocation into a shared log; optionally fails at
    /// one phase.
    struct ScriptedResolver {
        name: &'static str,
        priority: i32,
        fail_at: Option<&'static str>,
        log: Arc<Mutex<Vec<String>>>,
    }

    impl ScriptedResolver {
        fn record(&self, phase: &str) -> Result<(), ErrorList> {
            self.log.lock().unwrap().push(format!("{}:{}", self.name, phase));
            if self.fail_at == Some(phase) {
                return Err(ErrorList::from(LoadError::Bootstrap {
                    source: anyhow::anyhow!("{} failed at {}", self.name, phase),
                }));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl Resolver for ScriptedResolver {
        fn priority(&self) -> i32 {
            self.priority
        }
        fn discover(&mut self, _source: &dyn DeclarationSource) -> Result<(), ErrorList> {
            self.record("discover")
        }
        async fn download(&mut self, _context: &ResolveContext) -> Result<(), ErrorList> {
            self.record("download")
        }
        async fn relocate(&mut self, _context: &ResolveContext) -> Result<(), ErrorList> {
            self.record("relocate")
        }
        fn activate(&mut self, _context: &ResolveContext) -> Result<(), ErrorList> {
            self.record("activate")
        }
    }

    fn engine(dir: &Path) -> DependencyEngine {
        let mut engine = DependencyEngine::new(dir, Arc::new(NoopActivator)).unwrap();
        // drop the built-in resolver's network surface from these tests
        engine.register(
            COORDINATE_RESOLVER_KIND,
            Box::new(CoordinateResolver::bare()),
        );
        engine
    }

    fn scripted(
        name: &'static str,
        priority: i32,
        fail_at: Option<&'static str>,
        log: &Arc<Mutex<Vec<String>>>,
    ) -> Box<ScriptedResolver> {
        Box::new(ScriptedResolver {
            name,
            priority,
            fail_at,
            log: Arc::clone(log),
        })
    }

    #[tokio::test]
    async fn resolvers_run_in_priority_order_with_stable_ties() {
        let dir = tempfile::tempdir().unwrap();
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut engine = engine(dir.path());
        engine.register("late", scripted("late", 5, None, &log));
        engine.register("a", scripted("a", 1, None, &log));
        engine.register("b", scripted("b", 1, None, &log));
        engine.register("early", scripted("early", -1, None, &log));

        engine.run(&DependencySet::default()).await.unwrap();

        let entries = log.lock().unwrap().clone();
        let order: Vec<&str> = entries
            .iter()
            .filter(|e| e.ends_with(":discover"))
            .map(|e| e.split(':').next().unwrap())
            .collect();
        assert_eq!(order, ["early", "a", "b", "late"]);
    }

    #[tokio::test]
    async fn failure_skips_all_later_resolvers() {
        let dir = tempfile::tempdir().unwrap();
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut engine = engine(dir.path());
        engine.register("first", scripted("first", 0, Some("download"), &log));
        engine.register("second", scripted("second", 1, None, &log));

        let errors = engine.run(&DependencySet::default()).await.unwrap_err();
        assert_eq!(errors.len(), 1);

        let entries = log.lock().unwrap().clone();
        assert!(entries.contains(&"first:discover".to_string()));
        assert!(entries.contains(&"first:download".to_string()));
        // the failing resolver advances no further
        assert!(!entries.contains(&"first:relocate".to_string()));
        // the later resolver is never touched at all
        assert!(!entries.iter().any(|e| e.starts_with("second:")));
    }

    #[tokio::test]
    async fn phase_failure_stops_that_resolvers_later_phases() {
        let dir = tempfile::tempdir().unwrap();
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut engine = engine(dir.path());
        engine.register("r", scripted("r", 0, Some("discover"), &log));

        assert!(engine.run(&DependencySet::default()).await.is_err());
        let entries = log.lock().unwrap().clone();
        assert_eq!(entries, ["r:discover"]);
    }

    #[tokio::test]
    async fn register_replaces_kind_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut engine = engine(dir.path());
        engine.register("x", scripted("stale", 0, None, &log));
        engine.register("y", scripted("y", 0, None, &log));
        engine.register("x", scripted("fresh", 0, None, &log));

        engine.run(&DependencySet::default()).await.unwrap();
        let entries = log.lock().unwrap().clone();
        assert!(!entries.iter().any(|e| e.starts_with("stale:")));
        let order: Vec<&str> = entries
            .iter()
            .filter(|e| e.ends_with(":discover"))
            .map(|e| e.split(':').next().unwrap())
            .collect();
        // replacement keeps the original registry position
        assert_eq!(order, ["fresh", "y"]);
    }

    #[tokio::test]
    async fn empty_declaration_succeeds() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = engine(dir.path());
        assert!(engine.run(&DependencySet::default()).await.is_ok());
    }
}
