//! The pluggable resolution pipeline.
//!
//! One resolver per artifact kind. Each is a pure pipeline with no retry
//! loop of its own: discover a dependency set from a declaration source,
//! download it, optionally relocate it, activate it. The engine only ever
//! advances a resolver whose previous phase succeeded, which is what makes
//! DISCOVERED → DOWNLOADED → (REWRITTEN) → ACTIVATED (or FAILED from any
//! state) hold without explicit state tracking.

mod coordinates;
mod manifest;

pub use coordinates::CoordinateResolver;
pub use manifest::ManifestResolver;

use async_trait::async_trait;
use std::sync::Arc;

use crate::activation::Activator;
use crate::error::ErrorList;
use crate::fetch::{FetchCache, FetchOptions};
use crate::provider::DeclarationSource;
use crate::relocate::Relocator;

/// Baseline priority of the built-in exact-coordinate resolver. Host-specific
/// resolvers order themselves before (lower) or after (higher) it.
pub const DEFAULT_PRIORITY: i32 = 0;

/// Shared machinery the engine hands each resolver phase: the artifact
/// cache, fetch parameters, the relocator, and the host activation
/// capability.
#[derive(Clone)]
pub struct ResolveContext {
    pub cache: FetchCache,
    pub options: FetchOptions,
    pub relocator: Arc<Relocator>,
    pub host: Arc<dyn Activator>,
}

/// A pluggable pipeline stage for one category of dependency declarations.
#[async_trait]
pub trait Resolver: Send {
    /// Execution order among registered resolvers; lower runs first.
    fn priority(&self) -> i32 {
        DEFAULT_PRIORITY
    }

    /// Collects declarations into this resolver's dependency set. The set is
    /// fully merged before any download starts — a resolver never partially
    /// discovers.
    fn discover(&mut self, source: &dyn DeclarationSource) -> Result<(), ErrorList>;

    /// Fetches every artifact in the set. Artifacts are independent, so
    /// implementations fan out and drain best-effort: a failure marks the
    /// resolver failed but never aborts sibling downloads in flight.
    async fn download(&mut self, context: &ResolveContext) -> Result<(), ErrorList>;

    /// Rewrites downloaded artifacts when the resolver carries relocation
    /// rules; a no-op otherwise.
    async fn relocate(&mut self, context: &ResolveContext) -> Result<(), ErrorList>;

    /// Hands every resolved artifact to the host, in insertion order —
    /// activation order is a correctness property for hosts where a module
    /// must be visible before its dependents.
    fn activate(&mut self, context: &ResolveContext) -> Result<(), ErrorList>;
}
