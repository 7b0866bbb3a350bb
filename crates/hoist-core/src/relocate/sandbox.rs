//! Isolation capabilities for the rewrite engine.
//!
//! The engine that rewrites artifacts must not share a symbol namespace with
//! the artifacts it rewrites, so it runs behind two narrow capabilities: the
//! engine itself, and the sandbox that hosts it. A sandbox declares which
//! engine artifacts it needs resolved (through the ordinary fetch machinery)
//! and turns their local paths into a live engine.

use anyhow::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::coordinate::ArtifactCoordinate;

use super::archive::ArchiveRewriter;
use super::rule::CanonicalRule;

/// A rewrite engine instance, as seen by the relocator.
pub trait RelocationEngine: Send + Sync {
    /// Applies `rules` to the artifact at `input`, emitting the rewritten
    /// artifact at `output`. Must rewrite qualified-name references
    /// structurally, never as a blind byte replace.
    fn relocate(&self, input: &Path, output: &Path, rules: &[CanonicalRule]) -> Result<()>;
}

/// A disposable, isolated execution context able to host the rewrite engine.
/// Host processes with real symbol-namespace isolation supply their own
/// implementation; the engine artifacts it declares are bootstrapped through
/// the same fetch cache and fallback download used for ordinary dependencies.
pub trait Sandbox: Send + Sync {
    /// Artifacts that must be resolved locally before `instantiate`.
    fn engine_dependencies(&self) -> Vec<ArtifactCoordinate>;

    /// Builds the engine from the resolved artifact paths (in declaration
    /// order). Called at most once per relocator.
    fn instantiate(&self, artifacts: &[PathBuf]) -> Result<Arc<dyn RelocationEngine>>;
}

/// Default sandbox: the compiled-in archive rewriter. It carries no external
/// engine artifacts and holds no shared mutable state, so nothing it loads
/// can collide with the artifacts being rewritten.
pub struct InProcessSandbox;

impl Sandbox for InProcessSandbox {
    fn engine_dependencies(&self) -> Vec<ArtifactCoordinate> {
        Vec::new()
    }

    fn instantiate(&self, _artifacts: &[PathBuf]) -> Result<Arc<dyn RelocationEngine>> {
        Ok(Arc::new(ArchiveRewriter))
    }
}
