//! Declaration sources and the normalized dependency set.
//!
//! Every way a module can declare dependencies — a fluent builder, a const
//! record table compiled into the module, anything a host invents — funnels
//! through the narrow `DeclarationSource` capability into one normalized
//! `DependencySet` before resolution starts.

mod builder;

pub use builder::DependencySetBuilder;

use crate::coordinate::{ArtifactCoordinate, ValidationError};
use crate::relocate::rule::RelocationRule;
use crate::repository::RepositoryInfo;

/// Narrow capability the engine accepts declarations through: contribute
/// everything you declare into the builder.
pub trait DeclarationSource {
    fn collect_into(&self, builder: &mut DependencySetBuilder) -> Result<(), ValidationError>;
}

/// Immutable, normalized result of a declaration source: artifacts,
/// repositories, and relocation rules in insertion order with duplicates
/// dropped.
#[derive(Debug, Clone, Default)]
pub struct DependencySet {
    pub(crate) artifacts: Vec<ArtifactCoordinate>,
    pub(crate) repositories: Vec<RepositoryInfo>,
    pub(crate) rules: Vec<RelocationRule>,
}

impl DependencySet {
    pub fn builder() -> DependencySetBuilder {
        DependencySetBuilder::new()
    }

    pub fn artifacts(&self) -> &[ArtifactCoordinate] {
        &self.artifacts
    }

    pub fn repositories(&self) -> &[RepositoryInfo] {
        &self.repositories
    }

    pub fn rules(&self) -> &[RelocationRule] {
        &self.rules
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty() && self.repositories.is_empty() && self.rules.is_empty()
    }
}

impl DeclarationSource for DependencySet {
    fn collect_into(&self, builder: &mut DependencySetBuilder) -> Result<(), ValidationError> {
        for artifact in &self.artifacts {
            builder.push_artifact(artifact.clone());
        }
        for repository in &self.repositories {
            builder.push_repository(repository.clone());
        }
        for rule in &self.rules {
            builder.push_rule(rule.clone());
        }
        Ok(())
    }
}

/// One dependency declaration in const-record form, the declarative analog of
/// an attribute attached to a module type. `coordinate` is the compact
/// `group:name:version` string using `separator` in place of `.`/`/`.
#[derive(Debug, Clone, Copy)]
pub struct DependencyRecord {
    pub separator: &'static str,
    pub coordinate: &'static str,
}

/// One extra repository in const-record form.
#[derive(Debug, Clone, Copy)]
pub struct RepositoryRecord {
    pub url: &'static str,
}

/// One relocation rule in const-record form.
#[derive(Debug, Clone, Copy)]
pub struct RelocationRecord {
    pub from: &'static str,
    pub to: &'static str,
    pub separator: &'static str,
}

/// A module's complete declarative dependency table, embeddable as a `const`.
/// Parsing (and therefore validation) happens at collection time, so a
/// malformed record surfaces as a `ValidationError` from `run`, not a panic.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticDeclarations {
    pub dependencies: &'static [DependencyRecord],
    pub repositories: &'static [RepositoryRecord],
    pub relocations: &'static [RelocationRecord],
}

impl DeclarationSource for StaticDeclarations {
    fn collect_into(&self, builder: &mut DependencySetBuilder) -> Result<(), ValidationError> {
        for repository in self.repositories {
            builder.push_repository(RepositoryInfo::of(repository.url));
        }
        for relocation in self.relocations {
            builder.push_rule(RelocationRule::new(
                relocation.from,
                relocation.to,
                relocation.separator,
            ));
        }
        for dependency in self.dependencies {
            let coordinate =
                ArtifactCoordinate::parse_compact(dependency.separator, dependency.coordinate)?;
            builder.push_artifact(coordinate);
        }
        Ok(())
    }
}
