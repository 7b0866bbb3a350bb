//! Additive builder for dependency sets.

use crate::coordinate::{ArtifactCoordinate, ValidationError};
use crate::relocate::rule::RelocationRule;
use crate::repository::RepositoryInfo;

use super::DependencySet;

/// Accumulates a `DependencySet`. Purely additive; `build` consumes the
/// builder, so a finalized builder cannot be reused or finalized twice.
#[derive(Debug, Default)]
pub struct DependencySetBuilder {
    set: DependencySet,
}

impl DependencySetBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an already-parsed artifact, dropping duplicates.
    pub fn artifact(mut self, coordinate: ArtifactCoordinate) -> Self {
        self.push_artifact(coordinate);
        self
    }

    /// Parses and adds a `group:name:version` compact coordinate.
    pub fn artifact_compact(
        self,
        separator: &str,
        compact: &str,
    ) -> Result<Self, ValidationError> {
        Ok(self.artifact(ArtifactCoordinate::parse_compact(separator, compact)?))
    }

    /// Adds a single-URL repository.
    pub fn repository(mut self, url: impl Into<String>) -> Self {
        self.push_repository(RepositoryInfo::of(url));
        self
    }

    pub fn repository_info(mut self, repository: RepositoryInfo) -> Self {
        self.push_repository(repository);
        self
    }

    /// Adds a relocation rule using the default separator.
    pub fn relocation(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.push_rule(RelocationRule::of(from, to));
        self
    }

    pub fn relocation_rule(mut self, rule: RelocationRule) -> Self {
        self.push_rule(rule);
        self
    }

    pub(crate) fn push_artifact(&mut self, coordinate: ArtifactCoordinate) {
        if !self.set.artifacts.contains(&coordinate) {
            self.set.artifacts.push(coordinate);
        }
    }

    pub(crate) fn push_repository(&mut self, repository: RepositoryInfo) {
        if !self.set.repositories.contains(&repository) {
            self.set.repositories.push(repository);
        }
    }

    pub(crate) fn push_rule(&mut self, rule: RelocationRule) {
        if !self.set.rules.contains(&rule) {
            self.set.rules.push(rule);
        }
    }

    /// Finalizes the set. Consumes the builder.
    pub fn build(self) -> DependencySet {
        self.set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deduplicates_but_keeps_insertion_order() {
        let first = ArtifactCoordinate::parse("|", "org|acme", "widget", "1.0").unwrap();
        let second = ArtifactCoordinate::parse("|", "org|acme", "gadget", "2.0").unwrap();
        let set = DependencySetBuilder::new()
            .artifact(first.clone())
            .artifact(second.clone())
            .artifact(first.clone())
            .build();
        assert_eq!(set.artifacts(), [first, second]);
    }

    #[test]
    fn duplicate_rules_collapse_across_separators() {
        let set = DependencySetBuilder::new()
            .relocation_rule(RelocationRule::new("org|acme", "shadow|acme", "|"))
            .relocation_rule(RelocationRule::new("org#acme", "shadow#acme", "#"))
            .relocation_rule(RelocationRule::new("org|acme", "shadow|acme", "#"))
            .build();
        // the first and third share endpoints; the second has different ones
        assert_eq!(set.rules().len(), 2);
    }

    #[test]
    fn compact_artifact_errors_propagate() {
        let result = DependencySetBuilder::new().artifact_compact("|", "not-a-coordinate");
        assert!(result.is_err());
    }
}
