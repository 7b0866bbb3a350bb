//! Namespace relocation rules.

use std::hash::{Hash, Hasher};

/// A (from, to) namespace move. Like coordinates, the prefixes avoid literal
/// `.`/`/` and use a declared separator instead; the separator is cosmetic
/// and two rules with the same endpoints are the same rule.
#[derive(Debug, Clone)]
pub struct RelocationRule {
    from: String,
    to: String,
    separator: String,
}

/// A rule with its prefixes substituted back to canonical dotted form,
/// ready for the rewrite engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalRule {
    pub from: String,
    pub to: String,
}

impl RelocationRule {
    pub fn new(
        from: impl Into<String>,
        to: impl Into<String>,
        separator: impl Into<String>,
    ) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            separator: separator.into(),
        }
    }

    /// Rule with the default separator.
    pub fn of(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self::new(from, to, crate::DEFAULT_SEPARATOR)
    }

    pub fn from_prefix(&self) -> &str {
        &self.from
    }

    pub fn to_prefix(&self) -> &str {
        &self.to
    }

    pub fn separator(&self) -> &str {
        &self.separator
    }

    pub fn canonical(&self) -> CanonicalRule {
        CanonicalRule {
            from: self.from.replace(&self.separator, "."),
            to: self.to.replace(&self.separator, "."),
        }
    }
}

impl PartialEq for RelocationRule {
    fn eq(&self, other: &Self) -> bool {
        self.from == other.from && self.to == other.to
    }
}

impl Eq for RelocationRule {}

impl Hash for RelocationRule {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.from.hash(state);
        self.to.hash(state);
    }
}

impl CanonicalRule {
    /// Prefix in internal slashed form (`org/acme`), as it appears in entry
    /// paths and class references.
    pub fn from_internal(&self) -> String {
        self.from.replace('.', "/")
    }

    pub fn to_internal(&self) -> String {
        self.to.replace('.', "/")
    }
}
