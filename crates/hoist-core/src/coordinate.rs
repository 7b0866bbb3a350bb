//! Artifact coordinates and their validation.
//!
//! A coordinate names one external artifact as (group, name, version).
//! Declarations never contain literal `.` or `/` in the group/name — a
//! caller-chosen separator stands in for them and is substituted back to the
//! canonical form here, so build tooling that rewrites package-name literals
//! cannot corrupt a declaration.

use std::fmt;

/// File extension of packaged artifacts.
pub const ARCHIVE_EXTENSION: &str = "jar";

/// Rejected coordinate input. Each check has its own variant so the offending
/// raw input surfaces with a distinct message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("separator can't be empty or contain '.' or '/'; separator = '{0}'")]
    Separator(String),
    #[error("group can't be empty or contain '.' or '/'; use the separator instead; group = '{0}'")]
    RawGroup(String),
    #[error("name can't be empty or contain '.' or '/'; use the separator instead; name = '{0}'")]
    RawName(String),
    #[error("version can't be empty; version = '{0}'")]
    EmptyVersion(String),
    #[error("group contains invalid characters; group = '{0}'")]
    GroupPattern(String),
    #[error("name contains invalid characters; name = '{0}'")]
    NamePattern(String),
    #[error("version contains invalid characters; version = '{0}'")]
    VersionPattern(String),
    #[error("compact coordinate must be 'group:name:version'; coordinate = '{0}'")]
    Compact(String),
}

/// Immutable identity of one external artifact. Group is stored in canonical
/// dotted form; equal coordinates always produce equal file names.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArtifactCoordinate {
    group: String,
    name: String,
    version: String,
}

fn has_raw_delimiter(s: &str) -> bool {
    s.contains('.') || s.contains('/')
}

fn matches_pattern(s: &str) -> bool {
    !s.is_empty()
        && s.chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
}

impl ArtifactCoordinate {
    /// Parses and validates a coordinate. `separator` is the declaration's
    /// stand-in for `.`/`/` inside `group` and `name`.
    pub fn parse(
        separator: &str,
        group: &str,
        name: &str,
        version: &str,
    ) -> Result<Self, ValidationError> {
        if separator.is_empty() || has_raw_delimiter(separator) {
            return Err(ValidationError::Separator(separator.to_string()));
        }
        if group.is_empty() || has_raw_delimiter(group) {
            return Err(ValidationError::RawGroup(group.to_string()));
        }
        if name.is_empty() || has_raw_delimiter(name) {
            return Err(ValidationError::RawName(name.to_string()));
        }
        if version.is_empty() {
            return Err(ValidationError::EmptyVersion(version.to_string()));
        }

        let group = group.replace(separator, ".");
        let name = name.replace(separator, ".");

        if !matches_pattern(&group) {
            return Err(ValidationError::GroupPattern(group));
        }
        if !matches_pattern(&name) {
            return Err(ValidationError::NamePattern(name));
        }
        if !matches_pattern(version) {
            return Err(ValidationError::VersionPattern(version.to_string()));
        }

        Ok(Self {
            group,
            name,
            version: version.to_string(),
        })
    }

    /// Parses the compact `group:name:version` form.
    pub fn parse_compact(separator: &str, compact: &str) -> Result<Self, ValidationError> {
        let parts: Vec<&str> = compact.split(':').collect();
        if parts.len() != 3 {
            return Err(ValidationError::Compact(compact.to_string()));
        }
        Self::parse(separator, parts[0], parts[1], parts[2])
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// `name-version`, the stem every derived file name shares.
    pub fn display_name(&self) -> String {
        format!("{}-{}", self.name, self.version)
    }

    /// Path of the artifact below a repository base URL.
    pub fn remote_path(&self) -> String {
        format!(
            "{}/{}/{}/{}-{}.{}",
            self.group.replace('.', "/"),
            self.name,
            self.version,
            self.name,
            self.version,
            ARCHIVE_EXTENSION
        )
    }

    /// Full download URL against `base`, appending `/` to the base if missing.
    pub fn download_url(&self, base: &str) -> String {
        let slash = if base.ends_with('/') { "" } else { "/" };
        format!("{}{}{}", base, slash, self.remote_path())
    }

    /// Cache file name of the artifact as fetched.
    pub fn file_name(&self) -> String {
        format!("{}.{}", self.display_name(), ARCHIVE_EXTENSION)
    }

    /// Cache file name after namespace relocation.
    pub fn relocated_file_name(&self) -> String {
        format!("{}-relocated.{}", self.display_name(), ARCHIVE_EXTENSION)
    }
}

impl fmt::Display for ArtifactCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.group, self.name, self.version)
    }
}
