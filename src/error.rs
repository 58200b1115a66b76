//! Error types for versioning, migration and compatibility checks

use thiserror::Error;

use crate::version::Version;

/// Result type for versioning operations
pub type Result<T> = std::result::Result<T, VersionError>;

/// Versioning errors
///
/// Every variant carries the context needed to render an actionable message.
/// Nothing in this crate substitutes a default for a failed check.
#[derive(Error, Debug)]
pub enum VersionError {
    #[error("Invalid version '{input}': {reason}")]
    InvalidVersion { input: String, reason: String },

    #[error("Version mismatch for {subject}: expected {expected}, found {actual}")]
    VersionMismatch {
        subject: String,
        expected: Version,
        actual: Version,
    },

    #[error("Version constraint failed for {subject}: {message}")]
    VersionConstraint { subject: String, message: String },

    #[error("No version among [{}] satisfies [{constraints}]", format_versions(.candidates))]
    VersionResolution {
        constraints: String,
        candidates: Vec<Version>,
    },

    #[error(
        "No migration path for '{data_type}' from {from} to {to}: {reason} (partial chain: {})",
        format_chain(.partial)
    )]
    NoMigrationPath {
        data_type: String,
        from: Version,
        to: Version,
        reason: String,
        partial: Vec<(Version, Version)>,
    },

    #[error("Cannot register migration for '{data_type}' {from} -> {to}: {reason}")]
    MigrationRegistration {
        data_type: String,
        from: Version,
        to: Version,
        reason: String,
    },

    #[error(
        "Migration of '{subject}' from {from} to {to} failed: {reason}{}",
        format_violations(.violations)
    )]
    Migration {
        subject: String,
        from: Version,
        to: Version,
        reason: String,
        violations: Vec<String>,
        #[source]
        cause: Option<anyhow::Error>,
    },

    #[error("Schema already registered: {family} version {version}")]
    SchemaRegistration { family: String, version: Version },

    #[error("Invalid component name '{0}': must be non-empty and must not contain '@' or '|'")]
    InvalidComponent(String),

    #[error("'{element}' is deprecated since {since} and can no longer be called: {message}")]
    DeprecatedCall {
        element: String,
        since: Version,
        message: String,
    },

    #[error("Invalid compatibility snapshot: {0}")]
    InvalidSnapshot(String),

    #[error("Startup audit failed with {} issue(s): {}", .issues.len(), .issues.join("; "))]
    Audit { issues: Vec<String> },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl VersionError {
    pub(crate) fn invalid_version(input: &str, reason: impl Into<String>) -> Self {
        Self::InvalidVersion {
            input: input.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn constraint(subject: impl Into<String>, message: impl Into<String>) -> Self {
        Self::VersionConstraint {
            subject: subject.into(),
            message: message.into(),
        }
    }
}

fn format_chain(chain: &[(Version, Version)]) -> String {
    if chain.is_empty() {
        return "none".to_string();
    }
    chain
        .iter()
        .map(|(from, to)| format!("{} -> {}", from, to))
        .collect::<Vec<_>>()
        .join(", ")
}

fn format_versions(versions: &[Version]) -> String {
    versions
        .iter()
        .map(Version::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

fn format_violations(violations: &[String]) -> String {
    if violations.is_empty() {
        String::new()
    } else {
        format!(" [{}]", violations.join("; "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_path_message_lists_partial_chain() {
        let err = VersionError::NoMigrationPath {
            data_type: "memory_entry".to_string(),
            from: Version::new(1, 0, 0),
            to: Version::new(3, 0, 0),
            reason: "no step leaves 2.0.0".to_string(),
            partial: vec![(Version::new(1, 0, 0), Version::new(2, 0, 0))],
        };
        let msg = err.to_string();
        assert!(msg.contains("memory_entry"));
        assert!(msg.contains("1.0.0 -> 2.0.0"));
        assert!(msg.contains("no step leaves 2.0.0"));
    }

    #[test]
    fn test_migration_message_embeds_violations() {
        let err = VersionError::Migration {
            subject: "user".to_string(),
            from: Version::new(1, 0, 0),
            to: Version::new(2, 0, 0),
            reason: "input failed validation against 1.0.0".to_string(),
            violations: vec!["/name: required".to_string()],
            cause: None,
        };
        assert!(err.to_string().contains("[/name: required]"));
    }
}
