//! Compatibility rules attached to components

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::version::Version;

/// Custom rule predicate over `(component, version)`
pub type Predicate = Arc<dyn Fn(&str, &Version) -> bool + Send + Sync>;

/// A rule evaluated against one version of the component it is attached to
#[derive(Clone)]
pub enum CompatibilityRule {
    /// Passes iff `min <= version <= max`
    VersionRange { min: Version, max: Version },
    /// Passes iff the version is recorded as compatible with `component@version`
    Dependency { component: String, version: Version },
    /// Delegates to a caller-supplied predicate; never serialized
    Custom { name: String, predicate: Predicate },
}

impl CompatibilityRule {
    pub fn version_range(min: Version, max: Version) -> Self {
        Self::VersionRange { min, max }
    }

    pub fn dependency(component: impl Into<String>, version: Version) -> Self {
        Self::Dependency {
            component: component.into(),
            version,
        }
    }

    pub fn custom<F>(name: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&str, &Version) -> bool + Send + Sync + 'static,
    {
        Self::Custom {
            name: name.into(),
            predicate: Arc::new(predicate),
        }
    }

    /// Serializable form, `None` for custom rules
    pub fn to_spec(&self) -> Option<RuleSpec> {
        match self {
            Self::VersionRange { min, max } => Some(RuleSpec::VersionRange {
                min: min.clone(),
                max: max.clone(),
            }),
            Self::Dependency { component, version } => Some(RuleSpec::Dependency {
                component: component.clone(),
                version: version.clone(),
            }),
            Self::Custom { .. } => None,
        }
    }
}

impl fmt::Display for CompatibilityRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::VersionRange { min, max } => write!(f, "version_range({}..={})", min, max),
            Self::Dependency { component, version } => {
                write!(f, "dependency({}@{})", component, version)
            }
            Self::Custom { name, .. } => write!(f, "custom({})", name),
        }
    }
}

impl fmt::Debug for CompatibilityRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CompatibilityRule::{}", self)
    }
}

/// Persisted rule form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RuleSpec {
    VersionRange { min: Version, max: Version },
    Dependency { component: String, version: Version },
}

impl From<RuleSpec> for CompatibilityRule {
    fn from(spec: RuleSpec) -> Self {
        match spec {
            RuleSpec::VersionRange { min, max } => Self::VersionRange { min, max },
            RuleSpec::Dependency { component, version } => Self::Dependency { component, version },
        }
    }
}

/// A failed rule check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleViolation {
    pub component: String,
    pub version: Version,
    pub rule: String,
    pub reason: String,
}

impl fmt::Display for RuleViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{} violates {}: {}", self.component, self.version, self.rule, self.reason)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_spec_json_shape() {
        let spec = RuleSpec::VersionRange {
            min: Version::new(1, 0, 0),
            max: Version::new(1, 9, 0),
        };
        let json = serde_json::to_value(&spec).unwrap();
        assert_eq!(json["type"], "version_range");
        assert_eq!(json["min"], "1.0.0");
    }

    #[test]
    fn test_custom_rules_are_not_serializable() {
        let rule = CompatibilityRule::custom("even-minor", |_, v| v.minor() % 2 == 0);
        assert!(rule.to_spec().is_none());
        assert_eq!(rule.to_string(), "custom(even-minor)");
    }
}
