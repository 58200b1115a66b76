//! Pairwise compatibility facts and declarative rules
//!
//! The [`CompatibilityMatrix`] stores symmetric facts between
//! `(component, version)` pairs and evaluates [`CompatibilityRule`]s attached
//! to components. Lookups are tri-state: a pair nobody evaluated is
//! [`Compatibility::Unknown`], never silently incompatible.

pub mod matrix;
pub mod rule;

pub use matrix::{CompatibilityMatrix, MatrixReport, MatrixSnapshot};
pub use rule::{CompatibilityRule, Predicate, RuleSpec, RuleViolation};

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Result, VersionError};
use crate::version::Version;

/// Outcome of a compatibility lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Compatibility {
    Compatible,
    Incompatible,
    Unknown,
}

impl Compatibility {
    /// True only for a recorded positive fact
    pub fn is_compatible(self) -> bool {
        self == Compatibility::Compatible
    }

    pub fn is_known(self) -> bool {
        self != Compatibility::Unknown
    }

    pub fn as_bool(self) -> Option<bool> {
        match self {
            Compatibility::Compatible => Some(true),
            Compatibility::Incompatible => Some(false),
            Compatibility::Unknown => None,
        }
    }
}

impl From<bool> for Compatibility {
    fn from(value: bool) -> Self {
        if value {
            Compatibility::Compatible
        } else {
            Compatibility::Incompatible
        }
    }
}

impl From<Option<bool>> for Compatibility {
    fn from(value: Option<bool>) -> Self {
        value.map_or(Compatibility::Unknown, Compatibility::from)
    }
}

impl fmt::Display for Compatibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Compatibility::Compatible => write!(f, "compatible"),
            Compatibility::Incompatible => write!(f, "incompatible"),
            Compatibility::Unknown => write!(f, "unknown"),
        }
    }
}

/// A versioned component identifier, rendered as `component@version`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentVersion {
    pub component: String,
    pub version: Version,
}

impl ComponentVersion {
    pub fn new(component: &str, version: &Version) -> Result<Self> {
        validate_component(component)?;
        Ok(Self {
            component: component.to_string(),
            version: version.clone(),
        })
    }

    /// Parse the `component@version` form
    pub fn parse(key: &str) -> Result<Self> {
        let (component, version) = key
            .rsplit_once('@')
            .ok_or_else(|| VersionError::InvalidSnapshot(format!("missing '@' in key '{}'", key)))?;
        Self::new(component, &Version::parse(version)?)
    }
}

impl fmt::Display for ComponentVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.component, self.version)
    }
}

pub(crate) fn validate_component(component: &str) -> Result<()> {
    if component.trim().is_empty() || component.contains('@') || component.contains('|') {
        return Err(VersionError::InvalidComponent(component.to_string()));
    }
    Ok(())
}
