//! Version constraints and resolution
//!
//! Constraints use the usual operator prefixes: `=`, `>`, `>=`, `<`, `<=`,
//! caret (`^1.2.0`, same major and not lower), tilde (`~1.2.0`, same minor
//! and not lower) and `*` for any version. A bare version means `=`.
//!
//! [`VersionConstraint::matches`] is a pure precedence check, so `<1.5.0`
//! matches `1.5.0-rc.1`. [`resolve_version`] is stricter: a prerelease
//! candidate is only eligible when some constraint names a prerelease of the
//! same `major.minor.patch`, so `>=1.1.0, <1.5.0` never resolves to a
//! release candidate of 1.5.0.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use crate::error::{Result, VersionError};
use crate::version::Version;

fn constraint_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(>=|<=|>|<|=|\^|~)?\s*([^<>=^~\s].*)$").expect("constraint pattern compiles")
    })
}

/// A single constraint on a version
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum VersionConstraint {
    Any,
    Exact(Version),
    Greater(Version),
    GreaterOrEqual(Version),
    Less(Version),
    LessOrEqual(Version),
    Caret(Version),
    Tilde(Version),
}

impl VersionConstraint {
    /// Parse a constraint such as `>=1.2.0` or `^2.0.0`
    pub fn parse(text: &str) -> Result<Self> {
        let trimmed = text.trim();
        if trimmed == "*" {
            return Ok(Self::Any);
        }

        let caps = constraint_regex().captures(trimmed).ok_or_else(|| {
            VersionError::constraint(
                text,
                "expected an operator (=, >, >=, <, <=, ^, ~) followed by a version",
            )
        })?;
        let version = Version::parse(&caps[2])?;

        Ok(match caps.get(1).map(|m| m.as_str()) {
            None | Some("=") => Self::Exact(version),
            Some(">") => Self::Greater(version),
            Some(">=") => Self::GreaterOrEqual(version),
            Some("<") => Self::Less(version),
            Some("<=") => Self::LessOrEqual(version),
            Some("^") => Self::Caret(version),
            Some("~") => Self::Tilde(version),
            Some(op) => {
                return Err(VersionError::constraint(text, format!("unknown operator '{}'", op)))
            }
        })
    }

    /// The version this constraint is anchored on, `None` for `*`
    pub fn bound(&self) -> Option<&Version> {
        match self {
            Self::Any => None,
            Self::Exact(v)
            | Self::Greater(v)
            | Self::GreaterOrEqual(v)
            | Self::Less(v)
            | Self::LessOrEqual(v)
            | Self::Caret(v)
            | Self::Tilde(v) => Some(v),
        }
    }

    /// Check whether a version satisfies this constraint
    pub fn matches(&self, version: &Version) -> bool {
        let cmp = |bound: &Version| version.cmp_precedence(bound);
        match self {
            Self::Any => true,
            Self::Exact(v) => cmp(v) == Ordering::Equal,
            Self::Greater(v) => cmp(v) == Ordering::Greater,
            Self::GreaterOrEqual(v) => cmp(v) != Ordering::Less,
            Self::Less(v) => cmp(v) == Ordering::Less,
            Self::LessOrEqual(v) => cmp(v) != Ordering::Greater,
            Self::Caret(v) => version.major() == v.major() && cmp(v) != Ordering::Less,
            Self::Tilde(v) => {
                version.major() == v.major()
                    && version.minor() == v.minor()
                    && cmp(v) != Ordering::Less
            }
        }
    }
}

impl fmt::Display for VersionConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => write!(f, "*"),
            Self::Exact(v) => write!(f, "={}", v),
            Self::Greater(v) => write!(f, ">{}", v),
            Self::GreaterOrEqual(v) => write!(f, ">={}", v),
            Self::Less(v) => write!(f, "<{}", v),
            Self::LessOrEqual(v) => write!(f, "<={}", v),
            Self::Caret(v) => write!(f, "^{}", v),
            Self::Tilde(v) => write!(f, "~{}", v),
        }
    }
}

impl FromStr for VersionConstraint {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for VersionConstraint {
    type Error = VersionError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<VersionConstraint> for String {
    fn from(constraint: VersionConstraint) -> Self {
        constraint.to_string()
    }
}

/// Pick the highest candidate that satisfies every constraint.
///
/// Fails with [`VersionError::VersionResolution`] when the constraints are
/// jointly unsatisfiable over the candidates.
pub fn resolve_version(
    candidates: &[Version],
    constraints: &[VersionConstraint],
) -> Result<Version> {
    candidates
        .iter()
        .filter(|candidate| prerelease_allowed(candidate, constraints))
        .filter(|candidate| constraints.iter().all(|c| c.matches(candidate)))
        .max_by(|a, b| a.cmp_precedence(b))
        .cloned()
        .ok_or_else(|| VersionError::VersionResolution {
            constraints: constraints
                .iter()
                .map(VersionConstraint::to_string)
                .collect::<Vec<_>>()
                .join(", "),
            candidates: candidates.to_vec(),
        })
}

fn prerelease_allowed(candidate: &Version, constraints: &[VersionConstraint]) -> bool {
    if !candidate.is_prerelease() {
        return true;
    }
    let triple = |v: &Version| (v.major(), v.minor(), v.patch());
    constraints.iter().any(|constraint| {
        constraint
            .bound()
            .is_some_and(|bound| bound.is_prerelease() && triple(bound) == triple(candidate))
    })
}

/// Require `actual` to be compatible (same major) with `expected`
pub fn ensure_compatible(subject: &str, expected: &Version, actual: &Version) -> Result<()> {
    if expected.is_compatible_with(actual) {
        Ok(())
    } else {
        Err(VersionError::VersionMismatch {
            subject: subject.to_string(),
            expected: expected.clone(),
            actual: actual.clone(),
        })
    }
}
