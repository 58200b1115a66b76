//! Version identifiers
//!
//! A [`Version`] is parsed from the strict `major.minor.patch[-prerelease][+build]`
//! grammar and is immutable once built. Precedence compares the numeric triple,
//! then puts a prerelease before the plain release; two prerelease tags compare
//! as plain strings. Build metadata never changes precedence.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use crate::error::{Result, VersionError};

const VERSION_PATTERN: &str = concat!(
    r"^(0|[1-9][0-9]*)\.(0|[1-9][0-9]*)\.(0|[1-9][0-9]*)",
    r"(?:-([0-9A-Za-z-]+(?:\.[0-9A-Za-z-]+)*))?",
    r"(?:\+([0-9A-Za-z-]+(?:\.[0-9A-Za-z-]+)*))?$",
);

const IDENTIFIERS_PATTERN: &str = r"^[0-9A-Za-z-]+(?:\.[0-9A-Za-z-]+)*$";

fn version_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(VERSION_PATTERN).expect("version pattern compiles"))
}

fn identifiers_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(IDENTIFIERS_PATTERN).expect("identifier pattern compiles"))
}

/// A semantic version identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Version {
    major: u64,
    minor: u64,
    patch: u64,
    prerelease: Option<String>,
    build: Option<String>,
}

impl Version {
    /// Create a release version with no prerelease or build tag
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
            prerelease: None,
            build: None,
        }
    }

    /// Parse a version string.
    ///
    /// Surrounding whitespace is trimmed; nothing else is normalized, so a
    /// leading `v`, missing components or leading zeros are all rejected.
    pub fn parse(text: &str) -> Result<Self> {
        let trimmed = text.trim();
        let caps = version_regex().captures(trimmed).ok_or_else(|| {
            VersionError::invalid_version(text, "expected major.minor.patch[-prerelease][+build]")
        })?;

        let number = |index: usize, name: &str| -> Result<u64> {
            caps[index]
                .parse::<u64>()
                .map_err(|e| {
                    VersionError::invalid_version(text, format!("{} component: {}", name, e))
                })
        };

        Ok(Self {
            major: number(1, "major")?,
            minor: number(2, "minor")?,
            patch: number(3, "patch")?,
            prerelease: caps.get(4).map(|m| m.as_str().to_string()),
            build: caps.get(5).map(|m| m.as_str().to_string()),
        })
    }

    /// Attach a prerelease tag (e.g. `alpha.1`)
    pub fn with_prerelease(mut self, tag: &str) -> Result<Self> {
        if !identifiers_regex().is_match(tag) {
            return Err(VersionError::invalid_version(tag, "malformed prerelease tag"));
        }
        self.prerelease = Some(tag.to_string());
        Ok(self)
    }

    /// Attach build metadata (e.g. `sha.5114f85`)
    pub fn with_build(mut self, build: &str) -> Result<Self> {
        if !identifiers_regex().is_match(build) {
            return Err(VersionError::invalid_version(build, "malformed build metadata"));
        }
        self.build = Some(build.to_string());
        Ok(self)
    }

    pub fn major(&self) -> u64 {
        self.major
    }

    pub fn minor(&self) -> u64 {
        self.minor
    }

    pub fn patch(&self) -> u64 {
        self.patch
    }

    pub fn prerelease(&self) -> Option<&str> {
        self.prerelease.as_deref()
    }

    pub fn build(&self) -> Option<&str> {
        self.build.as_deref()
    }

    pub fn is_prerelease(&self) -> bool {
        self.prerelease.is_some()
    }

    /// Compare by precedence only, ignoring build metadata.
    ///
    /// Range checks and migration chains use this; `Ord` additionally breaks
    /// ties on build metadata so that it agrees with `Eq`.
    pub fn cmp_precedence(&self, other: &Self) -> Ordering {
        (self.major, self.minor, self.patch)
            .cmp(&(other.major, other.minor, other.patch))
            .then_with(|| match (&self.prerelease, &other.prerelease) {
                (None, None) => Ordering::Equal,
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (Some(a), Some(b)) => a.cmp(b),
            })
    }

    /// Equal precedence, i.e. equal once build metadata is ignored
    pub fn same_precedence(&self, other: &Self) -> bool {
        self.cmp_precedence(other) == Ordering::Equal
    }

    /// This version with its build metadata removed
    pub fn without_build(&self) -> Self {
        Self {
            build: None,
            ..self.clone()
        }
    }

    /// Default compatibility: same major version
    pub fn is_compatible_with(&self, other: &Version) -> bool {
        self.major == other.major
    }

    /// Check if this is a major version bump from another version
    pub fn is_major_bump_from(&self, other: &Version) -> bool {
        self.major > other.major
    }

    /// Check if this is a minor version bump from another version
    pub fn is_minor_bump_from(&self, other: &Version) -> bool {
        self.major == other.major && self.minor > other.minor
    }

    /// Check if this is a patch version bump from another version
    pub fn is_patch_bump_from(&self, other: &Version) -> bool {
        self.major == other.major && self.minor == other.minor && self.patch > other.patch
    }

    /// Next major release; fails when `major` is already `u64::MAX`
    pub fn bump_major(&self) -> Result<Self> {
        let major = self.bumped(self.major, "major")?;
        Ok(Self::new(major, 0, 0))
    }

    pub fn bump_minor(&self) -> Result<Self> {
        let minor = self.bumped(self.minor, "minor")?;
        Ok(Self::new(self.major, minor, 0))
    }

    pub fn bump_patch(&self) -> Result<Self> {
        let patch = self.bumped(self.patch, "patch")?;
        Ok(Self::new(self.major, self.minor, patch))
    }

    fn bumped(&self, component: u64, name: &str) -> Result<u64> {
        component.checked_add(1).ok_or_else(|| {
            let reason = format!("{} component overflows", name);
            VersionError::invalid_version(&self.to_string(), reason)
        })
    }
}

/// Parse a version string; see [`Version::parse`]
pub fn parse_version(text: &str) -> Result<Version> {
    Version::parse(text)
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if let Some(pre) = &self.prerelease {
            write!(f, "-{}", pre)?;
        }
        if let Some(build) = &self.build {
            write!(f, "+{}", build)?;
        }
        Ok(())
    }
}

impl FromStr for Version {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Version {
    type Error = VersionError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<Version> for String {
    fn from(version: Version) -> Self {
        version.to_string()
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.cmp_precedence(other)
            .then_with(|| self.build.cmp(&other.build))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    #[test]
    fn test_version_parsing() {
        let version = v("1.2.3");
        assert_eq!((version.major(), version.minor(), version.patch()), (1, 2, 3));
        assert_eq!(version.prerelease(), None);
        assert_eq!(version.build(), None);

        let version = v("3.1.4-beta.2+exp.sha.5114f85");
        assert_eq!(version.prerelease(), Some("beta.2"));
        assert_eq!(version.build(), Some("exp.sha.5114f85"));
        assert_eq!(version.to_string(), "3.1.4-beta.2+exp.sha.5114f85");
    }

    #[test]
    fn test_parse_trims_whitespace() {
        assert_eq!(v("  2.0.0\n"), Version::new(2, 0, 0));
    }

    #[test]
    fn test_rejects_malformed_versions() {
        for bad in [
            "", "1", "1.2", "1.2.3.4", "v1.2.3", "01.2.3", "1.2.3-", "1.2.3+", "1.2.3-al pha",
            "a.b.c", "1..3", "-1.2.3", "1.2.3-alpha..1", "99999999999999999999.0.0",
        ] {
            let err = Version::parse(bad).unwrap_err();
            assert!(matches!(err, VersionError::InvalidVersion { .. }), "{bad}");
        }
    }

    #[test]
    fn test_prerelease_sorts_before_release() {
        assert!(v("1.2.3-alpha") < v("1.2.3"));
        assert!(!(v("1.2.3") < v("1.2.3-alpha")));
        assert!(v("1.2.3-alpha") < v("1.2.3-beta"));
        assert!(v("1.2.2") < v("1.2.3-alpha"));
    }

    #[test]
    fn test_build_metadata_ignored_by_precedence() {
        let a = v("1.0.0+build.1");
        let b = v("1.0.0+build.2");
        assert_ne!(a, b);
        assert_eq!(a.cmp_precedence(&b), Ordering::Equal);
        assert_eq!(a.cmp_precedence(&v("1.0.0")), Ordering::Equal);
    }

    #[test]
    fn test_default_compatibility_is_same_major() {
        assert!(v("1.2.0").is_compatible_with(&v("1.9.3")));
        assert!(!v("1.2.0").is_compatible_with(&v("2.0.0")));
    }

    #[test]
    fn test_version_bumps() {
        let version = v("1.2.3-rc.1");
        assert_eq!(version.bump_major().unwrap().to_string(), "2.0.0");
        assert_eq!(version.bump_minor().unwrap().to_string(), "1.3.0");
        assert_eq!(version.bump_patch().unwrap().to_string(), "1.2.4");
        assert!(version.bump_major().unwrap().is_major_bump_from(&version));
        assert!(version.bump_minor().unwrap().is_minor_bump_from(&version));
        assert!(version.bump_patch().unwrap().is_patch_bump_from(&version));
    }

    #[test]
    fn test_bump_overflow_is_an_error() {
        let top = Version::new(u64::MAX, u64::MAX, u64::MAX);
        for result in [top.bump_major(), top.bump_minor(), top.bump_patch()] {
            assert!(matches!(result, Err(VersionError::InvalidVersion { .. })));
        }
        assert_eq!(
            Version::new(u64::MAX, 0, 7).bump_minor().unwrap(),
            Version::new(u64::MAX, 1, 0)
        );
    }

    #[test]
    fn test_builder_validates_identifiers() {
        let version = Version::new(1, 0, 0).with_prerelease("rc.1").unwrap();
        assert_eq!(version.to_string(), "1.0.0-rc.1");
        assert!(Version::new(1, 0, 0).with_build("bad build").is_err());
    }

    #[test]
    fn test_serde_uses_canonical_string() {
        let json = serde_json::to_string(&v("1.4.0-rc.2")).unwrap();
        assert_eq!(json, "\"1.4.0-rc.2\"");
        let back: Version = serde_json::from_str(&json).unwrap();
        assert_eq!(back, v("1.4.0-rc.2"));
        assert!(serde_json::from_str::<Version>("\"1.4\"").is_err());
    }
}
