//! API version tracking and deprecation enforcement
//!
//! A [`DeprecationRegistry`] records the current version of each named API
//! and deprecation metadata for fully-qualified elements. Call sites wrap a
//! target in [`Deprecated`] to enforce that metadata:
//!
//! - `error`: the call is refused and the target never runs
//! - `warning`: the call proceeds and one warning is reported per invocation
//! - `info`: the call proceeds and an informational entry is reported

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard};
use tracing::{debug, info, warn};

use crate::error::{Result, VersionError};
use crate::version::Version;

/// Severity of a deprecation
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DeprecationLevel {
    Info,
    #[default]
    Warning,
    Error,
}

impl fmt::Display for DeprecationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeprecationLevel::Info => write!(f, "info"),
            DeprecationLevel::Warning => write!(f, "warning"),
            DeprecationLevel::Error => write!(f, "error"),
        }
    }
}

/// Deprecation metadata for one element
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeprecationInfo {
    pub message: String,
    /// Version the element was deprecated in
    pub version: Version,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub removal_version: Option<Version>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alternative: Option<String>,
    #[serde(default)]
    pub level: DeprecationLevel,
}

impl DeprecationInfo {
    pub fn new(message: impl Into<String>, version: Version) -> Self {
        Self {
            message: message.into(),
            version,
            removal_version: None,
            alternative: None,
            level: DeprecationLevel::default(),
        }
    }

    pub fn removed_in(mut self, version: Version) -> Self {
        self.removal_version = Some(version);
        self
    }

    pub fn alternative(mut self, alternative: impl Into<String>) -> Self {
        self.alternative = Some(alternative.into());
        self
    }

    pub fn level(mut self, level: DeprecationLevel) -> Self {
        self.level = level;
        self
    }

    /// Full notice text for `element`
    pub fn notice(&self, element: &str) -> String {
        let mut text = format!(
            "'{}' is deprecated since {}: {}",
            element, self.version, self.message
        );
        if let Some(removal) = &self.removal_version {
            text.push_str(&format!(". It will be removed in {}", removal));
        }
        if let Some(alternative) = &self.alternative {
            text.push_str(&format!(". Use '{}' instead", alternative));
        }
        text
    }
}

/// Receives deprecation notices for calls that are allowed to proceed
pub trait DeprecationReporter: Send + Sync {
    fn report(&self, element: &str, info: &DeprecationInfo);
}

/// Reports notices as `tracing` events
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl DeprecationReporter for TracingReporter {
    fn report(&self, element: &str, info: &DeprecationInfo) {
        match info.level {
            DeprecationLevel::Info => info!(element, "{}", info.notice(element)),
            DeprecationLevel::Warning | DeprecationLevel::Error => {
                warn!(element, "{}", info.notice(element))
            }
        }
    }
}

/// One entry of an API's version history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionRecord {
    pub version: Version,
    pub registered_at: DateTime<Utc>,
}

/// Deprecation metadata shared between a registry and its wrappers
type DeprecationTable = Arc<RwLock<HashMap<String, DeprecationInfo>>>;

/// A call target bound to the deprecation entry of `element`.
///
/// The entry is looked up on every call, so re-registering the element (for
/// example raising it to `error`) takes effect on wrappers that already exist.
pub struct Deprecated<F> {
    element: String,
    table: DeprecationTable,
    reporter: Arc<dyn DeprecationReporter>,
    target: F,
}

impl<F> Deprecated<F> {
    fn new(
        element: impl Into<String>,
        table: DeprecationTable,
        reporter: Arc<dyn DeprecationReporter>,
        target: F,
    ) -> Self {
        Self {
            element: element.into(),
            table,
            reporter,
            target,
        }
    }

    pub fn element(&self) -> &str {
        &self.element
    }

    /// The deprecation entry currently registered for the element
    pub fn info(&self) -> Option<DeprecationInfo> {
        read_table(&self.table).get(&self.element).cloned()
    }

    /// Invoke the target under the deprecation policy
    pub fn call<A, R>(&self, args: A) -> Result<R>
    where
        F: Fn(A) -> R,
    {
        if let Some(info) = self.info() {
            if info.level == DeprecationLevel::Error {
                return Err(VersionError::DeprecatedCall {
                    element: self.element.clone(),
                    since: info.version.clone(),
                    message: info.notice(&self.element),
                });
            }
            self.reporter.report(&self.element, &info);
        }
        Ok((self.target)(args))
    }
}

impl<F> fmt::Debug for Deprecated<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Deprecated")
            .field("element", &self.element)
            .field("info", &self.info())
            .finish_non_exhaustive()
    }
}

fn read_table(table: &DeprecationTable) -> RwLockReadGuard<'_, HashMap<String, DeprecationInfo>> {
    table.read().unwrap_or_else(PoisonError::into_inner)
}

/// Current API versions and deprecation metadata
pub struct DeprecationRegistry {
    versions: HashMap<String, Version>,
    history: HashMap<String, Vec<VersionRecord>>,
    deprecations: DeprecationTable,
    reporter: Arc<dyn DeprecationReporter>,
}

impl Default for DeprecationRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl DeprecationRegistry {
    pub fn new() -> Self {
        Self::with_reporter(Arc::new(TracingReporter))
    }

    pub fn with_reporter(reporter: Arc<dyn DeprecationReporter>) -> Self {
        Self {
            versions: HashMap::new(),
            history: HashMap::new(),
            deprecations: DeprecationTable::default(),
            reporter,
        }
    }

    /// Set (or overwrite) the current version of an API and append it to history
    pub fn register_version(&mut self, api_name: &str, version: Version) {
        debug!(api = api_name, %version, "registered api version");
        self.history
            .entry(api_name.to_string())
            .or_default()
            .push(VersionRecord {
                version: version.clone(),
                registered_at: Utc::now(),
            });
        self.versions.insert(api_name.to_string(), version);
    }

    pub fn get_version(&self, api_name: &str) -> Option<&Version> {
        self.versions.get(api_name)
    }

    /// Every version registered for an API, oldest registration first
    pub fn history(&self, api_name: &str) -> &[VersionRecord] {
        self.history.get(api_name).map(Vec::as_slice).unwrap_or_default()
    }

    /// Attach deprecation metadata to a fully-qualified element name
    pub fn register_deprecation(&mut self, element: &str, info: DeprecationInfo) {
        debug!(element, level = %info.level, "registered deprecation");
        self.deprecations
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(element.to_string(), info);
    }

    pub fn deprecation(&self, element: &str) -> Option<DeprecationInfo> {
        read_table(&self.deprecations).get(element).cloned()
    }

    pub fn is_deprecated(&self, element: &str) -> bool {
        read_table(&self.deprecations).contains_key(element)
    }

    pub fn reporter(&self) -> Arc<dyn DeprecationReporter> {
        Arc::clone(&self.reporter)
    }

    /// Register `info` for `element` and wrap `target` with the element's entry
    pub fn deprecate<F>(
        &mut self,
        element: &str,
        info: DeprecationInfo,
        target: F,
    ) -> Deprecated<F> {
        self.register_deprecation(element, info);
        Deprecated::new(element, Arc::clone(&self.deprecations), self.reporter(), target)
    }

    /// Require the registered version of `api_name` to lie within `[min, max]`.
    ///
    /// An API that was never registered fails: compatibility cannot be
    /// assumed without a version.
    pub fn version_required(
        &self,
        api_name: &str,
        min: Option<&Version>,
        max: Option<&Version>,
    ) -> Result<&Version> {
        let current = self.get_version(api_name).ok_or_else(|| {
            VersionError::constraint(api_name, "no version registered for this api")
        })?;

        if let Some(min) = min {
            if current.cmp_precedence(min) == Ordering::Less {
                return Err(VersionError::constraint(
                    api_name,
                    format!("version {} is below the required minimum {}", current, min),
                ));
            }
        }
        if let Some(max) = max {
            if current.cmp_precedence(max) == Ordering::Greater {
                return Err(VersionError::constraint(
                    api_name,
                    format!("version {} is above the supported maximum {}", current, max),
                ));
            }
        }
        Ok(current)
    }

    /// Run `call` with the current version only when it satisfies the bounds
    pub fn with_version_required<R>(
        &self,
        api_name: &str,
        min: Option<&Version>,
        max: Option<&Version>,
        call: impl FnOnce(&Version) -> R,
    ) -> Result<R> {
        let current = self.version_required(api_name, min, max)?;
        Ok(call(current))
    }
}
