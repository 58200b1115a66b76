//! Schema Registry
//!
//! Append-only store of the versions of one schema family.

use std::collections::BTreeMap;
use tracing::debug;

use crate::error::{Result, VersionError};
use crate::schema::definition::SchemaVersion;
use crate::version::Version;

/// Versions of one schema family
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    family: String,
    schemas: BTreeMap<Version, SchemaVersion>,
}

impl SchemaRegistry {
    pub fn new(family: impl Into<String>) -> Self {
        Self {
            family: family.into(),
            schemas: BTreeMap::new(),
        }
    }

    pub fn family(&self) -> &str {
        &self.family
    }

    /// Register a schema version.
    ///
    /// Existing versions are immutable; re-registering one fails with
    /// [`VersionError::SchemaRegistration`].
    pub fn register(&mut self, schema: SchemaVersion) -> Result<()> {
        if self.schemas.contains_key(&schema.version) {
            return Err(VersionError::SchemaRegistration {
                family: self.family.clone(),
                version: schema.version,
            });
        }
        debug!(
            family = %self.family,
            version = %schema.version,
            checksum = %schema.checksum,
            "registered schema"
        );
        self.schemas.insert(schema.version.clone(), schema);
        Ok(())
    }

    pub fn get(&self, version: &Version) -> Option<&SchemaVersion> {
        self.schemas.get(version)
    }

    pub fn contains(&self, version: &Version) -> bool {
        self.schemas.contains_key(version)
    }

    /// All versions, ascending
    pub fn versions(&self) -> Vec<&Version> {
        self.schemas.keys().collect()
    }

    pub fn latest(&self) -> Option<&SchemaVersion> {
        self.schemas.values().next_back()
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    /// Versions whose stored definition no longer matches its checksum
    pub fn corrupted(&self) -> Vec<&Version> {
        self.schemas
            .values()
            .filter(|schema| !schema.verify_checksum())
            .map(|schema| &schema.version)
            .collect()
    }
}
