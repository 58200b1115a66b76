//! Shared versioning context
//!
//! [`VersionContext`] owns every registry for one process (or one test) and
//! is handed to consumers behind an `Arc`. Reads take a shared lock, so the
//! read-mostly traffic after startup does not contend; registration takes the
//! write lock and is serialized.

use serde_json::Value;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{info, warn};

use crate::compatibility::{Compatibility, CompatibilityMatrix, CompatibilityRule, RuleViolation};
use crate::config::VersioningConfig;
use crate::deprecation::{Deprecated, DeprecationInfo, DeprecationRegistry};
use crate::error::{Result, VersionError};
use crate::migration::{MigrationRegistry, MigrationStep};
use crate::schema::{JsonSchemaValidator, Migrator, SchemaEvolution, SchemaVersion};
use crate::version::Version;

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

/// Migration, compatibility, schema and deprecation state for one application
pub struct VersionContext {
    config: VersioningConfig,
    migrations: RwLock<MigrationRegistry>,
    matrix: RwLock<CompatibilityMatrix>,
    schemas: RwLock<HashMap<String, SchemaEvolution>>,
    deprecations: RwLock<DeprecationRegistry>,
}

impl Default for VersionContext {
    fn default() -> Self {
        Self::from_config(VersioningConfig::default())
    }
}

impl VersionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: VersioningConfig) -> Self {
        Self::with_deprecations(config, DeprecationRegistry::new())
    }

    /// Build a context around a pre-configured deprecation registry
    pub fn with_deprecations(config: VersioningConfig, deprecations: DeprecationRegistry) -> Self {
        Self {
            config,
            migrations: RwLock::new(MigrationRegistry::new()),
            matrix: RwLock::new(CompatibilityMatrix::new()),
            schemas: RwLock::new(HashMap::new()),
            deprecations: RwLock::new(deprecations),
        }
    }

    pub fn config(&self) -> &VersioningConfig {
        &self.config
    }

    // Migrations

    pub fn register_migration(&self, step: MigrationStep) -> Result<()> {
        write(&self.migrations).register(step)
    }

    /// Resolve a path under the read lock, then run it with the lock released
    pub fn migrate(
        &self,
        data_type: &str,
        data: &Value,
        from: &Version,
        to: &Version,
    ) -> Result<Value> {
        let path = read(&self.migrations).resolve(data_type, from, to)?;
        path.apply(data.clone())
    }

    /// Run `f` against the migration registry under the read lock.
    ///
    /// `f` must not register migrations on this context.
    pub fn with_migrations<R>(&self, f: impl FnOnce(&MigrationRegistry) -> R) -> R {
        f(&*read(&self.migrations))
    }

    // API versions and deprecations

    pub fn register_version(&self, api_name: &str, version: Version) {
        write(&self.deprecations).register_version(api_name, version);
    }

    pub fn get_version(&self, api_name: &str) -> Option<Version> {
        read(&self.deprecations).get_version(api_name).cloned()
    }

    pub fn register_deprecation(&self, element: &str, info: DeprecationInfo) {
        write(&self.deprecations).register_deprecation(element, info);
    }

    pub fn deprecation(&self, element: &str) -> Option<DeprecationInfo> {
        read(&self.deprecations).deprecation(element)
    }

    pub fn deprecate<F>(&self, element: &str, info: DeprecationInfo, target: F) -> Deprecated<F> {
        write(&self.deprecations).deprecate(element, info, target)
    }

    pub fn version_required(
        &self,
        api_name: &str,
        min: Option<&Version>,
        max: Option<&Version>,
    ) -> Result<Version> {
        read(&self.deprecations)
            .version_required(api_name, min, max)
            .cloned()
    }

    // Compatibility

    pub fn set_compatibility(
        &self,
        component1: &str,
        version1: &Version,
        component2: &str,
        version2: &Version,
        compatible: bool,
    ) -> Result<()> {
        write(&self.matrix).set_compatibility(
            component1, version1, component2, version2, compatible,
        )
    }

    pub fn is_compatible(
        &self,
        component1: &str,
        version1: &Version,
        component2: &str,
        version2: &Version,
    ) -> Compatibility {
        read(&self.matrix).is_compatible(component1, version1, component2, version2)
    }

    pub fn add_compatibility_rule(&self, component: &str, rule: CompatibilityRule) -> Result<()> {
        write(&self.matrix).add_compatibility_rule(component, rule)
    }

    pub fn check_compatibility_rules(
        &self,
        component: &str,
        version: &Version,
    ) -> Vec<RuleViolation> {
        read(&self.matrix).check_compatibility_rules(component, version)
    }

    pub fn with_matrix<R>(&self, f: impl FnOnce(&CompatibilityMatrix) -> R) -> R {
        f(&*read(&self.matrix))
    }

    // Schemas

    /// Register a schema version, creating the family on first use
    pub fn register_schema(&self, family: &str, schema: SchemaVersion) -> Result<()> {
        let mut schemas = write(&self.schemas);
        schemas
            .entry(family.to_string())
            .or_insert_with(|| self.new_family(family))
            .register_schema(schema)
    }

    pub fn add_migrator(&self, family: &str, migrator: impl Migrator + 'static) {
        let mut schemas = write(&self.schemas);
        schemas
            .entry(family.to_string())
            .or_insert_with(|| self.new_family(family))
            .add_migrator(migrator);
    }

    /// Evolve a record of `family` from one schema version to another.
    ///
    /// The schema read lock is held while the migrator and validator run, so a
    /// migrator must not register schemas or migrators on this context.
    pub fn evolve(
        &self,
        family: &str,
        data: &Value,
        from: &Version,
        to: &Version,
    ) -> Result<Value> {
        let schemas = read(&self.schemas);
        let evolution = schemas.get(family).ok_or_else(|| VersionError::Migration {
            subject: family.to_string(),
            from: from.clone(),
            to: to.clone(),
            reason: "schema family is not registered".to_string(),
            violations: Vec::new(),
            cause: None,
        })?;
        evolution.migrate(data, from, to)
    }

    pub fn schema_families(&self) -> Vec<String> {
        let mut families: Vec<String> = read(&self.schemas).keys().cloned().collect();
        families.sort();
        families
    }

    fn new_family(&self, family: &str) -> SchemaEvolution {
        let evolution =
            SchemaEvolution::new(family).with_options(self.config.schema.evolution_options());
        if self.config.schema.json_schema_validation {
            evolution.with_validator(JsonSchemaValidator::new())
        } else {
            evolution
        }
    }

    /// Check every registry for configuration defects.
    ///
    /// Reports migration graph branches and gaps, matrix asymmetry and rule
    /// violations, and schema versions whose checksum no longer matches.
    /// With `migration.fail_on_graph_issues` set, any finding is an error.
    pub fn audit(&self) -> Result<Vec<String>> {
        let mut issues: Vec<String> = read(&self.migrations)
            .audit()
            .iter()
            .map(ToString::to_string)
            .collect();

        issues.extend(read(&self.matrix).validate().issues());

        for (family, evolution) in read(&self.schemas).iter() {
            for version in evolution.registry().corrupted() {
                issues.push(format!("schema {} version {} fails its checksum", family, version));
            }
        }

        for issue in &issues {
            warn!(%issue, "versioning audit finding");
        }

        if !issues.is_empty() && self.config.migration.fail_on_graph_issues {
            return Err(VersionError::Audit { issues });
        }
        info!(findings = issues.len(), "versioning audit complete");
        Ok(issues)
    }
}
