//! Schema evolution: validate, migrate, validate
//!
//! Migration here is single-hop: exactly one registered [`Migrator`] must
//! handle the requested `(from, to)` pair. Multi-hop chains belong to
//! [`MigrationRegistry`](crate::migration::MigrationRegistry).

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{Result, VersionError};
use crate::schema::definition::SchemaVersion;
use crate::schema::migrator::Migrator;
use crate::schema::registry::SchemaRegistry;
use crate::schema::validator::SchemaValidator;
use crate::version::Version;

/// Which sides of a migration are validated when a validator is set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvolutionOptions {
    pub validate_input: bool,
    pub validate_output: bool,
}

impl Default for EvolutionOptions {
    fn default() -> Self {
        Self {
            validate_input: true,
            validate_output: true,
        }
    }
}

/// Schema versions, migrators and an optional validator for one family
pub struct SchemaEvolution {
    registry: SchemaRegistry,
    migrators: Vec<Box<dyn Migrator>>,
    validator: Option<Box<dyn SchemaValidator>>,
    options: EvolutionOptions,
}

impl SchemaEvolution {
    pub fn new(family: impl Into<String>) -> Self {
        Self {
            registry: SchemaRegistry::new(family),
            migrators: Vec::new(),
            validator: None,
            options: EvolutionOptions::default(),
        }
    }

    pub fn with_validator(mut self, validator: impl SchemaValidator + 'static) -> Self {
        self.validator = Some(Box::new(validator));
        self
    }

    pub fn with_options(mut self, options: EvolutionOptions) -> Self {
        self.options = options;
        self
    }

    pub fn family(&self) -> &str {
        self.registry.family()
    }

    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    pub fn options(&self) -> EvolutionOptions {
        self.options
    }

    pub fn has_validator(&self) -> bool {
        self.validator.is_some()
    }

    pub fn register_schema(&mut self, schema: SchemaVersion) -> Result<()> {
        self.registry.register(schema)
    }

    /// Add a migrator; lookup scans migrators in insertion order
    pub fn add_migrator(&mut self, migrator: impl Migrator + 'static) {
        debug!(family = self.family(), migrator = %migrator.name(), "added migrator");
        self.migrators.push(Box::new(migrator));
    }

    /// Migrate `data` from the `from` schema to the `to` schema.
    ///
    /// Input that fails validation is rejected before the migrator runs, and
    /// output that fails validation is never returned.
    pub fn migrate(&self, data: &Value, from: &Version, to: &Version) -> Result<Value> {
        let failure = |reason: String, violations: Vec<String>, cause: Option<anyhow::Error>| {
            VersionError::Migration {
                subject: self.family().to_string(),
                from: from.clone(),
                to: to.clone(),
                reason,
                violations,
                cause,
            }
        };

        let unregistered = |version: &Version| {
            failure(format!("schema version {} is not registered", version), Vec::new(), None)
        };
        let source = self.registry.get(from).ok_or_else(|| unregistered(from))?;
        let target = self.registry.get(to).ok_or_else(|| unregistered(to))?;

        // No shortcut for from == to: a same-version call also needs a migrator.
        let migrator = self
            .migrators
            .iter()
            .find(|m| m.can_migrate(from, to))
            .ok_or_else(|| {
                failure(format!("no migrator handles {} -> {}", from, to), Vec::new(), None)
            })?;

        if self.options.validate_input {
            let violations = self.check(data, source);
            if !violations.is_empty() {
                return Err(failure(
                    format!("input does not match schema {}", from),
                    violations,
                    None,
                ));
            }
        }

        let migrated = migrator.migrate(data.clone(), from, to).map_err(|cause| {
            failure(format!("migrator '{}' failed", migrator.name()), Vec::new(), Some(cause))
        })?;

        if self.options.validate_output {
            let violations = self.check(&migrated, target);
            if !violations.is_empty() {
                warn!(
                    family = self.family(),
                    migrator = %migrator.name(),
                    errors = violations.len(),
                    "migrator produced invalid output"
                );
                return Err(failure(
                    format!(
                        "migrator '{}' produced output that does not match schema {}",
                        migrator.name(),
                        to
                    ),
                    violations,
                    None,
                ));
            }
        }

        debug!(family = self.family(), %from, %to, "evolved record");
        Ok(migrated)
    }

    fn check(&self, data: &Value, schema: &SchemaVersion) -> Vec<String> {
        self.validator
            .as_ref()
            .map(|validator| validator.validate(data, schema))
            .unwrap_or_default()
    }
}
