//! Familiar Versioning
//!
//! Version-aware migration and compatibility for the Familiar platform.
//!
//! ## Features
//!
//! - **Semantic Versions**: strict `major.minor.patch[-prerelease][+build]` parsing
//!   with total ordering
//! - **Migration Chains**: per-data-type step registries resolved into validated
//!   upgrade or downgrade paths
//! - **Compatibility Matrix**: symmetric, tri-state component compatibility with typed rules
//! - **Schema Evolution**: checksummed schema versions with validate → migrate → validate
//! - **Deprecations**: API version tracking and call-site deprecation enforcement
//!
//! ## Architecture
//!
//! ```text
//! VersionContext (Arc-shared, one per application)
//! ├── MigrationRegistry     data_type -> [MigrationStep] -> MigrationPath
//! ├── CompatibilityMatrix   component@version x component@version -> bool
//! ├── SchemaEvolution       family -> SchemaRegistry + Migrators + Validator
//! └── DeprecationRegistry   api -> Version, element -> DeprecationInfo
//! ```

pub mod checksum;
pub mod compatibility;
pub mod config;
pub mod constraint;
pub mod context;
pub mod deprecation;
pub mod error;
pub mod migration;
pub mod schema;
pub mod version;

pub use checksum::Checksum;
pub use compatibility::{
    Compatibility, CompatibilityMatrix, CompatibilityRule, ComponentVersion, MatrixReport,
    MatrixSnapshot, RuleSpec, RuleViolation,
};
pub use config::VersioningConfig;
pub use constraint::{ensure_compatible, resolve_version, VersionConstraint};
pub use context::VersionContext;
pub use deprecation::{
    Deprecated, DeprecationInfo, DeprecationLevel, DeprecationRegistry, DeprecationReporter,
    TracingReporter,
};
pub use error::{Result, VersionError};
pub use migration::{
    Direction, MigrationGraphIssue, MigrationPath, MigrationRegistry, MigrationStep,
};
pub use schema::{
    EvolutionOptions, FnMigrator, JsonSchemaValidator, Migrator, SchemaEvolution, SchemaRegistry,
    SchemaValidator, SchemaVersion,
};
pub use version::{parse_version, Version};
