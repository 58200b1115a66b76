//! Versioned schema families and their evolution
//!
//! Each family keeps one [`SchemaVersion`] per [`Version`](crate::Version) in
//! a [`SchemaRegistry`]. [`SchemaEvolution`] drives validate → migrate →
//! validate over that registry using single-hop [`Migrator`]s.

pub mod definition;
pub mod evolution;
pub mod migrator;
pub mod registry;
pub mod validator;

pub use definition::SchemaVersion;
pub use evolution::{EvolutionOptions, SchemaEvolution};
pub use migrator::{FnMigrator, Migrator};
pub use registry::SchemaRegistry;
pub use validator::{JsonSchemaValidator, SchemaValidator};
