//! Multi-hop record migrations
//!
//! A [`MigrationRegistry`] holds [`MigrationStep`]s per data type and resolves
//! them into a continuous [`MigrationPath`] between any two versions.

pub mod path;
pub mod registry;
pub mod step;

pub use path::{Direction, MigrationPath};
pub use registry::{MigrationGraphIssue, MigrationRegistry};
pub use step::{MigrationStep, StepKey, Transform};
