//! Single-hop schema migrators

use serde_json::Value;
use std::fmt;

use crate::version::Version;

/// Transforms records between two schema versions in one hop
pub trait Migrator: Send + Sync {
    fn can_migrate(&self, from: &Version, to: &Version) -> bool;

    fn migrate(&self, data: Value, from: &Version, to: &Version) -> anyhow::Result<Value>;

    /// Name used in logs and error messages
    fn name(&self) -> String {
        "migrator".to_string()
    }
}

/// A migrator for exactly one `(from, to)` pair backed by a closure
pub struct FnMigrator<F> {
    from: Version,
    to: Version,
    transform: F,
}

impl<F> FnMigrator<F>
where
    F: Fn(Value) -> anyhow::Result<Value> + Send + Sync,
{
    pub fn new(from: Version, to: Version, transform: F) -> Self {
        Self { from, to, transform }
    }
}

impl<F> Migrator for FnMigrator<F>
where
    F: Fn(Value) -> anyhow::Result<Value> + Send + Sync,
{
    fn can_migrate(&self, from: &Version, to: &Version) -> bool {
        &self.from == from && &self.to == to
    }

    fn migrate(&self, data: Value, _from: &Version, _to: &Version) -> anyhow::Result<Value> {
        (self.transform)(data)
    }

    fn name(&self) -> String {
        format!("{} -> {}", self.from, self.to)
    }
}

impl<F> fmt::Debug for FnMigrator<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnMigrator")
            .field("from", &self.from)
            .field("to", &self.to)
            .finish_non_exhaustive()
    }
}
