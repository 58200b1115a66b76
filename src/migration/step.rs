//! Single migration steps between adjacent versions of one data type

use serde_json::Value;
use std::fmt;
use std::sync::Arc;

use crate::version::Version;

/// A pure record transform; failures are reported through `anyhow`
pub type Transform = Arc<dyn Fn(Value) -> anyhow::Result<Value> + Send + Sync>;

/// Identity of a step inside the registry
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StepKey {
    pub data_type: String,
    pub from: Version,
    pub to: Version,
}

impl fmt::Display for StepKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} -> {}", self.data_type, self.from, self.to)
    }
}

/// A bidirectional transformer between two adjacent versions
///
/// `forward` upgrades a record written at `from` into the `to` shape;
/// `backward` undoes it. The registry rejects steps whose source does not
/// strictly precede their target.
#[derive(Clone)]
pub struct MigrationStep {
    data_type: String,
    from: Version,
    to: Version,
    forward: Transform,
    backward: Transform,
    description: Option<String>,
}

impl MigrationStep {
    pub fn new<F, B>(
        data_type: impl Into<String>,
        from: Version,
        to: Version,
        forward: F,
        backward: B,
    ) -> Self
    where
        F: Fn(Value) -> anyhow::Result<Value> + Send + Sync + 'static,
        B: Fn(Value) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        Self {
            data_type: data_type.into(),
            from,
            to,
            forward: Arc::new(forward),
            backward: Arc::new(backward),
            description: None,
        }
    }

    /// Attach a human-readable description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn data_type(&self) -> &str {
        &self.data_type
    }

    pub fn from_version(&self) -> &Version {
        &self.from
    }

    pub fn to_version(&self) -> &Version {
        &self.to
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn key(&self) -> StepKey {
        StepKey {
            data_type: self.data_type.clone(),
            from: self.from.clone(),
            to: self.to.clone(),
        }
    }

    pub fn apply_forward(&self, data: Value) -> anyhow::Result<Value> {
        (self.forward)(data)
    }

    pub fn apply_backward(&self, data: Value) -> anyhow::Result<Value> {
        (self.backward)(data)
    }
}

impl fmt::Debug for MigrationStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MigrationStep")
            .field("data_type", &self.data_type)
            .field("from", &self.from)
            .field("to", &self.to)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}
