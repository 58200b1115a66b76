//! Resolved migration chains

use serde_json::Value;
use std::fmt;

use crate::error::{Result, VersionError};
use crate::migration::step::MigrationStep;
use crate::version::Version;

/// Which way a path walks the version chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// `from == to`, nothing to do
    Identity,
    /// Walks `forward` transforms toward a newer version
    Upgrade,
    /// Walks `backward` transforms toward an older version
    Downgrade,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Identity => write!(f, "identity"),
            Direction::Upgrade => write!(f, "upgrade"),
            Direction::Downgrade => write!(f, "downgrade"),
        }
    }
}

/// An unbroken chain of steps between two versions of one data type.
///
/// Steps are stored in walk order. For an upgrade each step's target is the
/// next step's source; for a downgrade each step's source is the next step's
/// target. Only [`MigrationRegistry::resolve`](super::MigrationRegistry::resolve)
/// builds paths.
#[derive(Debug, Clone)]
pub struct MigrationPath {
    data_type: String,
    from: Version,
    to: Version,
    direction: Direction,
    steps: Vec<MigrationStep>,
}

impl MigrationPath {
    pub(crate) fn new(
        data_type: impl Into<String>,
        from: Version,
        to: Version,
        direction: Direction,
        steps: Vec<MigrationStep>,
    ) -> Self {
        Self {
            data_type: data_type.into(),
            from,
            to,
            direction,
            steps,
        }
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

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn steps(&self) -> &[MigrationStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Version hops in walk order, e.g. `[(3.0.0, 2.0.0), (2.0.0, 1.0.0)]` for a downgrade
    pub fn hops(&self) -> Vec<(Version, Version)> {
        self.steps.iter().map(|step| self.hop(step)).collect()
    }

    fn hop(&self, step: &MigrationStep) -> (Version, Version) {
        match self.direction {
            Direction::Downgrade => (step.to_version().clone(), step.from_version().clone()),
            _ => (step.from_version().clone(), step.to_version().clone()),
        }
    }

    /// Re-check chain continuity from `from` to `to`
    pub fn validate(&self) -> Result<()> {
        let broken = |reason: String| VersionError::NoMigrationPath {
            data_type: self.data_type.clone(),
            from: self.from.clone(),
            to: self.to.clone(),
            reason,
            partial: self.hops(),
        };

        if self.steps.is_empty() {
            return if self.from.same_precedence(&self.to) {
                Ok(())
            } else {
                Err(broken("empty chain between distinct versions".to_string()))
            };
        }

        let mut cursor = &self.from;
        for step in &self.steps {
            if step.data_type() != self.data_type {
                return Err(broken(format!("step belongs to data type '{}'", step.data_type())));
            }
            let (entry, exit) = match self.direction {
                Direction::Downgrade => (step.to_version(), step.from_version()),
                _ => (step.from_version(), step.to_version()),
            };
            if !entry.same_precedence(cursor) {
                return Err(broken(format!(
                    "chain breaks at {}: next step starts at {}",
                    cursor, entry
                )));
            }
            cursor = exit;
        }

        if !cursor.same_precedence(&self.to) {
            return Err(broken(format!("chain ends at {} instead of {}", cursor, self.to)));
        }
        Ok(())
    }

    /// Fold the chain over `data`, each output feeding the next step.
    ///
    /// The first failing step aborts the whole fold; no intermediate value
    /// escapes.
    pub fn apply(&self, data: Value) -> Result<Value> {
        self.steps.iter().try_fold(data, |current, step| {
            let outcome = match self.direction {
                Direction::Downgrade => step.apply_backward(current),
                _ => step.apply_forward(current),
            };
            outcome.map_err(|cause| {
                let (hop_from, hop_to) = self.hop(step);
                VersionError::Migration {
                    subject: self.data_type.clone(),
                    from: self.from.clone(),
                    to: self.to.clone(),
                    reason: format!("{} step {} -> {} failed", self.direction, hop_from, hop_to),
                    violations: Vec::new(),
                    cause: Some(cause),
                }
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn add_field(name: &'static str) -> impl Fn(Value) -> anyhow::Result<Value> + Send + Sync {
        move |mut v: Value| {
            v[name] = json!(true);
            Ok(v)
        }
    }

    fn step(from: u64, to: u64) -> MigrationStep {
        MigrationStep::new(
            "doc",
            Version::new(from, 0, 0),
            Version::new(to, 0, 0),
            add_field("up"),
            add_field("down"),
        )
    }

    #[test]
    fn test_validate_rejects_broken_chain() {
        let path = MigrationPath::new(
            "doc",
            Version::new(1, 0, 0),
            Version::new(4, 0, 0),
            Direction::Upgrade,
            vec![step(1, 2), step(3, 4)],
        );
        let err = path.validate().unwrap_err();
        assert!(err.to_string().contains("chain breaks at 2.0.0"));
    }

    #[test]
    fn test_validate_ignores_build_metadata() {
        let tagged = |major: u64, build: &str| Version::new(major, 0, 0).with_build(build).unwrap();

        let identity = MigrationPath::new(
            "doc",
            Version::new(1, 0, 0),
            tagged(1, "b"),
            Direction::Identity,
            Vec::new(),
        );
        assert!(identity.validate().is_ok());

        let path = MigrationPath::new(
            "doc",
            tagged(1, "ci.7"),
            tagged(3, "ci.9"),
            Direction::Upgrade,
            vec![step(1, 2), step(2, 3)],
        );
        assert!(path.validate().is_ok());
    }

    #[test]
    fn test_downgrade_hops_are_reversed() {
        let path = MigrationPath::new(
            "doc",
            Version::new(3, 0, 0),
            Version::new(1, 0, 0),
            Direction::Downgrade,
            vec![step(2, 3), step(1, 2)],
        );
        path.validate().unwrap();
        assert_eq!(
            path.hops(),
            vec![
                (Version::new(3, 0, 0), Version::new(2, 0, 0)),
                (Version::new(2, 0, 0), Version::new(1, 0, 0)),
            ]
        );
        assert_eq!(path.apply(json!({})).unwrap(), json!({"down": true}));
    }

    #[test]
    fn test_apply_aborts_on_failing_step() {
        let failing = MigrationStep::new(
            "doc",
            Version::new(2, 0, 0),
            Version::new(3, 0, 0),
            |_| Err(anyhow::anyhow!("corrupt record")),
            Ok,
        );
        let path = MigrationPath::new(
            "doc",
            Version::new(1, 0, 0),
            Version::new(3, 0, 0),
            Direction::Upgrade,
            vec![step(1, 2), failing],
        );
        let err = path.apply(json!({})).unwrap_err();
        match err {
            VersionError::Migration { reason, cause, .. } => {
                assert!(reason.contains("2.0.0 -> 3.0.0"));
                assert_eq!(cause.unwrap().to_string(), "corrupt record");
            }
            other => panic!("expected Migration error, got {other:?}"),
        }
    }
}
