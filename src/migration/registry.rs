//! Migration step registry and path resolution
//!
//! Steps are stored per data type. The registered steps of one type must form
//! a simple chain: a version with two outgoing (or two incoming) steps makes
//! resolution ambiguous and fails rather than picking a branch.
//!
//! Versions are matched by precedence throughout (registration, chain walking
//! and path validation), so build metadata never selects or separates steps.

use petgraph::algo::connected_components;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction as EdgeDirection;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use tracing::debug;

use crate::error::{Result, VersionError};
use crate::migration::path::{Direction, MigrationPath};
use crate::migration::step::MigrationStep;
use crate::version::Version;

/// Registry of migration steps keyed by data type
#[derive(Debug, Default, Clone)]
pub struct MigrationRegistry {
    steps: BTreeMap<String, Vec<MigrationStep>>,
}

/// Structural defect in one data type's migration graph
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationGraphIssue {
    /// Several steps leave (or enter) the same version
    Branch {
        data_type: String,
        at: Version,
        direction: Direction,
        targets: Vec<Version>,
    },
    /// The steps form several disconnected chains
    Gap { data_type: String, chains: usize },
}

impl fmt::Display for MigrationGraphIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Branch {
                data_type,
                at,
                direction,
                targets,
            } => {
                let targets: Vec<String> = targets.iter().map(Version::to_string).collect();
                write!(
                    f,
                    "'{}' branches at {} ({}): {}",
                    data_type,
                    at,
                    direction,
                    targets.join(", ")
                )
            }
            Self::Gap { data_type, chains } => {
                write!(f, "'{}' is split into {} disconnected chains", data_type, chains)
            }
        }
    }
}

impl MigrationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a step.
    ///
    /// Fails with [`VersionError::MigrationRegistration`] when the step does
    /// not move strictly forward or when its `(data_type, from, to)` key is
    /// already taken. A failed registration leaves the registry unchanged.
    pub fn register(&mut self, step: MigrationStep) -> Result<()> {
        let rejected = |reason: &str| VersionError::MigrationRegistration {
            data_type: step.data_type().to_string(),
            from: step.from_version().clone(),
            to: step.to_version().clone(),
            reason: reason.to_string(),
        };

        if step.from_version().cmp_precedence(step.to_version()) != Ordering::Less {
            return Err(rejected("source version must precede target version"));
        }

        let existing = self.steps.entry(step.data_type().to_string()).or_default();
        if existing
            .iter()
            .any(|s| {
                s.from_version().same_precedence(step.from_version())
                    && s.to_version().same_precedence(step.to_version())
            })
        {
            return Err(rejected("a step with this key is already registered"));
        }

        debug!(
            data_type = step.data_type(),
            from = %step.from_version(),
            to = %step.to_version(),
            "registered migration step"
        );
        existing.push(step);
        existing.sort_by(|a, b| a.from_version().cmp(b.from_version()));
        Ok(())
    }

    /// Registered data types, sorted
    pub fn data_types(&self) -> Vec<&str> {
        self.steps.keys().map(String::as_str).collect()
    }

    /// Steps for one data type, ordered by source version
    pub fn steps(&self, data_type: &str) -> &[MigrationStep] {
        self.steps.get(data_type).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn contains(&self, data_type: &str, from: &Version, to: &Version) -> bool {
        self.steps(data_type)
            .iter()
            .any(|s| s.from_version().same_precedence(from) && s.to_version().same_precedence(to))
    }

    /// Total number of registered steps
    pub fn len(&self) -> usize {
        self.steps.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Resolve the chain of steps leading from `from` to `to`
    pub fn resolve(&self, data_type: &str, from: &Version, to: &Version) -> Result<MigrationPath> {
        let direction = match from.cmp_precedence(to) {
            Ordering::Equal => {
                let path = MigrationPath::new(
                    data_type,
                    from.clone(),
                    to.clone(),
                    Direction::Identity,
                    Vec::new(),
                );
                path.validate()?;
                return Ok(path);
            }
            Ordering::Less => Direction::Upgrade,
            Ordering::Greater => Direction::Downgrade,
        };

        let fail = |reason: String, chain: &[MigrationStep]| VersionError::NoMigrationPath {
            data_type: data_type.to_string(),
            from: from.clone(),
            to: to.clone(),
            reason,
            partial: chain
                .iter()
                .map(|s| match direction {
                    Direction::Downgrade => (s.to_version().clone(), s.from_version().clone()),
                    _ => (s.from_version().clone(), s.to_version().clone()),
                })
                .collect(),
        };

        let registered = match self.steps.get(data_type) {
            Some(steps) if !steps.is_empty() => steps,
            _ => return Err(fail("no migrations registered for this data type".to_string(), &[])),
        };

        let mut chain: Vec<MigrationStep> = Vec::new();
        let mut current = from.clone();
        while !current.same_precedence(to) {
            let candidates: Vec<&MigrationStep> = registered
                .iter()
                .filter(|s| match direction {
                    Direction::Downgrade => s.to_version().same_precedence(&current),
                    _ => s.from_version().same_precedence(&current),
                })
                .collect();

            let step = match candidates.as_slice() {
                [] => {
                    let reason = format!("no step continues the chain at {}", current);
                    return Err(fail(reason, &chain));
                }
                [only] => *only,
                many => {
                    let ends: Vec<String> = many
                        .iter()
                        .map(|s| match direction {
                            Direction::Downgrade => s.from_version().to_string(),
                            _ => s.to_version().to_string(),
                        })
                        .collect();
                    return Err(fail(
                        format!("ambiguous branch at {} toward {}", current, ends.join(", ")),
                        &chain,
                    ));
                }
            };

            let next = match direction {
                Direction::Downgrade => step.from_version(),
                _ => step.to_version(),
            };
            let overshoots = match direction {
                Direction::Downgrade => next.cmp_precedence(to) == Ordering::Less,
                _ => next.cmp_precedence(to) == Ordering::Greater,
            };
            if overshoots {
                return Err(fail(format!("step {} -> {} skips past {}", current, next, to), &chain));
            }

            current = next.clone();
            chain.push(step.clone());
        }

        let path = MigrationPath::new(data_type, from.clone(), to.clone(), direction, chain);
        path.validate()?;
        debug!(data_type, %from, %to, steps = path.len(), "resolved migration path");
        Ok(path)
    }

    /// Migrate a record between versions.
    ///
    /// The input is left untouched; callers should only replace their stored
    /// record with the returned value.
    pub fn migrate(
        &self,
        data_type: &str,
        data: &Value,
        from: &Version,
        to: &Version,
    ) -> Result<Value> {
        let path = self.resolve(data_type, from, to)?;
        path.apply(data.clone())
    }

    /// Inspect every data type's graph for branches and disconnected chains
    pub fn audit(&self) -> Vec<MigrationGraphIssue> {
        let mut issues = Vec::new();

        for (data_type, steps) in &self.steps {
            let mut graph: DiGraph<Version, ()> = DiGraph::new();
            let mut nodes: HashMap<Version, NodeIndex> = HashMap::new();
            let mut node = |graph: &mut DiGraph<Version, ()>, version: &Version| {
                let key = version.without_build();
                *nodes
                    .entry(key.clone())
                    .or_insert_with(|| graph.add_node(key))
            };

            for step in steps {
                let a = node(&mut graph, step.from_version());
                let b = node(&mut graph, step.to_version());
                graph.add_edge(a, b, ());
            }

            for index in graph.node_indices() {
                for (edge_direction, walk) in [
                    (EdgeDirection::Outgoing, Direction::Upgrade),
                    (EdgeDirection::Incoming, Direction::Downgrade),
                ] {
                    let mut targets: Vec<Version> = graph
                        .neighbors_directed(index, edge_direction)
                        .map(|n| graph[n].clone())
                        .collect();
                    if targets.len() > 1 {
                        targets.sort();
                        issues.push(MigrationGraphIssue::Branch {
                            data_type: data_type.clone(),
                            at: graph[index].clone(),
                            direction: walk,
                            targets,
                        });
                    }
                }
            }

            let chains = connected_components(&graph);
            if chains > 1 {
                issues.push(MigrationGraphIssue::Gap {
                    data_type: data_type.clone(),
                    chains,
                });
            }
        }

        issues
    }
}
