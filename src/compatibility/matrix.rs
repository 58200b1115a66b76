//! Symmetric compatibility matrix

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

use crate::compatibility::rule::{CompatibilityRule, RuleSpec, RuleViolation};
use crate::compatibility::{validate_component, Compatibility, ComponentVersion};
use crate::error::{Result, VersionError};
use crate::version::Version;

/// Compatibility facts and rules over `(component, version)` pairs
///
/// Every fact is stored in both directions by the same write, so
/// `is_compatible(a, b) == is_compatible(b, a)` always holds.
#[derive(Debug, Default, Clone)]
pub struct CompatibilityMatrix {
    versions: BTreeMap<String, BTreeSet<Version>>,
    cells: BTreeMap<ComponentVersion, BTreeMap<ComponentVersion, bool>>,
    rules: BTreeMap<String, Vec<CompatibilityRule>>,
}

/// Result of an offline [`CompatibilityMatrix::validate`] audit
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatrixReport {
    pub symmetry_errors: Vec<String>,
    pub rule_violations: Vec<RuleViolation>,
}

impl MatrixReport {
    pub fn is_valid(&self) -> bool {
        self.symmetry_errors.is_empty() && self.rule_violations.is_empty()
    }

    /// All findings as display lines
    pub fn issues(&self) -> Vec<String> {
        self.symmetry_errors
            .iter()
            .cloned()
            .chain(self.rule_violations.iter().map(RuleViolation::to_string))
            .collect()
    }
}

/// Persistence-agnostic matrix contents.
///
/// Cells are keyed `a@1.0.0|b@2.0.0` with the two halves in sorted order, so
/// each unordered pair appears once. Custom rules are not included and must
/// be re-registered after loading.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatrixSnapshot {
    #[serde(default)]
    pub cells: BTreeMap<String, bool>,
    #[serde(default)]
    pub versions: BTreeMap<String, Vec<Version>>,
    #[serde(default)]
    pub rules: BTreeMap<String, Vec<RuleSpec>>,
}

fn cell_key(a: &ComponentVersion, b: &ComponentVersion) -> String {
    if a <= b {
        format!("{}|{}", a, b)
    } else {
        format!("{}|{}", b, a)
    }
}

// Lookups skip name validation: an invalid name simply has no cells.
fn lookup_key(component: &str, version: &Version) -> ComponentVersion {
    ComponentVersion {
        component: component.to_string(),
        version: version.clone(),
    }
}

impl CompatibilityMatrix {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `component@version` exists
    pub fn add_version(&mut self, component: &str, version: &Version) -> Result<()> {
        validate_component(component)?;
        self.versions
            .entry(component.to_string())
            .or_default()
            .insert(version.clone());
        Ok(())
    }

    /// Registered versions of a component, ascending
    pub fn versions(&self, component: &str) -> Vec<&Version> {
        self.versions
            .get(component)
            .map(|set| set.iter().collect())
            .unwrap_or_default()
    }

    pub fn components(&self) -> Vec<&str> {
        self.versions.keys().map(String::as_str).collect()
    }

    /// Record a symmetric fact; both versions are registered as a side effect
    pub fn set_compatibility(
        &mut self,
        component1: &str,
        version1: &Version,
        component2: &str,
        version2: &Version,
        compatible: bool,
    ) -> Result<()> {
        let a = ComponentVersion::new(component1, version1)?;
        let b = ComponentVersion::new(component2, version2)?;

        self.add_version(component1, version1)?;
        self.add_version(component2, version2)?;
        self.cells.entry(a.clone()).or_default().insert(b.clone(), compatible);
        self.cells.entry(b.clone()).or_default().insert(a.clone(), compatible);

        debug!(%a, %b, compatible, "recorded compatibility");
        Ok(())
    }

    /// Tri-state lookup; unset pairs are [`Compatibility::Unknown`]
    pub fn is_compatible(
        &self,
        component1: &str,
        version1: &Version,
        component2: &str,
        version2: &Version,
    ) -> Compatibility {
        self.cells
            .get(&lookup_key(component1, version1))
            .and_then(|row| row.get(&lookup_key(component2, version2)))
            .copied()
            .into()
    }

    pub fn add_compatibility_rule(
        &mut self,
        component: &str,
        rule: CompatibilityRule,
    ) -> Result<()> {
        validate_component(component)?;
        debug!(component, %rule, "added compatibility rule");
        self.rules.entry(component.to_string()).or_default().push(rule);
        Ok(())
    }

    pub fn rules(&self, component: &str) -> &[CompatibilityRule] {
        self.rules.get(component).map(Vec::as_slice).unwrap_or_default()
    }

    /// Evaluate every rule of `component` against `version`
    pub fn check_compatibility_rules(
        &self,
        component: &str,
        version: &Version,
    ) -> Vec<RuleViolation> {
        self.rules(component)
            .iter()
            .filter_map(|rule| {
                self.evaluate(component, version, rule).map(|reason| RuleViolation {
                    component: component.to_string(),
                    version: version.clone(),
                    rule: rule.to_string(),
                    reason,
                })
            })
            .collect()
    }

    fn evaluate(
        &self,
        component: &str,
        version: &Version,
        rule: &CompatibilityRule,
    ) -> Option<String> {
        match rule {
            CompatibilityRule::VersionRange { min, max } => {
                let below = version.cmp_precedence(min) == Ordering::Less;
                let above = version.cmp_precedence(max) == Ordering::Greater;
                (below || above).then(|| format!("{} is outside [{}, {}]", version, min, max))
            }
            CompatibilityRule::Dependency {
                component: dependency,
                version: required,
            } => match self.is_compatible(component, version, dependency, required) {
                Compatibility::Compatible => None,
                Compatibility::Incompatible => {
                    Some(format!("recorded as incompatible with {}@{}", dependency, required))
                }
                Compatibility::Unknown => Some(format!(
                    "compatibility with {}@{} was never evaluated",
                    dependency, required
                )),
            },
            CompatibilityRule::Custom { name, predicate } => (!predicate(component, version))
                .then(|| format!("custom predicate '{}' rejected it", name)),
        }
    }

    /// Versions recorded as compatible with `component@version`, by other component
    pub fn get_compatible_versions(
        &self,
        component: &str,
        version: &Version,
    ) -> BTreeMap<String, Vec<Version>> {
        self.partition(component, version, true)
    }

    /// Versions recorded as incompatible with `component@version`, by other component
    pub fn get_incompatible_versions(
        &self,
        component: &str,
        version: &Version,
    ) -> BTreeMap<String, Vec<Version>> {
        self.partition(component, version, false)
    }

    fn partition(
        &self,
        component: &str,
        version: &Version,
        outcome: bool,
    ) -> BTreeMap<String, Vec<Version>> {
        let mut grouped: BTreeMap<String, Vec<Version>> = BTreeMap::new();
        let row = self.cells.get(&lookup_key(component, version));

        for (other, compatible) in row.into_iter().flatten() {
            if *compatible == outcome {
                grouped
                    .entry(other.component.clone())
                    .or_default()
                    .push(other.version.clone());
            }
        }
        grouped
    }

    /// Re-check symmetry of every cell and every rule of every registered version
    pub fn validate(&self) -> MatrixReport {
        let mut report = MatrixReport::default();

        for (a, row) in &self.cells {
            for (b, compatible) in row {
                let mirrored = self.cells.get(b).and_then(|r| r.get(a));
                if mirrored != Some(compatible) {
                    report.symmetry_errors.push(format!(
                        "{} -> {} is {} but {} -> {} is {}",
                        a,
                        b,
                        compatible,
                        b,
                        a,
                        mirrored.map_or("unset".to_string(), bool::to_string)
                    ));
                }
            }
        }

        for (component, versions) in &self.versions {
            for version in versions {
                report
                    .rule_violations
                    .extend(self.check_compatibility_rules(component, version));
            }
        }

        report
    }

    /// Export cells, versions and serializable rules
    pub fn to_snapshot(&self) -> MatrixSnapshot {
        let mut cells = BTreeMap::new();
        for (a, row) in &self.cells {
            for (b, compatible) in row {
                cells.insert(cell_key(a, b), *compatible);
            }
        }

        MatrixSnapshot {
            cells,
            versions: self
                .versions
                .iter()
                .map(|(component, set)| (component.clone(), set.iter().cloned().collect()))
                .collect(),
            rules: self
                .rules
                .iter()
                .map(|(component, rules)| {
                    let specs: Vec<_> =
                        rules.iter().filter_map(CompatibilityRule::to_spec).collect();
                    (component.clone(), specs)
                })
                .filter(|(_, specs)| !specs.is_empty())
                .collect(),
        }
    }

    /// Rebuild a matrix from a snapshot.
    ///
    /// Both orderings of the same pair may appear in a hand-written snapshot,
    /// but they must agree.
    pub fn from_snapshot(snapshot: &MatrixSnapshot) -> Result<Self> {
        let mut matrix = Self::new();

        for (component, versions) in &snapshot.versions {
            for version in versions {
                matrix.add_version(component, version)?;
            }
        }

        for (key, compatible) in &snapshot.cells {
            let (left, right) = key
                .split_once('|')
                .ok_or_else(|| {
                    VersionError::InvalidSnapshot(format!("cell key '{}' lacks '|'", key))
                })?;
            let a = ComponentVersion::parse(left)?;
            let b = ComponentVersion::parse(right)?;

            let existing = matrix.is_compatible(&a.component, &a.version, &b.component, &b.version);
            if existing.is_known() && existing.as_bool() != Some(*compatible) {
                return Err(VersionError::InvalidSnapshot(format!(
                    "contradictory facts for {} and {}",
                    a, b
                )));
            }
            matrix.set_compatibility(
                &a.component,
                &a.version,
                &b.component,
                &b.version,
                *compatible,
            )?;
        }

        for (component, specs) in &snapshot.rules {
            for spec in specs {
                matrix.add_compatibility_rule(component, spec.clone().into())?;
            }
        }

        Ok(matrix)
    }

    /// Serialize the snapshot as JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.to_snapshot())?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let snapshot: MatrixSnapshot = serde_json::from_str(json)?;
        Self::from_snapshot(&snapshot)
    }

    #[cfg(test)]
    pub(crate) fn corrupt_cell(
        &mut self,
        a: ComponentVersion,
        b: ComponentVersion,
        compatible: bool,
    ) {
        self.cells.entry(a).or_default().insert(b, compatible);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    #[test]
    fn test_symmetric_write() {
        let mut matrix = CompatibilityMatrix::new();
        matrix
            .set_compatibility("engine", &v("1.0.0"), "plugin", &v("2.1.0"), true)
            .unwrap();

        assert_eq!(
            matrix.is_compatible("plugin", &v("2.1.0"), "engine", &v("1.0.0")),
            Compatibility::Compatible
        );
        assert!(matrix.validate().symmetry_errors.is_empty());
        assert_eq!(matrix.versions("plugin"), vec![&v("2.1.0")]);
    }

    #[test]
    fn test_unset_pairs_are_unknown() {
        let mut matrix = CompatibilityMatrix::new();
        matrix
            .set_compatibility("engine", &v("1.0.0"), "plugin", &v("2.1.0"), false)
            .unwrap();
        assert_eq!(
            matrix.is_compatible("engine", &v("1.0.0"), "plugin", &v("2.2.0")),
            Compatibility::Unknown
        );
        assert_eq!(
            matrix.is_compatible("engine", &v("1.0.0"), "plugin", &v("2.1.0")),
            Compatibility::Incompatible
        );
    }

    #[test]
    fn test_overwrite_updates_both_cells() {
        let mut matrix = CompatibilityMatrix::new();
        matrix.set_compatibility("a", &v("1.0.0"), "b", &v("1.0.0"), true).unwrap();
        matrix.set_compatibility("b", &v("1.0.0"), "a", &v("1.0.0"), false).unwrap();
        assert_eq!(
            matrix.is_compatible("a", &v("1.0.0"), "b", &v("1.0.0")),
            Compatibility::Incompatible
        );
        assert!(matrix.validate().is_valid());
    }

    #[test]
    fn test_version_range_bounds_are_inclusive() {
        let mut matrix = CompatibilityMatrix::new();
        let range = CompatibilityRule::version_range(v("1.0.0"), v("1.5.0"));
        matrix.add_compatibility_rule("engine", range).unwrap();

        assert!(matrix.check_compatibility_rules("engine", &v("1.0.0")).is_empty());
        assert!(matrix.check_compatibility_rules("engine", &v("1.5.0")).is_empty());
        assert!(matrix.check_compatibility_rules("engine", &v("1.2.0")).is_empty());

        let violations = matrix.check_compatibility_rules("engine", &v("1.6.0"));
        assert_eq!(violations.len(), 1);
        assert!(violations[0].reason.contains("outside [1.0.0, 1.5.0]"));
        assert_eq!(matrix.check_compatibility_rules("engine", &v("0.9.0")).len(), 1);
    }

    #[test]
    fn test_dependency_rule_fails_closed_on_unknown() {
        let mut matrix = CompatibilityMatrix::new();
        matrix
            .add_compatibility_rule("plugin", CompatibilityRule::dependency("engine", v("1.0.0")))
            .unwrap();

        let unknown = matrix.check_compatibility_rules("plugin", &v("2.0.0"));
        assert!(unknown[0].reason.contains("never evaluated"));

        matrix
            .set_compatibility("plugin", &v("2.0.0"), "engine", &v("1.0.0"), true)
            .unwrap();
        assert!(matrix.check_compatibility_rules("plugin", &v("2.0.0")).is_empty());

        matrix
            .set_compatibility("plugin", &v("2.0.0"), "engine", &v("1.0.0"), false)
            .unwrap();
        let incompatible = matrix.check_compatibility_rules("plugin", &v("2.0.0"));
        assert!(incompatible[0].reason.contains("recorded as incompatible"));
    }

    #[test]
    fn test_custom_rule() {
        let mut matrix = CompatibilityMatrix::new();
        matrix
            .add_compatibility_rule(
                "engine",
                CompatibilityRule::custom("no-prerelease", |_, version| !version.is_prerelease()),
            )
            .unwrap();
        assert!(matrix.check_compatibility_rules("engine", &v("1.0.0")).is_empty());
        assert_eq!(matrix.check_compatibility_rules("engine", &v("1.0.0-rc.1")).len(), 1);
    }

    #[test]
    fn test_partition_by_outcome() {
        let mut matrix = CompatibilityMatrix::new();
        let engine = v("1.0.0");
        matrix.set_compatibility("engine", &engine, "plugin", &v("2.0.0"), true).unwrap();
        matrix.set_compatibility("engine", &engine, "plugin", &v("3.0.0"), false).unwrap();
        matrix.set_compatibility("engine", &engine, "store", &v("0.4.0"), true).unwrap();

        let compatible = matrix.get_compatible_versions("engine", &engine);
        assert_eq!(compatible["plugin"], vec![v("2.0.0")]);
        assert_eq!(compatible["store"], vec![v("0.4.0")]);

        let incompatible = matrix.get_incompatible_versions("engine", &engine);
        assert_eq!(incompatible.len(), 1);
        assert_eq!(incompatible["plugin"], vec![v("3.0.0")]);
        assert!(matrix.get_compatible_versions("engine", &v("9.0.0")).is_empty());
    }

    #[test]
    fn test_validate_reports_asymmetry_and_rule_violations() {
        let mut matrix = CompatibilityMatrix::new();
        matrix
            .corrupt_cell(
                ComponentVersion::new("a", &v("1.0.0")).unwrap(),
                ComponentVersion::new("b", &v("1.0.0")).unwrap(),
                true,
            );
        matrix.add_version("a", &v("3.0.0")).unwrap();
        matrix
            .add_compatibility_rule("a", CompatibilityRule::version_range(v("1.0.0"), v("2.0.0")))
            .unwrap();

        let report = matrix.validate();
        assert_eq!(report.symmetry_errors.len(), 1);
        assert!(report.symmetry_errors[0].contains("unset"));
        assert_eq!(report.rule_violations.len(), 1);
        assert!(!report.is_valid());
    }

    #[test]
    fn test_snapshot_round_trip() {
        let mut matrix = CompatibilityMatrix::new();
        matrix.set_compatibility("engine", &v("1.0.0"), "plugin", &v("2.0.0"), true).unwrap();
        matrix.add_version("engine", &v("1.1.0")).unwrap();
        let range = CompatibilityRule::version_range(v("1.0.0"), v("1.9.9"));
        matrix.add_compatibility_rule("engine", range).unwrap();
        matrix
            .add_compatibility_rule("engine", CompatibilityRule::custom("anything", |_, _| true))
            .unwrap();

        let snapshot = matrix.to_snapshot();
        assert_eq!(snapshot.cells.len(), 1);
        assert_eq!(snapshot.cells["engine@1.0.0|plugin@2.0.0"], true);
        assert_eq!(snapshot.rules["engine"].len(), 1);

        let restored = CompatibilityMatrix::from_json(&matrix.to_json().unwrap()).unwrap();
        assert_eq!(restored.to_snapshot(), snapshot);
        assert_eq!(restored.rules("engine").len(), 1);
        assert_eq!(
            restored.is_compatible("plugin", &v("2.0.0"), "engine", &v("1.0.0")),
            Compatibility::Compatible
        );
    }

    #[test]
    fn test_contradictory_snapshot_is_rejected() {
        let mut snapshot = MatrixSnapshot::default();
        snapshot.cells.insert("a@1.0.0|b@1.0.0".to_string(), true);
        snapshot.cells.insert("b@1.0.0|a@1.0.0".to_string(), false);
        assert!(matches!(
            CompatibilityMatrix::from_snapshot(&snapshot),
            Err(VersionError::InvalidSnapshot(_))
        ));

        let mut malformed = MatrixSnapshot::default();
        malformed.cells.insert("a@1.0.0".to_string(), true);
        assert!(CompatibilityMatrix::from_snapshot(&malformed).is_err());
    }
}
