//! Integration tests for multi-hop record migration

use familiar_versioning::{Direction, MigrationRegistry, MigrationStep, Version, VersionError};
use serde_json::{json, Value};

fn v(s: &str) -> Version {
    Version::parse(s).unwrap()
}

/// v1 `{text}` -> v2 `{content}` -> v3 `{content, tags}`
fn memory_entry_steps() -> Vec<MigrationStep> {
    vec![
        MigrationStep::new(
            "memory_entry",
            v("1.0.0"),
            v("2.0.0"),
            |mut data: Value| {
                let obj = data
                    .as_object_mut()
                    .ok_or_else(|| anyhow::anyhow!("memory entry must be an object"))?;
                let text = obj
                    .remove("text")
                    .ok_or_else(|| anyhow::anyhow!("missing 'text'"))?;
                obj.insert("content".to_string(), text);
                Ok(data)
            },
            |mut data: Value| {
                let obj = data
                    .as_object_mut()
                    .ok_or_else(|| anyhow::anyhow!("memory entry must be an object"))?;
                let content = obj
                    .remove("content")
                    .ok_or_else(|| anyhow::anyhow!("missing 'content'"))?;
                obj.insert("text".to_string(), content);
                Ok(data)
            },
        )
        .with_description("rename text to content"),
        MigrationStep::new(
            "memory_entry",
            v("2.0.0"),
            v("3.0.0"),
            |mut data: Value| {
                data["tags"] = json!([]);
                Ok(data)
            },
            |mut data: Value| {
                if let Some(obj) = data.as_object_mut() {
                    obj.remove("tags");
                }
                Ok(data)
            },
        )
        .with_description("add tags"),
    ]
}

fn registry() -> MigrationRegistry {
    let mut registry = MigrationRegistry::new();
    // Registration order must not matter for a simple chain.
    for step in memory_entry_steps().into_iter().rev() {
        registry.register(step).unwrap();
    }
    registry
}

#[test]
fn test_chain_resolves_to_two_ordered_steps() {
    let registry = registry();
    let path = registry.resolve("memory_entry", &v("1.0.0"), &v("3.0.0")).unwrap();

    assert_eq!(path.direction(), Direction::Upgrade);
    assert_eq!(
        path.hops(),
        vec![(v("1.0.0"), v("2.0.0")), (v("2.0.0"), v("3.0.0"))]
    );
    assert!(path.validate().is_ok());
}

#[test]
fn test_migrate_matches_manual_composition() {
    let registry = registry();
    let original = json!({"text": "remember the milk", "id": 7});

    let steps = memory_entry_steps();
    let manual = steps[1]
        .apply_forward(steps[0].apply_forward(original.clone()).unwrap())
        .unwrap();

    let migrated = registry
        .migrate("memory_entry", &original, &v("1.0.0"), &v("3.0.0"))
        .unwrap();
    assert_eq!(migrated, manual);
    assert_eq!(migrated, json!({"content": "remember the milk", "id": 7, "tags": []}));
}

#[test]
fn test_downgrade_round_trips() {
    let registry = registry();
    let original = json!({"text": "remember the milk", "id": 7});

    let upgraded = registry
        .migrate("memory_entry", &original, &v("1.0.0"), &v("3.0.0"))
        .unwrap();
    let path = registry.resolve("memory_entry", &v("3.0.0"), &v("1.0.0")).unwrap();
    assert_eq!(path.direction(), Direction::Downgrade);

    let restored = registry
        .migrate("memory_entry", &upgraded, &v("3.0.0"), &v("1.0.0"))
        .unwrap();
    assert_eq!(restored, original);
}

#[test]
fn test_same_version_is_identity() {
    let registry = registry();
    let data = json!({"content": "x"});
    assert_eq!(
        registry.migrate("memory_entry", &data, &v("2.0.0"), &v("2.0.0")).unwrap(),
        data
    );
}

#[test]
fn test_unknown_type_and_disconnected_endpoints_fail() {
    let registry = registry();

    let err = registry.resolve("task", &v("1.0.0"), &v("2.0.0")).unwrap_err();
    assert!(matches!(err, VersionError::NoMigrationPath { .. }));

    let err = registry.resolve("memory_entry", &v("1.0.0"), &v("4.0.0")).unwrap_err();
    match err {
        VersionError::NoMigrationPath { partial, .. } => {
            assert_eq!(partial.len(), 2);
        }
        other => panic!("expected NoMigrationPath, got {other:?}"),
    }
}

#[test]
fn test_failing_step_leaves_input_untouched() {
    let registry = registry();
    let original = json!({"id": 7});

    let err = registry
        .migrate("memory_entry", &original, &v("1.0.0"), &v("3.0.0"))
        .unwrap_err();
    assert!(matches!(err, VersionError::Migration { cause: Some(_), .. }));
    assert_eq!(original, json!({"id": 7}));
}

#[test]
fn test_duplicate_registration_leaves_registry_unchanged() {
    let mut registry = registry();
    let before = registry.len();

    let duplicate = MigrationStep::new("memory_entry", v("1.0.0"), v("2.0.0"), Ok, Ok);
    let err = registry.register(duplicate).unwrap_err();
    assert!(matches!(err, VersionError::MigrationRegistration { .. }));
    assert_eq!(registry.len(), before);

    let migrated = registry
        .migrate("memory_entry", &json!({"text": "a"}), &v("1.0.0"), &v("2.0.0"))
        .unwrap();
    assert_eq!(migrated, json!({"content": "a"}));
}

#[test]
fn test_branching_graph_is_reported_and_refused() {
    let mut registry = registry();
    registry
        .register(MigrationStep::new("memory_entry", v("1.0.0"), v("1.5.0"), Ok, Ok))
        .unwrap();

    assert!(registry
        .audit()
        .iter()
        .any(|issue| issue.to_string().contains("branches at 1.0.0")));
    assert!(matches!(
        registry.resolve("memory_entry", &v("1.0.0"), &v("3.0.0")),
        Err(VersionError::NoMigrationPath { .. })
    ));
}
