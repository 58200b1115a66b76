//! SHA256 checksums for schema definitions

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::fmt;

/// SHA256 checksum of a schema definition
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Checksum(String);

impl Checksum {
    pub fn of_bytes(data: &[u8]) -> Self {
        Self(format!("{:x}", Sha256::digest(data)))
    }

    /// Checksum of a JSON value with object keys in sorted order
    pub fn of_json(value: &Value) -> Self {
        Self::of_bytes(canonical(value).to_string().as_bytes())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn matches_json(&self, value: &Value) -> bool {
        *self == Self::of_json(value)
    }
}

// Rebuild objects with sorted keys so the bytes do not depend on map ordering.
fn canonical(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let mut sorted = Map::new();
            for key in keys {
                sorted.insert(key.clone(), canonical(&map[key.as_str()]));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonical).collect()),
        other => other.clone(),
    }
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_checksum_ignores_key_order() {
        let a: Value = serde_json::from_str(r#"{"b": 1, "a": {"y": 1, "x": 2}}"#).unwrap();
        let b: Value = serde_json::from_str(r#"{"a": {"x": 2, "y": 1}, "b": 1}"#).unwrap();
        assert_eq!(Checksum::of_json(&a), Checksum::of_json(&b));
    }

    #[test]
    fn test_checksum_detects_changes() {
        let checksum = Checksum::of_json(&json!({"type": "object"}));
        assert_eq!(checksum.as_str().len(), 64);
        assert!(checksum.matches_json(&json!({"type": "object"})));
        assert!(!checksum.matches_json(&json!({"type": "string"})));
    }
}
