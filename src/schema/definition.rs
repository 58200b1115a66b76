//! Schema definitions bound to a version

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::checksum::Checksum;
use crate::version::Version;

/// One version of a schema family
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaVersion {
    /// Version this definition describes
    pub version: Version,
    /// The schema definition; JSON Schema when validated with
    /// [`JsonSchemaValidator`](super::JsonSchemaValidator)
    pub definition: Value,
    /// SHA256 of the definition at registration time
    pub checksum: Checksum,
    pub registered_at: DateTime<Utc>,
    /// Change notes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl SchemaVersion {
    pub fn new(version: Version, definition: Value) -> Self {
        let checksum = Checksum::of_json(&definition);
        Self {
            version,
            definition,
            checksum,
            registered_at: Utc::now(),
            notes: None,
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// Verify the definition still matches its checksum
    pub fn verify_checksum(&self) -> bool {
        self.checksum.matches_json(&self.definition)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_checksum_tracks_definition() {
        let mut schema = SchemaVersion::new(Version::new(1, 0, 0), json!({"type": "object"}))
            .with_notes("initial");
        assert!(schema.verify_checksum());
        assert_eq!(schema.notes.as_deref(), Some("initial"));

        schema.definition = json!({"type": "array"});
        assert!(!schema.verify_checksum());
    }
}
