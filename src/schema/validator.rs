//! Validation of records against schema definitions

use jsonschema::JSONSchema;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::checksum::Checksum;
use crate::schema::definition::SchemaVersion;

/// Checks a record against one schema version
pub trait SchemaValidator: Send + Sync {
    /// Return every problem found; an empty list means the record is valid
    fn validate(&self, data: &Value, schema: &SchemaVersion) -> Vec<String>;
}

/// JSON Schema validation via the `jsonschema` crate.
///
/// Compiled schemas are cached by the checksum of their definition, so each
/// distinct definition is compiled once. Definitions that fail to compile are
/// not cached.
#[derive(Default)]
pub struct JsonSchemaValidator {
    compiled: RwLock<HashMap<Checksum, Arc<JSONSchema>>>,
}

impl JsonSchemaValidator {
    pub fn new() -> Self {
        Self::default()
    }

    fn compiled(&self, schema: &SchemaVersion) -> Result<Arc<JSONSchema>, String> {
        let key = Checksum::of_json(&schema.definition);
        if let Some(found) = self
            .compiled
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
        {
            return Ok(Arc::clone(found));
        }

        let compiled = JSONSchema::compile(&schema.definition)
            .map(Arc::new)
            .map_err(|e| format!("schema {} is not a valid JSON Schema: {}", schema.version, e))?;
        let mut cache = self.compiled.write().unwrap_or_else(PoisonError::into_inner);
        Ok(Arc::clone(cache.entry(key).or_insert(compiled)))
    }

    #[cfg(test)]
    fn cached(&self) -> usize {
        self.compiled.read().unwrap_or_else(PoisonError::into_inner).len()
    }
}

impl std::fmt::Debug for JsonSchemaValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let cached = self.compiled.read().unwrap_or_else(PoisonError::into_inner).len();
        f.debug_struct("JsonSchemaValidator").field("cached", &cached).finish()
    }
}

impl SchemaValidator for JsonSchemaValidator {
    fn validate(&self, data: &Value, schema: &SchemaVersion) -> Vec<String> {
        let compiled = match self.compiled(schema) {
            Ok(compiled) => compiled,
            Err(message) => return vec![message],
        };

        let messages = match compiled.validate(data) {
            Ok(()) => Vec::new(),
            Err(errors) => errors
                .map(|error| {
                    let path = error.instance_path.to_string();
                    if path.is_empty() {
                        error.to_string()
                    } else {
                        format!("{}: {}", path, error)
                    }
                })
                .collect(),
        };
        messages
    }
}
