//! Validator registry: type → data schema, type → meta schema.
//!
//! A type may be registered in zero, one or both maps. On validation both schemas
//! (when present) are checked and every failure is collected before rejecting; a missing
//! entry for a type means that field is not validated. This is the runtime-boundary
//! counterpart of the event-definition JSON files an external code generator emits static
//! types from (see [`ValidatorRegistry::load_dir`] for reading those files directly).

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

use jsonschema::Validator;
use serde_json::Value;

use crate::error::ValidationError;

/// Reserved file name contributing shared sub-schemas to sibling definition files.
const DEFINITIONS_FILE: &str = "$definitions.json";

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("io error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid json in {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid schema for event type `{event_type}`: {message}")]
    Schema { event_type: String, message: String },
}

/// Maps registered event types to their (optional) data and meta JSON schemas.
#[derive(Default)]
pub struct ValidatorRegistry {
    known_types: HashSet<String>,
    data_schemas: HashMap<String, Validator>,
    meta_schemas: HashMap<String, Validator>,
}

impl ValidatorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `event_type` as a member of the known set without attaching any schema.
    pub fn register_type(&mut self, event_type: impl Into<String>) {
        self.known_types.insert(event_type.into());
    }

    /// Registers (or replaces) the data schema for `event_type`, implicitly registering the type.
    pub fn register_data_schema(&mut self, event_type: impl Into<String>, schema: &Value) -> Result<(), RegistryError> {
        let event_type = event_type.into();
        let validator = compile(&event_type, schema)?;
        self.known_types.insert(event_type.clone());
        self.data_schemas.insert(event_type, validator);
        Ok(())
    }

    /// Registers (or replaces) the meta schema for `event_type`, implicitly registering the type.
    pub fn register_meta_schema(&mut self, event_type: impl Into<String>, schema: &Value) -> Result<(), RegistryError> {
        let event_type = event_type.into();
        let validator = compile(&event_type, schema)?;
        self.known_types.insert(event_type.clone());
        self.meta_schemas.insert(event_type, validator);
        Ok(())
    }

    /// `t` is a member of the registered event-type set.
    pub fn has_event_type(&self, event_type: &str) -> bool {
        self.known_types.contains(event_type)
    }

    pub fn event_types(&self) -> impl Iterator<Item = &str> {
        self.known_types.iter().map(String::as_str)
    }

    /// Validates `data` and `meta` against whichever schemas are registered for `event_type`.
    /// Both are checked and all failures collected before returning.
    pub fn validate(&self, event_type: &str, data: &Value, meta: &Value) -> Result<(), ValidationError> {
        let mut error = ValidationError::default();

        if let Some(schema) = self.data_schemas.get(event_type) {
            error.data_errors.extend(schema.iter_errors(data).map(|e| e.to_string()));
        }
        if let Some(schema) = self.meta_schemas.get(event_type) {
            error.meta_errors.extend(schema.iter_errors(meta).map(|e| e.to_string()));
        }

        if error.is_empty() {
            Ok(())
        } else {
            Err(error)
        }
    }

    /// Walks a directory tree of event-definition JSON files (see module docs), registering
    /// one event type per non-reserved file. `$definitions.json` at any directory level
    /// contributes shared sub-schemas referenced from sibling files as `#/definitions/<name>`.
    pub fn load_dir(&mut self, root: impl AsRef<Path>) -> Result<(), RegistryError> {
        self.load_dir_with_definitions(root.as_ref(), &Value::Object(Default::default()))
    }

    fn load_dir_with_definitions(&mut self, dir: &Path, inherited: &Value) -> Result<(), RegistryError> {
        let definitions_path = dir.join(DEFINITIONS_FILE);
        let own_definitions = if definitions_path.is_file() {
            read_json(&definitions_path)?
        } else {
            Value::Object(Default::default())
        };
        let definitions = merge_objects(inherited, &own_definitions);

        let entries = fs::read_dir(dir).map_err(|source| RegistryError::Io {
            path: dir.display().to_string(),
            source,
        })?;

        for entry in entries {
            let entry = entry.map_err(|source| RegistryError::Io {
                path: dir.display().to_string(),
                source,
            })?;
            let path = entry.path();

            if path.is_dir() {
                self.load_dir_with_definitions(&path, &definitions)?;
                continue;
            }

            let is_definitions_file = path.file_name().map(|n| n == DEFINITIONS_FILE).unwrap_or(false);
            let is_json = path.extension().map(|e| e == "json").unwrap_or(false);
            if is_definitions_file || !is_json {
                continue;
            }

            let definition = read_json(&path)?;
            self.register_event_definition(&definition, &definitions)?;
        }

        Ok(())
    }

    fn register_event_definition(&mut self, definition: &Value, definitions: &Value) -> Result<(), RegistryError> {
        let event_type = definition
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        self.known_types.insert(event_type.clone());

        if let Some(data) = definition.get("data") {
            let schema = wrap_properties(data, definitions);
            self.register_data_schema(event_type.clone(), &schema)?;
        }
        if let Some(meta) = definition.get("meta") {
            let schema = wrap_properties(meta, definitions);
            self.register_meta_schema(event_type, &schema)?;
        }

        Ok(())
    }
}

fn compile(event_type: &str, schema: &Value) -> Result<Validator, RegistryError> {
    jsonschema::validator_for(schema).map_err(|source| RegistryError::Schema {
        event_type: event_type.to_string(),
        message: source.to_string(),
    })
}

fn read_json(path: &Path) -> Result<Value, RegistryError> {
    let raw = fs::read_to_string(path).map_err(|source| RegistryError::Io {
        path: path.display().to_string(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| RegistryError::Json {
        path: path.display().to_string(),
        source,
    })
}

fn wrap_properties(properties: &Value, definitions: &Value) -> Value {
    serde_json::json!({
        "type": "object",
        "properties": properties,
        "definitions": definitions,
    })
}

fn merge_objects(base: &Value, overlay: &Value) -> Value {
    let mut merged = base.as_object().cloned().unwrap_or_default();
    if let Some(overlay) = overlay.as_object() {
        for (k, v) in overlay {
            merged.insert(k.clone(), v.clone());
        }
    }
    Value::Object(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn missing_schema_means_unvalidated() {
        let mut registry = ValidatorRegistry::new();
        registry.register_type("user:created");
        assert!(registry.has_event_type("user:created"));
        assert!(registry.validate("user:created", &json!({"anything": true}), &Value::Null).is_ok());
    }

    #[test]
    fn collects_both_data_and_meta_errors() {
        let mut registry = ValidatorRegistry::new();
        registry
            .register_data_schema(
                "user:created",
                &json!({"type": "object", "required": ["email"]}),
            )
            .unwrap();
        registry
            .register_meta_schema("user:created", &json!({"type": "object", "required": ["actor"]}))
            .unwrap();

        let err = registry
            .validate("user:created", &json!({}), &json!({}))
            .unwrap_err();

        assert_eq!(err.data_errors.len(), 1);
        assert_eq!(err.meta_errors.len(), 1);
    }

    #[test]
    fn valid_payload_passes() {
        let mut registry = ValidatorRegistry::new();
        registry
            .register_data_schema("user:created", &json!({"type": "object", "required": ["email"]}))
            .unwrap();

        assert!(registry
            .validate("user:created", &json!({"email": "jane@x"}), &Value::Null)
            .is_ok());
    }

    #[test]
    fn load_dir_resolves_shared_definitions() {
        let dir = std::env::temp_dir().join(format!("chronostore-validator-test-{}", crate::id::generate()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join("$definitions.json"),
            json!({"name": {"type": "object", "properties": {"given": {"type": "string"}}}}).to_string(),
        )
        .unwrap();
        std::fs::write(
            dir.join("user_created.json"),
            json!({
                "type": "user:created",
                "data": {"name": {"$ref": "#/definitions/name"}},
            })
            .to_string(),
        )
        .unwrap();

        let mut registry = ValidatorRegistry::new();
        registry.load_dir(&dir).unwrap();

        assert!(registry.has_event_type("user:created"));
        assert!(registry
            .validate(
                "user:created",
                &json!({"name": {"given": "Jane"}}),
                &Value::Null
            )
            .is_ok());
        assert!(registry
            .validate("user:created", &json!({"name": {"given": 1}}), &Value::Null)
            .is_err());

        std::fs::remove_dir_all(&dir).ok();
    }
}
