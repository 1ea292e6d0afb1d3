//! Default structural validator for request specs

use async_trait::async_trait;
use collector_interface::{Schema, SpecValidator, ValidationError};
use serde_json::Value;

/// Checks required fields, field types and the one-traversal-per-object rule
///
/// Knows nothing about which types or paths exist on the server.
#[derive(Debug, Clone, Copy, Default)]
pub struct SchemaValidator;

type Check = Result<(), String>;

#[async_trait]
impl SpecValidator for SchemaValidator {
    async fn validate(&self, candidate: &Value, schema: Schema) -> Result<(), ValidationError> {
        let outcome = match schema {
            Schema::PropertySpec => check_property_spec(candidate),
            Schema::TraversalSpec => check_traversal_spec(candidate),
            Schema::ObjectSpec => check_object_spec(candidate),
            Schema::PropertyFilterSpec => check_filter_spec(candidate),
        };
        outcome.map_err(|reason| ValidationError::new(schema, reason))
    }
}

fn non_empty_str(value: &Value, field: &str) -> Check {
    match value.get(field) {
        Some(Value::String(s)) if !s.is_empty() => Ok(()),
        Some(Value::String(_)) => Err(format!("{field} is empty")),
        Some(_) => Err(format!("{field} must be a string")),
        None => Err(format!("{field} is required")),
    }
}

fn optional_bool(value: &Value, field: &str) -> Check {
    match value.get(field) {
        None | Some(Value::Bool(_)) => Ok(()),
        Some(_) => Err(format!("{field} must be a boolean")),
    }
}

fn non_empty_array<'v>(value: &'v Value, field: &str) -> Result<&'v Vec<Value>, String> {
    match value.get(field) {
        Some(Value::Array(items)) if !items.is_empty() => Ok(items),
        Some(Value::Array(_)) => Err(format!("{field} must not be empty")),
        Some(_) => Err(format!("{field} must be an array")),
        None => Err(format!("{field} is required")),
    }
}

fn check_object_ref(value: &Value, field: &str) -> Check {
    let obj = value
        .get(field)
        .filter(|v| v.is_object())
        .ok_or_else(|| format!("{field} must be a managed object reference"))?;
    non_empty_str(obj, "type").map_err(|e| format!("{field}.{e}"))?;
    non_empty_str(obj, "value").map_err(|e| format!("{field}.{e}"))
}

fn check_property_spec(value: &Value) -> Check {
    non_empty_str(value, "type")?;
    optional_bool(value, "all")?;

    let fetch_all = value.get("all").and_then(Value::as_bool).unwrap_or(false);
    match value.get("pathSet") {
        None if fetch_all => Ok(()),
        None => Err("pathSet is required unless all is set".to_string()),
        Some(_) => {
            let paths = non_empty_array(value, "pathSet")?;
            if paths.iter().all(|p| p.as_str().is_some_and(|s| !s.is_empty())) {
                Ok(())
            } else {
                Err("pathSet entries must be non-empty strings".to_string())
            }
        }
    }
}

fn check_traversal_spec(value: &Value) -> Check {
    non_empty_str(value, "type")?;
    non_empty_str(value, "path")?;
    optional_bool(value, "skip")
}

fn check_object_spec(value: &Value) -> Check {
    check_object_ref(value, "obj")?;
    optional_bool(value, "skip")?;

    match value.get("selectSet") {
        None => Ok(()),
        Some(Value::Array(set)) if set.len() > 1 => {
            Err(format!("selectSet holds {} traversals, at most one allowed", set.len()))
        }
        Some(Value::Array(set)) => set.iter().try_for_each(check_traversal_spec),
        Some(_) => Err("selectSet must be an array".to_string()),
    }
}

fn check_filter_spec(value: &Value) -> Check {
    non_empty_array(value, "propSet")?
        .iter()
        .try_for_each(check_property_spec)
        .map_err(|e| format!("propSet: {e}"))?;
    non_empty_array(value, "objectSet")?
        .iter()
        .try_for_each(check_object_spec)
        .map_err(|e| format!("objectSet: {e}"))
}
