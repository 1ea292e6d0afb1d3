//! Response shapes read back from the property collector
//!
//! The transport hands back loosely shaped JSON: repeated elements arrive as a
//! bare object when there is only one of them, and empty results may be
//! `null`, `{}` or missing a `returnval` altogether. Everything here tolerates
//! both forms.

use collector_interface::ObjectRef;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::borrow::Cow;

use crate::error::{CollectorError, Result};

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

/// Accept `null`, a single element, or a list
pub(crate) fn one_or_many<'de, D, T>(deserializer: D) -> std::result::Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(match Option::<OneOrMany<T>>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(OneOrMany::Many(items)) => items,
        Some(OneOrMany::One(item)) => vec![item],
    })
}

/// The `returnval` of a response, `None` when the response carries nothing
pub(crate) fn returnval(response: &Value) -> Option<&Value> {
    match response.get("returnval") {
        None | Some(Value::Null) => None,
        Some(Value::Object(map)) if map.is_empty() => None,
        Some(value) => Some(value),
    }
}

/// `returnval` decoded as a managed object reference
pub(crate) fn returnval_ref(operation: &str, response: &Value) -> Result<ObjectRef> {
    let value = returnval(response)
        .ok_or_else(|| CollectorError::structural(operation, "response has no returnval"))?;
    ObjectRef::deserialize(value)
        .map_err(|e| CollectorError::structural(operation, format!("returnval is not a reference: {e}")))
}

/// Text form of a scalar property value
///
/// Enumerated values sometimes arrive wrapped as `{"$value": ...}`.
pub fn scalar_text(value: &Value) -> Option<Cow<'_, str>> {
    match value {
        Value::String(s) => Some(Cow::Borrowed(s.as_str())),
        Value::Bool(b) => Some(Cow::Owned(b.to_string())),
        Value::Number(n) => Some(Cow::Owned(n.to_string())),
        Value::Object(map) => map.get("$value").and_then(scalar_text),
        _ => None,
    }
}

// ── WaitForUpdatesEx ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSet {
    pub version: String,
    #[serde(default, deserialize_with = "one_or_many")]
    pub filter_set: Vec<PropertyFilterUpdate>,
}

impl UpdateSet {
    /// Decode a wait response, `None` for an empty wake-up
    pub fn from_response(response: &Value) -> Result<Option<UpdateSet>> {
        let Some(value) = returnval(response) else {
            return Ok(None);
        };

        // An empty filter set carries nothing to fold, version or not
        let empty = match value.get("filterSet") {
            None | Some(Value::Null) => true,
            Some(Value::Array(filters)) => filters.is_empty(),
            Some(_) => false,
        };
        if empty {
            return Ok(None);
        }

        UpdateSet::deserialize(value)
            .map(Some)
            .map_err(|e| CollectorError::structural("WaitForUpdatesEx", e.to_string()))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyFilterUpdate {
    #[serde(default)]
    pub filter: Option<ObjectRef>,
    #[serde(default, deserialize_with = "one_or_many")]
    pub object_set: Vec<ObjectUpdate>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectUpdate {
    pub kind: ObjectUpdateKind,
    #[serde(default)]
    pub obj: Option<ObjectRef>,
    #[serde(default, deserialize_with = "one_or_many")]
    pub change_set: Vec<PropertyChange>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectUpdateKind {
    Enter,
    Modify,
    Leave,
    #[serde(other)]
    Other,
}

impl ObjectUpdateKind {
    pub fn carries_changes(&self) -> bool {
        !matches!(self, ObjectUpdateKind::Other)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PropertyChange {
    pub name: String,
    pub op: PropertyChangeOp,
    #[serde(default)]
    pub val: Value,
}

impl PropertyChange {
    /// Value to record for this change; removals read as an empty string
    pub fn recorded_value(&self) -> Value {
        match self.op {
            PropertyChangeOp::Remove => Value::String(String::new()),
            _ => self.val.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PropertyChangeOp {
    Add,
    Remove,
    #[serde(alias = "modify")]
    Assign,
    IndirectRemove,
    #[serde(other)]
    Other,
}

// ── RetrievePropertiesEx ────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RetrieveResult {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default, deserialize_with = "one_or_many")]
    pub objects: Vec<ObjectContent>,
}

impl RetrieveResult {
    pub fn from_response(response: &Value) -> Result<RetrieveResult> {
        match returnval(response) {
            None => Ok(RetrieveResult::default()),
            Some(value) => RetrieveResult::deserialize(value)
                .map_err(|e| CollectorError::structural("RetrievePropertiesEx", e.to_string())),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectContent {
    pub obj: ObjectRef,
    #[serde(default, deserialize_with = "one_or_many")]
    pub prop_set: Vec<DynamicProperty>,
}

impl ObjectContent {
    pub fn property(&self, name: &str) -> Option<&Value> {
        self.prop_set.iter().find(|p| p.name == name).map(|p| &p.val)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DynamicProperty {
    pub name: String,
    #[serde(default)]
    pub val: Value,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_wait_responses() {
        assert!(UpdateSet::from_response(&Value::Null).unwrap().is_none());
        assert!(UpdateSet::from_response(&json!({})).unwrap().is_none());
        assert!(UpdateSet::from_response(&json!({ "returnval": null }))
            .unwrap()
            .is_none());
        assert!(UpdateSet::from_response(&json!({ "returnval": { "version": "3", "filterSet": [] } }))
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_single_elements_are_lifted() {
        let set = UpdateSet::from_response(&json!({
            "returnval": {
                "version": "1",
                "filterSet": {
                    "filter": { "type": "PropertyFilter", "value": "session[1]f" },
                    "objectSet": {
                        "kind": "modify",
                        "obj": { "type": "Task", "value": "task-1" },
                        "changeSet": { "name": "info.state", "op": "assign", "val": "running" },
                    },
                },
            }
        }))
        .unwrap()
        .unwrap();

        assert_eq!(set.version, "1");
        let object = &set.filter_set[0].object_set[0];
        assert_eq!(object.kind, ObjectUpdateKind::Modify);
        assert_eq!(object.change_set[0].op, PropertyChangeOp::Assign);
        assert_eq!(object.change_set[0].val, json!("running"));
    }

    #[test]
    fn test_unknown_kinds_and_ops() {
        let update: ObjectUpdate = serde_json::from_value(json!({
            "kind": "unknownKind",
            "changeSet": [{ "name": "x", "op": "modify", "val": 1 }, { "name": "y", "op": "weird" }],
        }))
        .unwrap();
        assert!(!update.kind.carries_changes());
        assert_eq!(update.change_set[0].op, PropertyChangeOp::Assign);
        assert_eq!(update.change_set[1].op, PropertyChangeOp::Other);
        assert_eq!(update.change_set[1].val, Value::Null);
    }

    #[test]
    fn test_remove_records_empty_string() {
        let change: PropertyChange =
            serde_json::from_value(json!({ "name": "info.error", "op": "remove", "val": "x" })).unwrap();
        assert_eq!(change.recorded_value(), json!(""));
    }

    #[test]
    fn test_missing_version_is_structural() {
        let response = json!({
            "returnval": {
                "filterSet": [{
                    "objectSet": [{
                        "kind": "modify",
                        "changeSet": [{ "name": "info.state", "op": "assign", "val": "running" }],
                    }],
                }],
            }
        });
        let err = UpdateSet::from_response(&response).unwrap_err();
        assert!(matches!(err, CollectorError::Structural { .. }));
    }

    #[test]
    fn test_empty_filter_set_without_version_is_empty() {
        for response in [
            json!({ "returnval": { "filterSet": [] } }),
            json!({ "returnval": { "filterSet": null } }),
            json!({ "returnval": { "truncated": false } }),
        ] {
            assert!(UpdateSet::from_response(&response).unwrap().is_none(), "{response}");
        }
    }

    #[test]
    fn test_scalar_text_forms() {
        assert_eq!(scalar_text(&json!("success")).as_deref(), Some("success"));
        assert_eq!(scalar_text(&json!({ "$value": "error" })).as_deref(), Some("error"));
        assert_eq!(scalar_text(&json!(true)).as_deref(), Some("true"));
        assert_eq!(scalar_text(&Value::Null), None);
    }

    #[test]
    fn test_returnval_ref() {
        let task = returnval_ref(
            "PowerOnVM_Task",
            &json!({ "returnval": { "type": "Task", "value": "task-7" } }),
        )
        .unwrap();
        assert_eq!(task, ObjectRef::new("Task", "task-7"));

        let err = returnval_ref("PowerOnVM_Task", &json!({ "returnval": "task-7" })).unwrap_err();
        assert!(matches!(err, CollectorError::Structural { .. }));
    }

    #[test]
    fn test_retrieve_result_property_lookup() {
        let result = RetrieveResult::from_response(&json!({
            "returnval": {
                "objects": {
                    "obj": { "type": "VirtualMachine", "value": "vm-1" },
                    "propSet": { "name": "summary", "val": { "config": { "name": "web" } } },
                }
            }
        }))
        .unwrap();
        assert_eq!(result.objects.len(), 1);
        assert!(result.objects[0].property("summary").is_some());
        assert!(result.objects[0].property("name").is_none());
    }
}
