//! Traversal, object and filter specs

use collector_interface::ObjectRef;
use serde::{Deserialize, Serialize};

use super::property::PropertySpec;

/// One hop of recursion from a starting object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraversalSpec {
    #[serde(rename = "type")]
    pub type_name: String,
    pub path: String,
    pub skip: bool,
}

impl TraversalSpec {
    /// Follow a container view into its members
    pub fn container_view() -> Self {
        Self {
            type_name: "ContainerView".to_string(),
            path: "view".to_string(),
            skip: false,
        }
    }
}

/// Starting object for a filter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectSpec {
    pub obj: ObjectRef,
    pub skip: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub select_set: Vec<TraversalSpec>,
}

impl ObjectSpec {
    /// Just this object, no traversal
    pub fn single(obj: ObjectRef) -> Self {
        Self {
            obj,
            skip: false,
            select_set: Vec::new(),
        }
    }

    /// Rooted at `view`, excluding the view itself but walking into it
    pub fn through_view(view: ObjectRef, traversal: TraversalSpec) -> Self {
        Self {
            obj: view,
            skip: true,
            select_set: vec![traversal],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyFilterSpec {
    pub prop_set: Vec<PropertySpec>,
    pub object_set: Vec<ObjectSpec>,
}
