//! Scoped bulk property retrieval
//!
//! A retrieval creates a recursive container view over `scope`, then asks the
//! property collector for the selected properties of every object in it:
//!
//! ```text
//! CreateContainerView(scope, type, recursive)
//!         │ view
//!         ▼
//! PropertyFilterSpec { PropertySpec(type, selector),
//!                      ObjectSpec(view, skip) ─▶ TraversalSpec(view.view) }
//!         │
//!         ▼
//! RetrievePropertiesEx ─▶ raw result
//! ```

use collector_interface::{CommandInvoker, ObjectRef, ServiceContent};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, error};

use crate::error::{CollectorError, Result};
use crate::spec::{ObjectSpec, Selector, SpecBuilder};
use crate::wire::{returnval_ref, scalar_text, ObjectContent, RetrieveResult};

pub(crate) const CREATE_CONTAINER_VIEW: &str = "CreateContainerView";
pub(crate) const RETRIEVE_PROPERTIES: &str = "RetrievePropertiesEx";

const VIRTUAL_MACHINE: &str = "VirtualMachine";
const SUMMARY: &str = "summary";

/// Name and power state of one virtual machine
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VmPowerState {
    pub obj: ObjectRef,
    pub name: String,
    pub power_state: String,
}

/// Creates recursive container views through the view manager
pub struct ContainerViewBuilder<'a> {
    invoker: &'a dyn CommandInvoker,
    view_manager: &'a ObjectRef,
}

impl<'a> ContainerViewBuilder<'a> {
    pub fn new(invoker: &'a dyn CommandInvoker, view_manager: &'a ObjectRef) -> Self {
        Self {
            invoker,
            view_manager,
        }
    }

    /// View over every `type_name` object below `scope`
    pub async fn create(&self, scope: &ObjectRef, type_name: &str) -> Result<ObjectRef> {
        debug!("Creating container view over {} for {}", scope, type_name);

        let response = self
            .invoker
            .invoke(
                CREATE_CONTAINER_VIEW,
                json!({
                    "_this": self.view_manager,
                    "container": scope,
                    "type": type_name,
                    "recursive": true,
                }),
            )
            .await?;

        returnval_ref(CREATE_CONTAINER_VIEW, &response)
    }
}

pub struct PropertyRetriever<'a> {
    invoker: &'a dyn CommandInvoker,
    content: &'a ServiceContent,
    specs: SpecBuilder<'a>,
}

impl<'a> PropertyRetriever<'a> {
    pub fn new(
        invoker: &'a dyn CommandInvoker,
        content: &'a ServiceContent,
        specs: SpecBuilder<'a>,
    ) -> Self {
        Self {
            invoker,
            content,
            specs,
        }
    }

    /// Selected properties of every `type_name` object below `scope`, as
    /// returned by the collector
    pub async fn retrieve(
        &self,
        scope: &ObjectRef,
        type_name: &str,
        selector: impl Into<Selector>,
    ) -> Result<Value> {
        let view = ContainerViewBuilder::new(self.invoker, &self.content.view_manager)
            .create(scope, type_name)
            .await
            .inspect_err(|e| error!("Failed to create container view over {}: {}", scope, e))?;

        let prop_spec = self.specs.property_spec(type_name, selector).await?;
        let traversal = self.specs.container_traversal().await?;
        let object_spec = self
            .specs
            .object_spec(ObjectSpec::through_view(view, traversal))
            .await?;
        let filter_spec = self
            .specs
            .filter_spec(vec![prop_spec], vec![object_spec])
            .await?;

        let args = json!({
            "_this": self.content.property_collector,
            "specSet": [filter_spec],
            "options": {},
        });

        self.invoker
            .invoke(RETRIEVE_PROPERTIES, args.clone())
            .await
            .map_err(|e| {
                error!("{} failed: {} (request: {})", RETRIEVE_PROPERTIES, e, args);
                CollectorError::from(e)
            })
    }

    /// Every `type_name` object below `scope`, with all of its properties
    pub async fn refs_in_container(&self, scope: &ObjectRef, type_name: &str) -> Result<Value> {
        self.retrieve(scope, type_name, Selector::All).await
    }

    /// Name and power state of every virtual machine below `scope`
    ///
    /// An empty container yields an empty list.
    pub async fn vm_power_states(&self, scope: &ObjectRef) -> Result<Vec<VmPowerState>> {
        let response = self.retrieve(scope, VIRTUAL_MACHINE, SUMMARY).await?;
        let result = RetrieveResult::from_response(&response)?;

        debug!("Projecting {} virtual machines below {}", result.objects.len(), scope);
        result.objects.iter().map(project_power_state).collect()
    }
}

fn project_power_state(object: &ObjectContent) -> Result<VmPowerState> {
    let summary = object
        .property(SUMMARY)
        .ok_or_else(|| missing(&object.obj, SUMMARY))?;

    let name = summary
        .pointer("/config/name")
        .and_then(scalar_text)
        .ok_or_else(|| missing(&object.obj, "summary.config.name"))?;
    let power_state = summary
        .pointer("/runtime/powerState")
        .and_then(scalar_text)
        .ok_or_else(|| missing(&object.obj, "summary.runtime.powerState"))?;

    Ok(VmPowerState {
        obj: object.obj.clone(),
        name: name.into_owned(),
        power_state: power_state.into_owned(),
    })
}

fn missing(obj: &ObjectRef, field: &str) -> CollectorError {
    CollectorError::structural(RETRIEVE_PROPERTIES, format!("{obj} has no {field}"))
}
