//! Property collector request specs
//!
//! Typed builders for the request objects sent to the property collector:
//! - `PropertySpec`: which properties to fetch for one type
//! - `TraversalSpec` / `ObjectSpec`: where to start and how to recurse
//! - `PropertyFilterSpec`: the (properties, objects) pairing sent on the wire
//!
//! Every spec can be pre-flight checked through a [`SpecValidator`]; the
//! default [`SchemaValidator`] performs structural checks only.

mod filter;
mod property;
mod validate;

pub use filter::{ObjectSpec, PropertyFilterSpec, TraversalSpec};
pub use property::{PathList, PropertySpec, Selector, ValueList};
pub use validate::SchemaValidator;

use collector_interface::{Schema, SpecValidator, ValidationError};
use serde::Serialize;
use tracing::debug;

use crate::error::Result;

/// Builds request specs and runs each through the validator before handing
/// it out
pub struct SpecBuilder<'a> {
    validator: &'a dyn SpecValidator,
    enabled: bool,
}

impl<'a> SpecBuilder<'a> {
    pub fn new(validator: &'a dyn SpecValidator, enabled: bool) -> Self {
        Self { validator, enabled }
    }

    /// Property selection for `type_name`
    pub async fn property_spec(
        &self,
        type_name: &str,
        selector: impl Into<Selector>,
    ) -> Result<PropertySpec> {
        let spec = PropertySpec::new(type_name, selector);
        self.check(&spec, Schema::PropertySpec).await?;
        Ok(spec)
    }

    /// The fixed single-hop traversal into a container view's members
    pub async fn container_traversal(&self) -> Result<TraversalSpec> {
        let spec = TraversalSpec::container_view();
        self.check(&spec, Schema::TraversalSpec).await?;
        Ok(spec)
    }

    pub async fn object_spec(&self, spec: ObjectSpec) -> Result<ObjectSpec> {
        self.check(&spec, Schema::ObjectSpec).await?;
        Ok(spec)
    }

    pub async fn filter_spec(
        &self,
        prop_set: Vec<PropertySpec>,
        object_set: Vec<ObjectSpec>,
    ) -> Result<PropertyFilterSpec> {
        let spec = PropertyFilterSpec {
            prop_set,
            object_set,
        };
        self.check(&spec, Schema::PropertyFilterSpec).await?;
        Ok(spec)
    }

    async fn check<T: Serialize>(&self, spec: &T, schema: Schema) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }

        let candidate = serde_json::to_value(spec)
            .map_err(|e| ValidationError::new(schema, format!("not serializable: {}", e)))?;

        debug!("Validating {}", schema);
        self.validator.validate(&candidate, schema).await?;
        Ok(())
    }
}
