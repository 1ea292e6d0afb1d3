//! Collector Interface: the seams between the property collector client and
//! the outside world
//!
//! This crate defines the two collaborators the client depends on but does not
//! implement:
//!
//! 1. **CommandInvoker**: issues a named remote operation and returns its
//!    result. This is the only I/O boundary; authentication, request
//!    serialization and socket-level retry all live behind it.
//! 2. **SpecValidator**: pre-flight checks a constructed request object
//!    against a named schema before it is sent.
//!
//! It also carries the small vocabulary shared by both sides: managed object
//! references and the session root descriptor.
//!
//! # Example
//!
//! ```rust,no_run
//! use collector_interface::{CommandInvoker, ObjectRef};
//! use serde_json::json;
//!
//! async fn power_on<I: CommandInvoker>(invoker: &I, vm: &ObjectRef) -> Result<(), Box<dyn std::error::Error>> {
//!     let task = invoker.invoke("PowerOnVM_Task", json!({ "_this": vm })).await?;
//!     println!("task: {}", task["returnval"]);
//!     Ok(())
//! }
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// Failure surfaced by a [`CommandInvoker`].
///
/// Opaque on purpose: network faults, expired sessions and remote-side
/// faults all look the same from this side of the seam.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InvokeError {
    #[error("transport failure: {0}")]
    Transport(String),

    #[error("session error: {0}")]
    Session(String),

    #[error("remote fault in {operation}: {message}")]
    Fault { operation: String, message: String },
}

/// A constructed request object failed its schema check.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{schema} failed validation: {reason}")]
pub struct ValidationError {
    pub schema: Schema,
    pub reason: String,
}

impl ValidationError {
    pub fn new(schema: Schema, reason: impl Into<String>) -> Self {
        Self {
            schema,
            reason: reason.into(),
        }
    }
}

/// Reference to a remote managed object: (type tag, opaque identifier)
///
/// Supplied by the remote service. The only place these are built locally is
/// when naming a polling target.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectRef {
    #[serde(rename = "type")]
    pub type_name: String,
    pub value: String,
}

impl ObjectRef {
    pub fn new(type_name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            value: value.into(),
        }
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.type_name, self.value)
    }
}

/// Session root descriptor, delivered once after the handshake completes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceContent {
    /// Handle used to create container views
    pub view_manager: ObjectRef,

    /// Handle used for filters, waits and bulk retrieval
    pub property_collector: ObjectRef,
}

/// Request shapes a [`SpecValidator`] knows how to check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Schema {
    PropertySpec,
    TraversalSpec,
    ObjectSpec,
    PropertyFilterSpec,
}

impl Schema {
    /// Wire name of the request type
    pub fn type_name(&self) -> &'static str {
        match self {
            Schema::PropertySpec => "PropertySpec",
            Schema::TraversalSpec => "TraversalSpec",
            Schema::ObjectSpec => "ObjectSpec",
            Schema::PropertyFilterSpec => "PropertyFilterSpec",
        }
    }
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}

/// The single I/O primitive of the client
///
/// Implementations correlate requests and responses themselves, so several
/// invocations may be outstanding at once (one per logical caller).
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync + 'static` to work across async boundaries.
#[async_trait]
pub trait CommandInvoker: Send + Sync + 'static {
    /// Issue `operation` with `args` and resolve with the raw response body.
    ///
    /// A long-poll operation may stay outstanding indefinitely; no timeout is
    /// implied by this trait.
    async fn invoke(&self, operation: &str, args: Value) -> Result<Value, InvokeError>;
}

/// Pre-flight check of constructed request objects
#[async_trait]
pub trait SpecValidator: Send + Sync + 'static {
    async fn validate(&self, candidate: &Value, schema: Schema) -> Result<(), ValidationError>;
}

#[async_trait]
impl<T: CommandInvoker + ?Sized> CommandInvoker for std::sync::Arc<T> {
    async fn invoke(&self, operation: &str, args: Value) -> Result<Value, InvokeError> {
        (**self).invoke(operation, args).await
    }
}

#[async_trait]
impl<T: SpecValidator + ?Sized> SpecValidator for std::sync::Arc<T> {
    async fn validate(&self, candidate: &Value, schema: Schema) -> Result<(), ValidationError> {
        (**self).validate(candidate, schema).await
    }
}
