/*!
 * vsphere-collector - property collector client
 *
 * Client-side building blocks for a vSphere-style property collector:
 * - Scoped bulk property retrieval through recursive container views
 * - Long-poll waits for named properties to reach expected values
 * - Power-on orchestration for one or many virtual machines on top of the wait
 *
 * The transport (handshake, serialization, socket retry) is supplied by the
 * caller through the `CommandInvoker` trait.
 */

pub mod client;
pub mod config;
pub mod error;
pub mod invoker;
pub mod logging;
pub mod poller;
pub mod retrieve;
pub mod spec;
pub mod task;
pub mod wire;

// Re-export commonly used types
pub use client::{Client, ReadySignal};
pub use collector_interface::{
    CommandInvoker, InvokeError, ObjectRef, Schema, ServiceContent, SpecValidator, ValidationError,
};
pub use config::{ClientConfig, LogLevel};
pub use error::{CollectorError, Result};
pub use poller::{PollState, PropertyUpdatePoller, PropertyValues, WaitTarget};
pub use retrieve::{ContainerViewBuilder, PropertyRetriever, VmPowerState};
pub use spec::{PathList, PropertySpec, SchemaValidator, Selector, SpecBuilder, ValueList};
pub use task::{PowerOnOutcome, TargetOutcome, TaskOrchestrator, Targets};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
