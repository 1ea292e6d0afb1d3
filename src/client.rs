//! Client: the consumer-facing entry point
//!
//! A `Client` is created together with a [`ReadySignal`]. The transport fires
//! the signal once its handshake completes, handing over the session root
//! descriptor. Until then every entry point that needs the view manager or the
//! property collector fails with [`CollectorError::NotReady`] without touching
//! the network.

use collector_interface::{CommandInvoker, ObjectRef, ServiceContent, SpecValidator};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::config::ClientConfig;
use crate::error::{CollectorError, Result};
use crate::poller::{PropertyUpdatePoller, PropertyValues};
use crate::retrieve::{PropertyRetriever, VmPowerState};
use crate::spec::{PathList, SchemaValidator, Selector, SpecBuilder, ValueList};
use crate::task::{PowerOnOutcome, TaskOrchestrator, Targets};

/// One-time notification that the session is established
///
/// Dropping the signal without firing leaves the client permanently not ready.
#[derive(Debug)]
pub struct ReadySignal {
    sender: watch::Sender<Option<ServiceContent>>,
}

impl ReadySignal {
    pub fn fire(self, content: ServiceContent) {
        info!(
            "Session ready (property collector {})",
            content.property_collector
        );
        self.sender.send_replace(Some(content));
    }
}

/// Property collector client
///
/// Cheap to clone; clones share the invoker, validator and session.
///
/// # Example
///
/// ```rust,no_run
/// use vsphere_collector::{Client, ClientConfig, ObjectRef};
/// # use vsphere_collector::invoker::MockInvoker;
///
/// # async fn example() -> vsphere_collector::Result<()> {
/// # let transport = MockInvoker::new();
/// let (client, _ready) = Client::new(transport, ClientConfig::default());
///
/// // ... the transport fires `_ready` after its handshake ...
/// client.wait_ready().await?;
///
/// let folder = ObjectRef::new("Folder", "group-v3");
/// for vm in client.vm_power_states(&folder).await? {
///     println!("{} is {}", vm.name, vm.power_state);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Client {
    invoker: Arc<dyn CommandInvoker>,
    validator: Arc<dyn SpecValidator>,
    config: Arc<ClientConfig>,
    session: watch::Receiver<Option<ServiceContent>>,
}

impl Client {
    /// Client using the built-in structural spec validator
    pub fn new(invoker: impl CommandInvoker, config: ClientConfig) -> (Self, ReadySignal) {
        Self::with_validator(invoker, SchemaValidator, config)
    }

    pub fn with_validator(
        invoker: impl CommandInvoker,
        validator: impl SpecValidator,
        config: ClientConfig,
    ) -> (Self, ReadySignal) {
        let (sender, session) = watch::channel(None);
        let client = Self {
            invoker: Arc::new(invoker),
            validator: Arc::new(validator),
            config: Arc::new(config),
            session,
        };
        (client, ReadySignal { sender })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn is_ready(&self) -> bool {
        self.session.borrow().is_some()
    }

    /// Session root descriptor, or `NotReady` before the signal fired
    pub fn service_content(&self) -> Result<ServiceContent> {
        self.session.borrow().clone().ok_or(CollectorError::NotReady)
    }

    /// Suspend until the session is ready
    pub async fn wait_ready(&self) -> Result<ServiceContent> {
        let mut session = self.session.clone();
        let content = session
            .wait_for(Option::is_some)
            .await
            .map_err(|_| CollectorError::NotReady)?;
        content.clone().ok_or(CollectorError::NotReady)
    }

    fn specs(&self) -> SpecBuilder<'_> {
        SpecBuilder::new(self.validator.as_ref(), self.config.validate_specs)
    }

    fn poller(&self, content: &ServiceContent) -> PropertyUpdatePoller<'_> {
        PropertyUpdatePoller::new(
            Arc::clone(&self.invoker),
            content.property_collector.clone(),
            self.specs(),
        )
    }

    /// Run an arbitrary remote operation
    pub async fn run_command(&self, operation: &str, args: Value) -> Result<Value> {
        debug!("Running {}", operation);
        Ok(self.invoker.invoke(operation, args).await?)
    }

    /// Selected properties of every `type_name` object below `scope`
    pub async fn retrieve_properties(
        &self,
        scope: &ObjectRef,
        type_name: &str,
        selector: impl Into<Selector>,
    ) -> Result<Value> {
        let content = self.service_content()?;
        PropertyRetriever::new(self.invoker.as_ref(), &content, self.specs())
            .retrieve(scope, type_name, selector)
            .await
    }

    /// Every `type_name` object below `scope`, all properties
    pub async fn refs_in_container(&self, scope: &ObjectRef, type_name: &str) -> Result<Value> {
        let content = self.service_content()?;
        PropertyRetriever::new(self.invoker.as_ref(), &content, self.specs())
            .refs_in_container(scope, type_name)
            .await
    }

    /// Name and power state of every virtual machine below `scope`
    pub async fn vm_power_states(&self, scope: &ObjectRef) -> Result<Vec<VmPowerState>> {
        let content = self.service_content()?;
        PropertyRetriever::new(self.invoker.as_ref(), &content, self.specs())
            .vm_power_states(scope)
            .await
    }

    /// Wait until one of `end_wait_props` on `target` reads one of
    /// `expected_vals`; see [`PropertyUpdatePoller::wait_for_values`]
    pub async fn wait_for_values(
        &self,
        target: ObjectRef,
        filter_props: impl Into<PathList>,
        end_wait_props: impl Into<PathList>,
        expected_vals: impl Into<ValueList>,
    ) -> Result<PropertyValues> {
        let content = self.service_content()?;
        self.poller(&content)
            .wait_for_values(target, filter_props, end_wait_props, expected_vals)
            .await
    }

    /// Power on one or many virtual machines; see [`TaskOrchestrator::power_on`]
    pub async fn power_on_vm_by_refs(&self, targets: Option<Targets>) -> Result<PowerOnOutcome> {
        let content = self.service_content()?;
        TaskOrchestrator::new(
            Arc::clone(&self.invoker),
            self.poller(&content),
            self.config.task_concurrency(),
        )
        .power_on(targets)
        .await
    }
}
