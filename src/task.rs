//! Power-on orchestration on top of the property wait
//!
//! Each target goes through the same sequence:
//! `PowerOnVM_Task` → task reference → wait on `info.state` until it reads
//! `success` or `error` → task state or task fault.
//!
//! Several targets run concurrently and report in completion order.

use collector_interface::{CommandInvoker, ObjectRef};
use futures::stream::{self, FuturesUnordered, StreamExt};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, error, info};

use crate::error::{CollectorError, Result};
use crate::poller::{PropertyUpdatePoller, PropertyValues};
use crate::wire::{returnval_ref, scalar_text};

pub(crate) const POWER_ON_VM_TASK: &str = "PowerOnVM_Task";

const TASK_FILTER_PROPS: [&str; 2] = ["info.state", "info.error"];
const TASK_END_WAIT_PROP: &str = "state";
const TASK_TERMINAL_STATES: [&str; 2] = ["success", "error"];

/// One or many power-on targets
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Targets {
    One(ObjectRef),
    Many(Vec<ObjectRef>),
}

impl From<ObjectRef> for Targets {
    fn from(target: ObjectRef) -> Self {
        Targets::One(target)
    }
}

impl From<Vec<ObjectRef>> for Targets {
    fn from(targets: Vec<ObjectRef>) -> Self {
        Targets::Many(targets)
    }
}

impl From<&[ObjectRef]> for Targets {
    fn from(targets: &[ObjectRef]) -> Self {
        Targets::Many(targets.to_vec())
    }
}

/// How one target of a multi-target power-on ended
#[derive(Debug)]
pub struct TargetOutcome {
    pub target: ObjectRef,
    /// Final task state, or why the power-on did not succeed
    pub result: Result<String>,
}

impl TargetOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

#[derive(Debug)]
pub enum PowerOnOutcome {
    /// Task state of the single target
    Single(String),
    /// Every target, in completion order
    Many(Vec<TargetOutcome>),
}

impl PowerOnOutcome {
    pub fn outcomes(&self) -> &[TargetOutcome] {
        match self {
            PowerOnOutcome::Single(_) => &[],
            PowerOnOutcome::Many(outcomes) => outcomes,
        }
    }
}

pub struct TaskOrchestrator<'a> {
    invoker: Arc<dyn CommandInvoker>,
    poller: PropertyUpdatePoller<'a>,
    concurrency: Option<usize>,
}

impl<'a> TaskOrchestrator<'a> {
    pub fn new(
        invoker: Arc<dyn CommandInvoker>,
        poller: PropertyUpdatePoller<'a>,
        concurrency: Option<usize>,
    ) -> Self {
        Self {
            invoker,
            poller,
            concurrency,
        }
    }

    /// Power on `targets`
    ///
    /// `None` or an empty list fails with an input error before anything is
    /// sent. A single target resolves with its task state or fails with its
    /// task fault. A list resolves once every target has reported; per-target
    /// failures are kept in the list rather than failing the whole call.
    pub async fn power_on(&self, targets: Option<Targets>) -> Result<PowerOnOutcome> {
        match targets {
            None => Err(no_targets()),
            Some(Targets::Many(refs)) if refs.is_empty() => Err(no_targets()),
            Some(Targets::One(vm)) => self.power_on_one(&vm).await.map(PowerOnOutcome::Single),
            Some(Targets::Many(refs)) => Ok(PowerOnOutcome::Many(self.power_on_many(refs).await)),
        }
    }

    async fn power_on_many(&self, refs: Vec<ObjectRef>) -> Vec<TargetOutcome> {
        info!("Powering on {} virtual machines", refs.len());

        let runs = refs.into_iter().map(|vm| async move {
            let result = self.power_on_one(&vm).await;
            TargetOutcome { target: vm, result }
        });

        let outcomes: Vec<TargetOutcome> = match self.concurrency {
            Some(limit) => stream::iter(runs).buffer_unordered(limit).collect().await,
            None => runs.collect::<FuturesUnordered<_>>().collect().await,
        };

        let failed = outcomes.iter().filter(|o| !o.is_success()).count();
        info!(
            "Power-on finished: {} succeeded, {} failed",
            outcomes.len() - failed,
            failed
        );
        outcomes
    }

    async fn power_on_one(&self, vm: &ObjectRef) -> Result<String> {
        let task = self.start_task(vm).await?;
        debug!("Power-on of {} running as {}", vm, task);

        let values = self
            .poller
            .wait_for_values(
                task.clone(),
                TASK_FILTER_PROPS,
                TASK_END_WAIT_PROP,
                TASK_TERMINAL_STATES,
            )
            .await?;

        task_result(task, &values).inspect_err(|e| error!("Power-on of {} failed: {}", vm, e))
    }

    async fn start_task(&self, vm: &ObjectRef) -> Result<ObjectRef> {
        let response = self
            .invoker
            .invoke(POWER_ON_VM_TASK, json!({ "_this": vm }))
            .await
            .inspect_err(|e| error!("{} on {} failed: {}", POWER_ON_VM_TASK, vm, e))?;

        returnval_ref(POWER_ON_VM_TASK, &response)
    }
}

fn no_targets() -> CollectorError {
    CollectorError::Input("no ManagedObjectReference(s) given".to_string())
}

/// `info.state` when no `info.error` was reported, otherwise the fault
fn task_result(task: ObjectRef, values: &PropertyValues) -> Result<String> {
    if let Some(fault) = values.get("info.error").filter(|v| is_reported(v)) {
        return Err(CollectorError::TaskFailed {
            task,
            fault: fault.clone(),
        });
    }

    values
        .get("info.state")
        .and_then(scalar_text)
        .map(|state| state.into_owned())
        .ok_or_else(|| CollectorError::structural("WaitForUpdatesEx", format!("{task} reported no info.state")))
}

fn is_reported(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.is_empty(),
        _ => true,
    }
}
