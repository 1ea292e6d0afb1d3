//! Long-poll wait for property values
//!
//! `PropertyUpdatePoller` watches named properties on a single object until one
//! of the end-wait properties reports an expected value:
//!
//! ```text
//! Init ─▶ FilterCreated ─▶ Polling ─┬─▶ Terminating ─▶ Done
//!                            ▲      │
//!                            └──────┘ no match yet
//!
//! any transport or decode error ─▶ Failed
//! ```
//!
//! Each wait owns one server-side filter. The filter is destroyed on every exit
//! path: after a match, after a failure, and (through [`FilterGuard`]) when the
//! wait is cancelled by dropping its future.
//!
//! There is no built-in timeout; a wait on a property that never changes stays
//! outstanding until the caller gives up.

mod guard;
mod target;

pub use guard::FilterGuard;
pub use target::{PollState, PropertyValues, WaitTarget};

use collector_interface::{CommandInvoker, ObjectRef};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::error::Result;
use crate::spec::{ObjectSpec, PathList, PropertyFilterSpec, PropertySpec, SpecBuilder, ValueList};
use crate::wire::{returnval_ref, UpdateSet};

pub(crate) const CREATE_FILTER: &str = "CreateFilter";
pub(crate) const WAIT_FOR_UPDATES: &str = "WaitForUpdatesEx";

pub struct PropertyUpdatePoller<'a> {
    invoker: Arc<dyn CommandInvoker>,
    collector: ObjectRef,
    specs: SpecBuilder<'a>,
}

impl<'a> PropertyUpdatePoller<'a> {
    pub fn new(invoker: Arc<dyn CommandInvoker>, collector: ObjectRef, specs: SpecBuilder<'a>) -> Self {
        Self {
            invoker,
            collector,
            specs,
        }
    }

    /// Wait until any of `end_wait_props` on `target` reports one of
    /// `expected_vals`, then return the latest values seen for `filter_props`.
    ///
    /// Each list accepts a bare path or a list of paths. The returned map may
    /// be partial: a filter property the server never reported is absent.
    pub async fn wait_for_values(
        &self,
        target: ObjectRef,
        filter_props: impl Into<PathList>,
        end_wait_props: impl Into<PathList>,
        expected_vals: impl Into<ValueList>,
    ) -> Result<PropertyValues> {
        let mut wait = WaitTarget::new(
            target,
            filter_props.into(),
            end_wait_props.into(),
            expected_vals.into(),
        );
        self.drive(&mut wait).await?;
        Ok(wait.into_filter_values())
    }

    /// Run `wait` to the end; it is left in [`PollState::Done`] on success and
    /// [`PollState::Failed`] on error.
    pub async fn drive(&self, wait: &mut WaitTarget) -> Result<()> {
        let filter = match self.create_filter(wait).await {
            Ok(filter) => filter,
            Err(e) => {
                wait.set_state(PollState::Failed);
                error!("Failed to create filter on {}: {}", wait.target(), e);
                return Err(e);
            }
        };
        wait.set_state(PollState::FilterCreated);

        match self.poll(wait, &filter).await {
            Ok(()) => {
                wait.set_state(PollState::Terminating);
                if let Err(e) = filter.release().await {
                    wait.set_state(PollState::Failed);
                    error!("Failed to destroy filter for {}: {}", wait.target(), e);
                    return Err(e);
                }
                wait.set_state(PollState::Done);
                info!("Wait on {} finished", wait.target());
                Ok(())
            }
            Err(e) => {
                wait.set_state(PollState::Failed);
                error!("Wait on {} failed: {}", wait.target(), e);
                if let Err(cleanup) = filter.release().await {
                    warn!("Filter cleanup after failure also failed: {}", cleanup);
                }
                Err(e)
            }
        }
    }

    async fn create_filter(&self, wait: &WaitTarget) -> Result<FilterGuard> {
        let spec = self.filter_spec(wait).await?;

        debug!("Creating filter on {} for {:?}", wait.target(), wait.filter_props());
        let response = self
            .invoker
            .invoke(
                CREATE_FILTER,
                json!({
                    "_this": self.collector,
                    "spec": spec,
                    "partialUpdates": true,
                }),
            )
            .await?;

        let handle = returnval_ref(CREATE_FILTER, &response)?;
        Ok(FilterGuard::new(Arc::clone(&self.invoker), handle))
    }

    async fn filter_spec(&self, wait: &WaitTarget) -> Result<PropertyFilterSpec> {
        let target = wait.target();
        let prop_spec = PropertySpec::paths(&target.type_name, wait.filter_props());
        let object_spec = self.specs.object_spec(ObjectSpec::single(target.clone())).await?;
        self.specs.filter_spec(vec![prop_spec], vec![object_spec]).await
    }

    /// One outstanding wait call at a time, each driven by the previous one
    async fn poll(&self, wait: &mut WaitTarget, filter: &FilterGuard) -> Result<()> {
        wait.set_state(PollState::Polling);

        loop {
            debug!("Waiting for updates on {} (version {:?})", wait.target(), wait.version());
            let response = self
                .invoker
                .invoke(
                    WAIT_FOR_UPDATES,
                    json!({
                        "_this": self.collector,
                        "version": wait.version(),
                        "options": {},
                    }),
                )
                .await?;

            let Some(update) = UpdateSet::from_response(&response)? else {
                debug!("Empty update set, polling again");
                continue;
            };

            wait.apply(&update, filter.handle());
            if wait.found() {
                return Ok(());
            }
        }
    }
}
