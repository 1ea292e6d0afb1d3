//! Scoped ownership of a server-side property filter

use collector_interface::{CommandInvoker, ObjectRef};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::Result;

pub(crate) const DESTROY_FILTER: &str = "DestroyPropertyFilter";

/// Destroys its filter exactly once
///
/// Callers release explicitly on both the success and the error path. If the
/// owning future is dropped first (for example by an outer timeout), `Drop`
/// hands the destroy call to the current tokio runtime.
pub struct FilterGuard {
    invoker: Arc<dyn CommandInvoker>,
    handle: Option<ObjectRef>,
}

impl FilterGuard {
    pub fn new(invoker: Arc<dyn CommandInvoker>, handle: ObjectRef) -> Self {
        Self {
            invoker,
            handle: Some(handle),
        }
    }

    pub fn handle(&self) -> Option<&ObjectRef> {
        self.handle.as_ref()
    }

    /// Destroy the filter now
    pub async fn release(mut self) -> Result<()> {
        let Some(handle) = self.handle.take() else {
            return Ok(());
        };

        debug!("Destroying property filter {}", handle);
        self.invoker
            .invoke(DESTROY_FILTER, json!({ "_this": handle }))
            .await?;
        Ok(())
    }
}

impl Drop for FilterGuard {
    fn drop(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };

        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                let invoker = Arc::clone(&self.invoker);
                runtime.spawn(async move {
                    if let Err(e) = invoker.invoke(DESTROY_FILTER, json!({ "_this": handle })).await {
                        warn!("Failed to destroy abandoned filter {}: {}", handle, e);
                    }
                });
            }
            Err(_) => warn!("No runtime to destroy abandoned filter {}", handle),
        }
    }
}
