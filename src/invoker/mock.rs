//! Scripted command invoker for testing
//!
//! This provides an in-memory implementation of `CommandInvoker` that answers
//! from per-operation scripts and records every call, so the client can be
//! exercised without a live service.

use async_trait::async_trait;
use collector_interface::{CommandInvoker, InvokeError};
use serde_json::Value;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

type Responder = Box<dyn Fn(&Value) -> Result<Value, InvokeError> + Send + Sync>;

/// One call seen by the mock
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub operation: String,
    pub args: Value,
}

#[derive(Default)]
struct MockState {
    scripted: HashMap<String, VecDeque<Result<Value, InvokeError>>>,
    responders: HashMap<String, Responder>,
    hanging: HashSet<String>,
    calls: Vec<RecordedCall>,
    in_flight: HashMap<String, usize>,
    max_in_flight: HashMap<String, usize>,
}

/// Scripted `CommandInvoker`
///
/// Answers are looked up per operation: queued responses first (in order),
/// then a responder closure. Operations marked with [`MockInvoker::hang`]
/// never complete. Clones share state, so a test can keep one handle and give
/// another to the client.
///
/// # Example
///
/// ```rust
/// use vsphere_collector::invoker::MockInvoker;
/// use vsphere_collector::CommandInvoker;
/// use serde_json::json;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let invoker = MockInvoker::new();
/// invoker.push("CurrentTime", json!({ "returnval": "2024-01-01T00:00:00Z" }));
///
/// let out = invoker.invoke("CurrentTime", json!({})).await.unwrap();
/// assert_eq!(out["returnval"], "2024-01-01T00:00:00Z");
/// assert_eq!(invoker.call_count("CurrentTime"), 1);
/// # }
/// ```
#[derive(Clone, Default)]
pub struct MockInvoker {
    state: Arc<Mutex<MockState>>,
}

impl MockInvoker {
    /// Create a mock with no scripted answers
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        // A panicking test thread must not hide the calls recorded so far
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Queue a successful response for `operation`
    pub fn push(&self, operation: &str, response: Value) {
        self.push_result(operation, Ok(response));
    }

    /// Queue a failure for `operation`
    pub fn push_error(&self, operation: &str, error: InvokeError) {
        self.push_result(operation, Err(error));
    }

    fn push_result(&self, operation: &str, result: Result<Value, InvokeError>) {
        self.lock()
            .scripted
            .entry(operation.to_string())
            .or_default()
            .push_back(result);
    }

    /// Answer `operation` from `responder` once its queue is exhausted
    pub fn respond_with<F>(&self, operation: &str, responder: F)
    where
        F: Fn(&Value) -> Result<Value, InvokeError> + Send + Sync + 'static,
    {
        self.lock()
            .responders
            .insert(operation.to_string(), Box::new(responder));
    }

    /// Never complete calls to `operation`
    pub fn hang(&self, operation: &str) {
        self.lock().hanging.insert(operation.to_string());
    }

    /// Every call, in the order it was issued
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.lock().calls.clone()
    }

    /// Calls to one operation, in order
    pub fn calls_to(&self, operation: &str) -> Vec<RecordedCall> {
        self.lock()
            .calls
            .iter()
            .filter(|c| c.operation == operation)
            .cloned()
            .collect()
    }

    pub fn call_count(&self, operation: &str) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|c| c.operation == operation)
            .count()
    }

    /// Highest number of simultaneously outstanding calls to `operation`
    pub fn max_in_flight(&self, operation: &str) -> usize {
        self.lock()
            .max_in_flight
            .get(operation)
            .copied()
            .unwrap_or(0)
    }

    fn begin(&self, operation: &str, args: &Value) -> Option<Result<Value, InvokeError>> {
        let mut state = self.lock();
        state.calls.push(RecordedCall {
            operation: operation.to_string(),
            args: args.clone(),
        });

        let current = {
            let count = state.in_flight.entry(operation.to_string()).or_insert(0);
            *count += 1;
            *count
        };
        let max = state.max_in_flight.entry(operation.to_string()).or_insert(0);
        *max = (*max).max(current);

        if state.hanging.contains(operation) {
            return None;
        }

        let scripted = state
            .scripted
            .get_mut(operation)
            .and_then(VecDeque::pop_front);

        Some(match scripted {
            Some(result) => result,
            None => match state.responders.get(operation) {
                Some(responder) => responder(args),
                None => Err(InvokeError::Fault {
                    operation: operation.to_string(),
                    message: "no scripted response".to_string(),
                }),
            },
        })
    }

    fn finish(&self, operation: &str) {
        if let Some(count) = self.lock().in_flight.get_mut(operation) {
            *count = count.saturating_sub(1);
        }
    }
}

#[async_trait]
impl CommandInvoker for MockInvoker {
    async fn invoke(&self, operation: &str, args: Value) -> Result<Value, InvokeError> {
        let Some(result) = self.begin(operation, &args) else {
            return std::future::pending().await;
        };

        // Let other logical callers run while this call is "on the wire"
        tokio::task::yield_now().await;

        self.finish(operation);
        result
    }
}
