/*!
 * Error types for the property collector client
 */

use collector_interface::{InvokeError, ObjectRef, ValidationError};
use serde_json::Value;
use std::io;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CollectorError>;

#[derive(Error, Debug)]
pub enum CollectorError {
    /// A constructed request object failed its schema check
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Failure surfaced by the command invoker, passed through unmodified
    #[error(transparent)]
    Transport(#[from] InvokeError),

    /// Response shape is missing fields needed for projection
    #[error("unexpected response shape from {operation}: {detail}")]
    Structural { operation: String, detail: String },

    /// Caller supplied no usable targets
    #[error("invalid input: {0}")]
    Input(String),

    /// Remote task finished in the error state
    #[error("task {task} failed: {fault}")]
    TaskFailed { task: ObjectRef, fault: Value },

    /// Entry point used before the session root descriptor arrived
    #[error("session is not ready")]
    NotReady,

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl CollectorError {
    pub(crate) fn structural(operation: &str, detail: impl Into<String>) -> Self {
        CollectorError::Structural {
            operation: operation.to_string(),
            detail: detail.into(),
        }
    }

    /// True for failures that came from the remote side or the wire
    pub fn is_transport(&self) -> bool {
        matches!(self, CollectorError::Transport(_))
    }
}
