//! Command invoker implementations
//!
//! The real transport lives outside this crate. This module provides:
//! - `MockInvoker`: scripted in-memory implementation for tests and examples

pub mod mock;

pub use mock::{MockInvoker, RecordedCall};
