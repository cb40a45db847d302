//! Mock Fluentd backend for testing
//!
//! Provides an in-process TCP server that accepts forward-protocol
//! messages and exposes them to tests for assertions.

pub mod service;

pub use service::{MockFluentdServer, ReceivedEntry, ReceivedMessage};
