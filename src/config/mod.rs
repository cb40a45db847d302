//! Configuration module
//!
//! Provides configuration management for the Fluentd forward exporter including
//! loading from YAML files, environment variables, and programmatic API.

pub mod loader;
pub mod types;

pub use loader::ConfigLoader;
pub use types::{ConfigBuilder, ExportMode, FluentdConfig, TransportFormat};
