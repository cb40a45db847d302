//! Fluentd Forward Exporter Library
//!
//! A Rust library for exporting trace spans and log records to a
//! Fluentd backend over the forward protocol, encoded as MessagePack.
//!
//! # Features
//!
//! - Span and log recordables with Fluentd-shaped field layouts
//! - Forward-protocol batching with optional event-to-trace promotion
//! - MessagePack encoding with the Fluentd EventTime extension
//! - TCP, UDP and Unix-socket transport with bounded retry
//! - OpenTelemetry SDK span-exporter bridge
//! - Configurable via YAML, environment variables, or programmatic API
//! - Mock backend for testing
//!
//! # Example
//!
//! ```no_run
//! use fluent_forward_exporter::{ConfigBuilder, FluentdTraceExporter};
//!
//! # fn example() -> Result<(), fluent_forward_exporter::FluentdError> {
//! let config = ConfigBuilder::new()
//!     .endpoint("tcp://127.0.0.1:24224")
//!     .tag("service.prod")
//!     .build()?;
//! let mut exporter = FluentdTraceExporter::new(config)?;
//!
//! let mut span = exporter.make_recordable();
//! span.set_name("checkout");
//! // ... populate and export
//! let _ = exporter.export(vec![span]);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod fluentd;
pub mod mock;
pub mod otel;

// Re-export public API
pub use config::{ConfigBuilder, ConfigLoader, ExportMode, FluentdConfig, TransportFormat};
pub use error::{FluentdConfigError, FluentdError, FluentdExportError, FluentdTransportError};
pub use fluentd::{
    AttributeValue, EventTime, ExportResult, FluentdLogExporter, FluentdTraceExporter, LogRecord,
    SpanKind, SpanRecord, StatusCode,
};
pub use mock::service::MockFluentdServer;
pub use otel::FluentdSpanExporter;

// Initialize tracing subscriber for structured logging
use tracing_subscriber::EnvFilter;

/// Initialize structured logging
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .init();
}
