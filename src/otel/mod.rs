//! OpenTelemetry SDK integration
//!
//! Adapters that plug the Fluentd exporters into the OpenTelemetry SDK's
//! pipeline traits.

pub mod trace;

pub use trace::FluentdSpanExporter;
