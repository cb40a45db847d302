//! OpenTelemetry SDK span exporter bridge
//!
//! Implements `opentelemetry_sdk::trace::SpanExporter` on top of
//! [`FluentdTraceExporter`], converting each finished `SpanData` through the
//! record accumulator surface. The underlying exporter is synchronous; the
//! returned future is already resolved.

use std::sync::{Arc, Mutex};

use futures::FutureExt;
use futures::future::BoxFuture;
use opentelemetry::trace::{SpanKind as OtelSpanKind, Status};
use opentelemetry::{Array, Value as OtelValue};
use opentelemetry_sdk::Resource;
use opentelemetry_sdk::error::{OTelSdkError, OTelSdkResult};
use opentelemetry_sdk::trace::{SpanData, SpanExporter};
use tracing::warn;

use crate::config::FluentdConfig;
use crate::error::FluentdError;
use crate::fluentd::recordable::{SpanKind, SpanRecord, StatusCode};
use crate::fluentd::value::{AttributeValue, EventTime};
use crate::fluentd::{ExportResult, FluentdTraceExporter};

/// SDK-facing span exporter backed by a Fluentd forward transport.
#[derive(Clone, Debug)]
pub struct FluentdSpanExporter {
    inner: Arc<Mutex<FluentdTraceExporter>>,
    resource_tag: Option<String>,
}

impl FluentdSpanExporter {
    /// Create an exporter for the configured endpoint.
    pub fn new(config: FluentdConfig) -> Result<Self, FluentdError> {
        let exporter = FluentdTraceExporter::new(config)?;
        Ok(Self {
            inner: Arc::new(Mutex::new(exporter)),
            resource_tag: None,
        })
    }

    fn convert(&self, span: SpanData) -> SpanRecord {
        let mut record = SpanRecord::new();

        record.set_identity(
            &span.span_context.trace_id().to_bytes(),
            &span.span_context.span_id().to_bytes(),
            &span.parent_span_id.to_bytes(),
        );
        record.set_name(&span.name);
        record.set_span_kind(convert_span_kind(&span.span_kind));

        let start = EventTime::from_system_time(span.start_time);
        record.set_start_time(EventTime::from_parts(start.seconds, start.nanos));
        record.set_duration(
            span.end_time
                .duration_since(span.start_time)
                .unwrap_or_default(),
        );

        match span.status {
            Status::Unset => {}
            Status::Ok => record.set_status(StatusCode::Ok, ""),
            Status::Error { description } => {
                record.set_status(StatusCode::Error, &description);
            }
        }

        for kv in &span.attributes {
            record.set_attribute(kv.key.as_str(), convert_attribute(&kv.value));
        }

        for event in span.events {
            let time = EventTime::from_system_time(event.timestamp);
            let attributes = event
                .attributes
                .iter()
                .map(|kv| (kv.key.to_string(), convert_attribute(&kv.value)))
                .collect::<Vec<_>>();
            record.add_event(
                &event.name,
                EventTime::from_parts(time.seconds, time.nanos),
                attributes,
            );
        }

        record.set_instrumentation_scope(
            span.instrumentation_scope.name(),
            span.instrumentation_scope.version().unwrap_or_default(),
        );

        if let Some(tag) = &self.resource_tag {
            record.set_resource([("tag", AttributeValue::Str(tag.clone()))]);
        }

        record
    }
}

impl SpanExporter for FluentdSpanExporter {
    #[allow(refining_impl_trait_reachable)]
    fn export(&self, batch: Vec<SpanData>) -> BoxFuture<'static, OTelSdkResult> {
        let records = batch
            .into_iter()
            .map(|span| self.convert(span))
            .collect::<Vec<_>>();

        // The exporter blocks on the calling thread; by the time the future
        // exists the batch is already delivered or dropped.
        let mut exporter = self
            .inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let result = match exporter.export(records) {
            ExportResult::Success => Ok(()),
            ExportResult::Failure => {
                warn!("fluentd span export failed");
                Err(OTelSdkError::InternalFailure(
                    "fluentd forward delivery failed".to_string(),
                ))
            }
        };
        drop(exporter);

        async move { result }.boxed()
    }

    fn shutdown(&mut self) -> OTelSdkResult {
        let exporter = self
            .inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        exporter.shutdown(std::time::Duration::ZERO);
        Ok(())
    }

    fn set_resource(&mut self, resource: &Resource) {
        for (key, value) in resource.iter() {
            if key.as_str() == "tag" {
                // Only a string tag is honored, everything else is ignored
                if let OtelValue::String(tag) = value {
                    self.resource_tag = Some(tag.to_string());
                }
            }
        }
    }
}

fn convert_span_kind(kind: &OtelSpanKind) -> SpanKind {
    match kind {
        OtelSpanKind::Client => SpanKind::Client,
        OtelSpanKind::Server => SpanKind::Server,
        OtelSpanKind::Producer => SpanKind::Producer,
        OtelSpanKind::Consumer => SpanKind::Consumer,
        OtelSpanKind::Internal => SpanKind::Internal,
    }
}

fn convert_attribute(value: &OtelValue) -> AttributeValue {
    match value {
        OtelValue::Bool(v) => AttributeValue::Bool(*v),
        OtelValue::I64(v) => AttributeValue::I64(*v),
        OtelValue::F64(v) => AttributeValue::F64(*v),
        OtelValue::String(v) => AttributeValue::Str(v.to_string()),
        OtelValue::Array(Array::Bool(vs)) => AttributeValue::BoolArray(vs.clone()),
        OtelValue::Array(Array::I64(vs)) => AttributeValue::I64Array(vs.clone()),
        OtelValue::Array(Array::F64(vs)) => AttributeValue::F64Array(vs.clone()),
        OtelValue::Array(Array::String(vs)) => {
            AttributeValue::StrArray(vs.iter().map(|v| v.to_string()).collect())
        }
        other => AttributeValue::Str(format!("{:?}", other)),
    }
}
