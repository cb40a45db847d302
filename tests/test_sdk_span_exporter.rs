//! Unit tests for the OpenTelemetry SDK span exporter bridge

use fluent_forward_exporter::config::ConfigBuilder;
use fluent_forward_exporter::mock::MockFluentdServer;
use fluent_forward_exporter::FluentdSpanExporter;
use opentelemetry::trace::{SpanContext, SpanId, SpanKind, Status, TraceFlags, TraceId};
use opentelemetry::KeyValue;
use opentelemetry_sdk::trace::{SpanData, SpanExporter};
use std::time::{Duration, SystemTime};

/// Helper function to create a test span
fn create_test_span(name: &str) -> SpanData {
    let trace_id = TraceId::from_bytes([1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16]);
    let span_id = SpanId::from_bytes([1, 2, 3, 4, 5, 6, 7, 8]);

    let span_context = SpanContext::new(
        trace_id,
        span_id,
        TraceFlags::default(),
        false,
        opentelemetry::trace::TraceState::default(),
    );

    SpanData {
        span_context,
        parent_span_id: SpanId::INVALID,
        span_kind: SpanKind::Server,
        name: std::borrow::Cow::Owned(name.to_string()),
        start_time: SystemTime::now(),
        end_time: SystemTime::now() + Duration::from_secs(1),
        attributes: vec![KeyValue::new("service.name", "test-service")],
        events: opentelemetry_sdk::trace::SpanEvents::default(),
        links: opentelemetry_sdk::trace::SpanLinks::default(),
        status: Status::Ok,
        dropped_attributes_count: 0,
        parent_span_is_remote: false,
        instrumentation_scope: opentelemetry::InstrumentationScope::builder("test").build(),
    }
}

fn record_string(record: &rmpv::Value, key: &str) -> Option<String> {
    record.as_map()?.iter().find_map(|(k, v)| {
        if k.as_str() == Some(key) {
            v.as_str().map(str::to_owned)
        } else {
            None
        }
    })
}

#[test]
fn test_sdk_span_exporter_export() {
    let server = MockFluentdServer::new();
    let endpoint = server.start_endpoint().unwrap();
    let config = ConfigBuilder::new().endpoint(endpoint).build().unwrap();
    let exporter = FluentdSpanExporter::new(config).unwrap();

    let spans = vec![create_test_span("test-span")];

    let result = futures::executor::block_on(exporter.export(spans));
    assert!(result.is_ok(), "Export should succeed");

    let messages = server.wait_for_messages(1, Duration::from_secs(5));
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].tag, "Span");

    let entry = &messages[0].entries[0];
    assert_eq!(
        record_string(&entry.record, "env_dt_traceId"),
        Some("0102030405060708090a0b0c0d0e0f10".to_string())
    );
    assert_eq!(
        record_string(&entry.record, "env_dt_spanId"),
        Some("0102030405060708".to_string())
    );
    assert_eq!(
        record_string(&entry.record, "name"),
        Some("test-span".to_string())
    );
    assert_eq!(record_string(&entry.record, "kind"), Some("SERVER".to_string()));
}

#[test]
fn test_sdk_span_exporter_export_to_unreachable_endpoint_fails() {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let config = ConfigBuilder::new()
        .endpoint(format!("tcp://127.0.0.1:{}", port))
        .build()
        .unwrap();
    let exporter = FluentdSpanExporter::new(config).unwrap();

    let spans = vec![create_test_span("test-span")];
    let result = futures::executor::block_on(exporter.export(spans));

    match result {
        Err(opentelemetry_sdk::error::OTelSdkError::InternalFailure(msg)) => {
            assert!(
                msg.contains("fluentd"),
                "Error message should mention fluentd delivery: {}",
                msg
            );
        }
        other => panic!("Expected InternalFailure error, got {:?}", other),
    }
}

#[test]
fn test_sdk_span_exporter_shutdown() {
    let server = MockFluentdServer::new();
    let endpoint = server.start_endpoint().unwrap();
    let config = ConfigBuilder::new().endpoint(endpoint).build().unwrap();
    let mut exporter = FluentdSpanExporter::new(config).unwrap();

    let result = exporter.shutdown();
    assert!(result.is_ok(), "Shutdown should succeed");

    // Exports after shutdown are rejected
    let spans = vec![create_test_span("test-span")];
    let export_result = futures::executor::block_on(exporter.export(spans));
    assert!(export_result.is_err(), "Export should fail after shutdown");
    assert_eq!(server.message_count(), 0);
}

#[test]
fn test_sdk_span_exporter_resource_tag_routes_messages() {
    let server = MockFluentdServer::new();
    let endpoint = server.start_endpoint().unwrap();
    let config = ConfigBuilder::new().endpoint(endpoint).build().unwrap();
    let mut exporter = FluentdSpanExporter::new(config).unwrap();

    let resource = opentelemetry_sdk::Resource::builder_empty()
        .with_attribute(KeyValue::new("tag", "routed.spans"))
        .build();
    exporter.set_resource(&resource);

    let spans = vec![create_test_span("test-span")];
    let result = futures::executor::block_on(exporter.export(spans));
    assert!(result.is_ok());

    let messages = server.wait_for_messages(1, Duration::from_secs(5));
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].tag, "routed.spans");
}
