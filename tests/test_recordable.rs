//! Unit tests for span and log record accumulators

use fluent_forward_exporter::fluentd::fields;
use fluent_forward_exporter::fluentd::recordable::{LogRecord, SpanKind, SpanRecord, StatusCode};
use fluent_forward_exporter::fluentd::value::{AttributeValue, EventTime, Value};
use std::time::Duration;

const TRACE_ID: [u8; 16] = [
    0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0a, 0x0b, 0x0c, 0x0d, 0x0e, 0x0f,
    0x10,
];
const SPAN_ID: [u8; 8] = [0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff, 0x00, 0x11];
const PARENT_ID: [u8; 8] = [0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00];

#[test]
fn test_span_identity_is_lowercase_hex() {
    let mut record = SpanRecord::new();
    record.set_identity(&TRACE_ID, &SPAN_ID, &PARENT_ID);

    let buffer = record.finish();
    assert_eq!(
        buffer.options.get(fields::TRACE_ID),
        Some(&Value::Str("0102030405060708090a0b0c0d0e0f10".to_string()))
    );
    assert_eq!(
        buffer.options.get(fields::SPAN_ID),
        Some(&Value::Str("aabbccddeeff0011".to_string()))
    );
    assert_eq!(
        buffer.options.get(fields::SPAN_PARENT_ID),
        Some(&Value::Str("0000000000000000".to_string()))
    );
}

#[test]
fn test_span_attributes_live_under_env_properties() {
    let mut record = SpanRecord::new();
    record.set_attribute("http.method", AttributeValue::Str("GET".into()));
    record.set_attribute("http.status_code", AttributeValue::I64(200));
    // Repeated key overwrites
    record.set_attribute("http.method", AttributeValue::Str("POST".into()));

    let buffer = record.finish();
    let properties = match buffer.options.get(fields::PROPERTIES) {
        Some(Value::Map(map)) => map,
        other => panic!("env_properties should be a map, got {:?}", other),
    };
    assert_eq!(properties.len(), 2);
    assert_eq!(
        properties.get("http.method"),
        Some(&Value::Str("POST".to_string()))
    );
    assert_eq!(properties.get("http.status_code"), Some(&Value::Int(200)));
}

#[test]
fn test_span_status_unset_writes_nothing() {
    let mut record = SpanRecord::new();
    record.set_status(StatusCode::Unset, "ignored");

    let buffer = record.finish();
    assert!(buffer.options.get(fields::TAGS).is_none());
}

#[test]
fn test_span_status_ok_writes_code_only() {
    let mut record = SpanRecord::new();
    record.set_status(StatusCode::Ok, "ignored");

    let buffer = record.finish();
    let tags = match buffer.options.get(fields::TAGS) {
        Some(Value::Map(map)) => map,
        other => panic!("tags should be a map, got {:?}", other),
    };
    assert_eq!(tags.get(fields::STATUS_CODE_TAG), Some(&Value::Int(1)));
    assert!(tags.get(fields::ERROR_TAG).is_none());
}

#[test]
fn test_span_status_error_writes_code_and_description() {
    let mut record = SpanRecord::new();
    record.set_status(StatusCode::Error, "connection refused");

    let buffer = record.finish();
    let tags = match buffer.options.get(fields::TAGS) {
        Some(Value::Map(map)) => map,
        other => panic!("tags should be a map, got {:?}", other),
    };
    assert_eq!(tags.get(fields::STATUS_CODE_TAG), Some(&Value::Int(2)));
    assert_eq!(
        tags.get(fields::ERROR_TAG),
        Some(&Value::Str("connection refused".to_string()))
    );
}

#[test]
fn test_span_kind_internal_is_omitted() {
    let mut record = SpanRecord::new();
    record.set_span_kind(SpanKind::Internal);
    let buffer = record.finish();
    assert!(buffer.options.get(fields::SPAN_KIND).is_none());

    let mut record = SpanRecord::new();
    record.set_span_kind(SpanKind::Server);
    let buffer = record.finish();
    assert_eq!(
        buffer.options.get(fields::SPAN_KIND),
        Some(&Value::Str("SERVER".to_string()))
    );
}

#[test]
fn test_span_instrumentation_scope_coexists_with_status() {
    let mut record = SpanRecord::new();
    record.set_status(StatusCode::Ok, "");
    record.set_instrumentation_scope("my-tracer", "1.2.3");

    let buffer = record.finish();
    let tags = match buffer.options.get(fields::TAGS) {
        Some(Value::Map(map)) => map,
        other => panic!("tags should be a map, got {:?}", other),
    };
    assert_eq!(tags.get(fields::STATUS_CODE_TAG), Some(&Value::Int(1)));
    assert_eq!(
        tags.get(fields::LIBRARY_NAME_TAG),
        Some(&Value::Str("my-tracer".to_string()))
    );
    assert_eq!(
        tags.get(fields::LIBRARY_VERSION_TAG),
        Some(&Value::Str("1.2.3".to_string()))
    );
}

#[test]
fn test_span_duration_writes_env_time_and_nanos() {
    let mut record = SpanRecord::new();
    record.set_duration(Duration::from_millis(250));

    let buffer = record.finish();
    assert_eq!(
        buffer.options.get(fields::DURATION),
        Some(&Value::Int(250_000_000))
    );
    assert!(matches!(
        buffer.options.get(fields::END_TIME),
        Some(Value::EventTime(_))
    ));
}

#[test]
fn test_span_events_keep_append_order() {
    let mut record = SpanRecord::new();
    record.add_event("first", EventTime::from_parts(10, 0), Vec::new());
    record.add_event(
        "second",
        EventTime::from_parts(5, 0),
        vec![("k".to_string(), AttributeValue::Bool(true))],
    );

    let buffer = record.finish();
    assert_eq!(buffer.events.len(), 2);
    assert_eq!(
        buffer.events[0].record.get(fields::NAME),
        Some(&Value::Str("first".to_string()))
    );
    assert_eq!(
        buffer.events[1].record.get(fields::NAME),
        Some(&Value::Str("second".to_string()))
    );
    assert_eq!(buffer.events[1].record.get("k"), Some(&Value::Bool(true)));
}

#[test]
fn test_span_event_zero_timestamp_is_substituted() {
    let mut record = SpanRecord::new();
    record.add_event("e", EventTime::from_parts(0, 0), Vec::new());

    let buffer = record.finish();
    let time = buffer.events[0].time;
    assert!(time.seconds != 0 || time.nanos != 0);
}

#[test]
fn test_span_default_tag_and_resource_override() {
    let record = SpanRecord::new();
    assert_eq!(record.finish().tag, "Span");

    let mut record = SpanRecord::new();
    record.set_resource([
        ("service.name", AttributeValue::Str("svc".into())),
        ("tag", AttributeValue::Str("custom.route".into())),
    ]);
    assert_eq!(record.finish().tag, "custom.route");

    // A non-string tag attribute is ignored
    let mut record = SpanRecord::new();
    record.set_resource([("tag", AttributeValue::I64(42))]);
    assert_eq!(record.finish().tag, "Span");
}

#[test]
fn test_span_end_time_prefers_recorded_value() {
    let mut record = SpanRecord::new();
    record.set_duration(Duration::from_secs(1));
    let buffer = record.finish();

    let recorded = match buffer.options.get(fields::END_TIME) {
        Some(Value::EventTime(ts)) => *ts,
        other => panic!("env_time should be an EventTime, got {:?}", other),
    };
    assert_eq!(buffer.end_time(), recorded);
}

#[test]
fn test_log_severity_number_and_text() {
    let mut record = LogRecord::new();
    record.set_severity(17);

    let buffer = record.finish();
    assert_eq!(
        buffer.fields.get(fields::SEVERITY_TEXT),
        Some(&Value::Str("ERROR".to_string()))
    );
    assert_eq!(buffer.fields.get(fields::SEVERITY_NUMBER), Some(&Value::Int(17)));
}

#[test]
fn test_log_out_of_range_severity_is_invalid() {
    let mut record = LogRecord::new();
    record.set_severity(0);

    let buffer = record.finish();
    assert_eq!(
        buffer.fields.get(fields::SEVERITY_TEXT),
        Some(&Value::Str("INVALID".to_string()))
    );
}

#[test]
fn test_log_body_is_rendered_as_text() {
    let mut record = LogRecord::new();
    record.set_body(AttributeValue::I64(42));
    let buffer = record.finish();
    assert_eq!(
        buffer.fields.get(fields::BODY),
        Some(&Value::Str("42".to_string()))
    );

    // Arrays are not representable and collapse to an empty string
    let mut record = LogRecord::new();
    record.set_body(AttributeValue::StrArray(vec!["a".into()]));
    let buffer = record.finish();
    assert_eq!(
        buffer.fields.get(fields::BODY),
        Some(&Value::Str(String::new()))
    );
}

#[test]
fn test_log_event_id_sets_name_only_when_nonempty() {
    let mut record = LogRecord::new();
    record.set_event_id(99, "");
    let buffer = record.finish();
    assert_eq!(buffer.fields.get(fields::EVENT_ID), Some(&Value::Int(99)));
    assert!(buffer.fields.get(fields::NAME).is_none());

    let mut record = LogRecord::new();
    record.set_event_id(99, "user.login");
    let buffer = record.finish();
    assert_eq!(
        buffer.fields.get(fields::NAME),
        Some(&Value::Str("user.login".to_string()))
    );
}

#[test]
fn test_log_default_tag_and_timestamp_fallback() {
    let record = LogRecord::new();
    let buffer = record.finish();
    assert_eq!(buffer.tag, "Log");

    // No timestamp recorded: the envelope time falls back to "now"
    let ts = buffer.timestamp();
    assert!(ts.seconds != 0 || ts.nanos != 0);
}

#[test]
fn test_log_recorded_timestamp_is_used() {
    let mut record = LogRecord::new();
    record.set_timestamp(EventTime {
        seconds: 1_700_000_000,
        nanos: 123,
    });
    record.set_observed_timestamp(EventTime {
        seconds: 1_700_000_001,
        nanos: 456,
    });

    let buffer = record.finish();
    assert_eq!(
        buffer.timestamp(),
        EventTime {
            seconds: 1_700_000_000,
            nanos: 123
        }
    );
    assert!(matches!(
        buffer.fields.get(fields::OBSERVED_TIMESTAMP),
        Some(Value::EventTime(_))
    ));
}
