//! Span and log record accumulators
//!
//! A record is filled field-by-field by the upstream pipeline, then finalized
//! into an immutable buffer the exporter consumes once. Field names follow
//! the Fluentd exporter conventions (`env_dt_traceId`, `env_properties`, ...).

use std::time::Duration;

use crate::fluentd::batcher::MessageEntry;
use crate::fluentd::fields;
use crate::fluentd::value::{AttributeValue, EventTime, FieldMap, Value, populate_attribute};

/// Span kind, mirrored onto the wire as an uppercase string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpanKind {
    /// Synchronous outbound call
    Client,
    /// Synchronous inbound call
    Server,
    /// Async message producer
    Producer,
    /// Async message consumer
    Consumer,
    /// Internal operation (not represented on the wire)
    Internal,
}

impl SpanKind {
    fn as_wire_str(self) -> Option<&'static str> {
        match self {
            SpanKind::Client => Some("CLIENT"),
            SpanKind::Server => Some("SERVER"),
            SpanKind::Producer => Some("PRODUCER"),
            SpanKind::Consumer => Some("CONSUMER"),
            SpanKind::Internal => None,
        }
    }
}

/// Span status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    /// Default; writes nothing
    Unset = 0,
    /// Explicit success
    Ok = 1,
    /// Failure; carries a description
    Error = 2,
}

/// Render an OpenTelemetry severity number (1..=24) as its text form.
pub fn severity_text(number: u8) -> &'static str {
    match number {
        1 => "TRACE",
        2 => "TRACE2",
        3 => "TRACE3",
        4 => "TRACE4",
        5 => "DEBUG",
        6 => "DEBUG2",
        7 => "DEBUG3",
        8 => "DEBUG4",
        9 => "INFO",
        10 => "INFO2",
        11 => "INFO3",
        12 => "INFO4",
        13 => "WARN",
        14 => "WARN2",
        15 => "WARN3",
        16 => "WARN4",
        17 => "ERROR",
        18 => "ERROR2",
        19 => "ERROR3",
        20 => "ERROR4",
        21 => "FATAL",
        22 => "FATAL2",
        23 => "FATAL3",
        24 => "FATAL4",
        _ => "INVALID",
    }
}

fn hex_lower(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        out.push_str(&format!("{:02x}", b));
    }
    out
}

/// Mutable accumulator for one span.
#[derive(Debug, Default)]
pub struct SpanRecord {
    tag: Option<String>,
    options: FieldMap,
    events: Vec<MessageEntry>,
}

impl SpanRecord {
    /// Create an empty span record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store trace/span/parent identity as lowercase hex strings
    /// (32/16/16 characters).
    pub fn set_identity(&mut self, trace_id: &[u8; 16], span_id: &[u8; 8], parent_span_id: &[u8; 8]) {
        self.options
            .insert(fields::SPAN_ID.to_string(), Value::Str(hex_lower(span_id)));
        self.options.insert(
            fields::SPAN_PARENT_ID.to_string(),
            Value::Str(hex_lower(parent_span_id)),
        );
        self.options
            .insert(fields::TRACE_ID.to_string(), Value::Str(hex_lower(trace_id)));
    }

    /// Store a user attribute under the `env_properties` sub-map.
    /// Repeated keys overwrite.
    pub fn set_attribute(&mut self, key: &str, value: AttributeValue) {
        let properties = self
            .options
            .entry(fields::PROPERTIES.to_string())
            .or_insert_with(|| Value::Map(FieldMap::new()));
        if let Value::Map(fields) = properties {
            populate_attribute(fields, key, value);
        }
    }

    /// Append one event with its name, timestamp and attributes.
    ///
    /// A zero timestamp is replaced with the current wall-clock time. Events
    /// keep append order.
    pub fn add_event<I>(&mut self, name: &str, timestamp: EventTime, attributes: I)
    where
        I: IntoIterator<Item = (String, AttributeValue)>,
    {
        let mut event_fields = FieldMap::new();
        for (key, value) in attributes {
            populate_attribute(&mut event_fields, &key, value);
        }
        event_fields.insert(fields::NAME.to_string(), Value::Str(name.to_string()));
        self.events.push(MessageEntry {
            time: EventTime::from_parts(timestamp.seconds, timestamp.nanos),
            record: event_fields,
        });
    }

    /// Record span status. Unset writes nothing; Error adds the description
    /// under `tags.error`.
    pub fn set_status(&mut self, code: StatusCode, description: &str) {
        if code == StatusCode::Unset {
            return;
        }
        let tags = self.tags_map();
        tags.insert(
            fields::STATUS_CODE_TAG.to_string(),
            Value::Int(code as i64),
        );
        if code == StatusCode::Error {
            tags.insert(
                fields::ERROR_TAG.to_string(),
                Value::Str(description.to_string()),
            );
        }
    }

    /// Record span kind. Internal spans carry no kind field.
    pub fn set_span_kind(&mut self, kind: SpanKind) {
        if let Some(kind) = kind.as_wire_str() {
            self.options
                .insert(fields::SPAN_KIND.to_string(), Value::Str(kind.to_string()));
        }
    }

    /// Record the span name.
    pub fn set_name(&mut self, name: &str) {
        self.options
            .insert(fields::NAME.to_string(), Value::Str(name.to_string()));
    }

    /// Record the span start time.
    pub fn set_start_time(&mut self, time: EventTime) {
        self.options
            .insert(fields::START_TIME.to_string(), Value::EventTime(time));
    }

    /// Record span duration. The envelope time (`env_time`) is stamped with
    /// the current wall clock at this point, matching send-time semantics.
    pub fn set_duration(&mut self, duration: Duration) {
        self.options.insert(
            fields::END_TIME.to_string(),
            Value::EventTime(EventTime::now()),
        );
        self.options.insert(
            fields::DURATION.to_string(),
            Value::Int(duration.as_nanos() as i64),
        );
    }

    /// Extract the routing tag from resource attributes. Only a string `tag`
    /// attribute is honored; everything else is ignored.
    pub fn set_resource<'a, I>(&mut self, attributes: I)
    where
        I: IntoIterator<Item = (&'a str, AttributeValue)>,
    {
        for (key, value) in attributes {
            if key == "tag" {
                if let AttributeValue::Str(tag) = value {
                    self.tag = Some(tag);
                }
            }
        }
    }

    /// Record instrumentation scope name and version under the `tags`
    /// sub-map.
    pub fn set_instrumentation_scope(&mut self, name: &str, version: &str) {
        let tags = self.tags_map();
        tags.insert(
            fields::LIBRARY_NAME_TAG.to_string(),
            Value::Str(name.to_string()),
        );
        tags.insert(
            fields::LIBRARY_VERSION_TAG.to_string(),
            Value::Str(version.to_string()),
        );
    }

    fn tags_map(&mut self) -> &mut FieldMap {
        let tags = self
            .options
            .entry(fields::TAGS.to_string())
            .or_insert_with(|| Value::Map(FieldMap::new()));
        match tags {
            Value::Map(fields) => fields,
            // A caller overwrote "tags" with a scalar; restore the sub-map.
            other => {
                *other = Value::Map(FieldMap::new());
                match other {
                    Value::Map(fields) => fields,
                    _ => unreachable!(),
                }
            }
        }
    }

    /// Finalize into an immutable snapshot. The record is consumed.
    pub fn finish(self) -> SpanBuffer {
        SpanBuffer {
            tag: self.tag.unwrap_or_else(|| fields::TAG_SPAN.to_string()),
            options: self.options,
            events: self.events,
        }
    }
}

/// Finalized span data ready for batching.
#[derive(Debug)]
pub struct SpanBuffer {
    /// Routing tag (`Span` unless overridden via resource `tag`)
    pub tag: String,
    /// Top-level fields, keyed by the Fluentd field names
    pub options: FieldMap,
    /// Span events in append order
    pub events: Vec<MessageEntry>,
}

impl SpanBuffer {
    /// The envelope time for this span's forward-protocol row: the recorded
    /// end time, or "now" when the span was never ended.
    pub fn end_time(&self) -> EventTime {
        match self.options.get(fields::END_TIME) {
            Some(Value::EventTime(ts)) => *ts,
            _ => EventTime::now(),
        }
    }
}

/// Mutable accumulator for one log record.
#[derive(Debug, Default)]
pub struct LogRecord {
    tag: Option<String>,
    fields: FieldMap,
}

impl LogRecord {
    /// Create an empty log record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record severity number and its text form.
    pub fn set_severity(&mut self, number: u8) {
        self.fields.insert(
            fields::SEVERITY_TEXT.to_string(),
            Value::Str(severity_text(number).to_string()),
        );
        self.fields.insert(
            fields::SEVERITY_NUMBER.to_string(),
            Value::Int(i64::from(number)),
        );
    }

    /// Record the event name.
    pub fn set_name(&mut self, name: &str) {
        self.fields
            .insert(fields::NAME.to_string(), Value::Str(name.to_string()));
    }

    /// Record the log body. Scalar values are rendered as text.
    pub fn set_body(&mut self, body: AttributeValue) {
        self.fields.insert(
            fields::BODY.to_string(),
            Value::Str(crate::fluentd::value::attribute_value_to_string(&body)),
        );
    }

    /// Record an event id, and the event name when non-empty.
    pub fn set_event_id(&mut self, id: i64, name: &str) {
        self.fields
            .insert(fields::EVENT_ID.to_string(), Value::Int(id));
        if !name.is_empty() {
            self.set_name(name);
        }
    }

    /// Record the owning trace id as a 32-char lowercase hex string.
    pub fn set_trace_id(&mut self, trace_id: &[u8; 16]) {
        self.fields
            .insert(fields::TRACE_ID.to_string(), Value::Str(hex_lower(trace_id)));
    }

    /// Record the owning span id as a 16-char lowercase hex string.
    pub fn set_span_id(&mut self, span_id: &[u8; 8]) {
        self.fields
            .insert(fields::SPAN_ID.to_string(), Value::Str(hex_lower(span_id)));
    }

    /// Store a user attribute under the `env_properties` sub-map.
    pub fn set_attribute(&mut self, key: &str, value: AttributeValue) {
        let properties = self
            .fields
            .entry(fields::PROPERTIES.to_string())
            .or_insert_with(|| Value::Map(FieldMap::new()));
        if let Value::Map(fields) = properties {
            populate_attribute(fields, key, value);
        }
    }

    /// Record the log timestamp.
    pub fn set_timestamp(&mut self, time: EventTime) {
        self.fields
            .insert(fields::TIMESTAMP.to_string(), Value::EventTime(time));
    }

    /// Record the observed timestamp.
    pub fn set_observed_timestamp(&mut self, time: EventTime) {
        self.fields.insert(
            fields::OBSERVED_TIMESTAMP.to_string(),
            Value::EventTime(time),
        );
    }

    /// Extract the routing tag from resource attributes, as for spans.
    pub fn set_resource<'a, I>(&mut self, attributes: I)
    where
        I: IntoIterator<Item = (&'a str, AttributeValue)>,
    {
        for (key, value) in attributes {
            if key == "tag" {
                if let AttributeValue::Str(tag) = value {
                    self.tag = Some(tag);
                }
            }
        }
    }

    /// Finalize into an immutable snapshot. The record is consumed.
    pub fn finish(self) -> LogBuffer {
        LogBuffer {
            tag: self.tag.unwrap_or_else(|| fields::TAG_LOG.to_string()),
            fields: self.fields,
        }
    }
}

/// Finalized log data ready for batching.
#[derive(Debug)]
pub struct LogBuffer {
    /// Routing tag (`Log` unless overridden via resource `tag`)
    pub tag: String,
    /// All log fields, keyed by the Fluentd field names
    pub fields: FieldMap,
}

impl LogBuffer {
    /// The envelope time for this log's forward-protocol row: the recorded
    /// timestamp, or "now" when none was set.
    pub fn timestamp(&self) -> EventTime {
        match self.fields.get(fields::TIMESTAMP) {
            Some(Value::EventTime(ts)) => *ts,
            _ => EventTime::now(),
        }
    }
}
