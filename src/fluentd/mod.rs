//! Fluentd forward-protocol exporter core
//!
//! Provides the record accumulators, message shaping, MessagePack encoding
//! and socket transport behind the span and log exporters.

pub mod batcher;
pub mod log_exporter;
pub mod msgpack;
pub mod recordable;
pub mod trace_exporter;
pub mod transport;
pub mod value;

pub use batcher::{ForwardMessage, MessageEntry};
pub use log_exporter::FluentdLogExporter;
pub use recordable::{LogRecord, SpanKind, SpanRecord, StatusCode};
pub use trace_exporter::FluentdTraceExporter;
pub use transport::{SocketTransport, TransportStats};
pub use value::{AttributeValue, EventTime, FieldMap, Value};

/// Result of one export call.
///
/// Success means the batch was handed to the transport layer; the forward
/// protocol is fire-and-forget once the socket write completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportResult {
    /// Batch handed to the transport
    Success,
    /// Batch dropped (shutdown, empty batch, encoding or delivery failure)
    Failure,
}

/// Fluentd field name constants.
pub mod fields {
    /// Event name
    pub const NAME: &str = "name";
    /// Trace id
    pub const TRACE_ID: &str = "env_dt_traceId";
    /// Span id
    pub const SPAN_ID: &str = "env_dt_spanId";
    /// Span parent id
    pub const SPAN_PARENT_ID: &str = "parentId";
    /// Span kind
    pub const SPAN_KIND: &str = "kind";
    /// User attribute sub-map
    pub const PROPERTIES: &str = "env_properties";
    /// Operation start time
    pub const START_TIME: &str = "startTime";
    /// Operation end time (doubles as the envelope time)
    pub const END_TIME: &str = "env_time";
    /// Operation duration in nanoseconds
    pub const DURATION: &str = "duration";
    /// Scope/status sub-map
    pub const TAGS: &str = "tags";
    /// Status code, inside `tags`
    pub const STATUS_CODE_TAG: &str = "otel.status_code";
    /// Error description, inside `tags`
    pub const ERROR_TAG: &str = "error";
    /// Instrumentation scope name, inside `tags`
    pub const LIBRARY_NAME_TAG: &str = "otel.library.name";
    /// Instrumentation scope version, inside `tags`
    pub const LIBRARY_VERSION_TAG: &str = "otel.library.version";
    /// Log timestamp
    pub const TIMESTAMP: &str = "Timestamp";
    /// Log observed timestamp
    pub const OBSERVED_TIMESTAMP: &str = "ObservedTimestamp";
    /// Log severity text
    pub const SEVERITY_TEXT: &str = "severityText";
    /// Log severity number
    pub const SEVERITY_NUMBER: &str = "severityNumber";
    /// Log body
    pub const BODY: &str = "body";
    /// Log event id
    pub const EVENT_ID: &str = "EventId";
    /// Default routing tag for spans
    pub const TAG_SPAN: &str = "Span";
    /// Default routing tag for logs
    pub const TAG_LOG: &str = "Log";
}
