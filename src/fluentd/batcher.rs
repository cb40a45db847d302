//! Forward-protocol message shaping
//!
//! Turns a batch of finalized records into the message set to transmit: one
//! primary message with a row per record, plus (for spans, when enabled) one
//! secondary message per distinct event name aggregating events across the
//! whole batch.

use std::collections::BTreeMap;

use tracing::trace;

use crate::error::FluentdExportError;
use crate::fluentd::fields;
use crate::fluentd::recordable::{LogBuffer, SpanBuffer};
use crate::fluentd::value::{EventTime, FieldMap, Value};

/// One `[time, record]` row of a forward-protocol message.
#[derive(Debug, Clone)]
pub struct MessageEntry {
    /// Envelope time for the row
    pub time: EventTime,
    /// Row fields
    pub record: FieldMap,
}

/// One forward-protocol message: `[tag, [[time, record], ...]]`.
#[derive(Debug, Clone)]
pub struct ForwardMessage {
    /// Routing tag
    pub tag: String,
    /// Message rows in order
    pub entries: Vec<MessageEntry>,
}

/// Messages produced from one span batch.
#[derive(Debug)]
pub struct SpanMessages {
    /// The `Span` message carrying one row per span
    pub primary: ForwardMessage,
    /// Per-event-name messages, present only when `convert_event_to_trace`
    /// is enabled and the batch carried events
    pub event_messages: Vec<ForwardMessage>,
}

/// Shape a span batch into its message set.
///
/// The batch is one delivery unit; its routing tag is taken from the first
/// record. An empty batch is a caller error and fails before any I/O.
pub fn build_span_messages(
    batch: Vec<SpanBuffer>,
    convert_event_to_trace: bool,
) -> Result<SpanMessages, FluentdExportError> {
    if batch.is_empty() {
        return Err(FluentdExportError::EmptyBatch);
    }

    let tag = batch[0].tag.clone();
    let mut entries = Vec::with_capacity(batch.len());
    // Alphabetical name order keeps the secondary message sequence stable.
    let mut grouped_events: BTreeMap<String, Vec<MessageEntry>> = BTreeMap::new();

    for span in batch {
        let end_time = span.end_time();
        let span_id = span.options.get(fields::SPAN_ID).cloned();
        let trace_id = span.options.get(fields::TRACE_ID).cloned();

        if convert_event_to_trace {
            for mut event in span.events {
                let name = match event.record.get(fields::NAME) {
                    Some(Value::Str(name)) => name.clone(),
                    _ => continue,
                };
                // Copy the owning span's identity so the event stays
                // correlatable once it leaves the span row.
                if let Some(span_id) = &span_id {
                    event.record.insert(fields::SPAN_ID.to_string(), span_id.clone());
                }
                if let Some(trace_id) = &trace_id {
                    event
                        .record
                        .insert(fields::TRACE_ID.to_string(), trace_id.clone());
                }
                grouped_events.entry(name).or_default().push(event);
            }
        }

        entries.push(MessageEntry {
            time: end_time,
            record: span.options,
        });
    }

    let event_messages: Vec<ForwardMessage> = grouped_events
        .into_iter()
        .map(|(name, entries)| {
            trace!(event_name = %name, rows = entries.len(), "grouped span events");
            ForwardMessage { tag: name, entries }
        })
        .collect();

    trace!(
        tag = %tag,
        spans = entries.len(),
        event_messages = event_messages.len(),
        "built span message set"
    );

    Ok(SpanMessages {
        primary: ForwardMessage { tag, entries },
        event_messages,
    })
}

/// Shape a log batch into its single forward-protocol message. Logs have no
/// secondary pass.
pub fn build_log_message(batch: Vec<LogBuffer>) -> Result<ForwardMessage, FluentdExportError> {
    if batch.is_empty() {
        return Err(FluentdExportError::EmptyBatch);
    }

    let tag = batch[0].tag.clone();
    let entries = batch
        .into_iter()
        .map(|log| MessageEntry {
            time: log.timestamp(),
            record: log.fields,
        })
        .collect::<Vec<_>>();

    trace!(tag = %tag, logs = entries.len(), "built log message");

    Ok(ForwardMessage { tag, entries })
}
