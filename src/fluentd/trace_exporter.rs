//! Span exporter
//!
//! Drives batcher -> encoder -> transport for each exported span batch on the
//! calling thread. Not safe for concurrent `export` calls on one instance;
//! callers serialize exports, as the upstream simple processor does.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tracing::{debug, warn};

use crate::config::FluentdConfig;
use crate::error::FluentdError;
use crate::fluentd::ExportResult;
use crate::fluentd::batcher::build_span_messages;
use crate::fluentd::msgpack::encode_forward_message;
use crate::fluentd::recordable::{SpanBuffer, SpanRecord};
use crate::fluentd::transport::{SocketTransport, TransportStats};

/// Exports finished spans as Fluentd forward-protocol messages.
pub struct FluentdTraceExporter {
    config: FluentdConfig,
    transport: SocketTransport,
    is_shutdown: AtomicBool,
    seq_batch: usize,
    seq_span: usize,
    seq_event: usize,
}

impl FluentdTraceExporter {
    /// Create an exporter for the configured endpoint. Fails on an invalid
    /// or unsupported endpoint.
    pub fn new(config: FluentdConfig) -> Result<Self, FluentdError> {
        config.validate().map_err(FluentdError::Config)?;
        let transport = SocketTransport::new(&config).map_err(FluentdError::Config)?;
        Ok(Self {
            config,
            transport,
            is_shutdown: AtomicBool::new(false),
            seq_batch: 0,
            seq_span: 0,
            seq_event: 0,
        })
    }

    /// Allocate a fresh span record for the pipeline to fill.
    pub fn make_recordable(&self) -> SpanRecord {
        SpanRecord::new()
    }

    /// Export one batch of finished span records.
    ///
    /// Success means the batch was handed to the transport layer, not that
    /// the backend acknowledged it.
    pub fn export(&mut self, batch: Vec<SpanRecord>) -> ExportResult {
        if self.is_shutdown.load(Ordering::Acquire) {
            warn!("export called after shutdown");
            return ExportResult::Failure;
        }
        if batch.is_empty() {
            warn!("export called with an empty batch");
            return ExportResult::Failure;
        }

        let buffers: Vec<SpanBuffer> = batch.into_iter().map(SpanRecord::finish).collect();
        self.seq_batch += 1;
        self.seq_span += buffers.len();

        let messages = match build_span_messages(buffers, self.config.convert_event_to_trace) {
            Ok(messages) => messages,
            Err(e) => {
                warn!(error = %e, "failed to shape span batch");
                return ExportResult::Failure;
            }
        };

        debug!(
            batch = self.seq_batch,
            spans = messages.primary.entries.len(),
            "sending span message"
        );
        let packet = match encode_forward_message(&messages.primary) {
            Ok(packet) => packet,
            Err(e) => {
                warn!(error = %e, "failed to encode span message");
                return ExportResult::Failure;
            }
        };
        if self.transport.send(&packet).is_err() {
            return ExportResult::Failure;
        }

        // A failed secondary message fails the whole batch and aborts the
        // remaining event messages.
        for message in &messages.event_messages {
            self.seq_event += message.entries.len();
            debug!(
                event_name = %message.tag,
                rows = message.entries.len(),
                "sending event message"
            );
            let packet = match encode_forward_message(message) {
                Ok(packet) => packet,
                Err(e) => {
                    warn!(error = %e, "failed to encode event message");
                    return ExportResult::Failure;
                }
            };
            if self.transport.send(&packet).is_err() {
                return ExportResult::Failure;
            }
        }

        ExportResult::Success
    }

    /// Mark the exporter shut down. The timeout is accepted for interface
    /// compatibility and ignored: the exporter is synchronous, so there is
    /// nothing in flight to drain. Idempotent; always reports a clean
    /// shutdown.
    pub fn shutdown(&self, _timeout: Duration) -> bool {
        if !self.is_shutdown.swap(true, Ordering::AcqRel) {
            let stats = self.transport.stats();
            debug!(
                batches = self.seq_batch,
                spans = self.seq_span,
                events = self.seq_event,
                uploads = stats.successful_sends,
                "fluentd trace exporter stats"
            );
        }
        true
    }

    /// Whether `shutdown` has been called.
    pub fn is_shutdown(&self) -> bool {
        self.is_shutdown.load(Ordering::Acquire)
    }

    /// Transport delivery counters.
    pub fn transport_stats(&self) -> TransportStats {
        self.transport.stats()
    }
}

impl std::fmt::Debug for FluentdTraceExporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FluentdTraceExporter")
            .field("endpoint", &self.transport.endpoint())
            .field("is_shutdown", &self.is_shutdown)
            .finish_non_exhaustive()
    }
}
