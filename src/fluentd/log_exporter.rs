//! Log exporter
//!
//! The log path mirrors the span path without the secondary per-event-name
//! pass: one forward-protocol message per batch, entry time taken from each
//! record's `Timestamp`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tracing::{debug, warn};

use crate::config::FluentdConfig;
use crate::error::FluentdError;
use crate::fluentd::ExportResult;
use crate::fluentd::batcher::build_log_message;
use crate::fluentd::msgpack::encode_forward_message;
use crate::fluentd::recordable::{LogBuffer, LogRecord};
use crate::fluentd::transport::{SocketTransport, TransportStats};

/// Exports finished log records as Fluentd forward-protocol messages.
pub struct FluentdLogExporter {
    transport: SocketTransport,
    is_shutdown: AtomicBool,
    seq_batch: usize,
    seq_log: usize,
}

impl FluentdLogExporter {
    /// Create an exporter for the configured endpoint. Fails on an invalid
    /// or unsupported endpoint.
    pub fn new(config: FluentdConfig) -> Result<Self, FluentdError> {
        config.validate().map_err(FluentdError::Config)?;
        let transport = SocketTransport::new(&config).map_err(FluentdError::Config)?;
        Ok(Self {
            transport,
            is_shutdown: AtomicBool::new(false),
            seq_batch: 0,
            seq_log: 0,
        })
    }

    /// Allocate a fresh log record for the pipeline to fill.
    pub fn make_recordable(&self) -> LogRecord {
        LogRecord::new()
    }

    /// Export one batch of finished log records.
    pub fn export(&mut self, batch: Vec<LogRecord>) -> ExportResult {
        if self.is_shutdown.load(Ordering::Acquire) {
            warn!("export called after shutdown");
            return ExportResult::Failure;
        }
        if batch.is_empty() {
            warn!("export called with an empty batch");
            return ExportResult::Failure;
        }

        let buffers: Vec<LogBuffer> = batch.into_iter().map(LogRecord::finish).collect();
        self.seq_batch += 1;
        self.seq_log += buffers.len();

        let message = match build_log_message(buffers) {
            Ok(message) => message,
            Err(e) => {
                warn!(error = %e, "failed to shape log batch");
                return ExportResult::Failure;
            }
        };

        debug!(
            batch = self.seq_batch,
            logs = message.entries.len(),
            "sending log message"
        );
        let packet = match encode_forward_message(&message) {
            Ok(packet) => packet,
            Err(e) => {
                warn!(error = %e, "failed to encode log message");
                return ExportResult::Failure;
            }
        };
        if self.transport.send(&packet).is_err() {
            return ExportResult::Failure;
        }

        ExportResult::Success
    }

    /// Mark the exporter shut down. Idempotent; always reports a clean
    /// shutdown. The timeout is accepted for interface compatibility and
    /// ignored.
    pub fn shutdown(&self, _timeout: Duration) -> bool {
        if !self.is_shutdown.swap(true, Ordering::AcqRel) {
            let stats = self.transport.stats();
            debug!(
                batches = self.seq_batch,
                logs = self.seq_log,
                uploads = stats.successful_sends,
                "fluentd log exporter stats"
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

impl std::fmt::Debug for FluentdLogExporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FluentdLogExporter")
            .field("endpoint", &self.transport.endpoint())
            .field("is_shutdown", &self.is_shutdown)
            .finish_non_exhaustive()
    }
}
