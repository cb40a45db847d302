//! Configuration type definitions
//!
//! Defines all configuration structures for the Fluentd forward exporter.

use serde::{Deserialize, Serialize};

use crate::error::FluentdConfigError;

/// Fluentd transport sub-format
///
/// Ref. <https://github.com/fluent/fluentd/wiki/Forward-Protocol-Specification-v1>
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportFormat {
    /// One event per message
    Message,
    /// Forward mode: `[tag, [[time, record], ...]]`
    Forward,
    /// PackedForward mode (not produced by this exporter)
    PackedForward,
    /// CompressedPackedForward mode (not produced by this exporter)
    CompressedPackedForward,
}

impl Default for TransportFormat {
    fn default() -> Self {
        Self::Forward
    }
}

/// Delivery mode for exported batches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportMode {
    /// Send on the calling thread, blocking until delivered or retries exhaust
    Sync,
    /// Queue for a background uploader (declared for config compatibility,
    /// rejected by validation)
    Async,
}

impl Default for ExportMode {
    fn default() -> Self {
        Self::Sync
    }
}

/// Configuration for the Fluentd forward exporter
///
/// # Configuration Sources
///
/// Configuration can be loaded from:
/// - YAML files
/// - Environment variables (with `FLUENTD_*` prefix)
/// - Programmatic API (using `ConfigBuilder`)
///
/// # Default Values
///
/// - `format`: `forward`
/// - `tag`: `tag.service`
/// - `export_mode`: `sync`
/// - `retry_count`: `2`
/// - `max_queue_size`: `16384`
/// - `wait_interval_ms`: `0`
/// - `convert_event_to_trace`: `false`
///
/// `endpoint` is required and has no default.
///
/// # Example
///
/// ```no_run
/// use fluent_forward_exporter::ConfigBuilder;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = ConfigBuilder::new()
///     .endpoint("tcp://127.0.0.1:24224")
///     .tag("my.service")
///     .retry_count(3)
///     .build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FluentdConfig {
    /// Fluentd transport sub-format (default: forward)
    #[serde(default)]
    pub format: TransportFormat,

    /// Routing tag used when a record carries no `tag` resource attribute
    /// (default: `tag.service`)
    #[serde(default = "default_tag")]
    pub tag: String,

    /// Endpoint to export to, e.g. `tcp://127.0.0.1:24224` or
    /// `unix:///var/run/fluent.sock` (required, no default)
    #[serde(default)]
    pub endpoint: String,

    /// Delivery mode (default: sync)
    #[serde(default)]
    pub export_mode: ExportMode,

    /// Number of connect-and-send attempts before a batch is dropped
    /// (default: 2)
    #[serde(default = "default_retry_count")]
    pub retry_count: usize,

    /// Maximum queued packets, consumed only by the async path
    /// (default: 16384)
    #[serde(default = "default_max_queue_size")]
    pub max_queue_size: usize,

    /// Pause between async upload rounds in milliseconds (default: 0)
    #[serde(default)]
    pub wait_interval_ms: u64,

    /// Also emit one secondary forward message per distinct span-event name
    /// (default: false; ignored by the log exporter)
    #[serde(default)]
    pub convert_event_to_trace: bool,
}

impl Default for FluentdConfig {
    fn default() -> Self {
        Self {
            format: TransportFormat::default(),
            tag: default_tag(),
            endpoint: String::new(),
            export_mode: ExportMode::default(),
            retry_count: default_retry_count(),
            max_queue_size: default_max_queue_size(),
            wait_interval_ms: 0,
            convert_event_to_trace: false,
        }
    }
}

impl FluentdConfig {
    /// Validate configuration values
    pub fn validate(&self) -> Result<(), FluentdConfigError> {
        if self.endpoint.is_empty() {
            return Err(FluentdConfigError::MissingRequiredField(
                "endpoint is required".to_string(),
            ));
        }

        // Scheme errors must surface at construction, not on first send
        let url = url::Url::parse(&self.endpoint)
            .map_err(|e| FluentdConfigError::InvalidEndpoint(format!("{}: {}", self.endpoint, e)))?;
        match url.scheme() {
            "tcp" | "udp" => {
                if url.host_str().is_none() || url.port().is_none() {
                    return Err(FluentdConfigError::InvalidEndpoint(format!(
                        "{} must specify host and port",
                        self.endpoint
                    )));
                }
            }
            "unix" => {
                if url.path().is_empty() {
                    return Err(FluentdConfigError::InvalidEndpoint(format!(
                        "{} must specify a socket path",
                        self.endpoint
                    )));
                }
            }
            other => {
                return Err(FluentdConfigError::UnsupportedScheme(other.to_string()));
            }
        }

        if self.tag.is_empty() {
            return Err(FluentdConfigError::ValidationFailed(
                "tag cannot be empty".to_string(),
            ));
        }

        if self.retry_count == 0 {
            return Err(FluentdConfigError::ValidationFailed(
                "retry_count must be greater than 0".to_string(),
            ));
        }

        if self.max_queue_size == 0 {
            return Err(FluentdConfigError::ValidationFailed(
                "max_queue_size must be greater than 0".to_string(),
            ));
        }

        if self.export_mode == ExportMode::Async {
            return Err(FluentdConfigError::ValidationFailed(
                "export_mode: async is not supported by this exporter".to_string(),
            ));
        }

        match self.format {
            TransportFormat::Forward => {}
            other => {
                return Err(FluentdConfigError::ValidationFailed(format!(
                    "transport format {:?} is not supported, use forward",
                    other
                )));
            }
        }

        Ok(())
    }
}

/// Builder for creating configurations programmatically
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    config: FluentdConfig,
}

impl ConfigBuilder {
    /// Create a new configuration builder
    pub fn new() -> Self {
        Self {
            config: FluentdConfig::default(),
        }
    }

    /// Set the endpoint URL
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.config.endpoint = endpoint.into();
        self
    }

    /// Set the default routing tag
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.config.tag = tag.into();
        self
    }

    /// Set the transport sub-format
    pub fn format(mut self, format: TransportFormat) -> Self {
        self.config.format = format;
        self
    }

    /// Set the delivery mode
    pub fn export_mode(mut self, mode: ExportMode) -> Self {
        self.config.export_mode = mode;
        self
    }

    /// Set the number of delivery attempts per batch
    pub fn retry_count(mut self, count: usize) -> Self {
        self.config.retry_count = count;
        self
    }

    /// Set the async queue capacity
    pub fn max_queue_size(mut self, size: usize) -> Self {
        self.config.max_queue_size = size;
        self
    }

    /// Set the async upload pause in milliseconds
    pub fn wait_interval_ms(mut self, millis: u64) -> Self {
        self.config.wait_interval_ms = millis;
        self
    }

    /// Enable or disable secondary per-event-name messages
    pub fn convert_event_to_trace(mut self, enabled: bool) -> Self {
        self.config.convert_event_to_trace = enabled;
        self
    }

    /// Build the configuration with validation
    pub fn build(self) -> Result<FluentdConfig, FluentdConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

// Default value functions
fn default_tag() -> String {
    "tag.service".to_string()
}

fn default_retry_count() -> usize {
    2
}

fn default_max_queue_size() -> usize {
    16384
}
