//! Error types for the Fluentd forward exporter
//!
//! Defines all error types used throughout the library with clear error messages
//! and context for debugging.

use thiserror::Error;

/// Main error type for the Fluentd forward exporter
#[derive(Error, Debug)]
pub enum FluentdError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] FluentdConfigError),

    /// Export/encoding errors
    #[error("Export error: {0}")]
    Export(#[from] FluentdExportError),

    /// Transport-related errors
    #[error("Transport error: {0}")]
    Transport(#[from] FluentdTransportError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum FluentdConfigError {
    /// Endpoint URL could not be parsed
    #[error("Invalid endpoint URL: {0}")]
    InvalidEndpoint(String),

    /// Endpoint scheme is not tcp, udp or unix
    #[error("Unsupported endpoint scheme: {0}")]
    UnsupportedScheme(String),

    /// Missing required configuration field
    #[error("Missing required field: {0}")]
    MissingRequiredField(String),

    /// Configuration validation failed
    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

/// Export/encoding errors
#[derive(Error, Debug)]
pub enum FluentdExportError {
    /// A batch with no records was handed to the exporter
    #[error("Export batch is empty")]
    EmptyBatch,

    /// The exporter has already been shut down
    #[error("Exporter has been shut down")]
    AlreadyShutdown,

    /// MessagePack serialization error
    #[error("MessagePack encoding error: {0}")]
    EncodingError(String),
}

/// Transport-related errors
#[derive(Error, Debug)]
pub enum FluentdTransportError {
    /// Could not connect to the configured endpoint
    #[error("Failed to connect to {endpoint}: {source}")]
    ConnectFailed {
        /// Endpoint the connection was attempted against
        endpoint: String,
        /// Underlying socket error
        source: std::io::Error,
    },

    /// All delivery attempts were exhausted
    #[error("Send failed after {attempts} attempts")]
    RetriesExhausted {
        /// Number of attempts made before giving up
        attempts: usize,
    },

}
