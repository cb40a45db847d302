//! Configuration loader
//!
//! Loads configuration from YAML files, environment variables, or programmatic API.
//! Priority: provided config > environment variables > defaults

use std::env;

use crate::config::types::{ExportMode, FluentdConfig};
use crate::error::FluentdConfigError;
use tracing::{debug, info, warn};

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from YAML file
    pub fn from_yaml(path: impl AsRef<std::path::Path>) -> Result<FluentdConfig, FluentdConfigError> {
        let path = path.as_ref();
        info!(
            config_path = %path.display(),
            "Loading configuration from YAML file"
        );

        let content = std::fs::read_to_string(path).map_err(|e| {
            warn!(
                config_path = %path.display(),
                error = %e,
                "Failed to read configuration file"
            );
            FluentdConfigError::ValidationFailed(format!("Failed to read config file: {}", e))
        })?;

        let mut config: FluentdConfig = serde_yaml::from_str(&content).map_err(|e| {
            warn!(
                config_path = %path.display(),
                error = %e,
                "Failed to parse YAML configuration"
            );
            FluentdConfigError::ValidationFailed(format!("Failed to parse YAML: {}", e))
        })?;

        debug!(
            config_path = %path.display(),
            "Parsed YAML configuration successfully"
        );

        Self::apply_env_overrides(&mut config);

        config.validate().map_err(|e| {
            warn!(
                config_path = %path.display(),
                error = %e,
                "Configuration validation failed"
            );
            e
        })?;

        info!(
            config_path = %path.display(),
            endpoint = %config.endpoint,
            tag = %config.tag,
            retry_count = config.retry_count,
            convert_event_to_trace = config.convert_event_to_trace,
            "Configuration loaded and validated successfully"
        );

        Ok(config)
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<FluentdConfig, FluentdConfigError> {
        info!("Loading configuration from environment variables");

        let mut config = FluentdConfig::default();
        Self::apply_env_overrides(&mut config);
        config.validate()?;

        info!(
            endpoint = %config.endpoint,
            tag = %config.tag,
            retry_count = config.retry_count,
            "Configuration loaded from environment"
        );

        Ok(config)
    }

    /// Apply `FLUENTD_*` environment variable overrides to a configuration
    fn apply_env_overrides(config: &mut FluentdConfig) {
        if let Ok(endpoint) = env::var("FLUENTD_ENDPOINT") {
            debug!(endpoint = %endpoint, "Overriding endpoint from environment");
            config.endpoint = endpoint;
        }

        if let Ok(tag) = env::var("FLUENTD_TAG") {
            debug!(tag = %tag, "Overriding tag from environment");
            config.tag = tag;
        }

        if let Ok(retry_count) = env::var("FLUENTD_RETRY_COUNT") {
            match retry_count.parse::<usize>() {
                Ok(count) => {
                    debug!(retry_count = count, "Overriding retry_count from environment");
                    config.retry_count = count;
                }
                Err(e) => {
                    warn!(
                        value = %retry_count,
                        error = %e,
                        "Ignoring invalid FLUENTD_RETRY_COUNT"
                    );
                }
            }
        }

        if let Ok(max_queue_size) = env::var("FLUENTD_MAX_QUEUE_SIZE") {
            match max_queue_size.parse::<usize>() {
                Ok(size) => {
                    debug!(max_queue_size = size, "Overriding max_queue_size from environment");
                    config.max_queue_size = size;
                }
                Err(e) => {
                    warn!(
                        value = %max_queue_size,
                        error = %e,
                        "Ignoring invalid FLUENTD_MAX_QUEUE_SIZE"
                    );
                }
            }
        }

        if let Ok(wait_interval) = env::var("FLUENTD_WAIT_INTERVAL_MS") {
            match wait_interval.parse::<u64>() {
                Ok(millis) => {
                    debug!(wait_interval_ms = millis, "Overriding wait_interval_ms from environment");
                    config.wait_interval_ms = millis;
                }
                Err(e) => {
                    warn!(
                        value = %wait_interval,
                        error = %e,
                        "Ignoring invalid FLUENTD_WAIT_INTERVAL_MS"
                    );
                }
            }
        }

        if let Ok(mode) = env::var("FLUENTD_EXPORT_MODE") {
            match mode.to_ascii_lowercase().as_str() {
                "sync" => config.export_mode = ExportMode::Sync,
                "async" => config.export_mode = ExportMode::Async,
                other => {
                    warn!(value = %other, "Ignoring invalid FLUENTD_EXPORT_MODE");
                }
            }
        }

        if let Ok(convert) = env::var("FLUENTD_CONVERT_EVENT_TO_TRACE") {
            match convert.parse::<bool>() {
                Ok(enabled) => {
                    debug!(
                        convert_event_to_trace = enabled,
                        "Overriding convert_event_to_trace from environment"
                    );
                    config.convert_event_to_trace = enabled;
                }
                Err(e) => {
                    warn!(
                        value = %convert,
                        error = %e,
                        "Ignoring invalid FLUENTD_CONVERT_EVENT_TO_TRACE"
                    );
                }
            }
        }
    }
}
