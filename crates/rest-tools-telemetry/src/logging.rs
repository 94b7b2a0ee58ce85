//! Structured logging for rest-tools.
//!
//! Installs a global `tracing` subscriber with either JSON output (for
//! services) or human-readable output (for development and scripts).
//!
//! # Example
//!
//! ```rust,ignore
//! use rest_tools_telemetry::{init_logging, LogConfig};
//!
//! init_logging(&LogConfig::from_env()?)?;
//!
//! tracing::info!(method = "GET", path = "/datasets", "Request started");
//! ```

use crate::error::TelemetryError;
use crate::TelemetryResult;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Environment variable holding the log filter (e.g. `info`, `rest_tools_client=debug`).
pub const LOG_LEVEL_ENV: &str = "REST_TOOLS_LOG_LEVEL";

/// Environment variable selecting the output format: `json` or `pretty`.
pub const LOG_FORMAT_ENV: &str = "REST_TOOLS_LOG_FORMAT";

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Whether logging is enabled.
    pub enabled: bool,

    /// Log filter (e.g., "info", "debug", "rest_tools_client=debug,warn").
    pub level: String,

    /// Whether to output JSON format.
    pub json_format: bool,

    /// Whether to include span events (new, close).
    pub span_events: bool,

    /// Whether to include file/line info.
    pub file_line_info: bool,

    /// Whether to include thread IDs.
    pub thread_ids: bool,

    /// Whether to include target (module path).
    pub include_target: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: "info".to_string(),
            json_format: true,
            span_events: false,
            file_line_info: false,
            thread_ids: false,
            include_target: true,
        }
    }
}

impl LogConfig {
    /// Creates a development configuration with human-readable output.
    #[must_use]
    pub fn development() -> Self {
        Self {
            enabled: true,
            level: "debug".to_string(),
            json_format: false,
            span_events: true,
            file_line_info: true,
            thread_ids: false,
            include_target: true,
        }
    }

    /// Creates a production configuration with JSON output.
    #[must_use]
    pub fn production() -> Self {
        Self::default()
    }

    /// Creates a configuration from [`LOG_LEVEL_ENV`] and [`LOG_FORMAT_ENV`],
    /// starting from the production defaults.
    ///
    /// # Errors
    ///
    /// Returns `TelemetryError::InvalidConfig` for an unknown format.
    pub fn from_env() -> TelemetryResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`from_env`](Self::from_env), reading variables through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns `TelemetryError::InvalidConfig` for an unknown format.
    pub fn from_lookup<F>(lookup: F) -> TelemetryResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::production();

        if let Some(level) = lookup(LOG_LEVEL_ENV) {
            config.level = level;
        }

        if let Some(format) = lookup(LOG_FORMAT_ENV) {
            config.json_format = match format.to_ascii_lowercase().as_str() {
                "json" => true,
                "pretty" | "text" => false,
                other => {
                    return Err(TelemetryError::InvalidConfig(format!(
                        "unknown log format '{other}', expected 'json' or 'pretty'"
                    )))
                }
            };
        }

        Ok(config)
    }
}

/// Initializes the logging subsystem.
///
/// # Arguments
///
/// * `config` - Logging configuration
///
/// # Errors
///
/// Returns `TelemetryError::LoggingInit` if the filter is invalid or a
/// global subscriber is already installed.
pub fn init_logging(config: &LogConfig) -> TelemetryResult<()> {
    if !config.enabled {
        return Ok(());
    }

    let filter = create_env_filter(&config.level)?;

    let span_events = if config.span_events {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    if config.json_format {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .json()
            .with_span_events(span_events)
            .with_file(config.file_line_info)
            .with_line_number(config.file_line_info)
            .with_thread_ids(config.thread_ids)
            .with_target(config.include_target)
            .with_filter(filter);

        tracing_subscriber::registry()
            .with(fmt_layer)
            .try_init()
            .map_err(|e| TelemetryError::LoggingInit(e.to_string()))?;
    } else {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .pretty()
            .with_span_events(span_events)
            .with_file(config.file_line_info)
            .with_line_number(config.file_line_info)
            .with_thread_ids(config.thread_ids)
            .with_target(config.include_target)
            .with_filter(filter);

        tracing_subscriber::registry()
            .with(fmt_layer)
            .try_init()
            .map_err(|e| TelemetryError::LoggingInit(e.to_string()))?;
    }

    Ok(())
}

/// Creates an env filter from a string.
///
/// # Errors
///
/// Returns error if the filter string is invalid.
pub fn create_env_filter(filter: &str) -> TelemetryResult<EnvFilter> {
    EnvFilter::try_new(filter)
        .map_err(|e| TelemetryError::LoggingInit(format!("Invalid log level: {e}")))
}
