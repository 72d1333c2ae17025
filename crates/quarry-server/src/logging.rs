//! Logging and tracing setup
//!
//! Console output for operators plus optional daily-rolling JSON files.
//! `RUST_LOG` overrides the configured filter.

use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

use crate::config::LogSettings;

const PRODUCTION_FILTER: &str =
    "warn,quarry_server=info,quarry_connector=info,quarry_store=info,tower_http=info";
const DEVELOPMENT_FILTER: &str = "info,quarry_server=debug,quarry_connector=debug,quarry_store=debug,quarry_driver_postgres=debug,quarry_driver_mysql=debug,tower_http=debug";

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Where JSON log files go
    pub log_dir: PathBuf,

    pub enable_json_logs: bool,

    pub enable_console_logs: bool,

    /// Include file/line information in console output
    pub include_location: bool,

    /// Log span open/close events
    pub enable_spans: bool,

    /// Filter used when `RUST_LOG` is unset
    pub default_filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        if cfg!(debug_assertions) {
            Self::development()
        } else {
            Self::production()
        }
    }
}

impl LoggingConfig {
    /// Compact console output and JSON files
    pub fn production() -> Self {
        Self {
            log_dir: log_directory(),
            enable_json_logs: true,
            enable_console_logs: true,
            include_location: false,
            enable_spans: false,
            default_filter: PRODUCTION_FILTER.to_string(),
        }
    }

    /// Verbose console output, no files
    pub fn development() -> Self {
        Self {
            log_dir: log_directory(),
            enable_json_logs: false,
            enable_console_logs: true,
            include_location: true,
            enable_spans: true,
            default_filter: DEVELOPMENT_FILTER.to_string(),
        }
    }

    /// Build from the `[logging]` config section
    pub fn from_settings(settings: &LogSettings) -> Self {
        let mut config = Self::default();
        if let Some(log_dir) = &settings.log_dir {
            config.log_dir = log_dir.clone();
        }
        if settings.json {
            config.enable_json_logs = true;
        }
        if let Some(filter) = &settings.filter {
            config.default_filter = filter.clone();
        }
        config
    }
}

/// Default log directory under the platform's local data dir
pub fn log_directory() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("quarry")
        .join("logs")
}

/// Install the global subscriber.
///
/// Keep the returned guard alive for as long as file logging should flush.
pub fn init(config: LoggingConfig) -> anyhow::Result<Option<WorkerGuard>> {
    // One filter per layer; each layer filters independently
    let env_filter = || {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.default_filter))
    };

    // NEW fires once per span; ENTER would fire on every re-poll of an
    // awaited future.
    let span_events = if config.enable_spans {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    let mut layers = Vec::new();
    let mut guard = None;

    if config.enable_console_logs {
        let console_layer = fmt::layer()
            .with_target(true)
            .with_file(config.include_location)
            .with_line_number(config.include_location)
            .with_span_events(span_events.clone())
            .with_filter(env_filter())
            .boxed();

        layers.push(console_layer);
    }

    if config.enable_json_logs {
        std::fs::create_dir_all(&config.log_dir)?;
        let file_appender = tracing_appender::rolling::daily(&config.log_dir, "quarry.log");
        let (non_blocking, worker_guard) = tracing_appender::non_blocking(file_appender);
        guard = Some(worker_guard);

        let json_layer = fmt::layer()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .with_span_events(span_events)
            .with_ansi(false)
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_writer(non_blocking)
            .with_filter(env_filter())
            .boxed();

        layers.push(json_layer);
    }

    tracing_subscriber::registry().with(layers).try_init()?;

    tracing::info!(
        log_dir = %config.log_dir.display(),
        json_enabled = config.enable_json_logs,
        console_enabled = config.enable_console_logs,
        "logging initialized"
    );

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_override_defaults() {
        let config = LoggingConfig::from_settings(&LogSettings {
            log_dir: Some(PathBuf::from("/var/log/quarry")),
            json: true,
            filter: Some("warn".into()),
        });
        assert_eq!(config.log_dir, PathBuf::from("/var/log/quarry"));
        assert!(config.enable_json_logs);
        assert_eq!(config.default_filter, "warn");
    }

    #[test]
    fn test_empty_settings_keep_profile() {
        let config = LoggingConfig::from_settings(&LogSettings::default());
        assert_eq!(config.log_dir, log_directory());
        assert!(config.enable_console_logs);
    }
}
