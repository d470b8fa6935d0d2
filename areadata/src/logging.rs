//! Tracing subscriber setup.
//!
//! Console output goes to stderr so it does not interleave with command
//! output or progress bars. An optional daily rolling log file can be added;
//! the returned guard flushes it and must be held until exit.

use std::path::PathBuf;

use time::format_description::well_known::Rfc3339;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::time::LocalTime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{EnvFilter, Registry};

/// Default filter when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Prefix of the rolling log files.
pub const LOG_FILE_PREFIX: &str = "areadata.log";

/// Logging options.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Filter used when `RUST_LOG` is unset (e.g. `info`, `areadata=debug`).
    pub default_filter: String,
    /// Directory for daily rolling log files; console only when `None`.
    pub log_dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default_filter: DEFAULT_LOG_FILTER.to_string(),
            log_dir: None,
        }
    }
}

impl LoggingConfig {
    pub fn with_default_filter(mut self, filter: impl Into<String>) -> Self {
        self.default_filter = filter.into();
        self
    }

    pub fn with_log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.log_dir = Some(dir.into());
        self
    }
}

fn env_filter(default_filter: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter))
}

/// Install the global subscriber.
///
/// Returns the file writer's guard when a log directory is configured.
pub fn init(config: &LoggingConfig) -> Result<Option<WorkerGuard>, TryInitError> {
    let console = tracing_subscriber::fmt::layer()
        .with_timer(LocalTime::new(Rfc3339))
        .with_writer(std::io::stderr)
        .with_target(false);

    let (file, guard) = match &config.log_dir {
        Some(dir) => {
            let appender = RollingFileAppender::new(Rotation::DAILY, dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_timer(LocalTime::new(Rfc3339))
                .with_ansi(false)
                .with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    Registry::default()
        .with(env_filter(&config.default_filter))
        .with(console)
        .with(file)
        .try_init()?;

    Ok(guard)
}
