//! Logging setup
//!
//! The library only emits `tracing` events. Applications that do not install
//! their own subscriber can call [`init_tracing`]:
//!
//! ```rust,ignore
//! use infera::observability::{init_tracing, TracingConfig};
//!
//! let _guard = init_tracing(TracingConfig::development())?;
//! ```

use crate::error::InferenceError;
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::BoxMakeWriter;

/// Output format for log lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Multi-line, human-readable
    Pretty,
    /// Single-line text
    #[default]
    Compact,
    /// One JSON object per line
    Json,
}

#[derive(Debug, Clone)]
pub struct TracingConfig {
    pub level: tracing::Level,
    pub format: OutputFormat,
    /// Write to daily-rotated files in this directory instead of stdout
    pub log_dir: Option<PathBuf>,
    pub file_prefix: String,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            level: tracing::Level::INFO,
            format: OutputFormat::Compact,
            log_dir: None,
            file_prefix: "infera.log".to_string(),
        }
    }
}

impl TracingConfig {
    pub fn development() -> Self {
        Self {
            level: tracing::Level::DEBUG,
            format: OutputFormat::Pretty,
            ..Default::default()
        }
    }

    pub fn json_production(log_dir: impl Into<PathBuf>) -> Self {
        Self {
            level: tracing::Level::INFO,
            format: OutputFormat::Json,
            log_dir: Some(log_dir.into()),
            ..Default::default()
        }
    }

    /// Warnings and errors only.
    pub fn minimal() -> Self {
        Self {
            level: tracing::Level::WARN,
            ..Default::default()
        }
    }

    pub fn with_level(mut self, level: tracing::Level) -> Self {
        self.level = level;
        self
    }

    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }

    fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "infera={}",
                self.level.as_str().to_ascii_lowercase()
            ))
        })
    }
}

/// Install a global subscriber.
///
/// Returns the appender guard when logging to files; keep it alive for the
/// lifetime of the program. An already installed subscriber is left in place.
pub fn init_tracing(config: TracingConfig) -> Result<Option<WorkerGuard>, InferenceError> {
    let (writer, guard) = match &config.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, &config.file_prefix);
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            (BoxMakeWriter::new(non_blocking), Some(guard))
        }
        None => (BoxMakeWriter::new(std::io::stdout), None),
    };
    let filter = config.filter();

    let result = match config.format {
        OutputFormat::Pretty => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(writer)
            .pretty()
            .try_init(),
        OutputFormat::Compact => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(writer)
            .compact()
            .try_init(),
        OutputFormat::Json => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(writer)
            .with_thread_ids(true)
            .json()
            .try_init(),
    };

    match result {
        Ok(()) => Ok(guard),
        Err(e)
            if e.to_string().contains("already been set")
                || e.to_string().contains("already initialized") =>
        {
            Ok(guard)
        }
        Err(e) => Err(InferenceError::ConfigurationError(format!(
            "failed to initialize tracing: {e}"
        ))),
    }
}

/// Mask a credential for logging, keeping a short prefix.
pub fn mask_secret(value: &str) -> String {
    let prefix: String = value.chars().take(4).collect();
    if value.chars().count() <= 8 {
        "***".to_string()
    } else {
        format!("{prefix}***")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn masks_secrets() {
        assert_eq!(mask_secret("short"), "***");
        assert_eq!(mask_secret("Bearer abcdefgh"), "Bear***");
    }

    #[test]
    fn presets() {
        assert_eq!(TracingConfig::development().format, OutputFormat::Pretty);
        assert_eq!(TracingConfig::minimal().level, tracing::Level::WARN);
        let prod = TracingConfig::json_production("/tmp/logs");
        assert_eq!(prod.format, OutputFormat::Json);
        assert!(prod.log_dir.is_some());
    }

    #[test]
    fn init_twice_is_fine() {
        let _ = init_tracing(TracingConfig::minimal());
        assert!(init_tracing(TracingConfig::minimal()).is_ok());
    }
}
