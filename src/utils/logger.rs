use anyhow::Context;
use std::str::FromStr;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};

/// Logging setup for applications embedding a graph. Level and destination
/// come from the environment so harnesses and services need no extra wiring.
#[derive(Debug, Clone, serde::Deserialize, serde::Serialize)]
pub struct LoggerConfig {
    pub level: String,
    pub file_dir: Option<String>,
    pub file_prefix: Option<String>,
}

impl LoggerConfig {
    /// Read `LOG_LEVEL`, `LOG_FILE_DIR` and `LOG_FILE_PREFIX`; unset
    /// variables fall back to defaults (info, stdout).
    pub fn from_env() -> Self {
        Self {
            level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            file_dir: std::env::var("LOG_FILE_DIR").ok(),
            file_prefix: std::env::var("LOG_FILE_PREFIX").ok(),
        }
    }

    /// Install the global subscriber. When a file directory is configured,
    /// logs go through a daily-rolling non-blocking appender; keep the
    /// returned guard alive for the lifetime of the process.
    pub fn init(&self) -> anyhow::Result<Option<WorkerGuard>> {
        let level = Level::from_str(&self.level).unwrap_or(Level::INFO);

        if let Some(dir) = self.file_dir.as_deref() {
            let appender = RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .filename_prefix(self.file_prefix.as_deref().unwrap_or(""))
                .build(dir)
                .with_context(|| format!("failed to create rolling appender in {dir}"))?;
            let (writer, guard) = tracing_appender::non_blocking(appender);

            let _ = tracing_subscriber::fmt()
                .with_max_level(level)
                .with_writer(writer)
                .try_init();
            Ok(Some(guard))
        } else {
            let _ = tracing_subscriber::fmt().with_max_level(level).try_init();
            Ok(None)
        }
    }
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file_dir: None,
            file_prefix: None,
        }
    }
}
