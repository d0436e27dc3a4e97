use std::path::PathBuf;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::env_string;

const LOG_FILE_PREFIX: &str = "words-backend.log";

#[derive(Debug, Clone)]
pub struct LogConfig {
    pub filter: String,
    /// `None` keeps logging on stdout only.
    pub file_dir: Option<PathBuf>,
    pub rotation: LogRotation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogRotation {
    Hourly,
    Daily,
    Never,
}

impl LogRotation {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "hourly" => Some(Self::Hourly),
            "daily" => Some(Self::Daily),
            "never" => Some(Self::Never),
            _ => None,
        }
    }

    fn as_rotation(self) -> Rotation {
        match self {
            Self::Hourly => Rotation::HOURLY,
            Self::Daily => Rotation::DAILY,
            Self::Never => Rotation::NEVER,
        }
    }
}

impl LogConfig {
    pub fn from_env(filter: &str) -> Self {
        let file_logs = env_string("ENABLE_FILE_LOGS")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);
        let file_dir = file_logs
            .then(|| PathBuf::from(env_string("LOG_DIR").unwrap_or_else(|| "./logs".to_string())));
        let rotation = env_string("LOG_ROTATION")
            .as_deref()
            .and_then(LogRotation::parse)
            .unwrap_or(LogRotation::Daily);

        Self {
            filter: filter.to_string(),
            file_dir,
            rotation,
        }
    }
}

/// Keeps the non-blocking file writer flushing until dropped.
pub struct FileLogGuard {
    _guard: WorkerGuard,
}

pub fn init_tracing(config: &LogConfig) -> Option<FileLogGuard> {
    let env_filter = EnvFilter::try_new(&config.filter).unwrap_or_else(|_| EnvFilter::new("info"));
    let stdout_layer = fmt::layer().with_target(true);

    let file_writer = config.file_dir.as_ref().and_then(|dir| match std::fs::create_dir_all(dir) {
        Ok(()) => {
            let appender =
                RollingFileAppender::new(config.rotation.as_rotation(), dir, LOG_FILE_PREFIX);
            Some(tracing_appender::non_blocking(appender))
        }
        Err(err) => {
            eprintln!("failed to create log directory {}: {err}", dir.display());
            None
        }
    });

    match file_writer {
        Some((writer, guard)) => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(stdout_layer)
                .with(fmt::layer().with_writer(writer).with_ansi(false).with_target(true))
                .init();
            Some(FileLogGuard { _guard: guard })
        }
        None => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(stdout_layer)
                .init();
            None
        }
    }
}
