//! Log output for the engine and CLI
//!
//! The engine logs through `tracing` targets named after its modules. By
//! default only those targets are shown at the configured level; every
//! other crate is held at `warn`. `RUST_LOG` overrides the whole filter.

use serde::{Deserialize, Serialize};
use std::io::IsTerminal;
use std::path::PathBuf;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Modules that emit session, replay and persistence events
pub const ENGINE_TARGETS: [&str; 5] = [
    "trackrs::session",
    "trackrs::replay",
    "trackrs::storage",
    "trackrs::sync",
    "trackrs::config",
];

/// `[logging]` section of the config file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: LogLevel,
    pub format: LogFormat,

    /// Also write JSON lines to this file
    pub file: Option<PathBuf>,

    /// Start a new log file each day
    pub rotate_daily: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Warn,
            format: LogFormat::Text,
            file: None,
            rotate_daily: true,
        }
    }
}

impl LogConfig {
    /// Filter directives for the engine targets, e.g. `warn,trackrs::session=debug,...`
    pub fn directives(&self) -> String {
        let level = self.level.as_str();
        ENGINE_TARGETS
            .iter()
            .fold(String::from("warn"), |mut acc, target| {
                acc.push(',');
                acc.push_str(target);
                acc.push('=');
                acc.push_str(level);
                acc
            })
    }

    fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(self.directives()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }

    /// Each `-v` on the command line raises the level by one step
    pub fn raised_by(self, verbosity: u8) -> Self {
        match (self as u8).saturating_add(verbosity) {
            0 => LogLevel::Error,
            1 => LogLevel::Warn,
            2 => LogLevel::Info,
            3 => LogLevel::Debug,
            _ => LogLevel::Trace,
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "error" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            _ => Err(format!("Invalid log level: {}", s)),
        }
    }
}

/// Console output style; the log file is always JSON
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Text,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "pretty" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            _ => Err(format!("Invalid log format: {}", s)),
        }
    }
}

fn file_appender(config: &LogConfig) -> anyhow::Result<Option<RollingFileAppender>> {
    let Some(path) = &config.file else {
        return Ok(None);
    };

    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));
    let prefix = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("trackrs.log");
    let rotation = if config.rotate_daily {
        Rotation::DAILY
    } else {
        Rotation::NEVER
    };

    std::fs::create_dir_all(&dir)?;
    let appender = RollingFileAppender::builder()
        .rotation(rotation)
        .filename_prefix(prefix)
        .build(&dir)?;
    Ok(Some(appender))
}

/// Install the global subscriber; logs go to stderr so stdout stays clean
/// for sync documents and tables.
pub fn init_logging(config: &LogConfig) -> anyhow::Result<()> {
    let console = match config.format {
        LogFormat::Text => fmt::layer()
            .compact()
            .with_writer(std::io::stderr)
            .with_ansi(std::io::stderr().is_terminal())
            .boxed(),
        LogFormat::Json => fmt::layer().json().with_writer(std::io::stderr).boxed(),
    };
    let file = file_appender(config)?.map(|appender| fmt::layer().json().with_writer(appender));

    tracing_subscriber::registry()
        .with(config.env_filter())
        .with(console)
        .with(file)
        .try_init()?;

    tracing::debug!(filter = %config.directives(), file = ?config.file, "Logging initialized");
    Ok(())
}
