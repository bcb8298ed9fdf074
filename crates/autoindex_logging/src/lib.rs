//! Shared logging utilities for Autoindex.
//!
//! The binary installs a `tracing` subscriber once via [`init_logging`].
//! Library code never logs through a global: it receives a [`SharedLogger`]
//! at construction and calls its leveled methods.

use anyhow::{Context, Result};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

const LOG_TARGET: &str = "autoindex";

/// Configured verbosity. `None` disables logging entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    None,
    Error,
    Warn,
    #[default]
    Info,
    Debug,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::None => "none",
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
        }
    }

    fn default_filter(&self) -> Option<String> {
        match self {
            LogLevel::None => None,
            level => Some(format!(
                "autoindex={lvl},autoindex_index={lvl},tower_http=warn",
                lvl = level.as_str()
            )),
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "info" => Ok(LogLevel::Info),
            "none" => Ok(LogLevel::None),
            "error" => Ok(LogLevel::Error),
            "warn" => Ok(LogLevel::Warn),
            "debug" => Ok(LogLevel::Debug),
            _ => Err(format!(
                "Invalid log level: '{}'. Expected: debug, info, warn, error, or none",
                s
            )),
        }
    }
}

/// Logging configuration for the server binary.
pub struct LogConfig {
    pub level: LogLevel,
}

/// Initialize tracing with stderr output.
///
/// `RUST_LOG` overrides the configured level. `LogLevel::None` installs
/// nothing.
pub fn init_logging(config: LogConfig) -> Result<()> {
    let Some(default_filter) = config.level.default_filter() else {
        return Ok(());
    };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_filter(filter),
        )
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(())
}

/// Leveled logging capability handed to library components.
pub trait Logger: Send + Sync {
    fn debug(&self, args: fmt::Arguments<'_>);
    fn info(&self, args: fmt::Arguments<'_>);
    fn warn(&self, args: fmt::Arguments<'_>);
    fn error(&self, args: fmt::Arguments<'_>);
}

pub type SharedLogger = Arc<dyn Logger>;

/// Forwards every call to the installed `tracing` subscriber.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn debug(&self, args: fmt::Arguments<'_>) {
        tracing::debug!(target: LOG_TARGET, "{}", args);
    }

    fn info(&self, args: fmt::Arguments<'_>) {
        tracing::info!(target: LOG_TARGET, "{}", args);
    }

    fn warn(&self, args: fmt::Arguments<'_>) {
        tracing::warn!(target: LOG_TARGET, "{}", args);
    }

    fn error(&self, args: fmt::Arguments<'_>) {
        tracing::error!(target: LOG_TARGET, "{}", args);
    }
}

/// Drops everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiscardLogger;

impl Logger for DiscardLogger {
    fn debug(&self, _args: fmt::Arguments<'_>) {}
    fn info(&self, _args: fmt::Arguments<'_>) {}
    fn warn(&self, _args: fmt::Arguments<'_>) {}
    fn error(&self, _args: fmt::Arguments<'_>) {}
}

/// Pick the logger variant for a configured level.
pub fn logger_for_level(level: LogLevel) -> SharedLogger {
    match level {
        LogLevel::None => Arc::new(DiscardLogger),
        _ => Arc::new(TracingLogger),
    }
}
