//! Logging configuration

use crate::logging::LogFormat;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::str::FromStr;

/// Logging section of the configuration file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Minimum level to emit
    /// Env: LAMINA_LOG_LEVEL
    /// Default: info
    pub level: LogLevel,

    /// Line format
    /// Env: LAMINA_LOG_FORMAT
    /// Default: human
    pub format: LogFormat,

    /// Stream the lines are written to
    /// Default: stderr
    pub output: LogOutput,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: LogLevel::Info, format: LogFormat::Human, output: LogOutput::Stderr }
    }
}

impl LoggingConfig {
    pub fn development() -> Self {
        Self { level: LogLevel::Debug, ..Self::default() }
    }

    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_output(mut self, output: LogOutput) -> Self {
        self.output = output;
        self
    }

    pub fn merge(&mut self, other: Self) {
        *self = other;
    }

    pub fn apply_env_vars(&mut self) -> Result<()> {
        self.apply_overrides(env::var("LAMINA_LOG_LEVEL").ok(), env::var("LAMINA_LOG_FORMAT").ok())
    }

    fn apply_overrides(&mut self, level: Option<String>, format: Option<String>) -> Result<()> {
        if let Some(level) = level {
            self.level = level.parse::<LogLevel>().context("Invalid LAMINA_LOG_LEVEL")?;
        }

        if let Some(format) = format {
            self.format = format.parse::<LogFormat>().context("Invalid LAMINA_LOG_FORMAT")?;
        }

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        Ok(())
    }
}

/// Log levels in order of severity (compatible with standard log crate)
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<log::Level> for LogLevel {
    fn from(level: log::Level) -> Self {
        match level {
            log::Level::Error => LogLevel::Error,
            log::Level::Warn => LogLevel::Warn,
            log::Level::Info => LogLevel::Info,
            log::Level::Debug => LogLevel::Debug,
            log::Level::Trace => LogLevel::Trace,
        }
    }
}

impl From<LogLevel> for log::LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

impl FromStr for LogLevel {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "error" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            other => bail!("Invalid log level: {}", other),
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LogLevel::Error => "ERROR",
            LogLevel::Warn => "WARN",
            LogLevel::Info => "INFO",
            LogLevel::Debug => "DEBUG",
            LogLevel::Trace => "TRACE",
        };
        f.pad(name)
    }
}

/// Where log lines go
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    Stdout,
    Stderr,
}
