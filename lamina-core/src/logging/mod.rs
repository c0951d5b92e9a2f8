//! Process-wide logger for lamina binaries
//!
//! Library code only talks to the `log` facade (`trace!` for evictions,
//! `debug!` for flushes, commits and hit ratios, `warn!` for lock timeouts).
//! Applications that do not bring their own logger can install this one:
//!
//! ```rust,no_run
//! use lamina_core::logging::{init_logging, LogFormat, LoggingConfig};
//!
//! let config = LoggingConfig::development().with_format(LogFormat::Json);
//! init_logging(&config)?;
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod config;
pub mod formatter;

pub use config::{LogLevel, LogOutput, LoggingConfig};
pub use formatter::{LogEntry, LogFormat};

use std::io::Write;
use std::sync::Once;

static INIT: Once = Once::new();

/// Install the global logger
///
/// Only the first call has an effect; later calls return `Ok(())`.
pub fn init_logging(config: &LoggingConfig) -> anyhow::Result<()> {
    let mut result = Ok(());
    INIT.call_once(|| {
        result = init_logging_internal(config);
    });
    result
}

fn init_logging_internal(config: &LoggingConfig) -> anyhow::Result<()> {
    log::set_boxed_logger(Box::new(LaminaLogger::new(config.clone())))?;
    log::set_max_level(config.level.into());
    Ok(())
}

struct LaminaLogger {
    config: LoggingConfig,
}

impl LaminaLogger {
    fn new(config: LoggingConfig) -> Self {
        Self { config }
    }
}

impl log::Log for LaminaLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        LogLevel::from(metadata.level()) <= self.config.level
    }

    fn log(&self, record: &log::Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let entry = LogEntry::from_log_record(record);
        let line = self.config.format.format_entry(&entry);
        let _ = match self.config.output {
            LogOutput::Stdout => writeln!(std::io::stdout().lock(), "{}", line),
            LogOutput::Stderr => writeln!(std::io::stderr().lock(), "{}", line),
        };
    }

    fn flush(&self) {
        let _ = match self.config.output {
            LogOutput::Stdout => std::io::stdout().flush(),
            LogOutput::Stderr => std::io::stderr().flush(),
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use log::Log;

    #[test]
    fn test_level_filtering() {
        let logger = LaminaLogger::new(LoggingConfig::default());
        let debug = log::Metadata::builder().level(log::Level::Debug).build();
        let warn = log::Metadata::builder().level(log::Level::Warn).build();

        assert!(!logger.enabled(&debug));
        assert!(logger.enabled(&warn));
    }

    #[test]
    fn test_init_is_idempotent() {
        let config = LoggingConfig::default();
        assert!(init_logging(&config).is_ok());
        assert!(init_logging(&config).is_ok());
    }
}
