//! Log formatting options for different output styles

use crate::logging::LogLevel;
use anyhow::bail;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// One formatted log line before rendering
#[derive(Debug, Clone)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub target: String,
    pub message: String,
}

impl LogEntry {
    pub fn new(level: LogLevel, message: String, target: String) -> Self {
        Self { timestamp: Utc::now(), level, target, message }
    }

    pub fn from_log_record(record: &log::Record) -> Self {
        Self::new(record.level().into(), record.args().to_string(), record.target().to_string())
    }
}

/// How logs should be formatted
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Example: 2024-01-15 10:30:00.000 DEBUG [lamina_core::cache::logging] Cache Hit Ratio [users]: 0.5000
    Human,

    /// Example: {"timestamp":"2024-01-15T10:30:00+00:00","level":"DEBUG","target":"..","message":".."}
    Json,

    /// Example: timestamp=2024-01-15T10:30:00+00:00 level=DEBUG target=.. message=".."
    Logfmt,
}

impl LogFormat {
    pub fn format_entry(&self, entry: &LogEntry) -> String {
        match self {
            LogFormat::Json => format_json(entry),
            LogFormat::Human => format_human(entry),
            LogFormat::Logfmt => format_logfmt(entry),
        }
    }
}

impl FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "human" => Ok(LogFormat::Human),
            "json" => Ok(LogFormat::Json),
            "logfmt" => Ok(LogFormat::Logfmt),
            other => bail!("Invalid log format: {}", other),
        }
    }
}

fn format_json(entry: &LogEntry) -> String {
    let json = serde_json::json!({
        "timestamp": entry.timestamp.to_rfc3339(),
        "level": entry.level.to_string(),
        "target": entry.target,
        "message": entry.message,
    });
    json.to_string()
}

fn format_human(entry: &LogEntry) -> String {
    let timestamp = entry.timestamp.format("%Y-%m-%d %H:%M:%S%.3f");
    format!("{} {:5} [{}] {}", timestamp, entry.level, entry.target, entry.message)
}

fn format_logfmt(entry: &LogEntry) -> String {
    format!(
        "timestamp={} level={} target={} message=\"{}\"",
        entry.timestamp.to_rfc3339(),
        entry.level,
        entry.target,
        entry.message.replace('"', "\\\"")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_format() {
        let entry = LogEntry::new(
            LogLevel::Debug,
            "Cache Hit Ratio [users]: 0.5000".to_string(),
            "lamina_core::cache::logging".to_string(),
        );

        let formatted = LogFormat::Json.format_entry(&entry);

        let parsed: serde_json::Value = serde_json::from_str(&formatted).unwrap();
        assert_eq!(parsed["message"], "Cache Hit Ratio [users]: 0.5000");
        assert_eq!(parsed["level"], "DEBUG");
        assert_eq!(parsed["target"], "lamina_core::cache::logging");
    }

    #[test]
    fn test_human_format() {
        let entry = LogEntry::new(
            LogLevel::Warn,
            "gave up waiting".to_string(),
            "lamina_core::cache::blocking".to_string(),
        );

        let formatted = LogFormat::Human.format_entry(&entry);

        assert!(formatted.contains("WARN "));
        assert!(formatted.contains("[lamina_core::cache::blocking]"));
        assert!(formatted.ends_with("gave up waiting"));
    }

    #[test]
    fn test_logfmt_format() {
        let entry =
            LogEntry::new(LogLevel::Trace, "evicted \"k\"".to_string(), "lru".to_string());

        let formatted = LogFormat::Logfmt.format_entry(&entry);

        assert!(formatted.contains("level=TRACE"));
        assert!(formatted.contains("target=lru"));
        assert!(formatted.contains("message=\"evicted \\\"k\\\"\""));
    }
}
