use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use static_init::dynamic;
use std::path::Path;

/// Facts about the running process, resolved once.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessInfo {
    pub process_basename: String,
    pub process_host: String,
    pub process_pid: i64,
}

fn get_process_info() -> ProcessInfo {
    let process_basename = std::env::current_exe()
        .ok()
        .and_then(|exe| {
            Path::new(&exe)
                .file_stem()
                .and_then(|stem| stem.to_str())
                .map(|s| s.to_string())
        })
        .unwrap_or_default();
    let process_host = hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_default();
    ProcessInfo {
        process_basename,
        process_host,
        process_pid: std::process::id() as i64,
    }
}

#[dynamic]
pub static PROCESSINFO: ProcessInfo = get_process_info();

/// Returns the current UTC time as an RFC 9557 / RFC 3339 string with
/// millisecond precision, e.g. `2024-01-15T10:00:00.123Z`.
pub fn current_datetime_rfc9557() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Maps the numeric log level used by `LoggerLocal` to its name.
pub fn level_name(log_level: i64) -> &'static str {
    match log_level {
        6 => "fatal",
        5 => "error",
        4 => "warn",
        3 => "info",
        2 => "debug",
        1 => "trace",
        _ => "silly",
    }
}

/// # Logrecord
///
/// A single structured log entry as written by `LoggerLocal`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Logrecord {
    /// The severity level of the log (0 silly .. 6 fatal).
    pub loglevel: i64,
    /// Human readable name of `loglevel`.
    pub level: String,
    /// Details about the message content.
    pub message: Message,
    /// Information about the application generating the log.
    pub app: App,
    /// Information about the host where the log originated.
    pub host: Host,
    /// Arbitrary structured extras attached by the caller.
    pub tags: Value,
    /// RFC 9557 formatted timestamp string.
    pub rfc9557: String,
}

impl Default for Logrecord {
    fn default() -> Self {
        Self {
            loglevel: 0,
            level: level_name(0).to_string(),
            message: Message::default(),
            app: App::default(),
            host: Host::default(),
            tags: serde_json::json!([]),
            rfc9557: current_datetime_rfc9557(),
        }
    }
}

impl Logrecord {
    /// Builds a record for `app_name` at `log_level`.
    pub fn new(app_name: &str, log_level: i64, text: &str, extras: Option<Value>) -> Self {
        let mut record = Logrecord::default();
        record.app.name = app_name.to_string();
        record.loglevel = log_level;
        record.level = level_name(log_level).to_string();
        record.message.text = text.to_string();
        if let Some(extras) = extras {
            record.tags = extras;
        }
        record
    }

    /// True when the caller attached extras to this record.
    pub fn has_tags(&self) -> bool {
        self.tags != serde_json::json!([]) && !self.tags.is_null()
    }
}

/// # Message
///
/// Represents the textual content of a log entry, including its language.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// The language of the message (e.g., "en" for English).
    pub lang: String,
    /// The actual text content of the message.
    pub text: String,
}

impl Default for Message {
    fn default() -> Self {
        Self {
            text: "".to_string(),
            lang: "en".to_string(),
        }
    }
}

/// # App
///
/// Contains information about the application that generated the log entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct App {
    /// The process ID (PID) of the application.
    pub pid: i64,
    /// The name of the application.
    pub name: String,
}

impl Default for App {
    /// Populates `name` from the running executable and `pid` from the OS.
    fn default() -> Self {
        Self {
            name: PROCESSINFO.process_basename.clone(),
            pid: PROCESSINFO.process_pid,
        }
    }
}

/// # Host
///
/// Contains information about the host machine where the log originated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Host {
    /// The name of the host.
    pub name: String,
}

impl Default for Host {
    fn default() -> Self {
        Self {
            name: PROCESSINFO.process_host.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_process_info_is_shared_by_records() {
        let first = Logrecord::new("a", 3, "one", None);
        let second = Logrecord::new("b", 3, "two", None);
        assert_eq!(first.host, second.host);
        assert_eq!(first.app.pid, std::process::id() as i64);
        assert_eq!(first.host.name, PROCESSINFO.process_host);
        assert_eq!(Host::default().name, PROCESSINFO.process_host);
        assert_eq!(App::default().name, PROCESSINFO.process_basename);
    }

    #[test]
    fn test_new_record_carries_level_and_tags() {
        let record = Logrecord::new("content", 5, "boom", Some(serde_json::json!({"attempt": 2})));
        assert_eq!(record.loglevel, 5);
        assert_eq!(record.level, "error");
        assert_eq!(record.app.name, "content");
        assert_eq!(record.message.text, "boom");
        assert!(record.has_tags());
        assert!(record.rfc9557.ends_with('Z'));
    }

    #[test]
    fn test_default_record_has_no_tags() {
        let record = Logrecord::default();
        assert!(!record.has_tags());
        assert_eq!(record.message.lang, "en");
    }
}
