use super::logrecord::Logrecord;
use chrono::Local;
use colored::*;
use glob::glob;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Serialize, Deserialize, Debug, Clone)]
/// # Logger Local Options
///
/// Configuration options for the `LoggerLocal` instance, controlling where and how
/// log messages are output.
pub struct LoggerLocalOptions {
    /// A list of log levels that should be printed to the TTY (console).
    pub use_tty: Option<Vec<i64>>,
    /// A list of log levels that should be written to a log file.
    pub use_file: Option<Vec<i64>>,
    /// The directory where log files should be stored. If `None`, defaults to `./logs`.
    pub log_dir: Option<PathBuf>,
    /// Forward every record to the `tracing` dispatcher as well.
    pub use_tracing: bool,
}

impl Default for LoggerLocalOptions {
    fn default() -> Self {
        Self {
            use_tty: Some(vec![6, 5, 4, 3]),
            use_file: None,
            log_dir: None,
            use_tracing: true,
        }
    }
}

impl LoggerLocalOptions {
    /// Options that only forward to `tracing`: nothing printed, nothing written.
    pub fn tracing_only() -> Self {
        Self {
            use_tty: None,
            use_file: None,
            log_dir: None,
            use_tracing: true,
        }
    }
}

pub struct LoggerLocal {
    /// The name of the application associated with this logger instance.
    app_name: String,
    /// Configuration options determining logging behavior.
    options: LoggerLocalOptions,
    /// Serializes appends so concurrent fetches never interleave lines.
    file_mutex: Arc<Mutex<()>>,
    /// The path to the currently active log file, if file logging is enabled.
    current_log_file: Option<PathBuf>,
}

impl LoggerLocal {
    /// Keeps only the newest `<app_name>-*.log` file in `log_dir`.
    fn rotate_logs(app_name: &str, log_dir: &Path) {
        let pattern = format!("{}/{}-*.log", log_dir.display(), app_name);
        let mut log_files: Vec<PathBuf> = match glob(&pattern) {
            Ok(paths) => paths.filter_map(Result::ok).collect(),
            Err(e) => {
                eprintln!("Error reading glob pattern {}: {}", pattern, e);
                return;
            }
        };

        // Filenames embed a sortable timestamp, newest first.
        log_files.sort_by(|a, b| b.file_name().cmp(&a.file_name()));

        for old_file in log_files.iter().skip(1) {
            if let Err(e) = std::fs::remove_file(old_file) {
                eprintln!("Error deleting old log file {}: {}", old_file.display(), e);
            }
        }
    }

    /// Creates a new `LoggerLocal` instance.
    ///
    /// If file logging is enabled, the log directory is created, older log files
    /// of the same application are rotated away and a fresh timestamped file is
    /// selected for this instance.
    pub fn new(app_name: String, options: Option<LoggerLocalOptions>) -> Self {
        let opts = options.unwrap_or_default();

        let mut logger = Self {
            app_name: app_name.clone(),
            options: opts,
            file_mutex: Arc::new(Mutex::new(())),
            current_log_file: None,
        };

        if logger.options.use_file.is_some() {
            let log_base_dir = logger
                .options
                .log_dir
                .clone()
                .unwrap_or_else(|| PathBuf::from("./logs"));

            if let Err(e) = std::fs::create_dir_all(&log_base_dir) {
                eprintln!("Error creating log directory {}: {}", log_base_dir.display(), e);
            }

            LoggerLocal::rotate_logs(&app_name, &log_base_dir);

            let timestamp = Local::now().format("%Y%m%d_%H%M%S").to_string();
            let current_log_filename = format!("{}-{}.log", app_name, timestamp);
            logger.current_log_file = Some(log_base_dir.join(current_log_filename));
        }

        logger
    }

    /// The application name stamped on every record.
    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    /// The file this instance appends to, when file logging is enabled.
    pub fn current_log_file(&self) -> Option<&Path> {
        self.current_log_file.as_deref()
    }

    /// Logs a message with a specified level, handling TTY output, `tracing`
    /// forwarding and file writing based on the logger's configuration.
    ///
    /// # Arguments
    /// * `log_level` - The numeric log level (0 silly .. 6 fatal).
    /// * `log_message` - The main message string to be logged.
    /// * `log_extras` - Optional structured data to include in the log.
    pub async fn log(&self, log_level: i64, log_message: &str, log_extras: Option<Value>) {
        let record = Logrecord::new(&self.app_name, log_level, log_message, log_extras);

        if self.options.use_tracing {
            Self::forward_to_tracing(&record);
        }

        if let Some(tty_levels) = &self.options.use_tty {
            if tty_levels.contains(&log_level) {
                let ts = record.rfc9557.as_str().truecolor(128, 128, 128);
                let app_name_colored = format!("[{}]", self.app_name).truecolor(128, 128, 128);
                let colored_message = match log_level {
                    6 => log_message.bright_white().on_bright_red(),
                    5 => log_message.bright_red(),
                    4 => log_message.bright_yellow(),
                    3 => log_message.bright_green(),
                    2 => log_message.bright_white(),
                    1 => log_message.bright_cyan(),
                    _ => log_message.blue(),
                };

                println!("{}{}\n{}", ts, app_name_colored, colored_message);
                if record.has_tags() {
                    if let Ok(tags_str) = serde_json::to_string(&record.tags) {
                        println!("{}{}{}", ts, app_name_colored, tags_str.truecolor(128, 128, 128));
                    }
                }
            }
        }

        if let Some(file_levels) = &self.options.use_file {
            if file_levels.contains(&log_level) {
                if let Some(log_file_path) = &self.current_log_file {
                    let mut line = format!("{} [{}] [{}] {}\n", record.rfc9557, self.app_name, record.level, log_message);
                    if record.has_tags() {
                        if let Ok(tags_str) = serde_json::to_string(&record.tags) {
                            line.push_str(&tags_str);
                            line.push('\n');
                        }
                    }

                    let _guard = self.file_mutex.lock().await;
                    let written = OpenOptions::new()
                        .create(true)
                        .append(true)
                        .open(log_file_path)
                        .and_then(|mut file| file.write_all(line.as_bytes()));
                    if let Err(e) = written {
                        eprintln!("Error writing log file {}: {}", log_file_path.display(), e);
                    }
                }
            }
        }
    }

    fn forward_to_tracing(record: &Logrecord) {
        let app = record.app.name.as_str();
        let text = record.message.text.as_str();
        let tags = if record.has_tags() { record.tags.to_string() } else { String::new() };
        match record.loglevel {
            5 | 6 => tracing::error!(target: "lib_common::content", app, tags = %tags, "{}", text),
            4 => tracing::warn!(target: "lib_common::content", app, tags = %tags, "{}", text),
            3 => tracing::info!(target: "lib_common::content", app, tags = %tags, "{}", text),
            2 => tracing::debug!(target: "lib_common::content", app, tags = %tags, "{}", text),
            _ => tracing::trace!(target: "lib_common::content", app, tags = %tags, "{}", text),
        }
    }

    /// Logs a message at the "Trace" (level 1) log level.
    pub async fn trace(&self, log_message: &str, log_extras: Option<Value>) {
        self.log(1, log_message, log_extras).await;
    }

    /// Logs a message at the "Debug" (level 2) log level.
    ///
    /// Used for query documents, cache hits and misses, and raw response text.
    pub async fn debug(&self, log_message: &str, log_extras: Option<Value>) {
        self.log(2, log_message, log_extras).await;
    }

    /// Logs a message at the "Info" (level 3) log level.
    pub async fn info(&self, log_message: &str, log_extras: Option<Value>) {
        self.log(3, log_message, log_extras).await;
    }

    /// Logs a message at the "Warn" (level 4) log level.
    pub async fn warn(&self, log_message: &str, log_extras: Option<Value>) {
        self.log(4, log_message, log_extras).await;
    }

    /// Logs a message at the "Error" (level 5) log level.
    ///
    /// Failed fetch attempts and downgraded failures land here.
    pub async fn error(&self, log_message: &str, log_extras: Option<Value>) {
        self.log(5, log_message, log_extras).await;
    }

    /// Logs a message at the "Fatal" (level 6) log level.
    pub async fn fatal(&self, log_message: &str, log_extras: Option<Value>) {
        self.log(6, log_message, log_extras).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn file_options(dir: &Path) -> LoggerLocalOptions {
        LoggerLocalOptions {
            use_tty: None,
            use_file: Some(vec![6, 5, 4, 3, 2, 1, 0]),
            log_dir: Some(dir.to_path_buf()),
            use_tracing: false,
        }
    }

    #[tokio::test]
    async fn test_file_logging_writes_messages_and_extras() {
        let temp_dir = tempdir().expect("Failed to create temporary directory");
        let logger = LoggerLocal::new("content_test".to_string(), Some(file_options(temp_dir.path())));

        logger.info("search issued", None).await;
        logger.error("attempt failed", Some(serde_json::json!({"attempt": 3}))).await;

        let path = logger.current_log_file().expect("file logging enabled");
        let contents = fs::read_to_string(path).expect("log file readable");
        assert!(contents.contains("search issued"));
        assert!(contents.contains("[error] attempt failed"));
        assert!(contents.contains(r#""attempt":3"#));
    }

    #[tokio::test]
    async fn test_levels_not_listed_are_not_written() {
        let temp_dir = tempdir().expect("Failed to create temporary directory");
        let mut options = file_options(temp_dir.path());
        options.use_file = Some(vec![5, 6]);
        let logger = LoggerLocal::new("content_levels".to_string(), Some(options));

        logger.debug("noisy detail", None).await;
        logger.error("real problem", None).await;

        let contents = fs::read_to_string(logger.current_log_file().unwrap()).unwrap();
        assert!(!contents.contains("noisy detail"));
        assert!(contents.contains("real problem"));
    }

    #[test]
    fn test_rotation_keeps_only_newest_file() {
        let temp_dir = tempdir().expect("Failed to create temporary directory");
        for stamp in ["20240101_000000", "20240102_000000", "20240103_000000"] {
            fs::write(temp_dir.path().join(format!("rot-{}.log", stamp)), "x").unwrap();
        }

        LoggerLocal::rotate_logs("rot", temp_dir.path());

        let remaining: Vec<_> = fs::read_dir(temp_dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(remaining, vec!["rot-20240103_000000.log".to_string()]);
    }
}
