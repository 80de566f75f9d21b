//! # Content Configuration
//!
//! Resolves the settings of the content retrieval layer from, in increasing
//! order of precedence: built-in defaults, an optional JSON file
//! (`$CONFIGS_LOCATION/content.json`), and the process environment (after a
//! `.env` file, if present, has been loaded).
//!
//! The API key is mandatory. Without it the process must refuse to start, so
//! [`load_content_config`] fails with [`ConfigError::MissingEnvVar`].

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::{env, fmt};

use config::{ext::*, *};
use serde::Serialize;
use thiserror::Error;

const CONFIG_CONTENT_NAME: &str = "content.json";

pub const ENV_API_KEY: &str = "CAPI_KEY";
pub const ENV_CAPI_PATH: &str = "CAPI_PATH";
pub const ENV_SAPI_PATH: &str = "SAPI_PATH";
pub const ENV_CONCORDANCES_PATH: &str = "CONCORDANCES_PATH";
pub const ENV_TME_AUTHORITY: &str = "TME_AUTHORITY";
pub const ENV_MAX_ATTEMPTS: &str = "CONTENT_MAX_ATTEMPTS";
pub const ENV_BACKOFF_MS: &str = "CONTENT_BACKOFF_MS";
pub const ENV_REQUEST_TIMEOUT_SECS: &str = "CONTENT_REQUEST_TIMEOUT_SECS";
pub const ENV_ARTICLE_RETRY: &str = "CONTENT_ARTICLE_RETRY";
pub const ENV_LOG_DIR: &str = "CONTENT_LOG_DIR";

pub const DEFAULT_CAPI_PATH: &str = "http://api.ft.com/enrichedcontent/";
pub const DEFAULT_SAPI_PATH: &str = "http://api.ft.com/content/search/v1";
pub const DEFAULT_CONCORDANCES_PATH: &str = "http://api.ft.com/concordances";
pub const DEFAULT_TME_AUTHORITY: &str = "http://api.ft.com/system/FT-TME";

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Configuration source error: {0}")]
    Source(String),
}

/// Settings of the content retrieval layer.
#[derive(Clone, PartialEq, Serialize)]
pub struct ContentConfig {
    #[serde(skip_serializing)]
    pub api_key: String,
    pub capi_path: String,
    pub sapi_path: String,
    pub concordances_path: String,
    pub tme_authority: String,
    pub max_attempts: u32,
    /// Zero means retries are immediate.
    pub backoff_ms: u64,
    pub request_timeout_secs: u64,
    /// Route article fetches through the retrying fetcher.
    pub article_retry: bool,
    pub log_dir: Option<PathBuf>,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            capi_path: DEFAULT_CAPI_PATH.to_string(),
            sapi_path: DEFAULT_SAPI_PATH.to_string(),
            concordances_path: DEFAULT_CONCORDANCES_PATH.to_string(),
            tme_authority: DEFAULT_TME_AUTHORITY.to_string(),
            max_attempts: 5,
            backoff_ms: 0,
            request_timeout_secs: 30,
            article_retry: false,
            log_dir: None,
        }
    }
}

impl fmt::Debug for ContentConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContentConfig")
            .field("has_api_key", &!self.api_key.is_empty())
            .field("capi_path", &self.capi_path)
            .field("sapi_path", &self.sapi_path)
            .field("concordances_path", &self.concordances_path)
            .field("tme_authority", &self.tme_authority)
            .field("max_attempts", &self.max_attempts)
            .field("backoff_ms", &self.backoff_ms)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("article_retry", &self.article_retry)
            .field("log_dir", &self.log_dir)
            .finish()
    }
}

impl fmt::Display for ContentConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ContentConfig
    Content path: {},
    Search path: {},
    Concordances path: {},
    TME authority: {},
    Max attempts: {},
    Backoff ms: {},
    Request timeout secs: {},
    Article retry: {}
",
            self.capi_path,
            self.sapi_path,
            self.concordances_path,
            self.tme_authority,
            self.max_attempts,
            self.backoff_ms,
            self.request_timeout_secs,
            self.article_retry
        )
    }
}

impl ContentConfig {
    /// Defaults with the given API key.
    pub fn with_api_key(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Default::default()
        }
    }

    /// Builds a configuration from file values overlaid by `lookup`.
    ///
    /// File keys are matched case-insensitively against the environment
    /// variable names; `lookup` (normally the process environment) wins.
    pub fn from_sources<F>(file_values: &BTreeMap<String, String>, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| -> Option<String> {
            lookup(key)
                .or_else(|| file_values.get(&key.to_lowercase()).cloned())
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let api_key = get(ENV_API_KEY).ok_or_else(|| ConfigError::MissingEnvVar(ENV_API_KEY.to_string()))?;
        let defaults = ContentConfig::default();

        Ok(Self {
            api_key,
            capi_path: get(ENV_CAPI_PATH).unwrap_or(defaults.capi_path),
            sapi_path: get(ENV_SAPI_PATH).unwrap_or(defaults.sapi_path),
            concordances_path: get(ENV_CONCORDANCES_PATH).unwrap_or(defaults.concordances_path),
            tme_authority: get(ENV_TME_AUTHORITY).unwrap_or(defaults.tme_authority),
            max_attempts: parse_attempts(get(ENV_MAX_ATTEMPTS), defaults.max_attempts)?,
            backoff_ms: parse_or(ENV_BACKOFF_MS, get(ENV_BACKOFF_MS), defaults.backoff_ms)?,
            request_timeout_secs: parse_or(
                ENV_REQUEST_TIMEOUT_SECS,
                get(ENV_REQUEST_TIMEOUT_SECS),
                defaults.request_timeout_secs,
            )?,
            article_retry: match get(ENV_ARTICLE_RETRY) {
                Some(v) => parse_flag(ENV_ARTICLE_RETRY, &v)?,
                None => defaults.article_retry,
            },
            log_dir: get(ENV_LOG_DIR).map(PathBuf::from),
        })
    }
}

fn parse_or<T: std::str::FromStr>(key: &str, value: Option<String>, default: T) -> Result<T, ConfigError> {
    match value {
        Some(v) => v.parse::<T>().map_err(|_| ConfigError::InvalidValue {
            key: key.to_string(),
            value: v,
        }),
        None => Ok(default),
    }
}

/// At least one attempt is always made.
fn parse_attempts(value: Option<String>, default: u32) -> Result<u32, ConfigError> {
    match parse_or(ENV_MAX_ATTEMPTS, value.clone(), default)? {
        0 => Err(ConfigError::InvalidValue {
            key: ENV_MAX_ATTEMPTS.to_string(),
            value: value.unwrap_or_default(),
        }),
        attempts => Ok(attempts),
    }
}

fn parse_flag(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}

/// Reads `path` as a JSON configuration file; missing files yield no values.
///
/// Keys are lower-cased so lookups are case-insensitive.
pub fn read_config_file(path: &Path) -> Result<BTreeMap<String, String>, ConfigError> {
    let mut values: BTreeMap<String, String> = BTreeMap::new();
    if !path.is_file() {
        return Ok(values);
    }

    let file: String = path.to_string_lossy().to_string();
    let config_data: Box<dyn ConfigurationRoot> = DefaultConfigurationBuilder::new()
        .add_json_file(&file.is().optional())
        .build()
        .map_err(|e| ConfigError::Source(format!("{}: {:?}", file, e)))?;

    for (key, value) in config_data.iter(None) {
        values.insert(key.to_string().to_lowercase(), value.to_string());
    }

    Ok(values)
}

/// Resolves the content configuration for this process.
///
/// `config_file` overrides the default `$CONFIGS_LOCATION/content.json`
/// location (current directory when `CONFIGS_LOCATION` is unset).
///
/// # Errors
/// [`ConfigError::MissingEnvVar`] when no API key is available from any
/// source; callers must treat this as fatal.
pub fn load_content_config(config_file: Option<PathBuf>) -> Result<ContentConfig, ConfigError> {
    // A missing .env file is not an error.
    let _ = dotenvy::dotenv();

    let path = config_file.unwrap_or_else(|| {
        let config_dir = env::var("CONFIGS_LOCATION").unwrap_or_else(|_| ".".to_string());
        PathBuf::from(config_dir).join(CONFIG_CONTENT_NAME)
    });

    let file_values = read_config_file(&path)?;
    ContentConfig::from_sources(&file_values, |key| env::var(key).ok())
}
