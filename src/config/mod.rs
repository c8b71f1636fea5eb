//! Configuration loading for the jobwatch client.
//!
//! Loads layered `.env` files and environment variables prefixed with
//! `JOBWATCH_`, producing a typed [`AppConfig`].

use std::{collections::BTreeMap, env, path::PathBuf, time::Duration};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Client configuration derived from `JOBWATCH_*` environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct AppConfig {
    #[serde(default = "default_profile")]
    pub profile: String,
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_log_format")]
    pub log_format: String,
    #[serde(default)]
    pub polling: PollingConfig,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    #[serde(default = "default_notice_ttl_ms")]
    pub notice_ttl_ms: u64,
}

/// Poller cadence and request shaping.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct PollingConfig {
    /// Fixed delay between poll ticks (default: 5)
    ///
    /// Environment variable: `JOBWATCH_POLL_INTERVAL_SECONDS`
    #[serde(default = "default_poll_interval_seconds")]
    pub interval_seconds: u64,

    /// Optional `limit` query parameter for the jobs listing
    ///
    /// Environment variable: `JOBWATCH_JOBS_LIMIT`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jobs_limit: Option<u32>,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_seconds: default_poll_interval_seconds(),
            jobs_limit: None,
        }
    }
}

impl PollingConfig {
    /// Validate polling bounds
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=3600).contains(&self.interval_seconds) {
            return Err(ConfigError::InvalidPollInterval {
                value: self.interval_seconds,
            });
        }

        if let Some(limit) = self.jobs_limit
            && !(1..=1000).contains(&limit)
        {
            return Err(ConfigError::InvalidJobsLimit { value: limit });
        }

        Ok(())
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_seconds)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            profile: default_profile(),
            api_base_url: default_api_base_url(),
            access_token: None,
            log_level: default_log_level(),
            log_format: default_log_format(),
            polling: PollingConfig::default(),
            request_timeout_ms: default_request_timeout_ms(),
            notice_ttl_ms: default_notice_ttl_ms(),
        }
    }
}

impl AppConfig {
    /// Returns the configured API base as a parsed URL.
    pub fn base_url(&self) -> Result<Url, ConfigError> {
        let parsed = Url::parse(&self.api_base_url).map_err(|source| ConfigError::InvalidBaseUrl {
            value: self.api_base_url.clone(),
            reason: source.to_string(),
        })?;

        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidBaseUrl {
                value: self.api_base_url.clone(),
                reason: format!("unsupported scheme '{}'", parsed.scheme()),
            });
        }

        Ok(parsed)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn notice_ttl(&self) -> Duration {
        Duration::from_millis(self.notice_ttl_ms)
    }

    /// Returns a redacted JSON representation (secrets are redacted).
    pub fn redacted_json(&self) -> serde_json::Result<String> {
        let mut config = self.clone();
        if config.access_token.is_some() {
            config.access_token = Some("[REDACTED]".to_string());
        }
        serde_json::to_string_pretty(&config)
    }

    /// Validates the configuration, returning the first violated bound.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.base_url()?;

        if !matches!(self.log_format.as_str(), "json" | "pretty") {
            return Err(ConfigError::InvalidLogFormat {
                value: self.log_format.clone(),
            });
        }

        if !(100..=120_000).contains(&self.request_timeout_ms) {
            return Err(ConfigError::InvalidRequestTimeout {
                value: self.request_timeout_ms,
            });
        }

        if !(100..=60_000).contains(&self.notice_ttl_ms) {
            return Err(ConfigError::InvalidNoticeTtl {
                value: self.notice_ttl_ms,
            });
        }

        self.polling.validate()?;

        Ok(())
    }
}

fn default_profile() -> String {
    "local".to_string()
}

fn default_api_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

fn default_poll_interval_seconds() -> u64 {
    5
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

fn default_notice_ttl_ms() -> u64 {
    3_000
}

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load environment file {path}: {source}")]
    EnvFile {
        path: PathBuf,
        source: dotenvy::Error,
    },
    #[error("invalid api base url '{value}': {reason}")]
    InvalidBaseUrl { value: String, reason: String },
    #[error("log format must be 'json' or 'pretty', got '{value}'")]
    InvalidLogFormat { value: String },
    #[error("poll interval must be between 1 and 3600 seconds, got {value}")]
    InvalidPollInterval { value: u64 },
    #[error("jobs limit must be between 1 and 1000, got {value}")]
    InvalidJobsLimit { value: u32 },
    #[error("request timeout must be between 100 and 120000 ms, got {value}")]
    InvalidRequestTimeout { value: u64 },
    #[error("notice ttl must be between 100 and 60000 ms, got {value}")]
    InvalidNoticeTtl { value: u64 },
    #[error("invalid numeric value for {key}: '{value}'")]
    InvalidNumber { key: String, value: String },
}

/// Loads configuration using layered `.env` files and `JOBWATCH_*` env vars.
pub struct ConfigLoader {
    base_dir: PathBuf,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Creates a new loader rooted at the current working directory.
    pub fn new() -> Self {
        Self {
            base_dir: env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        }
    }

    /// Creates a loader rooted at the provided directory (useful for tests).
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    /// Loads `.env` layers, overlays the process environment and validates the result.
    pub fn load(&self) -> Result<AppConfig, ConfigError> {
        let (mut layered, profile_hint) = self.collect_layered_env()?;

        // Overlay process environment last so it wins.
        for (key, value) in env::vars() {
            if let Some(stripped) = key.strip_prefix("JOBWATCH_") {
                layered.insert(stripped.to_string(), value);
            }
        }

        let profile = layered
            .remove("PROFILE")
            .filter(|v| !v.is_empty())
            .unwrap_or(profile_hint);

        let api_base_url = layered
            .remove("API_BASE_URL")
            .map(|v| v.trim().trim_end_matches('/').to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(default_api_base_url);

        let access_token = layered.remove("ACCESS_TOKEN").and_then(|val| {
            let trimmed = val.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        });

        let log_level = layered
            .remove("LOG_LEVEL")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(default_log_level);

        let log_format = layered
            .remove("LOG_FORMAT")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(default_log_format);

        let interval_seconds = parse_number(&mut layered, "POLL_INTERVAL_SECONDS")?
            .unwrap_or_else(default_poll_interval_seconds);
        let jobs_limit = parse_number(&mut layered, "JOBS_LIMIT")?;
        let request_timeout_ms = parse_number(&mut layered, "REQUEST_TIMEOUT_MS")?
            .unwrap_or_else(default_request_timeout_ms);
        let notice_ttl_ms =
            parse_number(&mut layered, "NOTICE_TTL_MS")?.unwrap_or_else(default_notice_ttl_ms);

        let config = AppConfig {
            profile,
            api_base_url,
            access_token,
            log_level,
            log_format,
            polling: PollingConfig {
                interval_seconds,
                jobs_limit,
            },
            request_timeout_ms,
            notice_ttl_ms,
        };

        config.validate()?;
        Ok(config)
    }

    fn collect_layered_env(&self) -> Result<(BTreeMap<String, String>, String), ConfigError> {
        let mut values = BTreeMap::new();
        self.merge_dotenv(self.base_dir.join(".env"), &mut values)?;
        self.merge_dotenv(self.base_dir.join(".env.local"), &mut values)?;

        let profile = env::var("JOBWATCH_PROFILE")
            .ok()
            .or_else(|| values.get("PROFILE").cloned())
            .unwrap_or_else(default_profile);

        self.merge_dotenv(
            self.base_dir.join(format!(".env.{}", &profile)),
            &mut values,
        )?;
        self.merge_dotenv(
            self.base_dir.join(format!(".env.{}.local", &profile)),
            &mut values,
        )?;

        Ok((values, profile))
    }

    fn merge_dotenv(
        &self,
        path: PathBuf,
        values: &mut BTreeMap<String, String>,
    ) -> Result<(), ConfigError> {
        match dotenvy::from_path_iter(&path) {
            Ok(iter) => {
                for item in iter {
                    let (key, value) = item.map_err(|source| ConfigError::EnvFile {
                        path: path.clone(),
                        source,
                    })?;
                    if let Some(stripped) = key.strip_prefix("JOBWATCH_") {
                        values.insert(stripped.to_string(), value);
                    }
                }
                Ok(())
            }
            Err(dotenvy::Error::Io(err)) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(ConfigError::EnvFile { path, source }),
        }
    }
}

fn parse_number<T: std::str::FromStr>(
    layered: &mut BTreeMap<String, String>,
    key: &str,
) -> Result<Option<T>, ConfigError> {
    match layered.remove(key).filter(|v| !v.trim().is_empty()) {
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidNumber {
                key: key.to_string(),
                value: raw,
            }),
        None => Ok(None),
    }
}
