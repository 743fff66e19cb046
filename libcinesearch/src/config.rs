//! Configuration management for Cinesearch

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{ConfigError, Result};

pub const DEFAULT_BASE_URL: &str = "https://www.omdbapi.com/";
pub const DEFAULT_SEARCH_TERM: &str = "marvel";
pub const DEFAULT_PAGES: u32 = 10;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
}

#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub search_term: String,
    /// Per-request timeout, e.g. "10s"
    pub timeout: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            search_term: DEFAULT_SEARCH_TERM.to_string(),
            timeout: "10s".to_string(),
        }
    }
}

impl std::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("search_term", &self.search_term)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Result<Duration> {
        parse_duration("api.timeout", &self.timeout)
    }

    /// The API key, failing if it is unset or blank
    pub fn require_api_key(&self) -> Result<&str> {
        match self.api_key.as_deref().map(str::trim) {
            Some(key) if !key.is_empty() => Ok(key),
            _ => Err(ConfigError::MissingField("api.api_key".to_string()).into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Number of pages requested concurrently per fetch
    pub pages: u32,
    /// Attempts per page for transient failures (1 = no retry)
    pub max_attempts: u32,
    /// Delay before the first retry; doubles on every further attempt
    pub backoff: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            pages: DEFAULT_PAGES,
            max_attempts: 1,
            backoff: "500ms".to_string(),
        }
    }
}

impl FetchConfig {
    pub fn backoff(&self) -> Result<Duration> {
        parse_duration("fetch.backoff", &self.backoff)
    }
}

impl Config {
    /// Load configuration from the default location
    ///
    /// A missing file is not an error; defaults are used instead. Environment
    /// overrides are applied in both cases.
    pub fn load() -> Result<Self> {
        let config_path = resolve_config_path()?;
        let mut config = if config_path.exists() {
            Self::load_from_path(&config_path)?
        } else {
            tracing::debug!(
                "No config file at {}, using defaults",
                config_path.display()
            );
            Self::default()
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadError)?;
        let config: Config = toml::from_str(&content).map_err(ConfigError::ParseError)?;
        Ok(config)
    }

    /// Apply `CINESEARCH_API_KEY` on top of the file contents
    pub fn apply_env_overrides(&mut self) {
        if let Ok(key) = std::env::var("CINESEARCH_API_KEY") {
            if !key.trim().is_empty() {
                self.api.api_key = Some(key);
            }
        }
    }

    /// Check value ranges and that durations parse
    pub fn validate(&self) -> Result<()> {
        if self.fetch.pages == 0 {
            return Err(invalid("fetch.pages", "must be at least 1"));
        }
        if self.fetch.max_attempts == 0 {
            return Err(invalid("fetch.max_attempts", "must be at least 1"));
        }
        if self.api.search_term.trim().is_empty() {
            return Err(invalid("api.search_term", "must not be empty"));
        }
        self.api.timeout()?;
        self.fetch.backoff()?;
        Ok(())
    }
}

fn invalid(field: &str, message: &str) -> crate::error::SearchError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        message: message.to_string(),
    }
    .into()
}

fn parse_duration(field: &str, value: &str) -> Result<Duration> {
    humantime::parse_duration(value).map_err(|e| invalid(field, &e.to_string()))
}

/// Resolve the configuration file path following XDG Base Directory spec
pub fn resolve_config_path() -> Result<PathBuf> {
    if let Ok(path) = std::env::var("CINESEARCH_CONFIG") {
        return Ok(PathBuf::from(shellexpand::tilde(&path).to_string()));
    }

    let config_dir = dirs::config_dir()
        .ok_or_else(|| ConfigError::MissingField("config directory".to_string()))?;

    Ok(config_dir.join("cinesearch").join("config.toml"))
}
