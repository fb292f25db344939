//! Configuration layer: typed settings with layered precedence (file → env).
//!
//! Sources, lowest precedence first:
//!
//! 1. `lexdesk.toml` (or any format `config` understands) in the working
//!    directory, if present
//! 2. an explicit file passed to [`load`]
//! 3. environment variables `LEXDESK_<SECTION>__<KEY>`, e.g.
//!    `LEXDESK_API__BASE_URL=https://admin.example.org/api`

use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use url::Url;

use crate::query::QueryConfig;

const LOCAL_CONFIG_BASENAME: &str = "lexdesk";
const ENV_PREFIX: &str = "LEXDESK";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_CACHE_SECS: u64 = 5 * 60;
const DEFAULT_DEBOUNCE_MS: u64 = 500;

/// Validated settings for the whole crate.
#[derive(Debug, Clone)]
pub struct Settings {
    pub api: ApiSettings,
    pub query: QueryConfig,
    pub search: SearchSettings,
    pub logging: LoggingSettings,
}

/// Where the API lives and how requests authenticate.
#[derive(Debug, Clone)]
pub struct ApiSettings {
    pub base_url: Url,
    pub timeout: Duration,
    pub user_agent: String,
    /// Cookie header sent with every request, e.g. a session cookie.
    pub cookie: Option<String>,
    pub bearer_token: Option<String>,
}

impl ApiSettings {
    /// Settings for `base_url` with default timeout and no credentials.
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: default_user_agent(),
            cookie: None,
            bearer_token: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchSettings {
    /// Quiet period before search input turns into a query key.
    pub debounce: Duration,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(DEFAULT_DEBOUNCE_MS),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: LevelFilter::INFO,
            format: LogFormat::Compact,
        }
    }
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings from the local config file, `file` and the process environment.
pub fn load(file: Option<&Path>) -> Result<Settings, LoadError> {
    build(file, None)
}

/// Like [`load`], but reads environment variables from `env` instead of the process.
pub fn load_with_env(
    file: Option<&Path>,
    env: HashMap<String, String>,
) -> Result<Settings, LoadError> {
    build(file, Some(env))
}

fn build(file: Option<&Path>, env: Option<HashMap<String, String>>) -> Result<Settings, LoadError> {
    let mut builder =
        Config::builder().add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = file {
        builder = builder.add_source(File::from(path).required(true));
    }

    builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true)
            .source(env),
    );

    let raw: RawSettings = builder.build()?.try_deserialize()?;
    Settings::from_raw(raw)
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    api: RawApiSettings,
    query: RawQuerySettings,
    search: RawSearchSettings,
    logging: RawLoggingSettings,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawApiSettings {
    base_url: Option<String>,
    timeout_secs: Option<u64>,
    user_agent: Option<String>,
    cookie: Option<String>,
    bearer_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawQuerySettings {
    stale_secs: Option<u64>,
    cache_secs: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSearchSettings {
    debounce_ms: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            api,
            query,
            search,
            logging,
        } = raw;

        Ok(Self {
            api: build_api_settings(api)?,
            query: build_query_config(query),
            search: build_search_settings(search)?,
            logging: build_logging_settings(logging)?,
        })
    }
}

fn build_api_settings(api: RawApiSettings) -> Result<ApiSettings, LoadError> {
    let base_url = api
        .base_url
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| LoadError::invalid("api.base_url", "must be set"))?;
    let base_url = Url::parse(base_url)
        .map_err(|err| LoadError::invalid("api.base_url", format!("failed to parse: {err}")))?;
    if !matches!(base_url.scheme(), "http" | "https") {
        return Err(LoadError::invalid(
            "api.base_url",
            "scheme must be http or https",
        ));
    }

    let timeout_secs = api.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS);
    if timeout_secs == 0 {
        return Err(LoadError::invalid(
            "api.timeout_secs",
            "must be greater than zero",
        ));
    }

    Ok(ApiSettings {
        base_url,
        timeout: Duration::from_secs(timeout_secs),
        user_agent: non_empty(api.user_agent).unwrap_or_else(default_user_agent),
        cookie: non_empty(api.cookie),
        bearer_token: non_empty(api.bearer_token),
    })
}

fn build_query_config(query: RawQuerySettings) -> QueryConfig {
    QueryConfig {
        stale_time: query.stale_secs.map(Duration::from_secs),
        cache_time: Duration::from_secs(query.cache_secs.unwrap_or(DEFAULT_CACHE_SECS)),
    }
}

fn build_search_settings(search: RawSearchSettings) -> Result<SearchSettings, LoadError> {
    let debounce_ms = search.debounce_ms.unwrap_or(DEFAULT_DEBOUNCE_MS);
    if debounce_ms == 0 {
        return Err(LoadError::invalid(
            "search.debounce_ms",
            "must be greater than zero",
        ));
    }
    Ok(SearchSettings {
        debounce: Duration::from_millis(debounce_ms),
    })
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}

fn default_user_agent() -> String {
    format!("lexdesk/{}", env!("CARGO_PKG_VERSION"))
}
