//! Gateway settings, read from the environment and an optional `.env` file.

use std::collections::HashMap;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use dotenvy::dotenv;
use tracing::debug;

use crate::engines::EngineKind;
use crate::proxy::{ProxyConfig, ProxyStrategy};
use crate::{Result, SearchError};

/// Runtime configuration of the gateway.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub project_name: String,
    /// Prefix of the versioned API routes, e.g. `/api/v1`.
    pub api_prefix: String,
    pub host: String,
    pub port: u16,
    /// Allowed CORS origins; `*` allows any.
    pub cors_origins: Vec<String>,
    /// Engines used when a request does not name any.
    pub default_engines: Vec<String>,
    /// Upper bound for the `pages` request field.
    pub max_search_pages: u32,
    /// Results kept per engine.
    pub results_limit: usize,
    /// When set, raw per-engine results are written to `<dir>/debug/`.
    pub output_dir: Option<PathBuf>,
    pub instance_id: String,
    /// Inbound requests admitted per client and path within `rate_limit_period`.
    pub rate_limit_requests: usize,
    pub rate_limit_period: Duration,
    /// Default for the `use_proxy` request field.
    pub use_proxy: bool,
    pub proxy_urls: Vec<String>,
    pub proxy_strategy: ProxyStrategy,
    /// Per-engine timeout.
    pub search_timeout: Duration,
    pub use_concurrent_search: bool,
    pub max_concurrent_searches: usize,
    pub use_user_agent_rotation: bool,
    pub use_random_delays: bool,
    pub min_request_delay: Duration,
    pub max_request_delay: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            project_name: "Search Engines Scraper API".to_string(),
            api_prefix: "/api/v1".to_string(),
            host: "0.0.0.0".to_string(),
            port: 8000,
            cors_origins: vec!["*".to_string()],
            default_engines: EngineKind::ALL.iter().map(|k| k.name().to_string()).collect(),
            max_search_pages: 1,
            results_limit: 10,
            output_dir: None,
            instance_id: "default".to_string(),
            rate_limit_requests: 10,
            rate_limit_period: Duration::from_secs(60),
            use_proxy: false,
            proxy_urls: Vec::new(),
            proxy_strategy: ProxyStrategy::RoundRobin,
            search_timeout: Duration::from_secs(30),
            use_concurrent_search: true,
            max_concurrent_searches: 5,
            use_user_agent_rotation: true,
            use_random_delays: true,
            min_request_delay: Duration::from_millis(500),
            max_request_delay: Duration::from_secs(2),
        }
    }
}

impl Settings {
    /// Loads settings from the process environment, after reading `.env`
    /// if one is present.
    pub fn from_env() -> Result<Self> {
        if let Ok(path) = dotenv() {
            debug!("Loaded environment from {}", path.display());
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads settings from a key/value map. Missing keys keep their default.
    pub fn from_map(vars: &HashMap<String, String>) -> Result<Self> {
        Self::from_lookup(|key| vars.get(key).cloned())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Self::default();

        let mut proxy_urls = Vec::new();
        if let Some(url) = get("PROXY_URL") {
            proxy_urls.push(url);
        }
        if let Some(urls) = get("PROXY_URLS") {
            for url in parse_list("PROXY_URLS", &urls)? {
                if !proxy_urls.contains(&url) {
                    proxy_urls.push(url);
                }
            }
        }

        Ok(Self {
            project_name: get("PROJECT_NAME").unwrap_or(defaults.project_name),
            api_prefix: get("API_V1_STR")
                .map(|p| normalize_prefix(&p))
                .unwrap_or(defaults.api_prefix),
            host: get("HOST").unwrap_or(defaults.host),
            port: parse_opt("PORT", get("PORT"))?.unwrap_or(defaults.port),
            cors_origins: get("CORS_ORIGINS")
                .map(|v| parse_list("CORS_ORIGINS", &v))
                .transpose()?
                .unwrap_or(defaults.cors_origins),
            default_engines: get("DEFAULT_SEARCH_ENGINES")
                .map(|v| parse_list("DEFAULT_SEARCH_ENGINES", &v))
                .transpose()?
                .map(|engines| engines.into_iter().map(|e| e.to_ascii_lowercase()).collect())
                .unwrap_or(defaults.default_engines),
            max_search_pages: parse_opt("MAX_SEARCH_PAGES", get("MAX_SEARCH_PAGES"))?
                .unwrap_or(defaults.max_search_pages),
            results_limit: parse_opt("SEARCH_RESULTS_LIMIT", get("SEARCH_RESULTS_LIMIT"))?
                .unwrap_or(defaults.results_limit),
            output_dir: get("OUTPUT_DIR").map(PathBuf::from),
            instance_id: get("INSTANCE_ID").unwrap_or(defaults.instance_id),
            rate_limit_requests: parse_opt("RATE_LIMIT_REQUESTS", get("RATE_LIMIT_REQUESTS"))?
                .unwrap_or(defaults.rate_limit_requests),
            rate_limit_period: parse_seconds("RATE_LIMIT_PERIOD", get("RATE_LIMIT_PERIOD"))?
                .unwrap_or(defaults.rate_limit_period),
            use_proxy: parse_bool("USE_PROXY", get("USE_PROXY"))?.unwrap_or(defaults.use_proxy),
            proxy_urls,
            proxy_strategy: get("PROXY_STRATEGY")
                .map(|v| v.parse())
                .transpose()?
                .unwrap_or(defaults.proxy_strategy),
            search_timeout: parse_seconds("SEARCH_TIMEOUT", get("SEARCH_TIMEOUT"))?
                .unwrap_or(defaults.search_timeout),
            use_concurrent_search: parse_bool("USE_CONCURRENT_SEARCH", get("USE_CONCURRENT_SEARCH"))?
                .unwrap_or(defaults.use_concurrent_search),
            max_concurrent_searches: parse_opt("MAX_CONCURRENT_SEARCHES", get("MAX_CONCURRENT_SEARCHES"))?
                .unwrap_or(defaults.max_concurrent_searches),
            use_user_agent_rotation: parse_bool("USE_USER_AGENT_ROTATION", get("USE_USER_AGENT_ROTATION"))?
                .unwrap_or(defaults.use_user_agent_rotation),
            use_random_delays: parse_bool("USE_RANDOM_DELAYS", get("USE_RANDOM_DELAYS"))?
                .unwrap_or(defaults.use_random_delays),
            min_request_delay: parse_seconds("MIN_REQUEST_DELAY", get("MIN_REQUEST_DELAY"))?
                .unwrap_or(defaults.min_request_delay),
            max_request_delay: parse_seconds("MAX_REQUEST_DELAY", get("MAX_REQUEST_DELAY"))?
                .unwrap_or(defaults.max_request_delay),
        })
    }

    /// Checks the settings for values the gateway cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.max_search_pages == 0 {
            return Err(config_error("MAX_SEARCH_PAGES must be at least 1"));
        }
        if self.results_limit == 0 {
            return Err(config_error("SEARCH_RESULTS_LIMIT must be at least 1"));
        }
        if self.max_concurrent_searches == 0 {
            return Err(config_error("MAX_CONCURRENT_SEARCHES must be at least 1"));
        }
        if self.rate_limit_requests == 0 || self.rate_limit_period.is_zero() {
            return Err(config_error("RATE_LIMIT_REQUESTS and RATE_LIMIT_PERIOD must be positive"));
        }
        if self.search_timeout.is_zero() {
            return Err(config_error("SEARCH_TIMEOUT must be positive"));
        }
        if self.default_engines.is_empty() {
            return Err(config_error("DEFAULT_SEARCH_ENGINES must name at least one engine"));
        }
        for engine in &self.default_engines {
            EngineKind::from_str(engine)
                .map_err(|_| config_error(format!("DEFAULT_SEARCH_ENGINES: unknown engine '{}'", engine)))?;
        }
        if self.min_request_delay > self.max_request_delay {
            return Err(config_error("MIN_REQUEST_DELAY must not exceed MAX_REQUEST_DELAY"));
        }
        for url in &self.proxy_urls {
            ProxyConfig::parse(url)?;
        }
        Ok(())
    }

    /// Parsed proxy list.
    pub fn proxies(&self) -> Result<Vec<ProxyConfig>> {
        self.proxy_urls.iter().map(|url| ProxyConfig::parse(url)).collect()
    }

    /// Socket address string the server binds to.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn config_error(msg: impl Into<String>) -> SearchError {
    SearchError::Config(msg.into())
}

fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{}", trimmed)
    }
}

fn parse_opt<T: FromStr>(key: &str, value: Option<String>) -> Result<Option<T>> {
    value
        .map(|v| {
            v.parse::<T>()
                .map_err(|_| config_error(format!("{} has an invalid value: '{}'", key, v)))
        })
        .transpose()
}

fn parse_bool(key: &str, value: Option<String>) -> Result<Option<bool>> {
    value
        .map(|v| match v.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(config_error(format!("{} must be a boolean, got '{}'", key, v))),
        })
        .transpose()
}

fn parse_seconds(key: &str, value: Option<String>) -> Result<Option<Duration>> {
    let Some(secs) = parse_opt::<f64>(key, value)? else {
        return Ok(None);
    };
    if !secs.is_finite() || secs < 0.0 {
        return Err(config_error(format!("{} must be a non-negative number of seconds", key)));
    }
    Duration::try_from_secs_f64(secs)
        .map(Some)
        .map_err(|_| config_error(format!("{} is too large: '{}'", key, secs)))
}

/// Parses `a,b,c` or a JSON array of strings.
fn parse_list(key: &str, value: &str) -> Result<Vec<String>> {
    let items: Vec<String> = if value.starts_with('[') {
        serde_json::from_str(value)
            .map_err(|e| config_error(format!("{} is not a valid list: {}", key, e)))?
    } else {
        value.split(',').map(str::to_string).collect()
    };
    Ok(items
        .into_iter()
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
        .collect())
}
