use std::env;
use std::time::Duration;
use url::Url;

pub const DEFAULT_DISEASE_API_URL: &str = "http://localhost:1234";
pub const DEFAULT_BACKEND_URL: &str = "http://localhost:3001";

pub const HEALTH_CHECK_TIMEOUT: Duration = Duration::from_secs(5);
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
pub const METADATA_TIMEOUT: Duration = Duration::from_secs(10);
pub const REPORT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid URL in {key}: {source}")]
    InvalidUrl {
        key: &'static str,
        source: url::ParseError,
    },
    #[error("Unsupported URL scheme in {key}: {scheme}")]
    UnsupportedScheme { key: &'static str, scheme: String },
    #[error("Invalid value for {key}: {value}")]
    InvalidNumber { key: &'static str, value: String },
}

/// Endpoints and per-call timeouts, resolved once before any client is built.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub disease_api_url: String,
    pub backend_url: String,
    pub health_timeout: Duration,
    pub request_timeout: Duration,
    pub metadata_timeout: Duration,
    pub report_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            disease_api_url: DEFAULT_DISEASE_API_URL.to_string(),
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            health_timeout: HEALTH_CHECK_TIMEOUT,
            request_timeout: REQUEST_TIMEOUT,
            metadata_timeout: METADATA_TIMEOUT,
            report_timeout: REPORT_TIMEOUT,
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let mut config = Self::default();

        if let Some(url) = read("DISEASE_API_URL") {
            config.disease_api_url = normalize_url("DISEASE_API_URL", &url)?;
        }
        if let Some(url) = read("BACKEND_URL") {
            config.backend_url = normalize_url("BACKEND_URL", &url)?;
        }
        if let Some(secs) = read("DISEASE_API_TIMEOUT_SECS") {
            let parsed = secs
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .ok_or(ConfigError::InvalidNumber {
                    key: "DISEASE_API_TIMEOUT_SECS",
                    value: secs.clone(),
                })?;
            config.request_timeout = Duration::from_secs(parsed);
        }

        log::debug!(
            "Disease API at {}, backend at {}",
            config.disease_api_url,
            config.backend_url
        );
        Ok(config)
    }

    /// Batch uploads get twice the single-image budget.
    pub fn batch_timeout(&self) -> Duration {
        self.request_timeout * 2
    }
}

fn normalize_url(key: &'static str, raw: &str) -> Result<String, ConfigError> {
    let url = Url::parse(raw.trim()).map_err(|source| ConfigError::InvalidUrl { key, source })?;
    match url.scheme() {
        "http" | "https" => Ok(url.as_str().trim_end_matches('/').to_string()),
        scheme => Err(ConfigError::UnsupportedScheme {
            key,
            scheme: scheme.to_string(),
        }),
    }
}
