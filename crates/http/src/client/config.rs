//! Client configuration

use super::ClientError;
use std::time::Duration;

/// Environment variable holding the backend base URL
pub const API_BASE_URL_ENV: &str = "STOREFRONT_API_BASE_URL";
/// Environment variable overriding the refresh bound, in seconds
pub const REFRESH_TIMEOUT_ENV: &str = "STOREFRONT_REFRESH_TIMEOUT_SECS";

/// Settings shared by the gateway, the refresher and the typed API
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Backend base URL, without trailing slash
    pub api_base_url: String,
    /// Per-request timeout (not applied on wasm)
    pub timeout: Option<Duration>,
    /// Bound on a single refresh call
    pub refresh_timeout: Duration,
    pub user_agent: String,
}

impl ClientConfig {
    pub const DEFAULT_REFRESH_TIMEOUT: Duration = Duration::from_secs(30);
    pub const DEFAULT_USER_AGENT: &'static str = "storefront-client/0.1.0";

    /// Create a configuration for the given base URL
    pub fn new(api_base_url: impl Into<String>) -> Result<Self, ClientError> {
        let api_base_url = api_base_url.into();
        url::Url::parse(&api_base_url).map_err(|e| {
            ClientError::Configuration(format!("invalid api base url {api_base_url:?}: {e}"))
        })?;

        Ok(Self {
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
            timeout: None,
            refresh_timeout: Self::DEFAULT_REFRESH_TIMEOUT,
            user_agent: Self::DEFAULT_USER_AGENT.to_string(),
        })
    }

    /// Create configuration from environment variables
    ///
    /// - `STOREFRONT_API_BASE_URL`: backend base URL (required)
    /// - `STOREFRONT_REFRESH_TIMEOUT_SECS`: refresh bound in seconds
    pub fn from_env() -> Result<Self, ClientError> {
        let base = std::env::var(API_BASE_URL_ENV)
            .map_err(|_| ClientError::Configuration(format!("{API_BASE_URL_ENV} is not set")))?;
        let mut config = Self::new(base)?;

        if let Ok(secs) = std::env::var(REFRESH_TIMEOUT_ENV) {
            let secs: u64 = secs.parse().map_err(|_| {
                ClientError::Configuration(format!("{REFRESH_TIMEOUT_ENV} must be whole seconds"))
            })?;
            config.refresh_timeout = Duration::from_secs(secs);
        }

        Ok(config)
    }

    /// Resolve a request target: absolute URLs pass through, paths are joined onto the base
    pub fn url(&self, target: &str) -> String {
        if target.starts_with("http://") || target.starts_with("https://") {
            target.to_string()
        } else if target.starts_with('/') {
            format!("{}{}", self.api_base_url, target)
        } else {
            format!("{}/{}", self.api_base_url, target)
        }
    }
}
