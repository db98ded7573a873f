//! Proxy configuration.
//!
//! Use the builder methods to customise, or [`ProxyConfig::from_env`] to
//! read the standard environment variables.

use std::fmt;
use std::time::Duration;

use fimgate_core::ModelRouting;
use thiserror::Error;

/// Environment variable holding the upstream API key.
pub const API_KEY_ENV: &str = "ZAI_API_KEY";
/// Environment variable overriding the upstream chat-completions URL.
pub const UPSTREAM_URL_ENV: &str = "FIMGATE_UPSTREAM_URL";
/// Environment variable enabling strict model routing.
pub const STRICT_MODELS_ENV: &str = "FIMGATE_STRICT_MODELS";

/// Default upstream chat-completions endpoint.
pub const DEFAULT_UPSTREAM_URL: &str = "https://api.z.ai/api/coding/paas/v4/chat/completions";

/// Errors raised while assembling configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No API key was provided.
    #[error("Missing upstream API key (set ZAI_API_KEY)")]
    MissingApiKey,
}

/// Configuration for the proxy and its upstream client.
#[derive(Clone)]
pub struct ProxyConfig {
    /// Full URL of the upstream chat-completions endpoint.
    pub(crate) upstream_url: String,
    /// Bearer token for the upstream.
    pub(crate) api_key: String,
    /// Bound on establishing the upstream connection.
    pub(crate) connect_timeout: Duration,
    /// Bound on a buffered call, and on each read of a streaming call.
    pub(crate) request_timeout: Duration,
    /// How unknown chat model names are handled.
    pub(crate) routing: ModelRouting,
}

// API key stays out of logs.
impl fmt::Debug for ProxyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyConfig")
            .field("upstream_url", &self.upstream_url)
            .field("api_key", &"<redacted>")
            .field("connect_timeout", &self.connect_timeout)
            .field("request_timeout", &self.request_timeout)
            .field("routing", &self.routing)
            .finish()
    }
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            upstream_url: DEFAULT_UPSTREAM_URL.to_string(),
            api_key: String::new(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(60),
            routing: ModelRouting::Fallback,
        }
    }
}

impl ProxyConfig {
    /// Create a new configuration with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup(API_KEY_ENV)
            .filter(|k| !k.trim().is_empty())
            .ok_or(ConfigError::MissingApiKey)?;

        let mut config = Self::new().with_api_key(api_key);
        if let Some(url) = lookup(UPSTREAM_URL_ENV).filter(|u| !u.is_empty()) {
            config = config.with_upstream_url(url);
        }
        if lookup(STRICT_MODELS_ENV).is_some_and(|v| is_truthy(&v)) {
            config = config.with_routing(ModelRouting::Strict);
        }
        Ok(config)
    }

    /// Set the upstream chat-completions URL.
    #[must_use]
    pub fn with_upstream_url(mut self, url: impl Into<String>) -> Self {
        self.upstream_url = url.into();
        self
    }

    /// Set the upstream API key.
    #[must_use]
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = key.into();
        self
    }

    /// Set the connect timeout.
    ///
    /// Defaults to 10 seconds.
    #[must_use]
    pub const fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the request timeout.
    ///
    /// Defaults to 60 seconds.
    #[must_use]
    pub const fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set how unknown chat model names are handled.
    #[must_use]
    pub const fn with_routing(mut self, routing: ModelRouting) -> Self {
        self.routing = routing;
        self
    }

    pub fn upstream_url(&self) -> &str {
        &self.upstream_url
    }

    pub const fn routing(&self) -> ModelRouting {
        self.routing
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = ProxyConfig::new();
        assert_eq!(config.upstream_url, DEFAULT_UPSTREAM_URL);
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
        assert_eq!(config.request_timeout, Duration::from_secs(60));
        assert_eq!(config.routing, ModelRouting::Fallback);
    }

    #[test]
    fn test_builder_pattern() {
        let config = ProxyConfig::new()
            .with_upstream_url("http://127.0.0.1:9/v1/chat/completions")
            .with_api_key("secret")
            .with_connect_timeout(Duration::from_secs(1))
            .with_request_timeout(Duration::from_secs(5))
            .with_routing(ModelRouting::Strict);

        assert_eq!(config.upstream_url(), "http://127.0.0.1:9/v1/chat/completions");
        assert_eq!(config.api_key, "secret");
        assert_eq!(config.connect_timeout, Duration::from_secs(1));
        assert_eq!(config.request_timeout, Duration::from_secs(5));
        assert_eq!(config.routing(), ModelRouting::Strict);
    }

    #[test]
    fn test_from_lookup_requires_api_key() {
        let err = ProxyConfig::from_lookup(lookup_from(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingApiKey));

        let err = ProxyConfig::from_lookup(lookup_from(&[(API_KEY_ENV, "  ")])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingApiKey));
    }

    #[test]
    fn test_from_lookup_overrides() {
        let config = ProxyConfig::from_lookup(lookup_from(&[
            (API_KEY_ENV, "k"),
            (UPSTREAM_URL_ENV, "http://upstream/chat"),
            (STRICT_MODELS_ENV, "true"),
        ]))
        .unwrap();
        assert_eq!(config.api_key, "k");
        assert_eq!(config.upstream_url(), "http://upstream/chat");
        assert_eq!(config.routing(), ModelRouting::Strict);
    }

    #[test]
    fn test_debug_redacts_key() {
        let config = ProxyConfig::new().with_api_key("super-secret");
        let debug = format!("{config:?}");
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("<redacted>"));
    }
}
