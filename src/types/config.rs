//! Configuration structures.
//!
//! Configuration is loaded once at startup from a JSON file (or the built-in
//! defaults) and handed to the application context. Nothing reads it ambiently.

use crate::types::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

/// Global adapter configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Backend name → connection settings.
    #[serde(default)]
    pub services: BTreeMap<String, BackendConfig>,

    /// Health probing and spec refresh cadence.
    #[serde(default)]
    pub discovery: DiscoveryConfig,

    /// Gateway retry tuning.
    #[serde(default)]
    pub retry: RetryConfig,

    /// Identity reported by `initialize`.
    #[serde(default)]
    pub server: ServerConfig,

    /// Observability configuration.
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Default for Config {
    fn default() -> Self {
        let services = [
            ("customer", "http://localhost:8001"),
            ("order", "http://localhost:8002"),
            ("inventory", "http://localhost:8003"),
        ]
        .into_iter()
        .map(|(name, url)| (name.to_string(), BackendConfig::new(url)))
        .collect();

        Self {
            services,
            discovery: DiscoveryConfig::default(),
            retry: RetryConfig::default(),
            server: ServerConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

impl Config {
    /// Read and validate a JSON configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!("cannot read {}: {}", path.display(), e))
        })?;
        let config: Config = serde_json::from_str(&raw)
            .map_err(|e| Error::config(format!("invalid config {}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the gateway and schedulers cannot run with.
    pub fn validate(&self) -> Result<()> {
        for (name, backend) in &self.services {
            if name.trim().is_empty() {
                return Err(Error::config("service name cannot be empty"));
            }
            let url = backend.base_url.trim();
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(Error::config(format!(
                    "service {}: base_url must start with http:// or https://, got '{}'",
                    name, backend.base_url
                )));
            }
            if backend.max_connections == 0 {
                return Err(Error::config(format!(
                    "service {}: max_connections must be positive",
                    name
                )));
            }
        }
        if self.discovery.health_check_interval.is_zero() {
            return Err(Error::config("health_check_interval must be positive"));
        }
        if self.discovery.spec_refresh_interval.is_zero() {
            return Err(Error::config("spec_refresh_interval must be positive"));
        }
        Ok(())
    }
}

/// Connection settings for one backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Scheme + authority (+ optional prefix) every request path is appended to.
    pub base_url: String,

    /// Per-attempt timeout.
    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,

    /// Additional attempts after the first one.
    #[serde(default = "default_retries")]
    pub retries: u32,

    /// Static bearer credential forwarded on every call.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,

    /// Maximum concurrent in-flight requests to this backend.
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,

    /// Maximum idle keep-alive connections kept in the pool.
    #[serde(default = "default_max_idle_connections")]
    pub max_idle_connections: usize,
}

impl BackendConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: default_timeout(),
            retries: default_retries(),
            auth_token: None,
            max_connections: default_max_connections(),
            max_idle_connections: default_max_idle_connections(),
        }
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }
}

fn default_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_retries() -> u32 {
    3
}

fn default_max_connections() -> usize {
    100
}

fn default_max_idle_connections() -> usize {
    20
}

/// Background refresh cadence.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Time between health probing cycles.
    #[serde(with = "humantime_serde")]
    pub health_check_interval: Duration,

    /// Time between API description reloads.
    #[serde(with = "humantime_serde")]
    pub spec_refresh_interval: Duration,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            health_check_interval: Duration::from_secs(30),
            spec_refresh_interval: Duration::from_secs(300),
        }
    }
}

/// Retry tuning. The delay before retry `k` is `backoff_base * 2^k`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    #[serde(with = "humantime_serde")]
    pub backoff_base: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            backoff_base: Duration::from_secs(1),
        }
    }
}

/// Server identity reported to clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub name: String,
    pub version: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: "mcp-adapter".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Tracing log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable JSON log formatting.
    pub json_logs: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}
