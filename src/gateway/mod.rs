//! Backend gateway: resilient HTTP calls per backend.
//!
//! Each configured backend gets its own transport (connection pool, default
//! headers, timeout) and a semaphore bounding concurrent in-flight calls.
//! `request` retries transport failures and 5xx responses with exponential
//! backoff; 4xx responses are returned to the caller immediately.

mod transport;

#[cfg(test)]
pub(crate) mod testing;

pub use transport::{BackendResponse, ReqwestTransport, Transport};

use crate::types::{BackendConfig, Error, HttpMethod, RequestOptions, Result};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

/// Fixed health endpoint every backend exposes.
pub const HEALTH_PATH: &str = "/health";

/// Exponential backoff: the delay before retry `k` (0-indexed) is `base * 2^k`.
#[derive(Debug, Clone, Copy)]
pub struct Backoff {
    base: Duration,
}

impl Backoff {
    pub fn new(base: Duration) -> Self {
        Self { base }
    }

    pub fn delay(&self, attempt: u32) -> Duration {
        self.base.saturating_mul(2u32.saturating_pow(attempt))
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(Duration::from_secs(1))
    }
}

#[derive(Debug)]
struct Backend {
    config: BackendConfig,
    transport: Arc<dyn Transport>,
    permits: Arc<Semaphore>,
}

/// Resilient HTTP client over all configured backends.
#[derive(Debug)]
pub struct BackendGateway {
    backends: BTreeMap<String, Backend>,
    backoff: Backoff,
}

impl BackendGateway {
    pub fn new(backoff: Backoff) -> Self {
        Self {
            backends: BTreeMap::new(),
            backoff,
        }
    }

    /// Build a gateway with a `reqwest` transport per configured backend.
    pub fn from_config(
        services: &BTreeMap<String, BackendConfig>,
        backoff: Backoff,
    ) -> Result<Self> {
        let mut gateway = Self::new(backoff);
        for (name, config) in services {
            let transport = ReqwestTransport::new(config)?;
            gateway.register(name, config.clone(), Arc::new(transport));
            tracing::info!("Initialized HTTP client for {}", name);
        }
        Ok(gateway)
    }

    /// Register (or replace) a backend with an explicit transport.
    pub fn register(&mut self, name: &str, config: BackendConfig, transport: Arc<dyn Transport>) {
        let permits = Arc::new(Semaphore::new(config.max_connections.max(1)));
        self.backends.insert(
            name.to_string(),
            Backend {
                config,
                transport,
                permits,
            },
        );
    }

    /// Configured backend names, sorted.
    pub fn service_names(&self) -> Vec<String> {
        self.backends.keys().cloned().collect()
    }

    pub fn is_configured(&self, service: &str) -> bool {
        self.backends.contains_key(service)
    }

    /// Perform a request with the backend's retry policy.
    ///
    /// Returns the first 2xx response. A 4xx fails immediately; 5xx and
    /// transport failures are retried up to `retries` more times, sleeping
    /// `backoff.delay(k)` before retry `k`. The last error is returned once
    /// the retries are spent.
    pub async fn request(
        &self,
        service: &str,
        method: HttpMethod,
        path: &str,
        options: &RequestOptions,
    ) -> Result<BackendResponse> {
        let backend = self
            .backends
            .get(service)
            .ok_or_else(|| Error::ServiceNotConfigured(service.to_string()))?;
        let retries = backend.config.retries;

        let mut attempt: u32 = 0;
        loop {
            tracing::info!("{} {}{} (attempt {})", method, service, path, attempt + 1);

            let outcome = {
                let _permit = backend
                    .permits
                    .acquire()
                    .await
                    .map_err(|e| Error::internal(format!("connection pool closed: {}", e)))?;
                backend.transport.send(method, path, options).await
            };

            let err = match outcome {
                Ok(response) => {
                    tracing::info!("Response: {} from {}{}", response.status, service, path);
                    if response.status < 400 {
                        return Ok(response);
                    }
                    tracing::warn!("HTTP error {} from {}{}", response.status, service, path);
                    Error::Upstream {
                        status: response.status,
                        body: response.text(),
                    }
                }
                Err(e) => {
                    tracing::warn!("Request error to {}{}: {}", service, path, e);
                    e
                }
            };

            if !err.is_retryable() || attempt >= retries {
                return Err(err);
            }

            let delay = self.backoff.delay(attempt);
            tracing::debug!(
                "retrying {}{} in {:?} ({} of {})",
                service,
                path,
                delay,
                attempt + 1,
                retries
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }

    pub async fn get(&self, service: &str, path: &str, options: &RequestOptions) -> Result<BackendResponse> {
        self.request(service, HttpMethod::Get, path, options).await
    }

    pub async fn post(&self, service: &str, path: &str, options: &RequestOptions) -> Result<BackendResponse> {
        self.request(service, HttpMethod::Post, path, options).await
    }

    pub async fn put(&self, service: &str, path: &str, options: &RequestOptions) -> Result<BackendResponse> {
        self.request(service, HttpMethod::Put, path, options).await
    }

    pub async fn delete(&self, service: &str, path: &str, options: &RequestOptions) -> Result<BackendResponse> {
        self.request(service, HttpMethod::Delete, path, options).await
    }

    pub async fn patch(&self, service: &str, path: &str, options: &RequestOptions) -> Result<BackendResponse> {
        self.request(service, HttpMethod::Patch, path, options).await
    }

    /// GET the health endpoint; any failure is reported as `false`.
    pub async fn health_check(&self, service: &str) -> bool {
        match self.get(service, HEALTH_PATH, &RequestOptions::default()).await {
            Ok(response) => response.is_success(),
            Err(e) => {
                tracing::error!("Health check failed for {}: {}", service, e);
                false
            }
        }
    }
}
