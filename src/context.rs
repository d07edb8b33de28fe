//! Application context: every long-lived component, built once at startup.

use crate::discovery::{HealthProbe, RefreshHook, ServiceRegistry};
use crate::gateway::{Backoff, BackendGateway};
use crate::openapi::SpecCatalog;
use crate::tools::{ToolCatalog, ToolExecutor};
use crate::types::{Config, DiscoveryConfig, Result, ServerConfig};
use std::sync::Arc;

/// Owns the component graph and wires the refresh loops to tool
/// regeneration.
#[derive(Debug)]
pub struct AppContext {
    pub server: ServerConfig,
    pub gateway: Arc<BackendGateway>,
    pub registry: Arc<ServiceRegistry>,
    pub specs: Arc<SpecCatalog>,
    pub tools: Arc<ToolCatalog>,
    pub executor: Arc<ToolExecutor>,
}

impl AppContext {
    /// Build every component from configuration. Nothing runs until `start`.
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;
        let gateway = BackendGateway::from_config(
            &config.services,
            Backoff::new(config.retry.backoff_base),
        )?;
        Ok(Self::with_gateway(gateway, &config.discovery, config.server.clone()))
    }

    /// Build around an already-populated gateway, probing through the gateway
    /// itself.
    pub fn with_gateway(gateway: BackendGateway, discovery: &DiscoveryConfig, server: ServerConfig) -> Self {
        let gateway = Arc::new(gateway);
        let probe: Arc<dyn HealthProbe> = gateway.clone();
        let registry = Arc::new(ServiceRegistry::new(probe, discovery.health_check_interval));
        let specs = Arc::new(SpecCatalog::new(
            gateway.clone(),
            registry.clone(),
            discovery.spec_refresh_interval,
        ));
        let tools = Arc::new(ToolCatalog::new(registry.clone(), specs.clone()));
        let executor = Arc::new(ToolExecutor::new(tools.clone(), gateway.clone()));
        Self {
            server,
            gateway,
            registry,
            specs,
            tools,
            executor,
        }
    }

    /// Eager health cycle, eager spec load, first tool generation; then both
    /// background loops, each regenerating tools after every cycle.
    pub async fn start(&self) {
        tracing::info!("Initializing adapter components...");
        self.registry.start(Some(self.regenerate_hook())).await;
        self.specs.start(Some(self.regenerate_hook())).await;
        let snapshot = self.tools.regenerate();
        tracing::info!("Generated {} tools from OpenAPI specs", snapshot.len());
    }

    /// Stop both loops, letting in-flight cycles finish.
    pub async fn stop(&self) {
        tracing::info!("Shutting down adapter components...");
        self.registry.stop().await;
        self.specs.stop().await;
        tracing::info!("Adapter shutdown complete");
    }

    fn regenerate_hook(&self) -> RefreshHook {
        let tools = Arc::clone(&self.tools);
        Arc::new(move || {
            tools.regenerate();
        })
    }
}
