//! SpecCatalog: keeps the latest parsed API description of every healthy
//! backend.

use super::document::{parse_document, ApiDocument, EndpointDescriptor};
use crate::discovery::{RefreshHook, ServiceRegistry};
use crate::gateway::BackendGateway;
use crate::scheduler::ScheduledTask;
use crate::types::{RequestOptions, Result};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;

/// Well-known path every backend serves its API description on.
pub const SPEC_PATH: &str = "/openapi.json";

pub struct SpecCatalog {
    gateway: Arc<BackendGateway>,
    registry: Arc<ServiceRegistry>,
    interval: Duration,
    documents: RwLock<BTreeMap<String, Arc<ApiDocument>>>,
    task: Mutex<Option<ScheduledTask>>,
}

impl std::fmt::Debug for SpecCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let loaded: Vec<String> = self.read_documents().keys().cloned().collect();
        f.debug_struct("SpecCatalog")
            .field("interval", &self.interval)
            .field("loaded", &loaded)
            .finish()
    }
}

impl SpecCatalog {
    pub fn new(gateway: Arc<BackendGateway>, registry: Arc<ServiceRegistry>, interval: Duration) -> Self {
        Self {
            gateway,
            registry,
            interval,
            documents: RwLock::new(BTreeMap::new()),
            task: Mutex::new(None),
        }
    }

    /// Load every healthy backend once, then refresh every `interval`.
    ///
    /// `on_cycle` runs after each background refresh.
    pub async fn start(self: &Arc<Self>, on_cycle: Option<RefreshHook>) {
        self.load_all().await;

        let mut task = self.task.lock().unwrap_or_else(PoisonError::into_inner);
        if task.is_some() {
            return;
        }
        let catalog = Arc::clone(self);
        *task = Some(ScheduledTask::spawn("spec_refresh", self.interval, move || {
            let catalog = Arc::clone(&catalog);
            let on_cycle = on_cycle.clone();
            async move {
                catalog.load_all().await;
                if let Some(hook) = on_cycle {
                    hook();
                }
            }
        }));
        tracing::info!("Started OpenAPI spec refresh loop");
    }

    pub async fn stop(&self) {
        let task = self.task.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(task) = task {
            task.stop().await;
        }
        tracing::info!("Stopped OpenAPI spec refresh loop");
    }

    pub fn is_running(&self) -> bool {
        self.task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|t| !t.is_finished())
    }

    /// Load every currently healthy backend concurrently.
    ///
    /// Returns how many loads succeeded. A failed load keeps that backend's
    /// previous document.
    pub async fn load_all(&self) -> usize {
        let healthy = self.registry.healthy_services();
        let outcomes = futures::future::join_all(healthy.iter().map(|name| async move {
            match self.load_spec(name).await {
                Ok(_) => true,
                Err(e) => {
                    tracing::error!("Failed to load OpenAPI spec for {}: {}", name, e);
                    false
                }
            }
        }))
        .await;
        outcomes.into_iter().filter(|ok| *ok).count()
    }

    /// Fetch, parse and store one backend's description.
    pub async fn load_spec(&self, name: &str) -> Result<Arc<ApiDocument>> {
        let response = self
            .gateway
            .get(name, SPEC_PATH, &RequestOptions::default())
            .await?;
        let raw = response.json()?;
        let document = Arc::new(parse_document(name, &raw));

        tracing::info!(
            "Loaded OpenAPI spec for {}: {} endpoints",
            name,
            document.endpoints.len()
        );
        self.documents
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.to_string(), Arc::clone(&document));
        Ok(document)
    }

    pub fn get_spec(&self, name: &str) -> Option<Arc<ApiDocument>> {
        self.read_documents().get(name).cloned()
    }

    /// Copy of the name → document mapping.
    pub fn all_specs(&self) -> BTreeMap<String, Arc<ApiDocument>> {
        self.read_documents().clone()
    }

    pub fn endpoints_for_service(&self, name: &str) -> Vec<EndpointDescriptor> {
        self.read_documents()
            .get(name)
            .map(|doc| doc.endpoints.clone())
            .unwrap_or_default()
    }

    fn read_documents(&self) -> std::sync::RwLockReadGuard<'_, BTreeMap<String, Arc<ApiDocument>>> {
        self.documents.read().unwrap_or_else(PoisonError::into_inner)
    }
}
