//! Service discovery: per-backend health tracking via periodic probing.
//!
//! Each backend moves through Unknown → Healthy/Unhealthy and then between
//! Healthy and Unhealthy as probe outcomes arrive. The healthy set is the
//! source of truth for which services get API descriptions loaded and tools
//! generated.

use crate::gateway::BackendGateway;
use crate::scheduler::ScheduledTask;
use crate::types::{Error, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;

/// Callback run after every completed refresh cycle.
pub type RefreshHook = Arc<dyn Fn() + Send + Sync>;

// =============================================================================
// Probe seam
// =============================================================================

/// Something that can tell whether a named backend is up.
///
/// `Ok(false)` is a plain negative result; `Err` is a probe that could not be
/// carried out at all.
#[async_trait]
pub trait HealthProbe: Send + Sync {
    /// Every backend that should be probed each cycle.
    fn service_names(&self) -> Vec<String>;

    async fn probe(&self, service: &str) -> Result<bool>;
}

#[async_trait]
impl HealthProbe for BackendGateway {
    fn service_names(&self) -> Vec<String> {
        BackendGateway::service_names(self)
    }

    async fn probe(&self, service: &str) -> Result<bool> {
        if !self.is_configured(service) {
            return Err(Error::ServiceNotConfigured(service.to_string()));
        }
        Ok(self.health_check(service).await)
    }
}

// =============================================================================
// Health record
// =============================================================================

/// Health state of one backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceHealthRecord {
    pub name: String,
    pub healthy: bool,
    pub consecutive_failures: u32,
    pub last_error: String,
    pub last_check: DateTime<Utc>,
}

impl ServiceHealthRecord {
    fn unknown(name: &str, now: DateTime<Utc>) -> Self {
        Self {
            name: name.to_string(),
            healthy: false,
            consecutive_failures: 0,
            last_error: String::new(),
            last_check: now,
        }
    }
}

#[derive(Debug, Default)]
struct RegistryState {
    records: BTreeMap<String, ServiceHealthRecord>,
    healthy: BTreeSet<String>,
}

// =============================================================================
// Registry
// =============================================================================

/// Tracks backend health and runs the periodic probing loop.
pub struct ServiceRegistry {
    prober: Arc<dyn HealthProbe>,
    interval: Duration,
    state: RwLock<RegistryState>,
    task: Mutex<Option<ScheduledTask>>,
}

impl std::fmt::Debug for ServiceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceRegistry")
            .field("interval", &self.interval)
            .field("healthy", &self.healthy_services())
            .finish()
    }
}

impl ServiceRegistry {
    pub fn new(probe: Arc<dyn HealthProbe>, interval: Duration) -> Self {
        Self {
            prober: probe,
            interval,
            state: RwLock::new(RegistryState::default()),
            task: Mutex::new(None),
        }
    }

    /// Run one eager cycle, then probe every `interval` in the background.
    ///
    /// `on_cycle` runs after each background cycle. Calling `start` while the
    /// loop is already running only runs the eager cycle.
    pub async fn start(self: &Arc<Self>, on_cycle: Option<RefreshHook>) {
        self.check_all().await;

        let mut task = self.task.lock().unwrap_or_else(PoisonError::into_inner);
        if task.is_some() {
            return;
        }
        let registry = Arc::clone(self);
        *task = Some(ScheduledTask::spawn("service_monitor", self.interval, move || {
            let registry = Arc::clone(&registry);
            let on_cycle = on_cycle.clone();
            async move {
                registry.check_all().await;
                if let Some(hook) = on_cycle {
                    hook();
                }
            }
        }));
        tracing::info!("Started service discovery monitoring");
    }

    /// Stop the loop, letting an in-flight cycle finish.
    pub async fn stop(&self) {
        let task = self.task.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(task) = task {
            task.stop().await;
        }
        tracing::info!("Stopped service discovery monitoring");
    }

    pub fn is_running(&self) -> bool {
        self.task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|t| !t.is_finished())
    }

    /// Probe every configured backend concurrently.
    ///
    /// Each probe contains its own failure, so one bad backend never cancels
    /// the others.
    pub async fn check_all(&self) {
        let names = self.prober.service_names();
        futures::future::join_all(names.iter().map(|name| self.probe(name))).await;
    }

    /// Probe one backend and apply the outcome.
    pub async fn probe(&self, name: &str) {
        let outcome = self.prober.probe(name).await;
        if let Err(e) = &outcome {
            tracing::error!("Health check error for {}: {}", name, e);
        }
        self.record_outcome(name, outcome, Utc::now());
    }

    fn record_outcome(&self, name: &str, outcome: Result<bool>, now: DateTime<Utc>) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        let RegistryState { records, healthy } = &mut *state;

        let first_check = !records.contains_key(name);
        let record = records
            .entry(name.to_string())
            .or_insert_with(|| ServiceHealthRecord::unknown(name, now));
        let was_healthy = record.healthy;
        record.last_check = now;

        let (is_healthy, error_text) = match outcome {
            Ok(up) => (up, String::new()),
            Err(e) => (false, e.to_string()),
        };

        if is_healthy {
            if first_check {
                tracing::info!("Service {} is healthy on initial check", name);
            } else if !was_healthy {
                tracing::info!(
                    "Service {} is now healthy (after {} failures)",
                    name,
                    record.consecutive_failures
                );
            }
            record.healthy = true;
            record.consecutive_failures = 0;
            record.last_error.clear();
            healthy.insert(name.to_string());
        } else {
            record.healthy = false;
            record.consecutive_failures += 1;
            record.last_error = error_text;
            healthy.remove(name);
            if record.consecutive_failures == 1 {
                tracing::warn!("Service {} became unhealthy", name);
            }
        }
    }

    pub fn is_service_healthy(&self, name: &str) -> bool {
        self.read_state().healthy.contains(name)
    }

    /// Copy of the currently healthy set.
    pub fn healthy_services(&self) -> BTreeSet<String> {
        self.read_state().healthy.clone()
    }

    pub fn service_status(&self, name: &str) -> Option<ServiceHealthRecord> {
        self.read_state().records.get(name).cloned()
    }

    pub fn all_statuses(&self) -> BTreeMap<String, ServiceHealthRecord> {
        self.read_state().records.clone()
    }

    fn read_state(&self) -> std::sync::RwLockReadGuard<'_, RegistryState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }
}

// =============================================================================
// Tests
// =============================================================================
