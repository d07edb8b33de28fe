//! Protocol-method router over the application context.

use crate::context::AppContext;
use crate::tools::{ExecutorHealth, ToolResult};
use crate::types::{Error, Result};
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::OnceCell;

/// Protocol version answered when the client does not name one.
pub const DEFAULT_PROTOCOL_VERSION: &str = "2024-11-05";

/// Adapter-level status, as reported by `ping`-style health queries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdapterStatus {
    pub status: &'static str,
    pub service: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<ExecutorHealth>,
}

#[derive(Debug)]
pub struct AdapterFacade {
    context: Arc<AppContext>,
    started: OnceCell<()>,
}

impl AdapterFacade {
    pub fn new(context: Arc<AppContext>) -> Self {
        Self {
            context,
            started: OnceCell::new(),
        }
    }

    pub fn context(&self) -> &Arc<AppContext> {
        &self.context
    }

    /// One-time bring-up of the refresh loops and first tool generation.
    ///
    /// Concurrent callers wait for the same bring-up; later calls return
    /// immediately.
    pub async fn ensure_started(&self) {
        self.started
            .get_or_init(|| async {
                self.context.start().await;
                tracing::info!("Adapter initialization complete");
            })
            .await;
    }

    pub fn is_started(&self) -> bool {
        self.started.initialized()
    }

    /// Route one protocol method.
    pub async fn dispatch(&self, method: &str, params: &Value) -> Result<Value> {
        match method {
            "initialize" => Ok(self.initialize(params).await),
            "tools/list" => Ok(self.tools_list().await),
            "tools/call" => {
                let result = self.tools_call(params).await?;
                Ok(serde_json::to_value(result)?)
            }
            "ping" => Ok(json!({})),
            other => Err(Error::MethodNotFound(other.to_string())),
        }
    }

    /// Messages that expect no reply.
    pub fn notify(&self, method: &str) {
        match method {
            "notifications/initialized" => tracing::info!("Client initialized"),
            other => tracing::debug!("Ignoring notification {}", other),
        }
    }

    pub async fn initialize(&self, params: &Value) -> Value {
        let protocol_version = params
            .get("protocolVersion")
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_PROTOCOL_VERSION);
        if let Some(client) = params.get("clientInfo") {
            tracing::info!("Initialize request from {}", client);
        }

        self.ensure_started().await;

        json!({
            "protocolVersion": protocol_version,
            "capabilities": {
                "tools": { "listChanged": true },
                "resources": {},
                "prompts": {},
            },
            "serverInfo": {
                "name": self.context.server.name,
                "version": self.context.server.version,
            }
        })
    }

    pub async fn tools_list(&self) -> Value {
        self.ensure_started().await;
        json!({ "tools": self.context.executor.list_available_tools() })
    }

    /// `params {name, arguments}`; a missing name is invalid params.
    pub async fn tools_call(&self, params: &Value) -> Result<ToolResult> {
        self.ensure_started().await;

        let name = params
            .get("name")
            .and_then(Value::as_str)
            .filter(|n| !n.is_empty())
            .ok_or_else(|| Error::validation("Tool name is required"))?;
        let arguments = params.get("arguments").cloned().unwrap_or(Value::Null);

        Ok(self.context.executor.execute(name, &arguments).await)
    }

    pub fn status(&self) -> AdapterStatus {
        if self.is_started() {
            AdapterStatus {
                status: "healthy",
                service: self.context.server.name.clone(),
                details: Some(self.context.executor.health_check()),
            }
        } else {
            AdapterStatus {
                status: "initializing",
                service: self.context.server.name.clone(),
                details: None,
            }
        }
    }

    /// Stop the background loops if bring-up ever happened.
    pub async fn shutdown(&self) {
        if self.is_started() {
            self.context.stop().await;
        }
    }
}
