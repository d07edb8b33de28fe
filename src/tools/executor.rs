//! Tool execution: lookup, validation, translation and dispatch.
//!
//! `execute` never fails outward. Every problem becomes an `isError` result
//! whose `_meta.error_code` follows `Error::tool_error_code`.

use super::catalog::{value_type_name, ToolCatalog, ToolListing};
use super::result::ToolResult;
use super::translator::{error_result, from_http, to_http};
use crate::gateway::BackendGateway;
use crate::types::{Error, Result};
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::sync::Arc;

/// Snapshot reported by [`ToolExecutor::health_check`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutorHealth {
    pub status: &'static str,
    pub tools_available: usize,
    pub healthy_services: usize,
    pub system: &'static str,
}

#[derive(Debug)]
pub struct ToolExecutor {
    catalog: Arc<ToolCatalog>,
    gateway: Arc<BackendGateway>,
}

impl ToolExecutor {
    pub fn new(catalog: Arc<ToolCatalog>, gateway: Arc<BackendGateway>) -> Self {
        Self { catalog, gateway }
    }

    /// Run one tool call to completion.
    pub async fn execute(&self, tool_name: &str, arguments: &Value) -> ToolResult {
        tracing::info!("Executing tool: {} with arguments: {}", tool_name, arguments);

        match self.run(tool_name, arguments).await {
            Ok(result) => {
                tracing::info!("Tool {} executed successfully", tool_name);
                result
            }
            Err(e) => {
                let code = e.tool_error_code();
                let message = failure_message(&e);
                match code {
                    400..=499 => tracing::warn!("Tool {} rejected: {}", tool_name, message),
                    _ => tracing::error!("Error executing tool {}: {}", tool_name, message),
                }
                error_result(&message, code)
            }
        }
    }

    async fn run(&self, tool_name: &str, arguments: &Value) -> Result<ToolResult> {
        let tool = self
            .catalog
            .get(tool_name)
            .ok_or_else(|| Error::not_found(format!("Tool not found: {}", tool_name)))?;
        let arguments = argument_map(arguments)?;
        tool.validate_arguments(&arguments)?;
        let plan = to_http(&tool, &arguments)?;
        let response = self
            .gateway
            .request(&tool.service_name, plan.method, &plan.path, &plan.options)
            .await?;
        Ok(from_http(&response, &tool))
    }

    pub fn list_available_tools(&self) -> Vec<ToolListing> {
        self.catalog.all().iter().map(|t| t.to_listing()).collect()
    }

    /// Listing plus `_meta {service, endpoint, method}`.
    pub fn get_tool_info(&self, tool_name: &str) -> Option<Value> {
        let tool = self.catalog.get(tool_name)?;
        let listing = tool.to_listing();
        Some(json!({
            "name": listing.name,
            "description": listing.description,
            "inputSchema": listing.input_schema,
            "_meta": {
                "service": tool.service_name,
                "endpoint": tool.endpoint_path,
                "method": tool.method,
            }
        }))
    }

    pub fn health_check(&self) -> ExecutorHealth {
        ExecutorHealth {
            status: "healthy",
            tools_available: self.catalog.len(),
            healthy_services: self.catalog.healthy_service_count(),
            system: "tool_executor",
        }
    }
}

/// `null` counts as no arguments; any other non-object is rejected.
fn argument_map(arguments: &Value) -> Result<Map<String, Value>> {
    match arguments {
        Value::Null => Ok(Map::new()),
        Value::Object(map) => Ok(map.clone()),
        other => Err(Error::validation(format!(
            "Arguments must be a JSON object, got {}",
            value_type_name(other)
        ))),
    }
}

fn failure_message(e: &Error) -> String {
    match e {
        Error::Internal(_) => e.to_string(),
        _ if e.tool_error_code() == 500 => format!("Internal error: {}", e),
        _ => e.to_string(),
    }
}
