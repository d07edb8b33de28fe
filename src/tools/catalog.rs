//! Tool catalog: typed tool descriptors, argument validation and the
//! atomically swapped snapshot every reader sees.
//!
//! The catalog is never edited in place. `regenerate` builds a complete new
//! `ToolCatalogSnapshot` from the healthy set and the loaded documents and
//! swaps the `Arc`; readers holding the previous snapshot keep a consistent
//! view.

use super::synthesis::{input_schema, tool_description, tool_name};
use crate::discovery::ServiceRegistry;
use crate::openapi::{
    ApiDocument, EndpointDescriptor, ParameterLocation, ParameterSpec, RequestBodySpec, SpecCatalog,
};
use crate::types::{Error, HttpMethod, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

// =============================================================================
// Schema types
// =============================================================================

/// Coarse JSON-schema type used for argument checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaType {
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Object,
}

impl SchemaType {
    /// `None` for types the checker does not know; those go unchecked.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "string" => Some(Self::String),
            "integer" => Some(Self::Integer),
            "number" => Some(Self::Number),
            "boolean" => Some(Self::Boolean),
            "array" => Some(Self::Array),
            "object" => Some(Self::Object),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Array => "array",
            Self::Object => "object",
        }
    }

    pub fn matches(&self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Integer => value.is_i64() || value.is_u64(),
            Self::Number => value.is_number(),
            Self::Boolean => value.is_boolean(),
            Self::Array => value.is_array(),
            Self::Object => value.is_object(),
        }
    }
}

pub(crate) fn value_type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_i64() || n.is_u64() => "integer",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// =============================================================================
// Tool descriptor
// =============================================================================

/// `tools/list` entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolListing {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

/// One callable tool, derived 1:1 from an endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
    pub service_name: String,
    pub endpoint_path: String,
    pub method: HttpMethod,
    pub parameters: Vec<ParameterSpec>,
    pub request_body: Option<RequestBodySpec>,
}

impl ToolDescriptor {
    pub fn from_endpoint(service: &str, endpoint: &EndpointDescriptor) -> Self {
        Self {
            name: tool_name(service, endpoint),
            description: tool_description(endpoint),
            input_schema: input_schema(endpoint),
            service_name: service.to_string(),
            endpoint_path: endpoint.path.clone(),
            method: endpoint.method,
            parameters: endpoint.parameters.clone(),
            request_body: endpoint.request_body.clone(),
        }
    }

    pub fn to_listing(&self) -> ToolListing {
        ToolListing {
            name: self.name.clone(),
            description: self.description.clone(),
            input_schema: self.input_schema.clone(),
        }
    }

    pub fn declares_body(&self) -> bool {
        self.request_body.is_some()
    }

    pub fn parameters_in(&self, location: ParameterLocation) -> impl Iterator<Item = &ParameterSpec> {
        self.parameters.iter().filter(move |p| p.location == location)
    }

    /// Check required presence and coarse property types.
    ///
    /// Stops at the first problem. Arguments not named in the schema pass
    /// through unchecked.
    pub fn validate_arguments(&self, arguments: &Map<String, Value>) -> Result<()> {
        let required = self
            .input_schema
            .get("required")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .filter_map(Value::as_str);
        for field in required {
            if !arguments.contains_key(field) {
                return Err(Error::validation(format!(
                    "Missing required parameter: {}",
                    field
                )));
            }
        }

        let Some(properties) = self.input_schema.get("properties").and_then(Value::as_object) else {
            return Ok(());
        };
        for (field, value) in arguments {
            let declared = properties
                .get(field)
                .and_then(|p| p.get("type"))
                .and_then(Value::as_str);
            let Some(expected) = declared.and_then(SchemaType::parse) else {
                continue;
            };
            if !expected.matches(value) {
                return Err(Error::validation(format!(
                    "Invalid type for parameter '{}': expected {}, got {}",
                    field,
                    expected.as_str(),
                    value_type_name(value)
                )));
            }
        }
        Ok(())
    }
}

// =============================================================================
// Snapshot
// =============================================================================

/// Immutable name → tool mapping produced by one regeneration.
#[derive(Debug, Clone)]
pub struct ToolCatalogSnapshot {
    tools: HashMap<String, Arc<ToolDescriptor>>,
    generated_at: DateTime<Utc>,
}

impl Default for ToolCatalogSnapshot {
    fn default() -> Self {
        Self {
            tools: HashMap::new(),
            generated_at: Utc::now(),
        }
    }
}

impl ToolCatalogSnapshot {
    /// Build tools for every healthy service that has a loaded document.
    pub fn build(
        healthy: &BTreeSet<String>,
        documents: &BTreeMap<String, Arc<ApiDocument>>,
    ) -> Self {
        let mut tools = HashMap::new();
        for service in healthy {
            let Some(document) = documents.get(service) else {
                tracing::warn!("No OpenAPI spec found for service: {}", service);
                continue;
            };
            for endpoint in &document.endpoints {
                let tool = ToolDescriptor::from_endpoint(service, endpoint);
                if tools.contains_key(&tool.name) {
                    tracing::warn!("Duplicate tool name {}; keeping the later operation", tool.name);
                }
                tools.insert(tool.name.clone(), Arc::new(tool));
            }
            tracing::info!(
                "Generated {} tools for {}",
                document.endpoints.len(),
                service
            );
        }
        Self {
            tools,
            generated_at: Utc::now(),
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<ToolDescriptor>> {
        self.tools.get(name).cloned()
    }

    /// All tools ordered by name.
    pub fn all(&self) -> Vec<Arc<ToolDescriptor>> {
        let mut tools: Vec<Arc<ToolDescriptor>> = self.tools.values().cloned().collect();
        tools.sort_by(|a, b| a.name.cmp(&b.name));
        tools
    }

    pub fn names(&self) -> BTreeSet<String> {
        self.tools.keys().cloned().collect()
    }

    pub fn generated_at(&self) -> DateTime<Utc> {
        self.generated_at
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

// =============================================================================
// Tool catalog
// =============================================================================

/// Current set of callable tools.
pub struct ToolCatalog {
    registry: Arc<ServiceRegistry>,
    specs: Arc<SpecCatalog>,
    current: RwLock<Arc<ToolCatalogSnapshot>>,
    /// Held from reading the inputs until the swap, so rebuilds land in order.
    rebuild: Mutex<()>,
}

impl std::fmt::Debug for ToolCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolCatalog")
            .field("tools", &self.len())
            .finish()
    }
}

impl ToolCatalog {
    pub fn new(registry: Arc<ServiceRegistry>, specs: Arc<SpecCatalog>) -> Self {
        Self {
            registry,
            specs,
            current: RwLock::new(Arc::new(ToolCatalogSnapshot::default())),
            rebuild: Mutex::new(()),
        }
    }

    /// Rebuild every tool from the current healthy set and documents, then
    /// swap the snapshot in one step.
    ///
    /// Concurrent callers are serialized, so the last rebuild to finish is
    /// also the last to have read its inputs.
    pub fn regenerate(&self) -> Arc<ToolCatalogSnapshot> {
        let _rebuild = self.rebuild.lock().unwrap_or_else(PoisonError::into_inner);
        let healthy = self.registry.healthy_services();
        let documents = self.specs.all_specs();
        tracing::info!("Generating tools for {} healthy services", healthy.len());

        let next = Arc::new(ToolCatalogSnapshot::build(&healthy, &documents));
        let previous = {
            let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
            std::mem::replace(&mut *current, Arc::clone(&next))
        };
        tracing::info!(
            "Tool refresh complete: {} -> {} tools",
            previous.len(),
            next.len()
        );
        next
    }

    /// The snapshot currently served to readers.
    pub fn snapshot(&self) -> Arc<ToolCatalogSnapshot> {
        Arc::clone(&self.current.read().unwrap_or_else(PoisonError::into_inner))
    }

    pub fn get(&self, name: &str) -> Option<Arc<ToolDescriptor>> {
        self.snapshot().get(name)
    }

    pub fn all(&self) -> Vec<Arc<ToolDescriptor>> {
        self.snapshot().all()
    }

    pub fn tools_for_service(&self, service: &str) -> Vec<Arc<ToolDescriptor>> {
        self.snapshot()
            .all()
            .into_iter()
            .filter(|t| t.service_name == service)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }

    pub fn healthy_service_count(&self) -> usize {
        self.registry.healthy_services().len()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::testing::ScriptedTransport;
    use crate::gateway::{Backoff, BackendGateway};
    use crate::openapi::parse_document;
    use crate::types::BackendConfig;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::time::Duration;

    fn items_document() -> Value {
        json!({
            "paths": {
                "/items/{id}": {
                    "get": {
                        "operationId": "getItem",
                        "parameters": [{"name": "id", "in": "path", "required": true,
                                        "schema": {"type": "string"}}]
                    }
                },
                "/items": {
                    "post": {
                        "requestBody": {"content": {"application/json": {"schema": {
                            "type": "object",
                            "properties": {"name": {"type": "string"}, "qty": {"type": "integer"}},
                            "required": ["name"]
                        }}}}
                    },
                    "get": {
                        "operationId": "listItems",
                        "parameters": [{"name": "limit", "in": "query",
                                        "schema": {"type": "integer", "default": 5, "enum": [5, 10, 20]}}]
                    }
                }
            }
        })
    }

    fn documents(names: &[&str]) -> BTreeMap<String, Arc<ApiDocument>> {
        names
            .iter()
            .map(|n| (n.to_string(), Arc::new(parse_document(n, &items_document()))))
            .collect()
    }

    fn healthy(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn test_build_names_and_lookup() {
        let snapshot = ToolCatalogSnapshot::build(&healthy(&["svc"]), &documents(&["svc"]));
        assert_eq!(
            snapshot.names().into_iter().collect::<Vec<_>>(),
            vec!["svc_getItem", "svc_listItems", "svc_post_items"]
        );

        let tool = snapshot.get("svc_getItem").unwrap();
        assert_eq!(tool.service_name, "svc");
        assert_eq!(tool.endpoint_path, "/items/{id}");
        assert_eq!(tool.method, HttpMethod::Get);
        assert!(!tool.declares_body());
        assert!(snapshot.get("svc_missing").is_none());
    }

    #[test]
    fn test_build_skips_unhealthy_and_unloaded() {
        let docs = documents(&["customer", "order"]);
        let snapshot = ToolCatalogSnapshot::build(&healthy(&["customer", "inventory"]), &docs);
        assert_eq!(snapshot.len(), 3);
        assert!(snapshot.all().iter().all(|t| t.service_name == "customer"));
    }

    #[test]
    fn test_build_is_deterministic() {
        let docs = documents(&["a", "b"]);
        let first = ToolCatalogSnapshot::build(&healthy(&["a", "b"]), &docs);
        let second = ToolCatalogSnapshot::build(&healthy(&["a", "b"]), &docs);
        assert_eq!(first.names(), second.names());
        for (x, y) in first.all().iter().zip(second.all().iter()) {
            assert_eq!(x.as_ref(), y.as_ref());
        }
    }

    #[test]
    fn test_listing_shape() {
        let snapshot = ToolCatalogSnapshot::build(&healthy(&["svc"]), &documents(&["svc"]));
        let listing = serde_json::to_value(snapshot.get("svc_listItems").unwrap().to_listing()).unwrap();
        assert_eq!(listing["name"], json!("svc_listItems"));
        assert_eq!(
            listing["inputSchema"]["properties"]["limit"],
            json!({"type": "integer", "description": "Query parameter: limit",
                   "default": 5, "enum": [5, 10, 20]})
        );
    }

    #[test]
    fn test_validate_arguments() {
        let snapshot = ToolCatalogSnapshot::build(&healthy(&["svc"]), &documents(&["svc"]));
        let create = snapshot.get("svc_post_items").unwrap();

        let args = |v: Value| v.as_object().cloned().unwrap();

        assert!(create.validate_arguments(&args(json!({"name": "x", "qty": 2}))).is_ok());
        // Unknown arguments pass.
        assert!(create.validate_arguments(&args(json!({"name": "x", "extra": []}))).is_ok());

        let err = create.validate_arguments(&args(json!({"qty": 2}))).unwrap_err();
        assert_eq!(err.to_string(), "Missing required parameter: name");
        assert_eq!(err.tool_error_code(), 400);

        let err = create
            .validate_arguments(&args(json!({"name": "x", "qty": "two"})))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid type for parameter 'qty': expected integer, got string"
        );

        let err = create
            .validate_arguments(&args(json!({"name": "x", "qty": 2.5})))
            .unwrap_err();
        assert!(err.to_string().ends_with("expected integer, got number"));
    }

    #[test]
    fn test_schema_type_checks() {
        assert!(SchemaType::Number.matches(&json!(3)));
        assert!(SchemaType::Number.matches(&json!(3.5)));
        assert!(!SchemaType::Boolean.matches(&json!(1)));
        assert!(SchemaType::Object.matches(&json!({})));
        assert!(SchemaType::Array.matches(&json!([])));
        assert_eq!(SchemaType::parse("file"), None);
    }

    #[tokio::test]
    async fn test_regenerate_swaps_snapshot() {
        let routes = ScriptedTransport::routes(vec![
            ("/health", Ok((200, "{}".into()))),
            ("/openapi.json", Ok((200, items_document().to_string()))),
        ]);
        let mut gateway = BackendGateway::new(Backoff::new(Duration::from_millis(1)));
        gateway.register("svc", BackendConfig::new("http://svc").with_retries(0), routes.clone());
        let gateway = Arc::new(gateway);
        let registry = Arc::new(ServiceRegistry::new(gateway.clone(), Duration::from_secs(30)));
        let specs = Arc::new(SpecCatalog::new(gateway, registry.clone(), Duration::from_secs(300)));
        let catalog = ToolCatalog::new(registry.clone(), specs.clone());

        assert!(catalog.is_empty());
        registry.check_all().await;
        specs.load_all().await;

        let before = catalog.snapshot();
        catalog.regenerate();
        assert_eq!(catalog.len(), 3);
        assert_eq!(catalog.tools_for_service("svc").len(), 3);
        assert!(catalog.tools_for_service("other").is_empty());
        assert_eq!(catalog.healthy_service_count(), 1);
        // Readers holding the old snapshot are unaffected.
        assert!(before.is_empty());

        // Service goes down: the next rebuild drops its tools.
        routes.set_route("/health", Ok((503, "down".into())));
        registry.check_all().await;
        catalog.regenerate();
        assert!(catalog.is_empty());
        assert!(catalog.get("svc_getItem").is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_regenerations_settle_on_latest_state() {
        let routes = ScriptedTransport::routes(vec![
            ("/health", Ok((200, "{}".into()))),
            ("/openapi.json", Ok((200, items_document().to_string()))),
        ]);
        let mut gateway = BackendGateway::new(Backoff::new(Duration::from_millis(1)));
        gateway.register("svc", BackendConfig::new("http://svc").with_retries(0), routes.clone());
        let gateway = Arc::new(gateway);
        let registry = Arc::new(ServiceRegistry::new(gateway.clone(), Duration::from_secs(30)));
        let specs = Arc::new(SpecCatalog::new(gateway, registry.clone(), Duration::from_secs(300)));
        let catalog = Arc::new(ToolCatalog::new(registry.clone(), specs.clone()));
        registry.check_all().await;
        specs.load_all().await;

        let rebuilders: Vec<_> = (0..4)
            .map(|_| {
                let catalog = Arc::clone(&catalog);
                tokio::task::spawn_blocking(move || {
                    for _ in 0..50 {
                        catalog.regenerate();
                    }
                })
            })
            .collect();

        routes.set_route("/health", Ok((503, "down".into())));
        registry.check_all().await;
        let after_flip = catalog.regenerate();
        assert!(after_flip.is_empty());

        for rebuilder in rebuilders {
            rebuilder.await.unwrap();
        }
        // Every rebuild that finished after the flip read the flipped state.
        assert!(catalog.is_empty());
    }
}
