//! API description parsing.
//!
//! The raw document stays a permissive `serde_json::Value` only up to this
//! boundary; everything downstream works with `ApiDocument` and
//! `EndpointDescriptor`. Raw parameter and body schemas are the one piece
//! that keeps the open-ended shape.

use crate::types::HttpMethod;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

/// Chained `$ref` hops followed before giving up.
const MAX_REF_DEPTH: usize = 8;

// =============================================================================
// Parameter model
// =============================================================================

/// Where an operation parameter travels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterLocation {
    Path,
    Query,
    Header,
    Cookie,
}

impl ParameterLocation {
    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "path" => Some(Self::Path),
            "query" => Some(Self::Query),
            "header" => Some(Self::Header),
            "cookie" => Some(Self::Cookie),
            _ => None,
        }
    }
}

/// One declared operation parameter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParameterSpec {
    pub name: String,
    pub location: ParameterLocation,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Raw schema object (may be `Null` when the document gave none).
    pub schema: Value,
}

impl ParameterSpec {
    /// Declared schema type, if any.
    pub fn schema_type(&self) -> Option<&str> {
        self.schema.get("type").and_then(Value::as_str)
    }
}

/// Declared request body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequestBodySpec {
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Schema of the `application/json` content (empty object when absent).
    pub schema: Value,
}

impl RequestBodySpec {
    pub fn schema_type(&self) -> Option<&str> {
        self.schema.get("type").and_then(Value::as_str)
    }
}

// =============================================================================
// Endpoint + document
// =============================================================================

/// One operation (path template + verb) exposed by a backend.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EndpointDescriptor {
    pub path: String,
    pub method: HttpMethod,
    pub operation_id: String,
    /// True when `operation_id` is the `<method>_<path>` default rather than
    /// a value declared by the document.
    pub operation_id_derived: bool,
    pub summary: String,
    pub description: String,
    pub parameters: Vec<ParameterSpec>,
    pub request_body: Option<RequestBodySpec>,
    pub responses: Map<String, Value>,
    pub tags: Vec<String>,
    pub security: Vec<Value>,
}

impl EndpointDescriptor {
    pub fn parameters_in(&self, location: ParameterLocation) -> impl Iterator<Item = &ParameterSpec> {
        self.parameters.iter().filter(move |p| p.location == location)
    }
}

/// Parsed API description of one backend.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiDocument {
    pub service_name: String,
    pub title: String,
    pub version: String,
    pub endpoints: Vec<EndpointDescriptor>,
    pub loaded_at: DateTime<Utc>,
}

/// Default operation id: `<method>_<path with '/' replaced by '_'>`.
pub fn derived_operation_id(method: HttpMethod, path: &str) -> String {
    format!("{}_{}", method.as_lower(), path.replace('/', "_"))
}

/// Narrow a raw API description into an `ApiDocument`.
///
/// Never fails: a missing or malformed `paths` collection yields zero
/// endpoints, and individual malformed operations or parameters are skipped.
pub fn parse_document(service_name: &str, raw: &Value) -> ApiDocument {
    let info = raw.get("info");
    let title = info
        .and_then(|i| i.get("title"))
        .and_then(Value::as_str)
        .unwrap_or(service_name)
        .to_string();
    let version = info
        .and_then(|i| i.get("version"))
        .and_then(Value::as_str)
        .unwrap_or("1.0.0")
        .to_string();

    let mut endpoints = Vec::new();
    if let Some(paths) = raw.get("paths").and_then(Value::as_object) {
        for (path, path_item) in paths {
            let Some(path_item) = path_item.as_object() else {
                tracing::warn!("{}: skipping non-object path item {}", service_name, path);
                continue;
            };
            for (key, operation) in path_item {
                let Ok(method) = key.parse::<HttpMethod>() else {
                    continue;
                };
                match parse_operation(raw, path, method, operation) {
                    Some(endpoint) => endpoints.push(endpoint),
                    None => tracing::warn!(
                        "{}: failed to parse operation {} {}",
                        service_name,
                        method,
                        path
                    ),
                }
            }
        }
    }

    ApiDocument {
        service_name: service_name.to_string(),
        title,
        version,
        endpoints,
        loaded_at: Utc::now(),
    }
}

fn parse_operation(
    doc: &Value,
    path: &str,
    method: HttpMethod,
    operation: &Value,
) -> Option<EndpointDescriptor> {
    let operation = operation.as_object()?;

    let declared_id = operation
        .get("operationId")
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty());
    let (operation_id, operation_id_derived) = match declared_id {
        Some(id) => (id.to_string(), false),
        None => (derived_operation_id(method, path), true),
    };

    let text = |key: &str| {
        operation
            .get(key)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };

    let parameters = operation
        .get("parameters")
        .and_then(Value::as_array)
        .map(|params| params.iter().filter_map(|p| parse_parameter(doc, p)).collect())
        .unwrap_or_default();

    let request_body = operation
        .get("requestBody")
        .map(|body| resolve_ref(doc, body))
        .and_then(|body| parse_request_body(doc, &body));

    let responses = operation
        .get("responses")
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();

    let tags = operation
        .get("tags")
        .and_then(Value::as_array)
        .map(|tags| {
            tags.iter()
                .filter_map(|t| t.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default();

    let security = operation
        .get("security")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    Some(EndpointDescriptor {
        path: path.to_string(),
        method,
        operation_id,
        operation_id_derived,
        summary: text("summary"),
        description: text("description"),
        parameters,
        request_body,
        responses,
        tags,
        security,
    })
}

fn parse_parameter(doc: &Value, raw: &Value) -> Option<ParameterSpec> {
    let param = resolve_ref(doc, raw);
    let name = param.get("name").and_then(Value::as_str)?.to_string();
    let location = param
        .get("in")
        .and_then(Value::as_str)
        .and_then(ParameterLocation::parse)?;

    Some(ParameterSpec {
        name,
        location,
        required: param.get("required").and_then(Value::as_bool).unwrap_or(false),
        description: param
            .get("description")
            .and_then(Value::as_str)
            .map(str::to_string),
        schema: param
            .get("schema")
            .map(|s| resolve_ref(doc, s))
            .unwrap_or(Value::Null),
    })
}

fn parse_request_body(doc: &Value, body: &Value) -> Option<RequestBodySpec> {
    let body = body.as_object().filter(|b| !b.is_empty())?;

    let schema = body
        .get("content")
        .and_then(|c| c.get("application/json"))
        .and_then(|c| c.get("schema"))
        .map(|s| resolve_schema(doc, s))
        .unwrap_or_else(|| Value::Object(Map::new()));

    Some(RequestBodySpec {
        required: body.get("required").and_then(Value::as_bool).unwrap_or(false),
        description: body
            .get("description")
            .and_then(Value::as_str)
            .map(str::to_string),
        schema,
    })
}

/// Follow local `#/...` references until a concrete node is reached.
///
/// Unresolvable references are returned unchanged.
fn resolve_ref(doc: &Value, node: &Value) -> Value {
    let mut current = node;
    for _ in 0..MAX_REF_DEPTH {
        let Some(reference) = current.get("$ref").and_then(Value::as_str) else {
            break;
        };
        let Some(pointer) = reference.strip_prefix('#') else {
            break;
        };
        match doc.pointer(pointer) {
            Some(target) => current = target,
            None => break,
        }
    }
    current.clone()
}

/// Resolve a schema and each of its direct properties.
fn resolve_schema(doc: &Value, schema: &Value) -> Value {
    let mut resolved = resolve_ref(doc, schema);
    if let Some(properties) = resolved.get_mut("properties").and_then(Value::as_object_mut) {
        for property in properties.values_mut() {
            *property = resolve_ref(doc, property);
        }
    }
    resolved
}

// =============================================================================
// Tests
// =============================================================================
