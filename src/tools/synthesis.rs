//! Tool synthesis: name, description and input schema for one endpoint.

use crate::openapi::{EndpointDescriptor, ParameterLocation, ParameterSpec};
use serde_json::{json, Map, Value};

/// Replace every character outside `[A-Za-z0-9_]` with `_`.
pub fn sanitize_name(raw: &str) -> String {
    raw.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

/// `<service>_<operationId>`, or `<service>_<method>_<last static segment>`
/// when the document declared no operation id.
pub fn tool_name(service: &str, endpoint: &EndpointDescriptor) -> String {
    let base = if endpoint.operation_id_derived {
        let last_static = endpoint
            .path
            .split('/')
            .filter(|part| !part.is_empty() && !part.starts_with('{'))
            .next_back();
        match last_static {
            Some(segment) => format!("{}_{}", endpoint.method.as_lower(), segment),
            None => format!("{}_root", endpoint.method.as_lower()),
        }
    } else {
        endpoint.operation_id.clone()
    };
    sanitize_name(&format!("{}_{}", service, base))
}

pub fn tool_description(endpoint: &EndpointDescriptor) -> String {
    let mut parts: Vec<String> = Vec::new();

    if !endpoint.summary.is_empty() {
        parts.push(endpoint.summary.clone());
    }
    if !endpoint.description.is_empty() && endpoint.description != endpoint.summary {
        parts.push(endpoint.description.clone());
    }
    if parts.is_empty() {
        parts.push(format!("{} {}", endpoint.method, endpoint.path));
    }

    let path_params: Vec<&str> = endpoint
        .parameters_in(ParameterLocation::Path)
        .map(|p| p.name.as_str())
        .collect();
    if !path_params.is_empty() {
        parts.push(format!("Path parameters: {}", path_params.join(", ")));
    }

    parts.join(". ")
}

/// Object schema merging path, query, header and body inputs.
///
/// Later sources overwrite same-named properties; `required` keeps
/// first-seen order without duplicates.
pub fn input_schema(endpoint: &EndpointDescriptor) -> Value {
    let mut properties = Map::new();
    let mut required: Vec<String> = Vec::new();

    for param in endpoint.parameters_in(ParameterLocation::Path) {
        properties.insert(param.name.clone(), parameter_property(param, "Path parameter", false));
        if param.required {
            push_unique(&mut required, &param.name);
        }
    }

    for (location, label) in [
        (ParameterLocation::Query, "Query parameter"),
        (ParameterLocation::Header, "Header parameter"),
    ] {
        for param in endpoint.parameters_in(location) {
            properties.insert(param.name.clone(), parameter_property(param, label, true));
            if param.required {
                push_unique(&mut required, &param.name);
            }
        }
    }

    if let Some(body) = &endpoint.request_body {
        if body.schema_type() == Some("object") {
            if let Some(body_props) = body.schema.get("properties").and_then(Value::as_object) {
                for (name, schema) in body_props {
                    properties.insert(name.clone(), body_property(name, schema));
                }
            }
            let body_required = body
                .schema
                .get("required")
                .and_then(Value::as_array)
                .into_iter()
                .flatten()
                .filter_map(Value::as_str);
            for name in body_required {
                push_unique(&mut required, name);
            }
        } else {
            properties.insert(
                "body".to_string(),
                json!({
                    "type": body.schema_type().unwrap_or("object"),
                    "description": "Request body data",
                }),
            );
            push_unique(&mut required, "body");
        }
    }

    json!({
        "type": "object",
        "properties": properties,
        "required": required,
    })
}

fn push_unique(required: &mut Vec<String>, name: &str) {
    if !required.iter().any(|r| r == name) {
        required.push(name.to_string());
    }
}

fn parameter_property(param: &ParameterSpec, label: &str, carry_constraints: bool) -> Value {
    let mut property = Map::new();
    property.insert(
        "type".to_string(),
        json!(param.schema_type().unwrap_or("string")),
    );
    property.insert(
        "description".to_string(),
        json!(param
            .description
            .clone()
            .unwrap_or_else(|| format!("{}: {}", label, param.name))),
    );
    if carry_constraints {
        for key in ["default", "enum"] {
            if let Some(value) = param.schema.get(key) {
                property.insert(key.to_string(), value.clone());
            }
        }
    }
    Value::Object(property)
}

fn body_property(name: &str, schema: &Value) -> Value {
    let mut property = schema.as_object().cloned().unwrap_or_default();
    property
        .entry("type")
        .or_insert_with(|| json!("string"));
    property
        .entry("description")
        .or_insert_with(|| json!(format!("Request body parameter: {}", name)));
    Value::Object(property)
}
