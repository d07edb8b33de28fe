//! Argument ⇄ HTTP translation. Stateless.

use super::catalog::ToolDescriptor;
use super::result::{ContentItem, ToolResult};
use crate::gateway::BackendResponse;
use crate::openapi::ParameterLocation;
use crate::types::{value_to_param, Error, HttpMethod, RequestOptions, Result};
use serde_json::{json, Map, Value};
use std::collections::HashSet;

/// A backend call ready for the gateway.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequestPlan {
    pub path: String,
    pub method: HttpMethod,
    pub options: RequestOptions,
}

/// Names of the `{placeholder}` segments of a path template, in order.
pub fn path_placeholders(template: &str) -> Vec<&str> {
    let mut names = Vec::new();
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        let after = &rest[open + 1..];
        let Some(close) = after.find('}') else {
            break;
        };
        names.push(&after[..close]);
        rest = &after[close + 1..];
    }
    names
}

/// Substitute every `{placeholder}` in one pass over the template.
///
/// Values are percent-encoded as single path segments and never rescanned.
/// An unterminated `{` is copied through as written.
fn fill_path(template: &str, arguments: &Map<String, Value>) -> Result<String> {
    let mut path = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        let after = &rest[open + 1..];
        let Some(close) = after.find('}') else {
            break;
        };
        let name = &after[..close];
        let value = arguments
            .get(name)
            .ok_or_else(|| Error::MissingPathParameter(name.to_string()))?;
        path.push_str(&rest[..open]);
        path.push_str(&encode_segment(&value_to_param(value)));
        rest = &after[close + 1..];
    }
    path.push_str(rest);
    Ok(path)
}

/// Percent-encode everything outside the RFC 3986 unreserved set.
fn encode_segment(raw: &str) -> String {
    let mut encoded = String::with_capacity(raw.len());
    for byte in raw.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                encoded.push(char::from(byte))
            }
            other => encoded.push_str(&format!("%{:02X}", other)),
        }
    }
    encoded
}

/// Build path, query, headers and body for one call.
pub fn to_http(tool: &ToolDescriptor, arguments: &Map<String, Value>) -> Result<HttpRequestPlan> {
    let placeholders = path_placeholders(&tool.endpoint_path);
    let path = fill_path(&tool.endpoint_path, arguments)?;

    let mut query = Map::new();
    for param in tool.parameters_in(ParameterLocation::Query) {
        if let Some(value) = arguments.get(&param.name) {
            query.insert(param.name.clone(), value.clone());
        }
    }

    let headers = tool
        .parameters_in(ParameterLocation::Header)
        .filter_map(|param| {
            arguments
                .get(&param.name)
                .map(|value| (param.name.clone(), value_to_param(value)))
        })
        .collect();

    let json_body = if !tool.declares_body() {
        None
    } else if let Some(body) = arguments.get("body") {
        Some(body.clone())
    } else {
        let excluded: HashSet<&str> = placeholders
            .iter()
            .copied()
            .chain(
                tool.parameters
                    .iter()
                    .filter(|p| matches!(p.location, ParameterLocation::Query | ParameterLocation::Header))
                    .map(|p| p.name.as_str()),
            )
            .collect();
        let leftover: Map<String, Value> = arguments
            .iter()
            .filter(|(key, _)| !excluded.contains(key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        Some(Value::Object(leftover))
    };

    let plan = HttpRequestPlan {
        path,
        method: tool.method,
        options: RequestOptions {
            query,
            json_body,
            headers,
        },
    };
    tracing::debug!(
        "Translated tool call to: {} {} with {:?}",
        plan.method,
        plan.path,
        plan.options
    );
    Ok(plan)
}

/// Wrap a backend response as a tool result.
///
/// JSON bodies are pretty-printed; anything else is passed through as text.
pub fn from_http(response: &BackendResponse, tool: &ToolDescriptor) -> ToolResult {
    let text = match response.json() {
        Ok(value) => match serde_json::to_string_pretty(&value) {
            Ok(pretty) => pretty,
            Err(e) => {
                tracing::error!("Failed to translate HTTP response: {}", e);
                return ToolResult {
                    content: vec![ContentItem::text(format!("Error translating response: {}", e))],
                    is_error: true,
                    meta: None,
                };
            }
        },
        Err(_) => response.text(),
    };

    let mut meta = Map::new();
    meta.insert("status_code".to_string(), json!(response.status));
    meta.insert("tool_name".to_string(), json!(tool.name));
    meta.insert("service".to_string(), json!(tool.service_name));
    ToolResult::success(text, meta)
}

pub fn error_result(message: &str, code: u16) -> ToolResult {
    ToolResult::error(message, code)
}
