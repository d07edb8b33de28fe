//! HTTP vocabulary shared by the gateway, the document parser and the translator.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// The five verbs an operation may be exposed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Patch,
}

impl HttpMethod {
    pub const ALL: [HttpMethod; 5] = [
        HttpMethod::Get,
        HttpMethod::Post,
        HttpMethod::Put,
        HttpMethod::Delete,
        HttpMethod::Patch,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Patch => "PATCH",
        }
    }

    /// Lowercase form used in derived operation ids and tool names.
    pub fn as_lower(&self) -> &'static str {
        match self {
            HttpMethod::Get => "get",
            HttpMethod::Post => "post",
            HttpMethod::Put => "put",
            HttpMethod::Delete => "delete",
            HttpMethod::Patch => "patch",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = String;

    /// Case-insensitive; anything outside the five verbs is rejected.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        HttpMethod::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unsupported HTTP method: {}", s))
    }
}

impl From<HttpMethod> for reqwest::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Delete => reqwest::Method::DELETE,
            HttpMethod::Patch => reqwest::Method::PATCH,
        }
    }
}

/// Everything besides method and path that a backend call carries.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestOptions {
    /// Query string parameters (values stringified on the wire).
    pub query: Map<String, Value>,
    /// JSON request body, if any.
    pub json_body: Option<Value>,
    /// Extra request headers on top of the backend defaults.
    pub headers: Vec<(String, String)>,
}

impl RequestOptions {
    pub fn is_empty(&self) -> bool {
        self.query.is_empty() && self.json_body.is_none() && self.headers.is_empty()
    }

    /// Query pairs ready for the wire.
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        self.query
            .iter()
            .flat_map(|(key, value)| match value {
                Value::Array(items) => items
                    .iter()
                    .map(|item| (key.clone(), value_to_param(item)))
                    .collect::<Vec<_>>(),
                other => vec![(key.clone(), value_to_param(other))],
            })
            .collect()
    }
}

/// Stringify an argument for use in a path segment, query string or header.
///
/// Strings are used as-is (no surrounding quotes); everything else uses its
/// JSON rendering.
pub fn value_to_param(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
