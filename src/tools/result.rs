//! The normalized `tools/call` result shape.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// One content entry of a tool result. Only text content is produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentItem {
    Text { text: String },
}

impl ContentItem {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    pub fn as_text(&self) -> &str {
        match self {
            Self::Text { text } => text,
        }
    }
}

/// Result of a tool invocation as delivered to protocol clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    pub content: Vec<ContentItem>,
    #[serde(rename = "isError")]
    pub is_error: bool,
    #[serde(rename = "_meta", default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Map<String, Value>>,
}

impl ToolResult {
    pub fn success(text: impl Into<String>, meta: Map<String, Value>) -> Self {
        Self {
            content: vec![ContentItem::text(text)],
            is_error: false,
            meta: Some(meta),
        }
    }

    /// Error shape: `"Error: <message>"` plus `_meta {error_code, error_message}`.
    pub fn error(message: &str, code: u16) -> Self {
        let mut meta = Map::new();
        meta.insert("error_code".to_string(), json!(code));
        meta.insert("error_message".to_string(), json!(message));
        Self {
            content: vec![ContentItem::text(format!("Error: {}", message))],
            is_error: true,
            meta: Some(meta),
        }
    }

    /// Text of the first content entry.
    pub fn text(&self) -> &str {
        self.content.first().map(ContentItem::as_text).unwrap_or_default()
    }

    /// `_meta.error_code`, when present.
    pub fn error_code(&self) -> Option<u16> {
        self.meta
            .as_ref()?
            .get("error_code")?
            .as_u64()
            .and_then(|c| u16::try_from(c).ok())
    }
}
