//! JSON-RPC 2.0 framing around the facade.

use super::facade::AdapterFacade;
use crate::types::{rpc_codes, Error};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const JSONRPC_VERSION: &str = "2.0";

/// Error member of a response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
}

/// One response frame. Exactly one of `result` / `error` is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcResponse {
    pub jsonrpc: String,
    pub id: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

impl RpcResponse {
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(id: Value, code: i64, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: None,
            error: Some(RpcError {
                code,
                message: message.into(),
            }),
        }
    }

    fn from_error(id: Value, err: &Error) -> Self {
        let code = err.rpc_error_code();
        let message = match err {
            Error::Internal(_) => err.to_string(),
            _ if code == rpc_codes::INTERNAL_ERROR => format!("Internal error: {}", err),
            _ => err.to_string(),
        };
        Self::failure(id, code, message)
    }
}

/// Handle one text frame. `None` means no reply is due (a notification).
pub async fn handle_message(facade: &AdapterFacade, raw: &str) -> Option<RpcResponse> {
    handle_frame(facade, raw.as_bytes()).await
}

/// Handle one frame as read off the wire. Bytes that are not UTF-8 JSON get
/// a parse error.
pub async fn handle_frame(facade: &AdapterFacade, raw: &[u8]) -> Option<RpcResponse> {
    match serde_json::from_slice::<Value>(raw) {
        Ok(message) => handle_value(facade, message).await,
        Err(e) => {
            tracing::warn!("Unparseable message: {}", e);
            Some(RpcResponse::failure(Value::Null, rpc_codes::PARSE_ERROR, "Parse error"))
        }
    }
}

pub async fn handle_value(facade: &AdapterFacade, message: Value) -> Option<RpcResponse> {
    let Value::Object(mut message) = message else {
        return Some(RpcResponse::failure(
            Value::Null,
            rpc_codes::INVALID_REQUEST,
            "Invalid request",
        ));
    };

    let id = message.remove("id");
    let reply_id = id.clone().unwrap_or(Value::Null);

    if message.get("jsonrpc").and_then(Value::as_str) != Some(JSONRPC_VERSION) {
        return Some(RpcResponse::failure(
            reply_id,
            rpc_codes::INVALID_REQUEST,
            "Invalid JSON-RPC version",
        ));
    }
    let Some(method) = message.get("method").and_then(Value::as_str).map(str::to_string) else {
        return Some(RpcResponse::failure(reply_id, rpc_codes::INVALID_REQUEST, "Invalid request"));
    };
    let params = message.remove("params").unwrap_or(Value::Null);

    if id.is_none() {
        if method.starts_with("notifications/") {
            facade.notify(&method);
        } else {
            tracing::warn!("{} sent without an id; running it without a reply", method);
            if let Err(e) = facade.dispatch(&method, &params).await {
                tracing::warn!("{} failed: {}", method, e);
            }
        }
        return None;
    }

    tracing::info!("Received {} request", method);
    let response = match facade.dispatch(&method, &params).await {
        Ok(result) => RpcResponse::success(reply_id, result),
        Err(e) => {
            tracing::warn!("{} failed: {}", method, e);
            RpcResponse::from_error(reply_id, &e)
        }
    };
    Some(response)
}
