//! Application error types.
//!
//! All errors use `thiserror` for automatic Error trait derivation and provide
//! clear error messages with context. The same enum is mapped onto two
//! surfaces: tool-level error codes inside `tools/call` results, and JSON-RPC
//! envelope codes at the transport boundary.

use thiserror::Error;

/// Application result type.
pub type Result<T> = std::result::Result<T, Error>;

/// JSON-RPC 2.0 envelope error codes.
pub mod rpc_codes {
    pub const PARSE_ERROR: i64 = -32700;
    pub const INVALID_REQUEST: i64 = -32600;
    pub const METHOD_NOT_FOUND: i64 = -32601;
    pub const INVALID_PARAMS: i64 = -32602;
    pub const INTERNAL_ERROR: i64 = -32603;
}

/// Main error enum for the adapter.
#[derive(Error, Debug)]
pub enum Error {
    /// A backend name that has no configuration entry.
    #[error("Service not configured: {0}")]
    ServiceNotConfigured(String),

    /// Missing or ill-typed tool arguments (tool code 400).
    #[error("{0}")]
    Validation(String),

    /// A `{name}` placeholder in the path template had no argument.
    #[error("Missing required path parameter: {0}")]
    MissingPathParameter(String),

    /// Tool or resource lookup miss (tool code 404).
    #[error("{0}")]
    NotFound(String),

    /// Backend answered with a 4xx/5xx status.
    #[error("HTTP error: {status} - {body}")]
    Upstream { status: u16, body: String },

    /// Connection, DNS, TLS or timeout failure talking to a backend.
    #[error("Request error: {0}")]
    Transport(String),

    /// Malformed API description or envelope.
    #[error("parse error: {0}")]
    Parse(String),

    /// Protocol method the facade does not route.
    #[error("Method not found: {0}")]
    MethodNotFound(String),

    /// Invalid or unreadable configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Internal errors.
    #[error("Internal error: {0}")]
    Internal(String),

    /// Serialization/deserialization errors.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Whether the gateway may retry after this error.
    ///
    /// Only transport failures and upstream 5xx qualify; 4xx never does.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Transport(_) => true,
            Error::Upstream { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Error code reported inside an `isError` tool result.
    pub fn tool_error_code(&self) -> u16 {
        match self {
            Error::Validation(_) | Error::MissingPathParameter(_) => 400,
            Error::NotFound(_) => 404,
            Error::Upstream { status, .. } => *status,
            Error::Transport(_) => 503,
            _ => 500,
        }
    }

    /// Convert to a JSON-RPC envelope error code.
    pub fn rpc_error_code(&self) -> i64 {
        match self {
            Error::Parse(_) | Error::Serialization(_) => rpc_codes::PARSE_ERROR,
            Error::MethodNotFound(_) => rpc_codes::METHOD_NOT_FOUND,
            Error::Validation(_) => rpc_codes::INVALID_PARAMS,
            _ => rpc_codes::INTERNAL_ERROR,
        }
    }
}

// Convenience constructors
impl Error {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Transport(err.to_string())
    }
}
