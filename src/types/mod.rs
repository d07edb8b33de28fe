//! Core types for the adapter.
//!
//! This module provides foundational types used throughout the system:
//! - **Errors**: Application error types with thiserror derives
//! - **Config**: Backend, discovery and server configuration
//! - **HTTP**: Method enum and explicit request options

mod config;
mod errors;
mod http;

pub use config::{
    BackendConfig, Config, DiscoveryConfig, ObservabilityConfig, RetryConfig, ServerConfig,
};
pub use errors::{rpc_codes, Error, Result};
pub use http::{value_to_param, HttpMethod, RequestOptions};
