//! # REST → MCP adapter
//!
//! Exposes a set of REST backends, described only by their OpenAPI
//! documents, as callable tools behind a JSON-RPC protocol surface:
//! - Health probing of every configured backend on a fixed interval
//! - Periodic loading and parsing of each healthy backend's API description
//! - Tool synthesis (name, description, input schema) per operation
//! - Argument validation and translation into HTTP requests
//! - Resilient backend calls with per-backend pools and exponential backoff
//!
//! ## Architecture
//!
//! ```text
//!   JSON-RPC  →  AdapterFacade  →  ToolExecutor  →  BackendGateway  →  backends
//!                                      │                  ▲
//!                                 ToolCatalog             │
//!                                  ▲       ▲              │
//!                       ServiceRegistry  SpecCatalog ─────┘
//!                        (health loop)   (spec loop)
//! ```
//!
//! Both loops regenerate the tool catalog after every cycle; readers always
//! see a complete snapshot.

// Enforce strict safety at compile time
#![deny(unsafe_code)]
#![warn(missing_debug_implementations)]
#![warn(rust_2018_idioms)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]

pub mod context;
pub mod discovery;
pub mod gateway;
pub mod mcp;
pub mod openapi;
pub mod scheduler;
pub mod tools;
pub mod types;

// Internal utilities
pub mod observability;

pub use context::AppContext;
pub use types::{Config, Error, Result};
