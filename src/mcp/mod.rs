//! Protocol surface: the method router, JSON-RPC framing and the stdio
//! transport.

pub mod envelope;
pub mod facade;
pub mod stdio;

pub use envelope::{handle_frame, handle_message, RpcError, RpcResponse};
pub use facade::{AdapterFacade, AdapterStatus, DEFAULT_PROTOCOL_VERSION};
pub use stdio::StdioServer;
