//! Model Context Protocol (MCP) implementation.
//!
//! JSON-RPC message codec, the lifecycle-aware dispatcher and the stdio
//! transport. The HTTP/SSE transport lives in [`crate::http`].
//!
//! # Architecture
//!
//! - `protocol` - Wire types, error codes, decode/encode
//! - `handler` - Tool/resource contracts and the capability registry
//! - `server` - Initialization state and method dispatch
//! - `transport` - The `Transport` contract and the stdio loop

pub mod handler;
pub mod protocol;
pub mod server;
pub mod transport;

pub use handler::{McpHandler, ResourceHandler, ToolHandler};
pub use protocol::*;
pub use server::McpServer;
pub use transport::{StdioTransport, Transport};
