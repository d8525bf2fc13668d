//! MCP Capability Server
//!
//! A Model Context Protocol (MCP) server that exposes a registry of tools and
//! resources to a client over JSON-RPC 2.0.
//!
//! # Architecture
//!
//! 1. **Protocol** (`mcp::protocol`) - JSON-RPC envelopes, decode/encode
//! 2. **Dispatcher** (`mcp::server`) - initialize/initialized lifecycle and routing
//! 3. **Capabilities** (`mcp::handler`, `tools`) - tool and resource contracts plus built-ins
//! 4. **Transports** - newline-delimited stdio (`mcp::transport`) or
//!    streamable HTTP with Server-Sent Events (`http`)
//!
//! Logging goes to stderr via `tracing`; stdout belongs to the protocol.

pub mod config;
pub mod error;
pub mod http;
pub mod mcp;
pub mod metrics;
pub mod tools;

pub use error::{Error, Result};

/// Server version reported in `initialize`.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Server name reported in `initialize`.
pub const SERVER_NAME: &str = "mcp-capability-server";
