//! Error types for the MCP capability server.

use thiserror::Error;

use crate::mcp::protocol::error_codes;

/// Result type alias for server operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the server.
#[derive(Error, Debug)]
pub enum Error {
    // ===== Protocol Errors =====
    #[error("Parse error")]
    Parse,

    #[error("Invalid JSON-RPC request: {0}")]
    InvalidRequest(String),

    #[error("Server not initialized")]
    NotInitialized,

    #[error("Method not found: {0}")]
    MethodNotFound(String),

    #[error("{0}")]
    InvalidParams(String),

    // ===== Capability Errors =====
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Resource not found: {0}")]
    ResourceNotFound(String),

    #[error("Invalid tool arguments: {0}")]
    InvalidToolArguments(String),

    #[error("Tool execution failed: {0}")]
    ToolExecutionFailed(String),

    #[error("Resource read failed: {0}")]
    ResourceReadFailed(String),

    // ===== I/O Errors =====
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    // ===== HTTP Errors =====
    #[error("HTTP server error: {0}")]
    HttpServer(String),

    // ===== Internal Errors =====
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// JSON-RPC error code reported to the client for this error.
    pub fn jsonrpc_code(&self) -> i32 {
        match self {
            Self::Parse => error_codes::PARSE_ERROR,
            Self::InvalidRequest(_) | Self::NotInitialized => error_codes::INVALID_REQUEST,
            Self::MethodNotFound(_) => error_codes::METHOD_NOT_FOUND,
            Self::InvalidParams(_) | Self::ToolNotFound(_) | Self::ResourceNotFound(_) => {
                error_codes::INVALID_PARAMS
            }
            _ => error_codes::INTERNAL_ERROR,
        }
    }

    /// Whether an I/O error means the peer or stream is gone for good.
    pub fn is_disconnect(&self) -> bool {
        match self {
            Self::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::BrokenPipe
                    | std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::ConnectionAborted
                    | std::io::ErrorKind::UnexpectedEof
            ),
            _ => false,
        }
    }
}
