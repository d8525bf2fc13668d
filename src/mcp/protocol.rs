//! MCP protocol types, message definitions and the JSON-RPC codec.
//!
//! Every message on the wire is a single JSON value; [`decode`] classifies
//! raw text into a request or a notification and [`encode`] turns a response
//! back into one line.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::Error;

/// JSON-RPC version.
pub const JSONRPC_VERSION: &str = "2.0";

/// MCP protocol version.
pub const MCP_VERSION: &str = "2024-11-05";

// ===== JSON-RPC Base Types =====

/// A JSON-RPC request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub id: RequestId,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

/// A JSON-RPC response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: RequestId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    /// Successful response carrying `result`.
    pub fn success(id: RequestId, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Error response carrying `error`.
    pub fn failure(id: RequestId, error: JsonRpcError) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: None,
            error: Some(error),
        }
    }
}

/// A JSON-RPC notification (no id, no response expected).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcNotification {
    pub jsonrpc: String,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

/// A JSON-RPC error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }
}

impl From<&Error> for JsonRpcError {
    fn from(err: &Error) -> Self {
        Self::new(err.jsonrpc_code(), err.to_string())
    }
}

/// Request ID (string, number, or an explicit null).
///
/// Numbers are kept as parsed, so fractional or very large ids come back
/// exactly as the client sent them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(untagged)]
pub enum RequestId {
    String(String),
    Number(serde_json::Number),
    Null,
}

impl From<i64> for RequestId {
    fn from(id: i64) -> Self {
        Self::Number(id.into())
    }
}

// ===== MCP-Specific Types =====

/// Server capabilities.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerCapabilities {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<ToolsCapability>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resources: Option<ResourcesCapability>,
}

/// Tools capability.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolsCapability {
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub list_changed: bool,
}

/// Resources capability.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourcesCapability {
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub subscribe: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub list_changed: bool,
}

/// Server info.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
}

/// Initialize result.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeResult {
    pub protocol_version: String,
    pub capabilities: ServerCapabilities,
    pub server_info: ServerInfo,
}

/// Tool definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tool {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

/// Tool call result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    pub content: Vec<ContentBlock>,
}

impl ToolResult {
    /// Wrap a capability's textual output.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ContentBlock::Text { text: text.into() }],
        }
    }
}

/// Content block in a tool result.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentBlock {
    Text { text: String },
}

/// List tools result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListToolsResult {
    pub tools: Vec<Tool>,
}

/// A resource exposed by the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    pub uri: String,
    pub name: String,
    pub description: String,
    pub mime_type: String,
}

/// Resource contents.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceContents {
    pub uri: String,
    pub mime_type: String,
    pub text: String,
}

/// Result of resources/list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListResourcesResult {
    pub resources: Vec<Resource>,
}

/// Result of resources/read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadResourceResult {
    pub contents: Vec<ResourceContents>,
}

// ===== Error Codes =====

/// Standard JSON-RPC error codes.
pub mod error_codes {
    pub const PARSE_ERROR: i32 = -32700;
    pub const INVALID_REQUEST: i32 = -32600;
    pub const METHOD_NOT_FOUND: i32 = -32601;
    pub const INVALID_PARAMS: i32 = -32602;
    pub const INTERNAL_ERROR: i32 = -32603;
}

// ===== Codec =====

/// A decoded inbound message.
#[derive(Debug, Clone)]
pub enum IncomingMessage {
    Request(JsonRpcRequest),
    Notification(JsonRpcNotification),
}

impl IncomingMessage {
    pub fn method(&self) -> &str {
        match self {
            Self::Request(req) => &req.method,
            Self::Notification(notif) => &notif.method,
        }
    }
}

/// A message that failed envelope validation.
#[derive(Debug, Clone)]
pub struct EnvelopeError {
    /// Id recovered from the envelope, `Null` when unreadable.
    pub id: RequestId,
    /// Set when the message had no `id` member and must not be answered.
    pub notification: bool,
    pub error: JsonRpcError,
}

impl EnvelopeError {
    fn parse() -> Self {
        Self {
            id: RequestId::Null,
            notification: false,
            error: JsonRpcError::from(&Error::Parse),
        }
    }

    fn invalid(id: RequestId, notification: bool, detail: &str) -> Self {
        Self {
            id,
            notification,
            error: JsonRpcError::from(&Error::InvalidRequest(detail.to_string())),
        }
    }

    /// The error response to send back, if any.
    pub fn into_response(self) -> Option<JsonRpcResponse> {
        if self.notification {
            None
        } else {
            Some(JsonRpcResponse::failure(self.id, self.error))
        }
    }
}

/// Decode one raw message into a request or notification.
pub fn decode(raw: &str) -> std::result::Result<IncomingMessage, EnvelopeError> {
    let value: Value = serde_json::from_str(raw).map_err(|e| {
        debug!("Failed to parse message: {}", e);
        EnvelopeError::parse()
    })?;

    let Value::Object(mut object) = value else {
        return Err(EnvelopeError::invalid(
            RequestId::Null,
            false,
            "message must be a JSON object",
        ));
    };

    let notification = !object.contains_key("id");
    let id = match object.remove("id") {
        None => RequestId::Null,
        Some(raw_id) => serde_json::from_value::<RequestId>(raw_id).map_err(|_| {
            EnvelopeError::invalid(
                RequestId::Null,
                false,
                "id must be a string, a number or null",
            )
        })?,
    };

    if object.get("jsonrpc").and_then(Value::as_str) != Some(JSONRPC_VERSION) {
        return Err(EnvelopeError::invalid(
            id,
            notification,
            "jsonrpc must be \"2.0\"",
        ));
    }

    let method = match object.remove("method") {
        Some(Value::String(method)) => method,
        _ => {
            return Err(EnvelopeError::invalid(
                id,
                notification,
                "method must be a string",
            ))
        }
    };

    let params = match object.remove("params") {
        None | Some(Value::Null) => None,
        Some(params @ (Value::Object(_) | Value::Array(_))) => Some(params),
        Some(_) => {
            return Err(EnvelopeError::invalid(
                id,
                notification,
                "params must be an object or an array",
            ))
        }
    };

    let jsonrpc = JSONRPC_VERSION.to_string();
    Ok(if notification {
        IncomingMessage::Notification(JsonRpcNotification {
            jsonrpc,
            method,
            params,
        })
    } else {
        IncomingMessage::Request(JsonRpcRequest {
            jsonrpc,
            id,
            method,
            params,
        })
    })
}

/// Encode a response as a single line of JSON.
pub fn encode(response: &JsonRpcResponse) -> String {
    match serde_json::to_string(response) {
        Ok(line) => line,
        Err(e) => {
            let fallback = JsonRpcResponse::failure(
                response.id.clone(),
                JsonRpcError::new(error_codes::INTERNAL_ERROR, e.to_string()),
            );
            serde_json::to_string(&fallback).unwrap_or_else(|_| {
                r#"{"jsonrpc":"2.0","id":null,"error":{"code":-32603,"message":"Internal error"}}"#
                    .to_string()
            })
        }
    }
}

/// Whether a raw body is a JSON-RPC request, i.e. an object with an `id` member.
pub fn is_request(raw: &str) -> bool {
    serde_json::from_str::<Map<String, Value>>(raw)
        .map(|object| object.contains_key("id"))
        .unwrap_or(false)
}
