//! MCP server implementation: lifecycle state and method dispatch.

use futures::FutureExt;
use serde_json::Value;
use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::mcp::handler::McpHandler;
use crate::mcp::protocol::*;
use crate::metrics::{Metrics, Timer};
use crate::VERSION;

/// MCP server.
///
/// Holds the immutable capability registry and the process-wide
/// initialized flag. Every entry point takes `&self`, so one instance behind
/// an `Arc` serves any number of concurrent transport workers.
pub struct McpServer {
    handler: Arc<McpHandler>,
    name: String,
    version: String,
    initialized: AtomicBool,
    metrics: Arc<Metrics>,
}

impl McpServer {
    /// Create a new MCP server.
    pub fn new(handler: McpHandler, name: impl Into<String>) -> Self {
        Self {
            handler: Arc::new(handler),
            name: name.into(),
            version: VERSION.to_string(),
            initialized: AtomicBool::new(false),
            metrics: Metrics::new(),
        }
    }

    /// Share an existing metrics collector.
    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the client has sent the `initialized` notification.
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    fn mark_initialized(&self) {
        if !self.initialized.swap(true, Ordering::AcqRel) {
            info!("Client initialized");
        }
    }

    /// Decode, dispatch and encode one raw message.
    ///
    /// Returns the encoded response line, or `None` when nothing must be
    /// sent back (notifications, including malformed ones).
    pub async fn handle_message(&self, raw: &str) -> Option<String> {
        match decode(raw) {
            Ok(IncomingMessage::Request(req)) => Some(encode(&self.handle_request(req).await)),
            Ok(IncomingMessage::Notification(notif)) => {
                self.handle_notification(notif).await;
                None
            }
            Err(envelope) => {
                warn!(
                    "Rejected message: {} ({})",
                    envelope.error.message, envelope.error.code
                );
                if envelope.notification {
                    self.metrics.inc_notifications();
                } else {
                    self.metrics.inc_requests();
                    self.metrics.inc_failed();
                }
                envelope.into_response().map(|response| encode(&response))
            }
        }
    }

    /// Handle a JSON-RPC request.
    pub async fn handle_request(&self, req: JsonRpcRequest) -> JsonRpcResponse {
        debug!("Handling request: {} (id: {:?})", req.method, req.id);
        self.metrics.inc_requests();
        let timer = Timer::start();

        let result = self.dispatch(&req.method, req.params).await;
        debug!("{} finished in {}ms", req.method, timer.elapsed_ms());

        match result {
            Ok(value) => {
                self.metrics.inc_success();
                JsonRpcResponse::success(req.id, value)
            }
            Err(e) => {
                self.metrics.inc_failed();
                debug!("Request {} failed: {}", req.method, e);
                JsonRpcResponse::failure(req.id, JsonRpcError::from(&e))
            }
        }
    }

    /// Handle a notification. Failures are logged, never answered.
    pub async fn handle_notification(&self, notif: JsonRpcNotification) {
        debug!("Handling notification: {}", notif.method);
        self.metrics.inc_notifications();

        match notif.method.as_str() {
            "initialized" | "notifications/initialized" => self.mark_initialized(),
            "notifications/cancelled" => {
                info!("Client cancelled a request: {:?}", notif.params);
            }
            method if method.starts_with("notifications/") => {
                debug!("Ignoring notification: {}", method);
            }
            method => {
                if let Err(e) = self.dispatch(method, notif.params).await {
                    warn!("Notification {} failed: {}", method, e);
                }
            }
        }
    }

    async fn dispatch(&self, method: &str, params: Option<Value>) -> Result<Value> {
        match method {
            "initialize" => return self.handle_initialize(params),
            "initialized" | "notifications/initialized" => {
                self.mark_initialized();
                return Ok(serde_json::json!({}));
            }
            _ => {}
        }

        if !self.is_initialized() {
            return Err(Error::NotInitialized);
        }

        match method {
            "tools/list" => self.handle_list_tools(),
            "tools/call" => self.handle_call_tool(params).await,
            "resources/list" => self.handle_list_resources(),
            "resources/read" => self.handle_read_resource(params).await,
            _ => Err(Error::MethodNotFound(method.to_string())),
        }
    }

    /// Handle initialize request.
    fn handle_initialize(&self, params: Option<Value>) -> Result<Value> {
        if let Some(client) = params
            .as_ref()
            .and_then(|p| p.get("clientInfo"))
            .and_then(|c| c.get("name"))
            .and_then(Value::as_str)
        {
            info!("Initialize from client: {}", client);
        }

        let result = InitializeResult {
            protocol_version: MCP_VERSION.to_string(),
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability::default()),
                resources: Some(ResourcesCapability::default()),
            },
            server_info: ServerInfo {
                name: self.name.clone(),
                version: self.version.clone(),
            },
        };

        Ok(serde_json::to_value(result)?)
    }

    /// Handle list tools request.
    fn handle_list_tools(&self) -> Result<Value> {
        let tools = self.handler.list_tools();
        Ok(serde_json::to_value(ListToolsResult { tools })?)
    }

    /// Handle call tool request.
    async fn handle_call_tool(&self, params: Option<Value>) -> Result<Value> {
        let params = params.unwrap_or(Value::Null);

        let name = params
            .get("name")
            .and_then(Value::as_str)
            .filter(|name| !name.is_empty())
            .ok_or_else(|| Error::InvalidParams("Tool name is required".to_string()))?;

        let tool = self
            .handler
            .get_tool(name)
            .ok_or_else(|| Error::ToolNotFound(name.to_string()))?;

        let arguments: HashMap<String, Value> = match params.get("arguments") {
            None | Some(Value::Null) => HashMap::new(),
            Some(Value::Object(map)) => map.clone().into_iter().collect(),
            Some(_) => {
                return Err(Error::InvalidParams(
                    "Tool arguments must be an object".to_string(),
                ))
            }
        };

        self.metrics.inc_tool_calls();
        let timer = Timer::start();
        let outcome = AssertUnwindSafe(tool.execute(arguments))
            .catch_unwind()
            .await;
        debug!("Tool {} ran for {}ms", name, timer.elapsed_ms());

        let text = match outcome {
            Ok(Ok(text)) => text,
            Ok(Err(e)) => return Err(Error::ToolExecutionFailed(e.to_string())),
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                warn!("Tool {} panicked: {}", name, message);
                return Err(Error::ToolExecutionFailed(message));
            }
        };

        Ok(serde_json::to_value(ToolResult::text(text))?)
    }

    /// Handle list resources request.
    fn handle_list_resources(&self) -> Result<Value> {
        let resources = self.handler.list_resources();
        Ok(serde_json::to_value(ListResourcesResult { resources })?)
    }

    /// Handle read resource request.
    async fn handle_read_resource(&self, params: Option<Value>) -> Result<Value> {
        let uri = params
            .as_ref()
            .and_then(|p| p.get("uri"))
            .and_then(Value::as_str)
            .filter(|uri| !uri.is_empty())
            .ok_or_else(|| Error::InvalidParams("Resource URI is required".to_string()))?;

        let resource = self
            .handler
            .get_resource(uri)
            .ok_or_else(|| Error::ResourceNotFound(uri.to_string()))?;

        self.metrics.inc_resource_reads();
        let outcome = AssertUnwindSafe(resource.read()).catch_unwind().await;

        let text = match outcome {
            Ok(Ok(text)) => text,
            Ok(Err(e)) => return Err(Error::ResourceReadFailed(e.to_string())),
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                warn!("Resource {} panicked: {}", uri, message);
                return Err(Error::ResourceReadFailed(message));
            }
        };

        let definition = resource.definition();
        let result = ReadResourceResult {
            contents: vec![ResourceContents {
                uri: definition.uri,
                mime_type: definition.mime_type,
                text,
            }],
        };
        Ok(serde_json::to_value(result)?)
    }
}

/// Best-effort text of a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "capability panicked".to_string()
    }
}
