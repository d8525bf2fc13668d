//! Capability contracts and the tool/resource registry.
//!
//! The registry is filled once at startup and then moved into the
//! [`McpServer`](crate::mcp::server::McpServer); after that it is only read,
//! so lookups need no locking.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::warn;

use crate::error::{Error, Result};
use crate::mcp::protocol::{Resource, Tool};

/// Handler for MCP tool calls.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    /// Get the tool definition.
    fn definition(&self) -> Tool;

    /// Execute the tool with the given arguments, returning its textual output.
    async fn execute(&self, arguments: HashMap<String, Value>) -> Result<String>;
}

/// Handler for MCP resource reads.
#[async_trait]
pub trait ResourceHandler: Send + Sync {
    /// Get the resource definition.
    fn definition(&self) -> Resource;

    /// Read the resource's current contents.
    async fn read(&self) -> Result<String>;
}

/// Registry of tool and resource handlers.
pub struct McpHandler {
    tools: BTreeMap<String, Arc<dyn ToolHandler>>,
    resources: BTreeMap<String, Arc<dyn ResourceHandler>>,
}

impl McpHandler {
    /// Create a new, empty registry.
    pub fn new() -> Self {
        Self {
            tools: BTreeMap::new(),
            resources: BTreeMap::new(),
        }
    }

    /// Register a tool handler. A later registration under the same name wins.
    pub fn register<T: ToolHandler + 'static>(&mut self, handler: T) {
        self.register_arc(Arc::new(handler));
    }

    /// Register a tool handler (Arc version).
    pub fn register_arc(&mut self, handler: Arc<dyn ToolHandler>) {
        let tool = handler.definition();
        if self.tools.insert(tool.name.clone(), handler).is_some() {
            warn!("Tool '{}' registered twice, keeping the latest", tool.name);
        }
    }

    /// Register a resource handler. A later registration under the same URI wins.
    pub fn register_resource<R: ResourceHandler + 'static>(&mut self, handler: R) {
        let resource = handler.definition();
        if self
            .resources
            .insert(resource.uri.clone(), Arc::new(handler))
            .is_some()
        {
            warn!(
                "Resource '{}' registered twice, keeping the latest",
                resource.uri
            );
        }
    }

    /// Get all registered tools.
    pub fn list_tools(&self) -> Vec<Tool> {
        self.tools.values().map(|h| h.definition()).collect()
    }

    /// Get a tool by name.
    pub fn get_tool(&self, name: &str) -> Option<Arc<dyn ToolHandler>> {
        self.tools.get(name).cloned()
    }

    /// Check if a tool exists.
    pub fn has_tool(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Get the number of registered tools.
    pub fn tool_count(&self) -> usize {
        self.tools.len()
    }

    /// Get all registered resources.
    pub fn list_resources(&self) -> Vec<Resource> {
        self.resources.values().map(|h| h.definition()).collect()
    }

    /// Get a resource by URI.
    pub fn get_resource(&self, uri: &str) -> Option<Arc<dyn ResourceHandler>> {
        self.resources.get(uri).cloned()
    }

    /// Get the number of registered resources.
    pub fn resource_count(&self) -> usize {
        self.resources.len()
    }
}

impl Default for McpHandler {
    fn default() -> Self {
        Self::new()
    }
}

/// Helper to extract an optional string argument.
pub fn get_optional_string_arg(args: &HashMap<String, Value>, name: &str) -> Option<String> {
    args.get(name).and_then(|v| v.as_str()).map(String::from)
}

/// Helper to extract an optional number argument. Numeric strings are
/// accepted; anything else present is an argument error.
pub fn get_optional_number_arg(args: &HashMap<String, Value>, name: &str) -> Result<Option<f64>> {
    match args.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_f64()
            .map(Some)
            .ok_or_else(|| Error::InvalidToolArguments(format!("{} is out of range", name))),
        Some(Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(|_| Error::InvalidToolArguments(format!("{} must be a number", name))),
        Some(_) => Err(Error::InvalidToolArguments(format!(
            "{} must be a number",
            name
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct TestTool {
        name: String,
    }

    #[async_trait]
    impl ToolHandler for TestTool {
        fn definition(&self) -> Tool {
            Tool {
                name: self.name.clone(),
                description: format!("Test tool: {}", self.name),
                input_schema: json!({
                    "type": "object",
                    "properties": { "input": { "type": "string" } }
                }),
            }
        }

        async fn execute(&self, args: HashMap<String, Value>) -> Result<String> {
            let input = get_optional_string_arg(&args, "input").unwrap_or_default();
            Ok(format!("Executed {} with: {}", self.name, input))
        }
    }

    struct TestResource;

    #[async_trait]
    impl ResourceHandler for TestResource {
        fn definition(&self) -> Resource {
            Resource {
                uri: "test://resource".to_string(),
                name: "Test".to_string(),
                description: "A test resource".to_string(),
                mime_type: "text/plain".to_string(),
            }
        }

        async fn read(&self) -> Result<String> {
            Ok("contents".to_string())
        }
    }

    #[test]
    fn test_handler_registration() {
        let mut handler = McpHandler::new();
        handler.register(TestTool {
            name: "test_tool".to_string(),
        });

        assert_eq!(handler.tool_count(), 1);
        assert!(handler.has_tool("test_tool"));
        assert!(!handler.has_tool("nonexistent"));
    }

    #[test]
    fn test_duplicate_registration_replaces() {
        let mut handler = McpHandler::new();
        handler.register(TestTool {
            name: "dup".to_string(),
        });
        handler.register(TestTool {
            name: "dup".to_string(),
        });

        assert_eq!(handler.tool_count(), 1);
    }

    #[test]
    fn test_handler_list_tools() {
        let mut handler = McpHandler::new();
        handler.register(TestTool {
            name: "tool_b".to_string(),
        });
        handler.register(TestTool {
            name: "tool_a".to_string(),
        });

        let names: Vec<_> = handler.list_tools().into_iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["tool_a", "tool_b"]);
    }

    #[tokio::test]
    async fn test_tool_execution() {
        let mut handler = McpHandler::new();
        handler.register(TestTool {
            name: "echo".to_string(),
        });

        let tool = handler.get_tool("echo").unwrap();
        let mut args = HashMap::new();
        args.insert("input".to_string(), json!("hello"));

        let text = tool.execute(args).await.unwrap();
        assert_eq!(text, "Executed echo with: hello");
    }

    #[tokio::test]
    async fn test_resource_registration_and_read() {
        let mut handler = McpHandler::new();
        handler.register_resource(TestResource);

        assert_eq!(handler.resource_count(), 1);
        assert_eq!(handler.list_resources()[0].uri, "test://resource");

        let resource = handler.get_resource("test://resource").unwrap();
        assert_eq!(resource.read().await.unwrap(), "contents");
        assert!(handler.get_resource("test://missing").is_none());
    }

    #[test]
    fn test_get_optional_string_arg() {
        let mut args = HashMap::new();
        args.insert("name".to_string(), json!("value"));

        assert_eq!(
            get_optional_string_arg(&args, "name"),
            Some("value".to_string())
        );
        assert_eq!(get_optional_string_arg(&args, "missing"), None);
    }

    #[test]
    fn test_get_optional_number_arg() {
        let mut args = HashMap::new();
        args.insert("a".to_string(), json!(4.5));
        args.insert("b".to_string(), json!(" 7 "));
        args.insert("c".to_string(), json!("seven"));
        args.insert("d".to_string(), json!(null));
        args.insert("e".to_string(), json!([1]));

        assert_eq!(get_optional_number_arg(&args, "a").unwrap(), Some(4.5));
        assert_eq!(get_optional_number_arg(&args, "b").unwrap(), Some(7.0));
        assert!(get_optional_number_arg(&args, "c").is_err());
        assert_eq!(get_optional_number_arg(&args, "d").unwrap(), None);
        assert!(get_optional_number_arg(&args, "e").is_err());
        assert_eq!(get_optional_number_arg(&args, "missing").unwrap(), None);
    }
}
