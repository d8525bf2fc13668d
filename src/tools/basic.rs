//! Basic tools: echo, misezan and delay_response.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

use crate::error::Result;
use crate::mcp::handler::{get_optional_number_arg, get_optional_string_arg, ToolHandler};
use crate::mcp::protocol::Tool;

/// Echo tool.
pub struct EchoTool;

impl EchoTool {
    pub fn new() -> Self {
        Self
    }
}

impl Default for EchoTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ToolHandler for EchoTool {
    fn definition(&self) -> Tool {
        Tool {
            name: "echo".to_string(),
            description: "Echo input messages (test tool)".to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "message": {
                        "type": "string",
                        "description": "Message to echo"
                    }
                },
                "required": ["message"]
            }),
        }
    }

    async fn execute(&self, args: HashMap<String, Value>) -> Result<String> {
        let message = match args.get("message") {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Null) | None => "No message provided".to_string(),
            Some(other) => other.to_string(),
        };
        Ok(format!("Echo: {}", message))
    }
}

/// Misezan (見せ算) tool: the absolute difference of two numbers.
pub struct MisezanTool;

impl MisezanTool {
    pub fn new() -> Self {
        Self
    }
}

impl Default for MisezanTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ToolHandler for MisezanTool {
    fn definition(&self) -> Tool {
        Tool {
            name: "misezan".to_string(),
            description: "Saya-Ka's 見せ算 (fifth arithmetic operation)".to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "a": {
                        "type": "number",
                        "description": "First number"
                    },
                    "b": {
                        "type": "number",
                        "description": "Second number"
                    }
                },
                "required": ["a", "b"]
            }),
        }
    }

    async fn execute(&self, args: HashMap<String, Value>) -> Result<String> {
        let a = get_optional_number_arg(&args, "a")?.unwrap_or(0.0);
        let b = get_optional_number_arg(&args, "b")?.unwrap_or(0.0);
        let result = a.max(b) - a.min(b);
        Ok(format!("見せ算: {} 見せ算 {} = {}", a, b, result))
    }
}

/// Delayed response tool.
pub struct DelayResponseTool;

impl DelayResponseTool {
    pub const MIN_SECONDS: u64 = 1;
    pub const MAX_SECONDS: u64 = 60;

    pub fn new() -> Self {
        Self
    }
}

impl Default for DelayResponseTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ToolHandler for DelayResponseTool {
    fn definition(&self) -> Tool {
        Tool {
            name: "delay_response".to_string(),
            description: "Real-time delayed response (1-60 seconds)".to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "seconds": {
                        "type": "number",
                        "description": "Delay in seconds (1-60)"
                    },
                    "message": {
                        "type": "string",
                        "description": "Message to return after delay"
                    }
                },
                "required": ["seconds"]
            }),
        }
    }

    async fn execute(&self, args: HashMap<String, Value>) -> Result<String> {
        let requested =
            get_optional_number_arg(&args, "seconds")?.unwrap_or(Self::MIN_SECONDS as f64);
        let seconds = (requested.round().max(0.0) as u64).clamp(Self::MIN_SECONDS, Self::MAX_SECONDS);
        let message =
            get_optional_string_arg(&args, "message").unwrap_or_else(|| "Delay completed".to_string());

        debug!("delay_response sleeping for {}s", seconds);
        tokio::time::sleep(Duration::from_secs(seconds)).await;

        Ok(format!("Delayed {} seconds: {}", seconds, message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use serde_json::json;

    fn args(value: Value) -> HashMap<String, Value> {
        serde_json::from_value(value).unwrap()
    }

    #[tokio::test]
    async fn test_echo() {
        let tool = EchoTool::new();
        assert_eq!(
            tool.execute(args(json!({"message": "hello"}))).await.unwrap(),
            "Echo: hello"
        );
        assert_eq!(
            tool.execute(HashMap::new()).await.unwrap(),
            "Echo: No message provided"
        );
    }

    #[tokio::test]
    async fn test_misezan() {
        let tool = MisezanTool::new();
        assert_eq!(
            tool.execute(args(json!({"a": 3, "b": 10}))).await.unwrap(),
            "見せ算: 3 見せ算 10 = 7"
        );
        assert_eq!(
            tool.execute(args(json!({"a": 2.5, "b": "1"}))).await.unwrap(),
            "見せ算: 2.5 見せ算 1 = 1.5"
        );
    }

    #[tokio::test]
    async fn test_misezan_missing_operand_is_zero() {
        let tool = MisezanTool::new();
        assert_eq!(
            tool.execute(args(json!({"a": -4}))).await.unwrap(),
            "見せ算: -4 見せ算 0 = 4"
        );
    }

    #[tokio::test]
    async fn test_misezan_rejects_non_numbers() {
        let tool = MisezanTool::new();
        let err = tool
            .execute(args(json!({"a": "three", "b": 1})))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidToolArguments(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_delay_response() {
        let tool = DelayResponseTool::new();
        let text = tool
            .execute(args(json!({"seconds": 2, "message": "done"})))
            .await
            .unwrap();
        assert_eq!(text, "Delayed 2 seconds: done");
    }

    #[tokio::test(start_paused = true)]
    async fn test_delay_response_clamps() {
        let tool = DelayResponseTool::new();

        let start = tokio::time::Instant::now();
        let text = tool.execute(args(json!({"seconds": 600}))).await.unwrap();
        assert_eq!(text, "Delayed 60 seconds: Delay completed");
        assert!(start.elapsed() >= Duration::from_secs(60));

        let text = tool.execute(args(json!({"seconds": 0}))).await.unwrap();
        assert_eq!(text, "Delayed 1 seconds: Delay completed");
    }
}
