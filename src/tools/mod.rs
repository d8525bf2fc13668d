//! Built-in MCP capabilities.
//!
//! - `basic` - echo, misezan and delay_response (3 tools)
//! - `text` - text_analyzer (1 tool)
//! - `resources` - time://current and server://status (2 resources)

pub mod basic;
pub mod resources;
pub mod text;

use crate::mcp::handler::McpHandler;

/// Register every built-in tool and resource with the handler.
pub fn register_all_tools(handler: &mut McpHandler) {
    // Basic tools (3)
    handler.register(basic::EchoTool::new());
    handler.register(basic::MisezanTool::new());
    handler.register(basic::DelayResponseTool::new());

    // Text tools (1)
    handler.register(text::TextAnalyzerTool::new());

    // Resources (2)
    handler.register_resource(resources::CurrentTimeResource::new());
    handler.register_resource(resources::ServerStatusResource::new());
}
