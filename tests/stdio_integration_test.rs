//! Stdio Integration Tests
//!
//! These tests spawn the server binary and talk JSON-RPC to it over
//! stdin/stdout, one message per line.

#![allow(deprecated)] // Allow deprecated cargo_bin for now

use assert_cmd::cargo::CommandCargoExt;
use assert_cmd::Command as AssertCommand;
use predicates::prelude::*;
use serde_json::{json, Value};
use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::time::{Duration, Instant};

const BIN: &str = "mcp-capability-server";

/// MCP Test Client that communicates with the server via stdio
struct McpTestClient {
    child: Child,
    stdin: Option<ChildStdin>,
    stdout: BufReader<ChildStdout>,
    request_id: i64,
}

impl McpTestClient {
    /// Spawn a new MCP server and connect to it
    fn spawn() -> Result<Self, Box<dyn std::error::Error>> {
        let mut child = Command::cargo_bin(BIN)?
            .arg("--transport")
            .arg("stdio")
            .env("RUST_LOG", "warn")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()?;

        let stdin = child.stdin.take().expect("Failed to get stdin");
        let stdout = BufReader::new(child.stdout.take().expect("Failed to get stdout"));

        Ok(Self {
            child,
            stdin: Some(stdin),
            stdout,
            request_id: 0,
        })
    }

    fn send_line(&mut self, line: &str) -> Result<(), Box<dyn std::error::Error>> {
        let stdin = self.stdin.as_mut().expect("stdin already closed");
        writeln!(stdin, "{}", line)?;
        stdin.flush()?;
        Ok(())
    }

    fn read_response(&mut self) -> Result<Value, Box<dyn std::error::Error>> {
        let mut response_line = String::new();
        self.stdout.read_line(&mut response_line)?;
        Ok(serde_json::from_str(&response_line)?)
    }

    /// Send a JSON-RPC request and get the response
    fn request(
        &mut self,
        method: &str,
        params: Value,
    ) -> Result<Value, Box<dyn std::error::Error>> {
        self.request_id += 1;
        let request = json!({
            "jsonrpc": "2.0",
            "id": self.request_id,
            "method": method,
            "params": params
        });

        self.send_line(&serde_json::to_string(&request)?)?;
        self.read_response()
    }

    fn notify(&mut self, method: &str) -> Result<(), Box<dyn std::error::Error>> {
        let notification = json!({ "jsonrpc": "2.0", "method": method });
        self.send_line(&serde_json::to_string(&notification)?)
    }

    fn initialize(&mut self) -> Result<Value, Box<dyn std::error::Error>> {
        let response = self.request(
            "initialize",
            json!({
                "protocolVersion": "2024-11-05",
                "capabilities": {},
                "clientInfo": { "name": "test-client", "version": "1.0.0" }
            }),
        )?;
        self.notify("notifications/initialized")?;
        Ok(response)
    }

    fn call_tool(
        &mut self,
        name: &str,
        arguments: Value,
    ) -> Result<Value, Box<dyn std::error::Error>> {
        self.request(
            "tools/call",
            json!({ "name": name, "arguments": arguments }),
        )
    }

    /// Close stdin and wait for the server to exit.
    fn finish(mut self) -> std::process::ExitStatus {
        drop(self.stdin.take());
        self.child.wait().expect("Failed to wait for server")
    }
}

impl Drop for McpTestClient {
    fn drop(&mut self) {
        let _ = self.child.kill();
    }
}

// ============================================================================
// Integration Tests
// ============================================================================

#[test]
fn test_binary_help() {
    AssertCommand::cargo_bin(BIN)
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("MCP server"))
        .stdout(predicate::str::contains("--transport"));
}

#[test]
fn test_binary_version() {
    AssertCommand::cargo_bin(BIN)
        .unwrap()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(BIN));
}

#[test]
fn test_invalid_transport_is_rejected() {
    AssertCommand::cargo_bin(BIN)
        .unwrap()
        .args(["--transport", "carrier-pigeon"])
        .assert()
        .failure();
}

#[test]
fn test_eof_exits_cleanly() {
    AssertCommand::cargo_bin(BIN)
        .unwrap()
        .write_stdin("")
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}

#[test]
fn test_mcp_initialize() {
    let mut client = McpTestClient::spawn().expect("Failed to spawn MCP server");

    let response = client.initialize().expect("Failed to initialize");
    assert_eq!(response["jsonrpc"], "2.0");
    assert_eq!(response["id"], 1);

    let result = &response["result"];
    assert_eq!(result["protocolVersion"], "2024-11-05");
    assert_eq!(result["serverInfo"]["name"], BIN);
    assert!(result["capabilities"]["tools"].is_object());
    assert!(result["capabilities"]["resources"].is_object());

    assert!(client.finish().success());
}

#[test]
fn test_tools_before_initialized_are_rejected() {
    let mut client = McpTestClient::spawn().expect("Failed to spawn MCP server");

    let response = client.request("tools/list", json!({})).unwrap();
    assert_eq!(response["error"]["code"], -32600);
    assert_eq!(response["error"]["message"], "Server not initialized");
}

#[test]
fn test_mcp_list_tools() {
    let mut client = McpTestClient::spawn().expect("Failed to spawn MCP server");
    client.initialize().expect("Failed to initialize");

    // The initialized notification above must not have produced a line, so
    // the next line read belongs to this request.
    let response = client.request("tools/list", json!({})).unwrap();
    assert_eq!(response["id"], 2);

    let tools = response["result"]["tools"]
        .as_array()
        .expect("tools should be array");
    let tool_names: Vec<&str> = tools.iter().filter_map(|t| t["name"].as_str()).collect();
    assert_eq!(
        tool_names,
        vec!["delay_response", "echo", "misezan", "text_analyzer"]
    );
    for tool in tools {
        assert!(tool["description"].is_string());
        assert_eq!(tool["inputSchema"]["type"], "object");
    }
}

#[test]
fn test_mcp_call_echo() {
    let mut client = McpTestClient::spawn().expect("Failed to spawn MCP server");
    client.initialize().expect("Failed to initialize");

    let response = client
        .call_tool("echo", json!({ "message": "hello" }))
        .unwrap();
    assert_eq!(
        response["result"]["content"],
        json!([{ "type": "text", "text": "Echo: hello" }])
    );
}

#[test]
fn test_mcp_call_unknown_tool() {
    let mut client = McpTestClient::spawn().expect("Failed to spawn MCP server");
    client.initialize().expect("Failed to initialize");

    let response = client.call_tool("unknown_tool", json!({})).unwrap();
    assert_eq!(response["error"]["code"], -32602);
    assert_eq!(response["error"]["message"], "Tool not found: unknown_tool");
}

#[test]
fn test_mcp_read_resource() {
    let mut client = McpTestClient::spawn().expect("Failed to spawn MCP server");
    client.initialize().expect("Failed to initialize");

    let listed = client.request("resources/list", json!({})).unwrap();
    let uris: Vec<&str> = listed["result"]["resources"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|r| r["uri"].as_str())
        .collect();
    assert!(uris.contains(&"time://current"));

    let response = client
        .request("resources/read", json!({ "uri": "time://current" }))
        .unwrap();
    let contents = &response["result"]["contents"][0];
    assert_eq!(contents["uri"], "time://current");
    assert_eq!(contents["mimeType"], "text/plain");
    assert_eq!(contents["text"].as_str().unwrap().len(), 19);
}

#[test]
fn test_garbage_line_gets_parse_error() {
    let mut client = McpTestClient::spawn().expect("Failed to spawn MCP server");

    client.send_line("this is not json").unwrap();
    let response = client.read_response().unwrap();
    assert_eq!(response["error"]["code"], -32700);
    assert!(response["id"].is_null());

    // The loop keeps going afterwards.
    let response = client.request("initialize", json!({})).unwrap();
    assert_eq!(response["result"]["protocolVersion"], "2024-11-05");
}

#[test]
fn test_unknown_method() {
    let mut client = McpTestClient::spawn().expect("Failed to spawn MCP server");
    client.initialize().expect("Failed to initialize");

    let response = client.request("prompts/list", json!({})).unwrap();
    assert_eq!(response["error"]["code"], -32601);
    assert_eq!(response["error"]["message"], "Method not found: prompts/list");
}

#[cfg(unix)]
#[test]
fn test_sigint_exits_while_stdin_is_open() {
    let mut client = McpTestClient::spawn().expect("Failed to spawn MCP server");
    // A full round trip means the signal listener is installed.
    client.initialize().expect("Failed to initialize");

    let status = Command::new("kill")
        .arg("-INT")
        .arg(client.child.id().to_string())
        .status()
        .expect("Failed to run kill");
    assert!(status.success());

    // stdin stays open the whole time.
    assert!(client.stdin.is_some());
    let deadline = Instant::now() + Duration::from_secs(10);
    let exit = loop {
        if let Some(exit) = client.child.try_wait().expect("Failed to poll server") {
            break exit;
        }
        assert!(
            Instant::now() < deadline,
            "server still running after SIGINT"
        );
        std::thread::sleep(Duration::from_millis(50));
    };
    assert!(exit.success());
}
