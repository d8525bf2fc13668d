//! Configuration management for the MCP capability server.

use clap::Parser;
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::time::Duration;

use crate::error::{Error, Result};

/// Command-line arguments for the server.
#[derive(Parser, Debug, Clone)]
#[command(name = "mcp-capability-server")]
#[command(author = "MCP Capability Server Team")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "MCP server exposing tools and resources over stdio or streamable HTTP")]
#[command(disable_help_flag = true)]
pub struct Args {
    /// Transport mode: stdio or http
    #[arg(short, long, default_value = "stdio", env = "MCP_TRANSPORT")]
    pub transport: Transport,

    /// Host to bind (http transport only)
    #[arg(short = 'h', long, default_value = "localhost", env = "MCP_HOST")]
    pub host: String,

    /// Port to bind (http transport only)
    #[arg(short, long, default_value = "8080", env = "MCP_PORT")]
    pub port: u16,

    /// Endpoint path (http transport only)
    #[arg(long, default_value = "/mcp", env = "MCP_PATH")]
    pub path: String,

    /// Seconds between SSE keep-alive pings
    #[arg(long, default_value = "30", env = "MCP_KEEP_ALIVE_SECS")]
    pub keep_alive_secs: u64,

    /// Enable debug logging
    #[arg(short, long, env = "MCP_DEBUG")]
    pub debug: bool,

    /// Print help
    #[arg(long, action = clap::ArgAction::Help)]
    pub help: Option<bool>,
}

/// Transport mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    #[default]
    Stdio,
    Http,
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Transport mode
    pub transport: Transport,
    /// HTTP bind host
    pub host: String,
    /// HTTP port
    pub port: u16,
    /// HTTP endpoint path, always with a leading and no trailing slash
    pub path: String,
    /// SSE keep-alive interval in seconds
    pub keep_alive_secs: u64,
    /// Debug mode
    pub debug: bool,
}

impl Config {
    /// `host:port` suitable for binding a listener.
    pub fn bind_address(&self) -> String {
        if self.host.contains(':') && !self.host.starts_with('[') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }

    pub fn keep_alive(&self) -> Duration {
        Duration::from_secs(self.keep_alive_secs)
    }

    /// Reject settings the transports cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(Error::Config("host must not be empty".to_string()));
        }
        if self.keep_alive_secs == 0 {
            return Err(Error::Config(
                "keep-alive interval must be at least one second".to_string(),
            ));
        }
        Ok(())
    }
}

impl From<Args> for Config {
    fn from(args: Args) -> Self {
        Self {
            transport: args.transport,
            host: args.host.trim().to_string(),
            port: args.port,
            path: normalize_path(&args.path),
            keep_alive_secs: args.keep_alive_secs,
            debug: args.debug,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            transport: Transport::Stdio,
            host: "localhost".to_string(),
            port: 8080,
            path: "/mcp".to_string(),
            keep_alive_secs: 30,
            debug: false,
        }
    }
}

/// `localhost`, or any literal loopback IP such as `127.0.0.1` or `::1`.
pub fn is_loopback_host(host: &str) -> bool {
    let host = host.trim_start_matches('[').trim_end_matches(']');
    host.eq_ignore_ascii_case("localhost")
        || host
            .parse::<IpAddr>()
            .map(|ip| ip.is_loopback())
            .unwrap_or(false)
}

fn normalize_path(path: &str) -> String {
    let trimmed = path.trim().trim_matches('/');
    format!("/{}", trimmed)
}
