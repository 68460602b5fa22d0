//! External tool backend
//!
//! The backend is a child process that offers named tools over MCP (JSON-RPC
//! 2.0 on stdio). The agent only sees it through the [`ToolBackend`] trait.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

pub mod injection;
mod mcp;
mod rpc;

pub use mcp::McpClient;

/// Backend failures; any of these aborts the current turn
#[derive(Debug, Clone, Error)]
pub enum BackendError {
    #[error("Failed to start tool backend `{command}`: {message}")]
    Spawn { command: String, message: String },

    #[error("Tool backend is not running")]
    NotStarted,

    #[error("Tool backend connection closed")]
    Closed,

    #[error("Tool backend request '{method}' timed out after {after:?}")]
    Timeout { method: String, after: Duration },

    #[error("Tool backend error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("Tool backend protocol error: {0}")]
    Protocol(String),
}

/// A remote tool as advertised by the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteToolSpec {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "inputSchema", default = "empty_schema")]
    pub input_schema: Value,
}

fn empty_schema() -> Value {
    serde_json::json!({ "type": "object", "properties": {} })
}

/// Outcome of a remote tool call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteCallResult {
    pub content: String,
    pub is_error: bool,
}

/// Provider of remote tools
#[async_trait]
pub trait ToolBackend: Send + Sync {
    /// Connect and handshake; idempotent
    async fn start(&self) -> Result<(), BackendError>;

    /// Advertised tools
    async fn list_tools(&self) -> Result<Vec<RemoteToolSpec>, BackendError>;

    /// Invoke a tool with JSON arguments
    async fn call_tool(&self, name: &str, arguments: Value) -> Result<RemoteCallResult, BackendError>;

    /// Close the connection and stop the process; safe to call repeatedly
    async fn shutdown(&self);
}
