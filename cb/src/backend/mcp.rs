//! MCP client over a child process's stdio

use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::rpc::RpcChannel;
use super::{BackendError, RemoteCallResult, RemoteToolSpec, ToolBackend};
use crate::config::BackendConfig;

const PROTOCOL_VERSION: &str = "2024-11-05";

/// How long shutdown waits for the child to exit after kill
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

struct Connection {
    rpc: Arc<RpcChannel>,
    child: Option<Child>,
    initialized: bool,
}

/// MCP tool backend
///
/// The process is launched lazily by `start` and relaunched by the next
/// `start` after it dies or is shut down.
pub struct McpClient {
    config: BackendConfig,
    env: Vec<(String, String)>,
    state: Mutex<Option<Connection>>,
}

impl McpClient {
    pub fn new(config: BackendConfig) -> Self {
        debug!(command = %config.command, args = ?config.args, "McpClient::new: called");
        Self {
            config,
            env: Vec::new(),
            state: Mutex::new(None),
        }
    }

    /// Extra environment for the child process (the LLM credential)
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Client over an existing byte stream pair instead of a process
    pub(crate) fn from_io<R, W>(reader: R, writer: W, timeout: Duration) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let config = BackendConfig {
            command: String::new(),
            args: vec![],
            timeout_secs: timeout.as_secs().max(1),
            ..Default::default()
        };
        Self {
            config,
            env: Vec::new(),
            state: Mutex::new(Some(Connection {
                rpc: Arc::new(RpcChannel::spawn(reader, writer, timeout)),
                child: None,
                initialized: false,
            })),
        }
    }

    fn spawn_process(&self) -> Result<Connection, BackendError> {
        info!(command = %self.config.command, "McpClient::spawn_process: launching tool backend");
        let spawn_error = |message: String| BackendError::Spawn {
            command: self.config.command.clone(),
            message,
        };
        if self.config.command.is_empty() {
            return Err(spawn_error("no command configured".to_string()));
        }

        let mut command = Command::new(&self.config.command);
        command
            .args(&self.config.args)
            .envs(self.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = command.spawn().map_err(|e| spawn_error(e.to_string()))?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| spawn_error("stdin was not captured".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| spawn_error("stdout was not captured".to_string()))?;
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    debug!(target: "connector_builder::backend::stderr", "{}", line);
                }
            });
        }

        Ok(Connection {
            rpc: Arc::new(RpcChannel::spawn(stdout, stdin, self.config.timeout())),
            child: Some(child),
            initialized: false,
        })
    }

    async fn handshake(rpc: &RpcChannel) -> Result<(), BackendError> {
        debug!("McpClient::handshake: called");
        let result = rpc
            .request(
                "initialize",
                json!({
                    "protocolVersion": PROTOCOL_VERSION,
                    "capabilities": {},
                    "clientInfo": {
                        "name": "connector-builder",
                        "version": env!("CARGO_PKG_VERSION"),
                    },
                }),
            )
            .await?;

        match result.get("protocolVersion").and_then(Value::as_str) {
            Some(version) => debug!(%version, "McpClient::handshake: server protocol"),
            None => warn!("McpClient::handshake: initialize result has no protocolVersion"),
        }
        rpc.notify("notifications/initialized", json!({}))
    }

    async fn channel(&self) -> Result<Arc<RpcChannel>, BackendError> {
        let state = self.state.lock().await;
        match state.as_ref() {
            Some(conn) if conn.initialized && !conn.rpc.is_closed() => Ok(conn.rpc.clone()),
            Some(conn) if conn.rpc.is_closed() => Err(BackendError::Closed),
            _ => Err(BackendError::NotStarted),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ToolsPage {
    #[serde(default)]
    tools: Vec<RemoteToolSpec>,
    #[serde(rename = "nextCursor", default)]
    next_cursor: Option<String>,
}

/// Flatten a `tools/call` result into text
fn parse_call_result(value: &Value) -> RemoteCallResult {
    let is_error = value.get("isError").and_then(Value::as_bool).unwrap_or(false);
    let parts: Vec<String> = value
        .get("content")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .map(|item| match item.get("type").and_then(Value::as_str) {
                    Some("text") => item.get("text").and_then(Value::as_str).unwrap_or_default().to_string(),
                    _ => item.to_string(),
                })
                .collect()
        })
        .unwrap_or_default();

    let content = if parts.is_empty() {
        value
            .get("structuredContent")
            .map(Value::to_string)
            .unwrap_or_default()
    } else {
        parts.join("\n")
    };

    RemoteCallResult { content, is_error }
}

#[async_trait]
impl ToolBackend for McpClient {
    async fn start(&self) -> Result<(), BackendError> {
        debug!("McpClient::start: called");
        let mut state = self.state.lock().await;

        let reusable = state.as_ref().is_some_and(|conn| !conn.rpc.is_closed());
        if !reusable {
            if let Some(old) = state.take() {
                debug!("McpClient::start: previous connection closed, relaunching");
                old.rpc.close().await;
            }
            *state = Some(self.spawn_process()?);
        }

        let Some(conn) = state.as_mut() else {
            return Err(BackendError::NotStarted);
        };
        if !conn.initialized {
            Self::handshake(&conn.rpc).await?;
            conn.initialized = true;
            info!("McpClient::start: tool backend ready");
        }
        Ok(())
    }

    async fn list_tools(&self) -> Result<Vec<RemoteToolSpec>, BackendError> {
        debug!("McpClient::list_tools: called");
        let rpc = self.channel().await?;
        let mut tools = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let params = match &cursor {
                Some(c) => json!({ "cursor": c }),
                None => json!({}),
            };
            let result = rpc.request("tools/list", params).await?;
            let page: ToolsPage =
                serde_json::from_value(result).map_err(|e| BackendError::Protocol(format!("tools/list: {}", e)))?;
            tools.extend(page.tools);
            match page.next_cursor {
                Some(next) if !next.is_empty() => cursor = Some(next),
                _ => break,
            }
        }

        debug!(count = tools.len(), "McpClient::list_tools: done");
        Ok(tools)
    }

    async fn call_tool(&self, name: &str, arguments: Value) -> Result<RemoteCallResult, BackendError> {
        debug!(%name, "McpClient::call_tool: called");
        let rpc = self.channel().await?;
        let result = rpc
            .request("tools/call", json!({ "name": name, "arguments": arguments }))
            .await?;
        Ok(parse_call_result(&result))
    }

    async fn shutdown(&self) {
        debug!("McpClient::shutdown: called");
        let Some(mut conn) = self.state.lock().await.take() else {
            return;
        };
        conn.rpc.close().await;
        if let Some(child) = conn.child.as_mut() {
            if let Err(e) = child.start_kill() {
                debug!(error = %e, "McpClient::shutdown: kill failed (already exited?)");
            }
            if tokio::time::timeout(SHUTDOWN_GRACE, child.wait()).await.is_err() {
                warn!("McpClient::shutdown: backend did not exit in time");
            }
        }
        info!("McpClient::shutdown: tool backend stopped");
    }
}
