//! Tools served by the external backend

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

use super::{Tool, ToolContext, ToolError, ToolResult};
use crate::backend::injection::{inject_manifest, is_manifest_tool, rewrite_schema};
use crate::backend::{BackendError, RemoteToolSpec, ToolBackend};

/// One remote tool, proxied through a [`ToolBackend`]
pub struct RemoteTool {
    spec: RemoteToolSpec,
    injects_manifest: bool,
    backend: Arc<dyn ToolBackend>,
}

impl RemoteTool {
    pub fn new(mut spec: RemoteToolSpec, backend: Arc<dyn ToolBackend>) -> Self {
        let injects_manifest = is_manifest_tool(&spec.name);
        if injects_manifest {
            debug!(name = %spec.name, "RemoteTool::new: manifest argument will be injected");
            spec.input_schema = rewrite_schema(spec.input_schema);
        }
        Self {
            spec,
            injects_manifest,
            backend,
        }
    }
}

#[async_trait]
impl Tool for RemoteTool {
    fn name(&self) -> &str {
        &self.spec.name
    }

    fn description(&self) -> &str {
        &self.spec.description
    }

    fn input_schema(&self) -> Value {
        self.spec.input_schema.clone()
    }

    async fn execute(&self, input: Value, ctx: &ToolContext) -> Result<ToolResult, ToolError> {
        debug!(name = %self.spec.name, "RemoteTool::execute: called");
        let arguments = if self.injects_manifest {
            inject_manifest(input, &ctx.manifest().await)
        } else {
            input
        };

        match self.backend.call_tool(&self.spec.name, arguments).await {
            Ok(result) if result.is_error => Ok(ToolResult::error(result.content)),
            Ok(result) => Ok(ToolResult::success(result.content)),
            // The backend answered but refused the call; the agent can adjust
            Err(BackendError::Rpc { code, message }) => {
                debug!(code, %message, "RemoteTool::execute: backend rejected call");
                Ok(ToolResult::error(format!("{} (code {})", message, code)))
            }
            Err(source) => {
                warn!(name = %self.spec.name, error = %source, "RemoteTool::execute: backend failure");
                Err(ToolError::Backend {
                    name: self.spec.name.clone(),
                    source,
                })
            }
        }
    }
}
