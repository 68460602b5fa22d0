//! ToolExecutor - the tool set for one agent

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::backend::{RemoteToolSpec, ToolBackend};
use crate::llm::{ToolCall, ToolDefinition};

use super::builtin::{
    AddTaskTool, GetConnectorMetadataTool, GetFormFieldsTool, GetManifestTextTool, InsertManifestLinesTool,
    InsertTaskTool, ListTasksTool, RemoveTaskTool, ReplaceManifestLinesTool, UpdateFormFieldTool,
    UpdateTaskStatusTool,
};
use super::remote::RemoteTool;
use super::{Tool, ToolContext, ToolError, ToolResult};

/// Manages the tools available to the agent
pub struct ToolExecutor {
    tools: HashMap<String, Box<dyn Tool>>,
}

impl ToolExecutor {
    /// Executor with the session tools
    pub fn builtins() -> Self {
        debug!("ToolExecutor::builtins: called");
        let mut executor = Self::empty();

        // Manifest
        executor.add_tool(Box::new(GetManifestTextTool));
        executor.add_tool(Box::new(InsertManifestLinesTool));
        executor.add_tool(Box::new(ReplaceManifestLinesTool));

        // Requirement metadata
        executor.add_tool(Box::new(GetConnectorMetadataTool));
        executor.add_tool(Box::new(GetFormFieldsTool));
        executor.add_tool(Box::new(UpdateFormFieldTool));

        // Task list
        executor.add_tool(Box::new(ListTasksTool));
        executor.add_tool(Box::new(AddTaskTool));
        executor.add_tool(Box::new(InsertTaskTool));
        executor.add_tool(Box::new(UpdateTaskStatusTool));
        executor.add_tool(Box::new(RemoveTaskTool));

        executor
    }

    /// Create an empty executor (for testing)
    pub fn empty() -> Self {
        Self { tools: HashMap::new() }
    }

    /// Add a tool to the executor
    pub fn add_tool(&mut self, tool: Box<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    /// Register the backend's tools; names already taken by built-ins are skipped
    pub fn add_remote_tools(&mut self, specs: Vec<RemoteToolSpec>, backend: Arc<dyn ToolBackend>) -> usize {
        debug!(count = specs.len(), "ToolExecutor::add_remote_tools: called");
        let mut added = 0;
        for spec in specs {
            if self.tools.contains_key(&spec.name) {
                warn!(name = %spec.name, "ToolExecutor::add_remote_tools: name collides with a built-in, skipping");
                continue;
            }
            self.add_tool(Box::new(RemoteTool::new(spec, backend.clone())));
            added += 1;
        }
        added
    }

    /// Get tool definitions for the LLM, sorted by name
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        debug!("ToolExecutor::definitions: called");
        let mut defs: Vec<ToolDefinition> = self.tools.values().map(|t| definition(t.as_ref())).collect();
        defs.sort_by(|a, b| a.name.cmp(&b.name));
        defs
    }

    /// Execute a tool call
    pub async fn execute(&self, tool_call: &ToolCall, ctx: &ToolContext) -> Result<ToolResult, ToolError> {
        debug!(tool_name = %tool_call.name, tool_id = %tool_call.id, "ToolExecutor::execute: called");
        match self.tools.get(&tool_call.name) {
            Some(tool) => tool.execute(tool_call.input.clone(), ctx).await,
            None => {
                debug!("ToolExecutor::execute: unknown tool");
                Ok(ToolResult::error(format!("Unknown tool: {}", tool_call.name)))
            }
        }
    }

    /// Get tool names, sorted
    pub fn tool_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }
}

impl Default for ToolExecutor {
    fn default() -> Self {
        Self::builtins()
    }
}

fn definition(tool: &dyn Tool) -> ToolDefinition {
    ToolDefinition::new(tool.name(), tool.description(), tool.input_schema())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{BackendError, RemoteCallResult};
    use crate::session::{ConnectorFields, SessionDeps};
    use async_trait::async_trait;
    use serde_json::{Value, json};

    struct EchoBackend;

    #[async_trait]
    impl ToolBackend for EchoBackend {
        async fn start(&self) -> Result<(), BackendError> {
            Ok(())
        }

        async fn list_tools(&self) -> Result<Vec<RemoteToolSpec>, BackendError> {
            Ok(vec![])
        }

        async fn call_tool(&self, name: &str, arguments: Value) -> Result<RemoteCallResult, BackendError> {
            Ok(RemoteCallResult {
                content: format!("{} {}", name, arguments),
                is_error: false,
            })
        }

        async fn shutdown(&self) {}
    }

    fn ctx() -> ToolContext {
        ToolContext::new(SessionDeps::new("a\nb\nc", None, ConnectorFields::default()))
    }

    fn remote(name: &str) -> RemoteToolSpec {
        RemoteToolSpec {
            name: name.to_string(),
            description: String::new(),
            input_schema: json!({ "type": "object", "properties": {} }),
        }
    }

    #[test]
    fn test_builtins_registered() {
        let executor = ToolExecutor::builtins();
        let names = executor.tool_names();
        for name in [
            "get_manifest_text",
            "insert_manifest_lines",
            "replace_manifest_lines",
            "get_connector_metadata",
            "get_form_fields",
            "update_form_field",
            "list_tasks",
            "add_task",
            "insert_task",
            "update_task_status",
            "remove_task",
        ] {
            assert!(names.iter().any(|n| n == name), "missing {}", name);
        }
        assert_eq!(executor.definitions().len(), 11);
    }

    #[test]
    fn test_remote_tools_do_not_shadow_builtins() {
        let mut executor = ToolExecutor::builtins();
        let added = executor.add_remote_tools(
            vec![remote("validate_manifest"), remote("list_tasks")],
            Arc::new(EchoBackend),
        );
        assert_eq!(added, 1);
        assert!(executor.tool_names().contains(&"validate_manifest".to_string()));

        let defs = executor.definitions();
        let names: Vec<&str> = defs.iter().map(|d| d.name.as_str()).collect();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
    }

    #[tokio::test]
    async fn test_execute_unknown_tool() {
        let executor = ToolExecutor::builtins();
        let call = ToolCall::new("call_1", "unknown_tool", json!({}));

        let result = executor.execute(&call, &ctx()).await.unwrap();
        assert!(result.is_error);
        assert_eq!(result.content, "Error: Unknown tool: unknown_tool");
    }

    #[tokio::test]
    async fn test_execute_reads_own_writes() {
        let executor = ToolExecutor::builtins();
        let ctx = ctx();
        let insert = ToolCall::new("1", "insert_manifest_lines", json!({"line_number": 2, "text": "X"}));
        let read = ToolCall::new("2", "get_manifest_text", json!({"start_line": 2, "end_line": 2}));

        assert!(!executor.execute(&insert, &ctx).await.unwrap().is_error);
        let result = executor.execute(&read, &ctx).await.unwrap();
        assert_eq!(result.content, "X");
    }
}
