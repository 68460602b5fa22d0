//! Tool trait definition

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use super::ToolError;
use super::context::ToolContext;

/// A tool that can be called by the LLM
///
/// Expected failures (bad arguments, unknown ids, out-of-range lines) come back
/// as an error [`ToolResult`]. `Err` is reserved for failures that should end
/// the turn, such as a dead tool backend.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Tool name (matches the LLM tool call name)
    fn name(&self) -> &str;

    /// Human-readable description
    fn description(&self) -> &str;

    /// JSON Schema for input parameters
    fn input_schema(&self) -> Value;

    /// Execute the tool
    async fn execute(&self, input: Value, ctx: &ToolContext) -> Result<ToolResult, ToolError>;
}

/// Result of a tool execution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolResult {
    pub content: String,
    pub is_error: bool,
}

impl ToolResult {
    /// Create a successful result
    pub fn success(content: impl Into<String>) -> Self {
        debug!("ToolResult::success: called");
        Self {
            content: content.into(),
            is_error: false,
        }
    }

    /// Create an error result; the content always starts with `Error:`
    pub fn error(content: impl Into<String>) -> Self {
        debug!("ToolResult::error: called");
        let content = content.into();
        let content = if content.starts_with("Error:") {
            content
        } else {
            format!("Error: {}", content)
        };
        Self {
            content,
            is_error: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_result_success() {
        let result = ToolResult::success("Task 'x' added");
        assert!(!result.is_error);
        assert_eq!(result.content, "Task 'x' added");
    }

    #[test]
    fn test_tool_result_error_prefixed_once() {
        let result = ToolResult::error("Task with ID 'x' not found.");
        assert!(result.is_error);
        assert_eq!(result.content, "Error: Task with ID 'x' not found.");

        let result = ToolResult::error("Error: No manifest content available");
        assert_eq!(result.content, "Error: No manifest content available");
    }
}
