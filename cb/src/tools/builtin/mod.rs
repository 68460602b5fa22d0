//! Built-in tools operating on the turn's session

/// Unwrap a parameter or return its error result to the agent
macro_rules! arg {
    ($e:expr) => {
        match $e {
            Ok(value) => value,
            Err(result) => return Ok(result),
        }
    };
}

mod manifest;
mod metadata;
mod tasks;

pub use manifest::{GetManifestTextTool, InsertManifestLinesTool, ReplaceManifestLinesTool};
pub use metadata::{GetConnectorMetadataTool, GetFormFieldsTool, UpdateFormFieldTool};
pub use tasks::{AddTaskTool, InsertTaskTool, ListTasksTool, RemoveTaskTool, UpdateTaskStatusTool};

use serde_json::Value;

use super::ToolResult;

/// Required string parameter, or the error result to hand back
fn required_str<'a>(input: &'a Value, key: &str) -> Result<&'a str, ToolResult> {
    input
        .get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| ToolResult::error(format!("Missing required parameter: {}", key)))
}

/// Optional string parameter; empty strings count as absent
fn optional_str<'a>(input: &'a Value, key: &str) -> Option<&'a str> {
    input.get(key).and_then(Value::as_str).filter(|s| !s.is_empty())
}

/// Integer parameter; accepts JSON numbers and numeric strings
fn optional_int(input: &Value, key: &str) -> Result<Option<i64>, ToolResult> {
    match input.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_i64()
            .map(Some)
            .ok_or_else(|| ToolResult::error(format!("Parameter {} must be an integer", key))),
        Some(Value::String(s)) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ToolResult::error(format!("Parameter {} must be an integer (got '{}')", key, s))),
        Some(other) => Err(ToolResult::error(format!(
            "Parameter {} must be an integer (got {})",
            key, other
        ))),
    }
}

fn required_int(input: &Value, key: &str) -> Result<i64, ToolResult> {
    optional_int(input, key)?.ok_or_else(|| ToolResult::error(format!("Missing required parameter: {}", key)))
}
