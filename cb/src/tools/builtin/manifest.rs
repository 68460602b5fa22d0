//! Line-addressed manifest tools

use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::debug;

use super::{optional_int, required_int, required_str};
use crate::domain::manifest;
use crate::tools::{Tool, ToolContext, ToolError, ToolResult};

/// Read the manifest, whole or a line range
pub struct GetManifestTextTool;

#[async_trait]
impl Tool for GetManifestTextTool {
    fn name(&self) -> &str {
        "get_manifest_text"
    }

    fn description(&self) -> &str {
        "Read the connector manifest YAML currently in the editor. Optionally restrict to an inclusive, \
        1-indexed line range and prefix each line with its number. Use line numbers before editing."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "with_line_numbers": {
                    "type": "boolean",
                    "description": "Prefix each line with its 1-indexed line number (default: false)",
                    "default": false
                },
                "start_line": {
                    "type": "integer",
                    "description": "First line to return (1-indexed, inclusive)"
                },
                "end_line": {
                    "type": "integer",
                    "description": "Last line to return (1-indexed, inclusive)"
                }
            }
        })
    }

    async fn execute(&self, input: Value, ctx: &ToolContext) -> Result<ToolResult, ToolError> {
        debug!(?input, "GetManifestTextTool::execute: called");
        let with_line_numbers = input
            .get("with_line_numbers")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        let start_line = arg!(optional_int(&input, "start_line"));
        let end_line = arg!(optional_int(&input, "end_line"));

        let session = ctx.session().await;
        Ok(
            match manifest::read_lines(&session.yaml_content, with_line_numbers, start_line, end_line) {
                Ok(text) => ToolResult::success(text),
                Err(e) => {
                    debug!(error = %e, "GetManifestTextTool::execute: read failed");
                    ToolResult::error(e.to_string())
                }
            },
        )
    }
}

/// Insert lines before a given line
pub struct InsertManifestLinesTool;

#[async_trait]
impl Tool for InsertManifestLinesTool {
    fn name(&self) -> &str {
        "insert_manifest_lines"
    }

    fn description(&self) -> &str {
        "Insert text into the manifest before the given 1-indexed line. A line number past the end appends. \
        Multi-line text is inserted as multiple lines."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "line_number": {
                    "type": "integer",
                    "description": "Line to insert before (1-indexed)"
                },
                "text": {
                    "type": "string",
                    "description": "Text to insert"
                }
            },
            "required": ["line_number", "text"]
        })
    }

    async fn execute(&self, input: Value, ctx: &ToolContext) -> Result<ToolResult, ToolError> {
        debug!(?input, "InsertManifestLinesTool::execute: called");
        let line_number = arg!(required_int(&input, "line_number"));
        let text = arg!(required_str(&input, "text"));

        let mut session = ctx.session().await;
        Ok(match manifest::insert_lines(&session.yaml_content, line_number, text) {
            Ok(edit) => {
                session.yaml_content = edit.content;
                ToolResult::success(edit.message)
            }
            Err(e) => {
                debug!(error = %e, "InsertManifestLinesTool::execute: insert failed");
                ToolResult::error(e.to_string())
            }
        })
    }
}

/// Replace an inclusive line range
pub struct ReplaceManifestLinesTool;

#[async_trait]
impl Tool for ReplaceManifestLinesTool {
    fn name(&self) -> &str {
        "replace_manifest_lines"
    }

    fn description(&self) -> &str {
        "Replace an inclusive, 1-indexed range of manifest lines with new text. Pass an empty string to \
        delete the range."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "start_line": {
                    "type": "integer",
                    "description": "First line to replace (1-indexed, inclusive)"
                },
                "end_line": {
                    "type": "integer",
                    "description": "Last line to replace (1-indexed, inclusive)"
                },
                "text": {
                    "type": "string",
                    "description": "Replacement text; empty deletes the range"
                }
            },
            "required": ["start_line", "end_line", "text"]
        })
    }

    async fn execute(&self, input: Value, ctx: &ToolContext) -> Result<ToolResult, ToolError> {
        debug!(?input, "ReplaceManifestLinesTool::execute: called");
        let start_line = arg!(required_int(&input, "start_line"));
        let end_line = arg!(required_int(&input, "end_line"));
        let text = arg!(required_str(&input, "text"));

        let mut session = ctx.session().await;
        Ok(
            match manifest::replace_lines(&session.yaml_content, start_line, end_line, text) {
                Ok(edit) => {
                    session.yaml_content = edit.content;
                    ToolResult::success(edit.message)
                }
                Err(e) => {
                    debug!(error = %e, "ReplaceManifestLinesTool::execute: replace failed");
                    ToolResult::error(e.to_string())
                }
            },
        )
    }
}
