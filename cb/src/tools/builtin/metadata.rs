//! Requirement metadata and form field tools

use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::{debug, warn};

use super::required_str;
use crate::session::FormField;
use crate::tools::{Tool, ToolContext, ToolError, ToolResult};

/// Human-readable dump of the requirement metadata
pub struct GetConnectorMetadataTool;

#[async_trait]
impl Tool for GetConnectorMetadataTool {
    fn name(&self) -> &str {
        "get_connector_metadata"
    }

    fn description(&self) -> &str {
        "Get the connector's requirement metadata: connector name, source API, documentation URLs, \
        functional requirements and test list."
    }

    fn input_schema(&self) -> Value {
        json!({ "type": "object", "properties": {} })
    }

    async fn execute(&self, _input: Value, ctx: &ToolContext) -> Result<ToolResult, ToolError> {
        debug!("GetConnectorMetadataTool::execute: called");
        Ok(ToolResult::success(ctx.session().await.fields.metadata_text()))
    }
}

/// JSON dump of the form fields
pub struct GetFormFieldsTool;

#[async_trait]
impl Tool for GetFormFieldsTool {
    fn name(&self) -> &str {
        "get_form_fields"
    }

    fn description(&self) -> &str {
        "Get the current values of all requirement form fields as JSON."
    }

    fn input_schema(&self) -> Value {
        json!({ "type": "object", "properties": {} })
    }

    async fn execute(&self, _input: Value, ctx: &ToolContext) -> Result<ToolResult, ToolError> {
        debug!("GetFormFieldsTool::execute: called");
        let session = ctx.session().await;
        Ok(match serde_json::to_string_pretty(&session.fields) {
            Ok(text) => ToolResult::success(text),
            Err(e) => {
                warn!(error = %e, "GetFormFieldsTool::execute: serialization failed");
                ToolResult::error(format!("Failed to serialize form fields: {}", e))
            }
        })
    }
}

/// Update one whitelisted form field
pub struct UpdateFormFieldTool;

#[async_trait]
impl Tool for UpdateFormFieldTool {
    fn name(&self) -> &str {
        "update_form_field"
    }

    fn description(&self) -> &str {
        "Update one requirement form field. Valid field names: source_api_name, connector_name, \
        documentation_urls, functional_requirements, test_list."
    }

    fn input_schema(&self) -> Value {
        let names: Vec<&str> = FormField::ALL.iter().map(|f| f.as_str()).collect();
        json!({
            "type": "object",
            "properties": {
                "field_name": {
                    "type": "string",
                    "enum": names,
                    "description": "Field to update"
                },
                "value": {
                    "type": "string",
                    "description": "New value"
                }
            },
            "required": ["field_name", "value"]
        })
    }

    async fn execute(&self, input: Value, ctx: &ToolContext) -> Result<ToolResult, ToolError> {
        debug!(?input, "UpdateFormFieldTool::execute: called");
        let field_name = arg!(required_str(&input, "field_name"));
        let value = arg!(required_str(&input, "value"));

        let field: FormField = match field_name.parse() {
            Ok(field) => field,
            Err(e) => {
                debug!(%field_name, "UpdateFormFieldTool::execute: unknown field");
                return Ok(ToolResult::error(format!(
                    "{}. Valid fields: {}",
                    e,
                    FormField::valid_names()
                )));
            }
        };

        ctx.session().await.set_field(field, value);
        Ok(ToolResult::success(format!("Updated {} ({})", field.label(), field)))
    }
}
