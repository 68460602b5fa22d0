//! Manifest argument injection for the backend's manifest tools
//!
//! These tools all take the full manifest text. The agent should not have to
//! copy the editor contents into every call, so the schema marks `manifest`
//! optional and the call fills it from the session when left out.

use serde_json::{Map, Value};
use tracing::debug;

pub const MANIFEST_ARG: &str = "manifest";

/// Remote tools whose `manifest` argument is auto-supplied
pub const MANIFEST_TOOLS: &[&str] = &[
    "execute_stream_test_read",
    "validate_manifest",
    "execute_record_counts_smoke_test",
    "execute_dynamic_manifest_resolution_test",
];

const AUTO_SUPPLIED: &str =
    "The connector manifest YAML. Optional: when omitted, the manifest currently in the editor is used.";

pub fn is_manifest_tool(name: &str) -> bool {
    MANIFEST_TOOLS.contains(&name)
}

/// Make `manifest` optional in a tool's input schema and describe it as auto-supplied
pub fn rewrite_schema(mut schema: Value) -> Value {
    let Some(obj) = schema.as_object_mut() else {
        return schema;
    };

    if let Some(required) = obj.get_mut("required").and_then(Value::as_array_mut) {
        required.retain(|v| v.as_str() != Some(MANIFEST_ARG));
    }

    let properties = obj
        .entry("properties")
        .or_insert_with(|| Value::Object(Map::new()));
    if let Some(properties) = properties.as_object_mut() {
        let prop = properties
            .entry(MANIFEST_ARG)
            .or_insert_with(|| serde_json::json!({ "type": "string" }));
        if let Some(prop) = prop.as_object_mut() {
            prop.insert("description".to_string(), Value::String(AUTO_SUPPLIED.to_string()));
        }
    }

    schema
}

/// Fill a missing, null or empty `manifest` with the session's manifest text
///
/// A non-empty value the agent supplied is left alone.
pub fn inject_manifest(mut arguments: Value, manifest: &str) -> Value {
    if !arguments.is_object() {
        arguments = Value::Object(Map::new());
    }
    let Some(obj) = arguments.as_object_mut() else {
        return arguments;
    };

    let needs_fill = match obj.get(MANIFEST_ARG) {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        Some(_) => false,
    };
    if needs_fill {
        debug!("inject_manifest: supplying session manifest");
        obj.insert(MANIFEST_ARG.to_string(), Value::String(manifest.to_string()));
    }
    arguments
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_is_manifest_tool() {
        assert!(is_manifest_tool("validate_manifest"));
        assert!(is_manifest_tool("execute_stream_test_read"));
        assert!(!is_manifest_tool("get_connector_builder_docs"));
    }

    #[test]
    fn test_rewrite_schema_makes_manifest_optional() {
        let schema = json!({
            "type": "object",
            "properties": {
                "manifest": { "type": "string", "description": "Manifest YAML" },
                "stream_name": { "type": "string" }
            },
            "required": ["manifest", "stream_name"]
        });
        let rewritten = rewrite_schema(schema);
        assert_eq!(rewritten["required"], json!(["stream_name"]));
        assert_eq!(rewritten["properties"]["manifest"]["type"], "string");
        assert!(
            rewritten["properties"]["manifest"]["description"]
                .as_str()
                .unwrap()
                .contains("Optional")
        );
    }

    #[test]
    fn test_rewrite_schema_without_properties() {
        let rewritten = rewrite_schema(json!({ "type": "object" }));
        assert!(rewritten["properties"]["manifest"].is_object());
        assert!(rewritten.get("required").is_none());
    }

    #[test]
    fn test_inject_fills_missing_null_and_empty() {
        let yaml = "version: 6.0.0\n";
        for args in [json!({}), json!({ "manifest": null }), json!({ "manifest": "  " })] {
            let out = inject_manifest(args, yaml);
            assert_eq!(out["manifest"], yaml);
        }
    }

    #[test]
    fn test_inject_keeps_agent_value() {
        let out = inject_manifest(json!({ "manifest": "agent: yaml", "stream_name": "users" }), "session: yaml");
        assert_eq!(out["manifest"], "agent: yaml");
        assert_eq!(out["stream_name"], "users");
    }

    #[test]
    fn test_inject_non_object_arguments() {
        let out = inject_manifest(Value::Null, "a: 1");
        assert_eq!(out, json!({ "manifest": "a: 1" }));
    }
}
