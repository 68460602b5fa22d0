//! Prompt Loader
//!
//! Loads prompt templates from the user override directory or falls back to
//! the embedded defaults.

use std::path::{Path, PathBuf};

use eyre::{Result, eyre};
use handlebars::Handlebars;
use serde::Serialize;
use tracing::debug;

use super::embedded;
use crate::session::ConnectorFields;

/// Values available to the system prompt template
#[derive(Debug, Clone, Default, Serialize)]
pub struct PromptContext {
    pub connector_name: String,
    pub source_api_name: String,
    /// The backend's validation and test tools are available
    pub has_backend_tools: bool,
    /// Turn runs as part of the autonomous loop
    pub autonomous: bool,
}

impl PromptContext {
    pub fn from_fields(fields: &ConnectorFields) -> Self {
        Self {
            connector_name: fields.connector_name.clone(),
            source_api_name: fields.source_api_name.clone(),
            ..Default::default()
        }
    }
}

/// Loads and renders prompt templates
pub struct PromptLoader {
    hbs: Handlebars<'static>,
    /// User override directory (`.connector-builder/prompts/`)
    user_dir: Option<PathBuf>,
}

impl PromptLoader {
    /// Loader honouring overrides under `root/.connector-builder/prompts/`
    pub fn new(root: impl AsRef<Path>) -> Self {
        let user_dir = root.as_ref().join(".connector-builder/prompts");
        let exists = user_dir.exists();
        debug!(?user_dir, %exists, "PromptLoader::new: called");
        Self {
            hbs: engine(),
            user_dir: exists.then_some(user_dir),
        }
    }

    /// Loader using only embedded prompts
    pub fn embedded_only() -> Self {
        debug!("PromptLoader::embedded_only: called");
        Self {
            hbs: engine(),
            user_dir: None,
        }
    }

    fn load_template(&self, name: &str) -> Result<String> {
        debug!(%name, "PromptLoader::load_template: called");
        if let Some(user_dir) = &self.user_dir {
            let path = user_dir.join(format!("{}.pmt", name));
            if path.exists() {
                debug!(?path, "PromptLoader::load_template: found in user override");
                return std::fs::read_to_string(&path)
                    .map_err(|e| eyre!("Failed to read user prompt {}: {}", path.display(), e));
            }
        }

        embedded::get_embedded(name)
            .map(str::to_string)
            .ok_or_else(|| eyre!("Prompt template not found: {}", name))
    }

    /// Render a template with the given context
    pub fn render(&self, template_name: &str, context: &PromptContext) -> Result<String> {
        debug!(%template_name, "PromptLoader::render: called");
        let template = self.load_template(template_name)?;
        self.hbs
            .render_template(&template, context)
            .map_err(|e| eyre!("Failed to render template {}: {}", template_name, e))
    }

    /// The agent system prompt
    pub fn system_prompt(&self, context: &PromptContext) -> Result<String> {
        self.render("system", context)
    }
}

/// Handlebars without HTML escaping; prompts are plain text
fn engine() -> Handlebars<'static> {
    let mut hbs = Handlebars::new();
    hbs.register_escape_fn(handlebars::no_escape);
    hbs
}

impl Default for PromptLoader {
    fn default() -> Self {
        Self::embedded_only()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_system_prompt_unnamed_connector() {
        let prompt = PromptLoader::embedded_only()
            .system_prompt(&PromptContext::default())
            .unwrap();
        assert!(prompt.contains("No connector has been named yet"));
        assert!(!prompt.contains("Task completed successfully"));
        assert!(!prompt.contains("{{"));
    }

    #[test]
    fn test_system_prompt_with_metadata_and_autonomous() {
        let context = PromptContext {
            connector_name: "source-jsonplaceholder".to_string(),
            source_api_name: "JSONPlaceholder".to_string(),
            has_backend_tools: true,
            autonomous: true,
        };
        let prompt = PromptLoader::embedded_only().system_prompt(&context).unwrap();
        assert!(prompt.contains("\"source-jsonplaceholder\" for the JSONPlaceholder API"));
        assert!(prompt.contains("validate_manifest"));
        assert!(prompt.contains("✅ Task completed successfully"));
    }

    #[test]
    fn test_user_override() {
        let temp = tempdir().unwrap();
        let dir = temp.path().join(".connector-builder/prompts");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("system.pmt"), "Custom for {{connector_name}}").unwrap();

        let context = PromptContext {
            connector_name: "x".to_string(),
            ..Default::default()
        };
        let prompt = PromptLoader::new(temp.path()).system_prompt(&context).unwrap();
        assert_eq!(prompt, "Custom for x");
    }

    #[test]
    fn test_values_not_html_escaped() {
        let context = PromptContext {
            connector_name: "a & b".to_string(),
            ..Default::default()
        };
        let prompt = PromptLoader::embedded_only().system_prompt(&context).unwrap();
        assert!(prompt.contains("\"a & b\""));
    }

    #[test]
    fn test_unknown_template() {
        assert!(PromptLoader::embedded_only().load_template("nonexistent").is_err());
    }
}
