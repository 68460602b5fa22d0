//! Connector builder configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// LLM provider configuration
    pub llm: LlmConfig,

    /// Tool backend subprocess
    pub backend: BackendConfig,

    /// Chat session behaviour
    pub chat: ChatConfig,

    /// Agent tool loop limits
    pub agent: AgentConfig,

    /// Log level (overridden by --log-level)
    #[serde(rename = "log-level")]
    pub log_level: Option<String>,
}

impl Config {
    /// Validate configuration before use
    ///
    /// Fails fast when no LLM credential is available: neither `key` nor the
    /// configured environment variable.
    pub fn validate(&self, key: Option<&str>) -> Result<()> {
        if self.llm.resolve_api_key(key).is_none() {
            return Err(eyre::eyre!(
                "LLM API key not found. Set the {} environment variable or use /key.",
                self.llm.api_key_env
            ));
        }
        if self.agent.max_tool_rounds == 0 {
            return Err(eyre::eyre!("agent.max-tool-rounds must be at least 1"));
        }
        Ok(())
    }

    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        let local_config = PathBuf::from(".connector-builder.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("connector-builder").join("connector-builder.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Read only the `log-level` key, before logging is set up
    pub fn load_log_level(config_path: Option<&PathBuf>) -> Option<String> {
        Self::load(config_path).ok().and_then(|config| config.log_level)
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;
        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;
        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

/// LLM provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Provider name (currently only "openai")
    pub provider: String,

    /// Model identifier
    pub model: String,

    /// Environment variable containing the API key
    #[serde(rename = "api-key-env")]
    pub api_key_env: String,

    /// API base URL
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Maximum tokens per response
    #[serde(rename = "max-tokens")]
    pub max_tokens: u32,

    /// Request timeout in milliseconds
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            base_url: "https://api.openai.com".to_string(),
            max_tokens: 16384,
            timeout_ms: 300_000,
        }
    }
}

impl LlmConfig {
    /// Effective credential: a non-empty explicit key wins over the environment
    pub fn resolve_api_key(&self, key: Option<&str>) -> Option<String> {
        key.map(str::trim)
            .filter(|k| !k.is_empty())
            .map(str::to_string)
            .or_else(|| std::env::var(&self.api_key_env).ok().filter(|k| !k.is_empty()))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Tool backend subprocess configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Start the backend at all; without it only built-in tools are offered
    pub enabled: bool,

    /// Executable to launch
    pub command: String,

    /// Arguments passed to the executable
    pub args: Vec<String>,

    /// Per-request timeout in seconds
    #[serde(rename = "timeout-secs")]
    pub timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            command: "uvx".to_string(),
            args: vec!["airbyte-connector-builder-mcp".to_string()],
            timeout_secs: 180,
        }
    }
}

impl BackendConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Chat session configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Most recent messages sent to the model each turn
    #[serde(rename = "history-max-messages")]
    pub history_max_messages: usize,

    /// Pause between autonomous turns
    #[serde(rename = "autonomous-backoff-ms")]
    pub autonomous_backoff_ms: u64,

    /// Upper bound on autonomous turns per run
    #[serde(rename = "autonomous-max-turns")]
    pub autonomous_max_turns: u32,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            history_max_messages: 20,
            autonomous_backoff_ms: 1000,
            autonomous_max_turns: 50,
        }
    }
}

/// Agent tool loop configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Maximum LLM rounds per turn
    #[serde(rename = "max-tool-rounds")]
    pub max_tool_rounds: u32,

    /// Max tokens requested per round
    #[serde(rename = "max-tokens")]
    pub max_tokens: u32,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_tool_rounds: 25,
            max_tokens: 4096,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.llm.provider, "openai");
        assert_eq!(config.llm.model, "gpt-4o-mini");
        assert_eq!(config.backend.command, "uvx");
        assert_eq!(config.backend.args, vec!["airbyte-connector-builder-mcp"]);
        assert_eq!(config.backend.timeout_secs, 180);
        assert_eq!(config.chat.history_max_messages, 20);
        assert_eq!(config.agent.max_tool_rounds, 25);
    }

    #[test]
    fn test_deserialize_config() {
        let yaml = r#"
llm:
  model: gpt-4o
  api-key-env: MY_KEY
  max-tokens: 8192

backend:
  enabled: false
  timeout-secs: 30

chat:
  history-max-messages: 10
  autonomous-max-turns: 3

log-level: debug
"#;

        let config: Config = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(config.llm.model, "gpt-4o");
        assert_eq!(config.llm.api_key_env, "MY_KEY");
        assert_eq!(config.llm.max_tokens, 8192);
        assert!(!config.backend.enabled);
        assert_eq!(config.backend.timeout(), Duration::from_secs(30));
        assert_eq!(config.chat.history_max_messages, 10);
        assert_eq!(config.chat.autonomous_backoff_ms, 1000);
        assert_eq!(config.log_level.as_deref(), Some("debug"));
    }

    #[test]
    fn test_load_explicit_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "agent:\n  max-tool-rounds: 7").unwrap();

        let config = Config::load(Some(&file.path().to_path_buf())).unwrap();
        assert_eq!(config.agent.max_tool_rounds, 7);
        assert_eq!(config.agent.max_tokens, 4096);
    }

    #[test]
    fn test_load_log_level() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "log-level: trace").unwrap();
        assert_eq!(
            Config::load_log_level(Some(&file.path().to_path_buf())).as_deref(),
            Some("trace")
        );
    }

    #[test]
    fn test_load_missing_explicit_path_fails() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.yml");
        assert!(Config::load(Some(&missing)).is_err());
    }

    #[test]
    fn test_explicit_key_wins() {
        let config = LlmConfig {
            api_key_env: "CB_TEST_UNSET_KEY_VAR".to_string(),
            ..Default::default()
        };
        assert_eq!(config.resolve_api_key(Some("sk-ui")), Some("sk-ui".to_string()));
        assert_eq!(config.resolve_api_key(Some("  ")), None);
        assert_eq!(config.resolve_api_key(None), None);
    }

    #[test]
    fn test_validate_requires_credential() {
        let mut config = Config::default();
        config.llm.api_key_env = "CB_TEST_UNSET_KEY_VAR".to_string();
        assert!(config.validate(None).is_err());
        assert!(config.validate(Some("sk-test")).is_ok());
    }
}
