//! Cached agent per credential

use std::sync::Arc;

use tracing::{debug, info};

use super::{AgentError, ChatAgent};
use crate::backend::{McpClient, ToolBackend};
use crate::config::Config;
use crate::llm::create_client;

/// Builds agents for a credential
pub trait AgentFactory: Send + Sync {
    fn create(&self, credential: &str) -> Result<ChatAgent, AgentError>;
}

/// OpenAI client plus the MCP backend from the configuration
pub struct DefaultAgentFactory {
    config: Config,
}

impl DefaultAgentFactory {
    pub fn new(config: Config) -> Self {
        Self { config }
    }
}

impl AgentFactory for DefaultAgentFactory {
    fn create(&self, credential: &str) -> Result<ChatAgent, AgentError> {
        debug!(provider = %self.config.llm.provider, "DefaultAgentFactory::create: called");
        let llm = create_client(&self.config.llm, credential)?;
        let backend: Option<Arc<dyn ToolBackend>> = if self.config.backend.enabled {
            Some(Arc::new(
                McpClient::new(self.config.backend.clone()).with_env(&self.config.llm.api_key_env, credential),
            ))
        } else {
            debug!("DefaultAgentFactory::create: backend disabled");
            None
        };
        Ok(ChatAgent::new(llm, backend, self.config.agent.clone()))
    }
}

/// The started agent for the current credential, if any
///
/// Never serialized; state restored from elsewhere starts without an agent.
#[derive(Default)]
pub struct AgentHandle {
    agent: Option<Arc<ChatAgent>>,
    credential: Option<String>,
}

impl std::fmt::Debug for AgentHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentHandle")
            .field("started", &self.agent.is_some())
            .finish()
    }
}

impl AgentHandle {
    pub fn is_started(&self) -> bool {
        self.agent.is_some()
    }

    /// Return the cached agent, or replace it when the credential changed
    pub async fn ensure_started(
        &mut self,
        factory: &dyn AgentFactory,
        credential: &str,
    ) -> Result<Arc<ChatAgent>, AgentError> {
        if let Some(agent) = &self.agent
            && self.credential.as_deref() == Some(credential)
        {
            debug!("AgentHandle::ensure_started: reusing agent");
            return Ok(agent.clone());
        }

        if self.agent.is_some() {
            info!("AgentHandle::ensure_started: credential changed, replacing agent");
            self.shutdown().await;
        }

        let mut agent = factory.create(credential)?;
        agent.start().await?;
        let agent = Arc::new(agent);
        self.agent = Some(agent.clone());
        self.credential = Some(credential.to_string());
        info!("AgentHandle::ensure_started: agent started");
        Ok(agent)
    }

    /// Shut the agent down and forget it; the next turn builds a new one
    pub async fn shutdown(&mut self) {
        self.credential = None;
        if let Some(agent) = self.agent.take() {
            debug!("AgentHandle::shutdown: stopping agent");
            agent.shutdown().await;
        }
    }
}
