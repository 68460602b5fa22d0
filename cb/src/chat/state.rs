//! Durable, UI-visible chat state

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::agent::AgentHandle;
use crate::domain::{EMPTY_MANIFEST, TaskList};
use crate::session::ConnectorFields;

pub const WELCOME_MESSAGE: &str = "Welcome! 👋\n\nWhat connector do you want to build today?";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

/// One transcript entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: Uuid,
    pub role: ChatRole,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    fn new(role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            role,
            content: content.into(),
            created_at: Utc::now(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(ChatRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(ChatRole::Assistant, content)
    }
}

/// Everything the front end renders for one chat session
#[derive(Debug, Serialize, Deserialize)]
pub struct AppState {
    pub messages: Vec<ChatMessage>,
    /// Text of the assistant message being streamed; empty between turns
    pub current_streaming_message: String,
    pub is_streaming: bool,
    pub yaml_content: String,
    /// Created on the first turn
    pub task_list: Option<TaskList>,
    pub fields: ConnectorFields,
    /// Credential entered in the session; overrides the environment
    #[serde(skip)]
    pub api_key: Option<String>,
    #[serde(skip)]
    pub agent: AgentHandle,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            messages: vec![ChatMessage::assistant(WELCOME_MESSAGE)],
            current_streaming_message: String::new(),
            is_streaming: false,
            yaml_content: EMPTY_MANIFEST.to_string(),
            task_list: None,
            fields: ConnectorFields::default(),
            api_key: None,
            agent: AgentHandle::default(),
        }
    }
}
