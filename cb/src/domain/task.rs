//! Task domain type
//!
//! A task is one tracked unit of connector-building work. Its category (and the
//! stream it concerns, for stream tasks) is fixed at creation; only the status
//! and status detail change afterwards.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Errors raised by task and task list operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TaskError {
    #[error("stream_name is required for stream tasks")]
    MissingStreamName,

    #[error("stream_name is only allowed for stream tasks, not {category} tasks")]
    UnexpectedStreamName { category: TaskCategory },

    #[error("Task category mismatch: expected {expected}, got {actual}")]
    CategoryMismatch { expected: TaskCategory, actual: TaskCategory },

    #[error("Task with ID '{0}' already exists.")]
    DuplicateId(String),

    #[error("Task with ID '{0}' not found.")]
    NotFound(String),

    #[error("Invalid {field}: '{value}'")]
    InvalidValue { field: &'static str, value: String },
}

/// Task status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    NotStarted,
    InProgress,
    Completed,
    Blocked,
}

impl TaskStatus {
    /// All statuses in display order
    pub const ALL: [TaskStatus; 4] = [Self::NotStarted, Self::InProgress, Self::Completed, Self::Blocked];

    /// Wire name (snake_case)
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotStarted => "not_started",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Blocked => "blocked",
        }
    }

    /// Emoji used in the plain-text rendering of a task
    pub fn as_emoji(&self) -> &'static str {
        match self {
            Self::NotStarted => "⚪",
            Self::InProgress => "🔵",
            Self::Completed => "✅",
            Self::Blocked => "⛔",
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = TaskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "not_started" => Ok(Self::NotStarted),
            "in_progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            "blocked" => Ok(Self::Blocked),
            _ => Err(TaskError::InvalidValue {
                field: "status",
                value: s.to_string(),
            }),
        }
    }
}

/// The three task panels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskCategory {
    Connector,
    Stream,
    Finalization,
}

impl TaskCategory {
    pub const ALL: [TaskCategory; 3] = [Self::Connector, Self::Stream, Self::Finalization];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Connector => "connector",
            Self::Stream => "stream",
            Self::Finalization => "finalization",
        }
    }
}

impl std::fmt::Display for TaskCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for TaskCategory {
    type Err = TaskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "connector" => Ok(Self::Connector),
            "stream" => Ok(Self::Stream),
            "finalization" => Ok(Self::Finalization),
            _ => Err(TaskError::InvalidValue {
                field: "category",
                value: s.to_string(),
            }),
        }
    }
}

/// Category plus the data that only some categories carry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "category", rename_all = "snake_case")]
pub enum TaskKind {
    Connector,
    Stream { stream_name: String },
    Finalization,
}

impl TaskKind {
    pub fn category(&self) -> TaskCategory {
        match self {
            Self::Connector => TaskCategory::Connector,
            Self::Stream { .. } => TaskCategory::Stream,
            Self::Finalization => TaskCategory::Finalization,
        }
    }
}

/// A tracked unit of work
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    id: String,
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(flatten)]
    kind: TaskKind,
    #[serde(default)]
    status: TaskStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    status_detail: Option<String>,
}

impl Task {
    /// Create a task, validating that `stream_name` is given iff the category is `stream`
    pub fn new(
        category: TaskCategory,
        id: impl Into<String>,
        name: impl Into<String>,
        description: Option<String>,
        stream_name: Option<String>,
    ) -> Result<Self, TaskError> {
        let id = id.into();
        debug!(%id, %category, ?stream_name, "Task::new: called");
        let kind = match (category, stream_name) {
            (TaskCategory::Stream, Some(stream_name)) => TaskKind::Stream { stream_name },
            (TaskCategory::Stream, None) => return Err(TaskError::MissingStreamName),
            (category, Some(_)) => return Err(TaskError::UnexpectedStreamName { category }),
            (TaskCategory::Connector, None) => TaskKind::Connector,
            (TaskCategory::Finalization, None) => TaskKind::Finalization,
        };

        Ok(Self {
            id,
            name: name.into(),
            description,
            kind,
            status: TaskStatus::NotStarted,
            status_detail: None,
        })
    }

    /// Shorthand for a connector task
    pub fn connector(id: impl Into<String>, name: impl Into<String>, description: Option<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description,
            kind: TaskKind::Connector,
            status: TaskStatus::NotStarted,
            status_detail: None,
        }
    }

    /// Shorthand for a stream task
    pub fn stream(
        id: impl Into<String>,
        name: impl Into<String>,
        stream_name: impl Into<String>,
        description: Option<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description,
            kind: TaskKind::Stream {
                stream_name: stream_name.into(),
            },
            status: TaskStatus::NotStarted,
            status_detail: None,
        }
    }

    /// Shorthand for a finalization task
    pub fn finalization(id: impl Into<String>, name: impl Into<String>, description: Option<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description,
            kind: TaskKind::Finalization,
            status: TaskStatus::NotStarted,
            status_detail: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn kind(&self) -> &TaskKind {
        &self.kind
    }

    pub fn category(&self) -> TaskCategory {
        self.kind.category()
    }

    /// Stream name, present only for stream tasks
    pub fn stream_name(&self) -> Option<&str> {
        match &self.kind {
            TaskKind::Stream { stream_name } => Some(stream_name),
            _ => None,
        }
    }

    pub fn status(&self) -> TaskStatus {
        self.status
    }

    pub fn status_detail(&self) -> Option<&str> {
        self.status_detail.as_deref()
    }

    /// Set the status; the detail is replaced only when one is given.
    ///
    /// Any status may follow any other. Workflow ordering is left to the agent.
    pub(crate) fn set_status(&mut self, status: TaskStatus, detail: Option<String>) {
        debug!(id = %self.id, from = %self.status, to = %status, "Task::set_status: called");
        self.status = status;
        if detail.is_some() {
            self.status_detail = detail;
        }
    }
}

impl std::fmt::Display for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(stream_name) = self.stream_name() {
            return write!(f, "{}: {}", stream_name, self.name);
        }
        write!(f, "{} {}", self.status.as_emoji(), self.name)?;
        if let Some(detail) = self.status_detail.as_deref().or(self.description.as_deref()) {
            write!(f, ": {}", detail)?;
        }
        Ok(())
    }
}
