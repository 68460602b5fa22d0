//! Per-turn session state exposed to tool calls
//!
//! A [`SessionDeps`] is built by value from the durable chat state at the start
//! of every turn. Tools mutate it freely; at the end of the turn the changes the
//! agent made are diffed against the turn-start [`SessionSnapshot`] and merged
//! back field by field.

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use crate::domain::TaskList;

mod fields;

pub use fields::{ConnectorFields, FormField};

/// Session-level errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("Unknown field '{0}'")]
    UnknownField(String),
}

/// Callback bound to a UI-visible field, invoked on every `set_field`
pub type FieldSetter = Arc<dyn Fn(&str) + Send + Sync>;

/// Mutable state for one agent run
#[derive(Clone)]
pub struct SessionDeps {
    pub yaml_content: String,
    pub task_list: TaskList,
    pub fields: ConnectorFields,
    setters: HashMap<FormField, FieldSetter>,
}

impl std::fmt::Debug for SessionDeps {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionDeps")
            .field("yaml_content_len", &self.yaml_content.len())
            .field("task_list", &self.task_list)
            .field("fields", &self.fields)
            .field("setters", &self.setters.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl SessionDeps {
    /// Build a session; a missing task list is seeded with the connector-build bootstrap
    pub fn new(yaml_content: impl Into<String>, task_list: Option<TaskList>, fields: ConnectorFields) -> Self {
        debug!(has_task_list = task_list.is_some(), "SessionDeps::new: called");
        Self {
            yaml_content: yaml_content.into(),
            task_list: task_list.unwrap_or_else(TaskList::new_connector_build),
            fields,
            setters: HashMap::new(),
        }
    }

    /// Bind a setter callback to a field
    pub fn with_setter(mut self, field: FormField, setter: FieldSetter) -> Self {
        self.setters.insert(field, setter);
        self
    }

    /// Update a field and notify its setter, if any
    pub fn set_field(&mut self, field: FormField, value: &str) {
        debug!(%field, "SessionDeps::set_field: called");
        self.fields.set(field, value);
        if let Some(setter) = self.setters.get(&field) {
            debug!(%field, "SessionDeps::set_field: invoking setter");
            setter(value);
        }
    }

    /// Copy of the mergeable state, taken at turn start
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            yaml_content: self.yaml_content.clone(),
            task_list: self.task_list.clone(),
            fields: self.fields.clone(),
        }
    }

    /// Fields the agent changed relative to `baseline`
    pub fn changes_since(&self, baseline: &SessionSnapshot) -> SessionChanges {
        let yaml_content = (self.yaml_content != baseline.yaml_content).then(|| self.yaml_content.clone());
        let task_list = (self.task_list != baseline.task_list).then(|| self.task_list.clone());
        let fields = FormField::ALL
            .into_iter()
            .filter(|f| self.fields.get(*f) != baseline.fields.get(*f))
            .map(|f| (f, self.fields.get(f).to_string()))
            .collect();

        let changes = SessionChanges {
            yaml_content,
            task_list,
            fields,
        };
        debug!(changed = ?changes.field_names(), "SessionDeps::changes_since: diffed");
        changes
    }
}

/// Turn-start copy of the session's mergeable fields
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub yaml_content: String,
    pub task_list: TaskList,
    pub fields: ConnectorFields,
}

/// What the agent changed during a turn
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionChanges {
    pub yaml_content: Option<String>,
    pub task_list: Option<TaskList>,
    pub fields: Vec<(FormField, String)>,
}

impl SessionChanges {
    pub fn is_empty(&self) -> bool {
        self.yaml_content.is_none() && self.task_list.is_none() && self.fields.is_empty()
    }

    pub fn field_names(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        if self.yaml_content.is_some() {
            names.push("yaml_content");
        }
        if self.task_list.is_some() {
            names.push("task_list");
        }
        names.extend(self.fields.iter().map(|(f, _)| f.as_str()));
        names
    }

    /// Write agent changes into durable state, skipping values already equal there.
    ///
    /// Returns the names of the fields actually written.
    pub fn apply(
        self,
        yaml_content: &mut String,
        task_list: &mut Option<TaskList>,
        fields: &mut ConnectorFields,
    ) -> Vec<&'static str> {
        let mut written = Vec::new();

        if let Some(yaml) = self.yaml_content
            && *yaml_content != yaml
        {
            *yaml_content = yaml;
            written.push("yaml_content");
        }
        if let Some(list) = self.task_list
            && task_list.as_ref() != Some(&list)
        {
            *task_list = Some(list);
            written.push("task_list");
        }
        for (field, value) in self.fields {
            if fields.get(field) != value {
                fields.set(field, value);
                written.push(field.as_str());
            }
        }

        debug!(?written, "SessionChanges::apply: merged");
        written
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Task, TaskStatus};
    use std::sync::Mutex;

    fn session() -> SessionDeps {
        SessionDeps::new("a\nb\n", None, ConnectorFields::default())
    }

    #[test]
    fn test_new_bootstraps_task_list() {
        let deps = session();
        assert!(deps.task_list.contains("collect-info"));
        assert_eq!(deps.task_list.len(), 5);
    }

    #[test]
    fn test_set_field_invokes_setter() {
        let seen = Arc::new(Mutex::new(Vec::<String>::new()));
        let sink = seen.clone();
        let mut deps = session().with_setter(
            FormField::ConnectorName,
            Arc::new(move |v: &str| sink.lock().unwrap().push(v.to_string())),
        );

        deps.set_field(FormField::ConnectorName, "source-users");
        deps.set_field(FormField::TestList, "no setter here");

        assert_eq!(deps.fields.connector_name, "source-users");
        assert_eq!(deps.fields.test_list, "no setter here");
        assert_eq!(*seen.lock().unwrap(), vec!["source-users".to_string()]);
    }

    #[test]
    fn test_untouched_session_has_no_changes() {
        let deps = session();
        let baseline = deps.snapshot();
        assert!(deps.changes_since(&baseline).is_empty());
    }

    #[test]
    fn test_changes_only_agent_edits() {
        let mut deps = session();
        let baseline = deps.snapshot();
        deps.yaml_content = "changed\n".to_string();
        deps.task_list
            .append(Task::stream("users-1", "Read users", "users", None))
            .unwrap();
        deps.set_field(FormField::SourceApiName, "Users API");

        let changes = deps.changes_since(&baseline);
        assert_eq!(
            changes.field_names(),
            vec!["yaml_content", "task_list", "source_api_name"]
        );
    }

    #[test]
    fn test_apply_skips_fields_agent_did_not_touch() {
        let mut deps = session();
        let baseline = deps.snapshot();
        deps.task_list
            .update_status("collect-info", TaskStatus::InProgress, None)
            .unwrap();
        let changes = deps.changes_since(&baseline);

        // UI edits that landed mid-turn
        let mut yaml = "edited in the UI\n".to_string();
        let mut fields = ConnectorFields {
            connector_name: "ui-name".to_string(),
            ..Default::default()
        };
        let mut task_list = None;

        let written = changes.apply(&mut yaml, &mut task_list, &mut fields);
        assert_eq!(written, vec!["task_list"]);
        assert_eq!(yaml, "edited in the UI\n");
        assert_eq!(fields.connector_name, "ui-name");
        assert_eq!(
            task_list.unwrap().get_by_id("collect-info").unwrap().status(),
            TaskStatus::InProgress
        );
    }

    #[test]
    fn test_apply_skips_equal_values() {
        let mut deps = session();
        let baseline = deps.snapshot();
        deps.set_field(FormField::TestList, "same");
        let changes = deps.changes_since(&baseline);

        let mut yaml = String::new();
        let mut task_list = None;
        let mut fields = ConnectorFields {
            test_list: "same".to_string(),
            ..Default::default()
        };
        assert!(changes.apply(&mut yaml, &mut task_list, &mut fields).is_empty());
    }
}
