//! Task list: three ordered per-category sequences with unique ids

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::task::{Task, TaskCategory, TaskError, TaskStatus};

/// Counts per status across every category
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSummary {
    pub total: usize,
    pub not_started: usize,
    pub in_progress: usize,
    pub completed: usize,
    pub blocked: usize,
}

impl TaskSummary {
    fn record(&mut self, status: TaskStatus) {
        self.total += 1;
        match status {
            TaskStatus::NotStarted => self.not_started += 1,
            TaskStatus::InProgress => self.in_progress += 1,
            TaskStatus::Completed => self.completed += 1,
            TaskStatus::Blocked => self.blocked += 1,
        }
    }
}

/// Ordered collection of tasks
///
/// Deserializing goes through the same checks as `insert`, so ids stay unique
/// and every task sits in the sequence of its own category.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "TaskListData")]
pub struct TaskList {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    connector_tasks: Vec<Task>,
    #[serde(default)]
    stream_tasks: Vec<Task>,
    #[serde(default)]
    finalization_tasks: Vec<Task>,
}

/// Unvalidated wire form of a [`TaskList`]
#[derive(Deserialize)]
struct TaskListData {
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    connector_tasks: Vec<Task>,
    #[serde(default)]
    stream_tasks: Vec<Task>,
    #[serde(default)]
    finalization_tasks: Vec<Task>,
}

impl TryFrom<TaskListData> for TaskList {
    type Error = TaskError;

    fn try_from(data: TaskListData) -> Result<Self, Self::Error> {
        let mut list = TaskList::new(data.name, data.description);
        for (category, tasks) in [
            (TaskCategory::Connector, data.connector_tasks),
            (TaskCategory::Stream, data.stream_tasks),
            (TaskCategory::Finalization, data.finalization_tasks),
        ] {
            for task in tasks {
                list.insert(category, usize::MAX, task)?;
            }
        }
        Ok(list)
    }
}

impl TaskList {
    /// Empty list with a name and description
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            ..Default::default()
        }
    }

    /// Seed list for a fresh connector build
    pub fn new_connector_build() -> Self {
        debug!("TaskList::new_connector_build: called");
        let mut list = Self::new(
            "Build New Connector",
            "Workflow for building and testing a new connector from scratch",
        );

        list.connector_tasks = vec![
            Task::connector(
                "collect-info",
                "Collect information from user",
                Some("Gather requirements, API details, authentication info, and user expectations".to_string()),
            ),
            Task::connector(
                "research-api",
                "Research and analyze source API",
                Some("Study API documentation, endpoints, rate limits, and data structures".to_string()),
            ),
            Task::connector(
                "first-stream-tasks",
                "Enumerate streams and create first stream's tasks",
                Some(
                    "Identify all available streams and create detailed tasks for implementing the first stream"
                        .to_string(),
                ),
            ),
        ];
        list.finalization_tasks = vec![
            Task::finalization(
                "readiness-pass-1",
                "Run connector readiness report",
                Some(
                    "Execute readiness check. If issues exist, go back and fix them. \
                     Otherwise, create tasks for remaining streams that were enumerated"
                        .to_string(),
                ),
            ),
            Task::finalization(
                "readiness-pass-2",
                "Run connector readiness report",
                Some("Execute final readiness check and create new tasks based on findings".to_string()),
            ),
        ];
        list
    }

    /// Tasks of one category, in storage order
    pub fn tasks(&self, category: TaskCategory) -> &[Task] {
        match category {
            TaskCategory::Connector => &self.connector_tasks,
            TaskCategory::Stream => &self.stream_tasks,
            TaskCategory::Finalization => &self.finalization_tasks,
        }
    }

    fn tasks_mut(&mut self, category: TaskCategory) -> &mut Vec<Task> {
        match category {
            TaskCategory::Connector => &mut self.connector_tasks,
            TaskCategory::Stream => &mut self.stream_tasks,
            TaskCategory::Finalization => &mut self.finalization_tasks,
        }
    }

    /// Every task: connector, then stream, then finalization
    pub fn all_tasks(&self) -> impl Iterator<Item = &Task> {
        self.connector_tasks
            .iter()
            .chain(self.stream_tasks.iter())
            .chain(self.finalization_tasks.iter())
    }

    pub fn len(&self) -> usize {
        self.connector_tasks.len() + self.stream_tasks.len() + self.finalization_tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, id: &str) -> bool {
        self.all_tasks().any(|t| t.id() == id)
    }

    /// Append a task to the end of its category sequence
    pub fn append(&mut self, task: Task) -> Result<(), TaskError> {
        debug!(id = %task.id(), category = %task.category(), "TaskList::append: called");
        if self.contains(task.id()) {
            debug!(id = %task.id(), "TaskList::append: duplicate id");
            return Err(TaskError::DuplicateId(task.id().to_string()));
        }
        self.tasks_mut(task.category()).push(task);
        Ok(())
    }

    /// Insert a task at `position` within `category`, clamped to `[0, len]`.
    ///
    /// Returns the position actually used.
    pub fn insert(&mut self, category: TaskCategory, position: usize, task: Task) -> Result<usize, TaskError> {
        debug!(id = %task.id(), %category, position, "TaskList::insert: called");
        if task.category() != category {
            return Err(TaskError::CategoryMismatch {
                expected: category,
                actual: task.category(),
            });
        }
        if self.contains(task.id()) {
            debug!(id = %task.id(), "TaskList::insert: duplicate id");
            return Err(TaskError::DuplicateId(task.id().to_string()));
        }
        let tasks = self.tasks_mut(category);
        let position = position.min(tasks.len());
        tasks.insert(position, task);
        Ok(position)
    }

    pub fn get_by_id(&self, id: &str) -> Result<&Task, TaskError> {
        self.all_tasks()
            .find(|t| t.id() == id)
            .ok_or_else(|| TaskError::NotFound(id.to_string()))
    }

    fn get_by_id_mut(&mut self, id: &str) -> Result<&mut Task, TaskError> {
        self.connector_tasks
            .iter_mut()
            .chain(self.stream_tasks.iter_mut())
            .chain(self.finalization_tasks.iter_mut())
            .find(|t| t.id() == id)
            .ok_or_else(|| TaskError::NotFound(id.to_string()))
    }

    /// Set a task's status; `detail` replaces the status detail only when given
    pub fn update_status(&mut self, id: &str, status: TaskStatus, detail: Option<String>) -> Result<&Task, TaskError> {
        debug!(%id, %status, "TaskList::update_status: called");
        let task = self.get_by_id_mut(id)?;
        task.set_status(status, detail);
        Ok(task)
    }

    /// Remove a task from whichever sequence holds it
    pub fn remove(&mut self, id: &str) -> Result<Task, TaskError> {
        debug!(%id, "TaskList::remove: called");
        for category in TaskCategory::ALL {
            let tasks = self.tasks_mut(category);
            if let Some(index) = tasks.iter().position(|t| t.id() == id) {
                return Ok(tasks.remove(index));
            }
        }
        debug!(%id, "TaskList::remove: not found");
        Err(TaskError::NotFound(id.to_string()))
    }

    pub fn summary(&self) -> TaskSummary {
        let mut summary = TaskSummary::default();
        for task in self.all_tasks() {
            summary.record(task.status());
        }
        summary
    }

    /// Human-readable listing used by the `list_tasks` tool
    pub fn render(&self) -> String {
        let summary = self.summary();
        let mut out = format!(
            "{}\n{}\n\nProgress: {}/{} completed, {} in progress, {} blocked\n",
            self.name, self.description, summary.completed, summary.total, summary.in_progress, summary.blocked
        );

        for (category, heading) in [
            (TaskCategory::Connector, "Connector Tasks"),
            (TaskCategory::Stream, "Stream Tasks"),
            (TaskCategory::Finalization, "Finalization Tasks"),
        ] {
            let tasks = self.tasks(category);
            out.push_str(&format!("\n{}:\n", heading));
            if tasks.is_empty() {
                out.push_str("  (none)\n");
                continue;
            }
            for task in tasks {
                out.push_str(&format!("  - [{}] {} ({})", task.id(), task, task.status()));
                if task.stream_name().is_some()
                    && let Some(detail) = task.status_detail()
                {
                    out.push_str(&format!(" - {}", detail));
                }
                out.push('\n');
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_bootstrap_seed() {
        let list = TaskList::new_connector_build();
        let ids: Vec<&str> = list.all_tasks().map(|t| t.id()).collect();
        assert_eq!(
            ids,
            vec![
                "collect-info",
                "research-api",
                "first-stream-tasks",
                "readiness-pass-1",
                "readiness-pass-2"
            ]
        );
        assert!(list.tasks(TaskCategory::Stream).is_empty());
        assert_eq!(list.summary().not_started, 5);
    }

    #[test]
    fn test_append_rejects_duplicate_across_categories() {
        let mut list = TaskList::new_connector_build();
        let dup = Task::stream("collect-info", "Read users", "users", None);

        assert_eq!(list.append(dup), Err(TaskError::DuplicateId("collect-info".to_string())));
        assert_eq!(list.len(), 5);
    }

    #[test]
    fn test_insert_clamps_position() {
        let mut list = TaskList::new_connector_build();
        let pos = list
            .insert(TaskCategory::Connector, 99, Task::connector("auth", "Configure auth", None))
            .unwrap();
        assert_eq!(pos, 3);
        assert_eq!(list.tasks(TaskCategory::Connector)[3].id(), "auth");

        let pos = list
            .insert(TaskCategory::Connector, 0, Task::connector("first", "First", None))
            .unwrap();
        assert_eq!(pos, 0);
        assert_eq!(list.tasks(TaskCategory::Connector)[0].id(), "first");
    }

    #[test]
    fn test_insert_rejects_category_mismatch() {
        let mut list = TaskList::new_connector_build();
        let err = list
            .insert(TaskCategory::Finalization, 0, Task::connector("x", "X", None))
            .unwrap_err();
        assert!(matches!(err, TaskError::CategoryMismatch { .. }));
    }

    #[test]
    fn test_update_stream_task_status() {
        let mut list = TaskList::new_connector_build();
        list.append(Task::stream("users-1", "Paginate users", "users", None))
            .unwrap();

        list.update_status("users-1", TaskStatus::Completed, Some("200 records".to_string()))
            .unwrap();

        let task = list.get_by_id("users-1").unwrap();
        assert_eq!(task.status(), TaskStatus::Completed);
        assert_eq!(task.status_detail(), Some("200 records"));
        assert_eq!(task.stream_name(), Some("users"));
        assert_eq!(list.summary().completed, 1);
    }

    #[test]
    fn test_unknown_id_is_not_found() {
        let mut list = TaskList::new_connector_build();
        assert_eq!(
            list.get_by_id("nope").unwrap_err(),
            TaskError::NotFound("nope".to_string())
        );
        assert!(list.update_status("nope", TaskStatus::Blocked, None).is_err());
        assert!(list.remove("nope").is_err());
    }

    #[test]
    fn test_remove() {
        let mut list = TaskList::new_connector_build();
        let removed = list.remove("research-api").unwrap();
        assert_eq!(removed.id(), "research-api");
        assert!(!list.contains("research-api"));
        assert_eq!(list.len(), 4);
    }

    #[test]
    fn test_deserialize_round_trips_valid_list() {
        let mut list = TaskList::new_connector_build();
        list.append(Task::stream("users-setup", "Setup", "users", None)).unwrap();
        let json = serde_json::to_value(&list).unwrap();
        let back: TaskList = serde_json::from_value(json).unwrap();
        assert_eq!(back, list);
    }

    #[test]
    fn test_deserialize_rejects_duplicate_ids() {
        let json = serde_json::json!({
            "name": "t",
            "connector_tasks": [
                { "id": "a", "name": "A", "category": "connector", "status": "not_started" },
            ],
            "finalization_tasks": [
                { "id": "a", "name": "Again", "category": "finalization", "status": "not_started" },
            ],
        });
        let err = serde_json::from_value::<TaskList>(json).unwrap_err();
        assert!(err.to_string().contains("Task with ID 'a' already exists."), "{}", err);
    }

    #[test]
    fn test_deserialize_rejects_task_in_wrong_sequence() {
        let json = serde_json::json!({
            "name": "t",
            "connector_tasks": [
                { "id": "s", "name": "S", "category": "stream", "stream_name": "users", "status": "not_started" },
            ],
        });
        let err = serde_json::from_value::<TaskList>(json).unwrap_err();
        assert!(err.to_string().contains("Task category mismatch"), "{}", err);
    }

    #[test]
    fn test_render_lists_every_task() {
        let list = TaskList::new_connector_build();
        let text = list.render();
        assert!(text.starts_with("Build New Connector"));
        assert!(text.contains("[collect-info]"));
        assert!(text.contains("Stream Tasks:\n  (none)"));
        assert!(text.contains("[readiness-pass-2]"));
    }

    fn arb_status() -> impl Strategy<Value = TaskStatus> {
        prop::sample::select(TaskStatus::ALL.to_vec())
    }

    fn arb_category() -> impl Strategy<Value = TaskCategory> {
        prop::sample::select(TaskCategory::ALL.to_vec())
    }

    proptest! {
        #[test]
        fn prop_summary_matches_statuses(
            entries in prop::collection::vec((arb_category(), arb_status()), 0..40)
        ) {
            let mut list = TaskList::new("t", "");
            for (i, (category, status)) in entries.iter().enumerate() {
                let id = format!("t{}", i);
                let stream_name = (*category == TaskCategory::Stream).then(|| "s".to_string());
                let task = Task::new(*category, id.clone(), "n", None, stream_name).unwrap();
                list.append(task).unwrap();
                list.update_status(&id, *status, None).unwrap();
            }

            let summary = list.summary();
            prop_assert_eq!(summary.total, entries.len());
            prop_assert_eq!(
                summary.not_started + summary.in_progress + summary.completed + summary.blocked,
                summary.total
            );
            let completed = entries.iter().filter(|(_, s)| *s == TaskStatus::Completed).count();
            prop_assert_eq!(summary.completed, completed);
        }

        #[test]
        fn prop_ids_stay_unique(ids in prop::collection::vec("[a-c]{1,2}", 0..30)) {
            let mut list = TaskList::new("t", "");
            for id in &ids {
                let _ = list.append(Task::connector(id.clone(), "n", None));
            }
            let mut seen: Vec<&str> = list.all_tasks().map(|t| t.id()).collect();
            let before = seen.len();
            seen.sort();
            seen.dedup();
            prop_assert_eq!(seen.len(), before);
        }

        #[test]
        fn prop_category_survives_mutation(
            statuses in prop::collection::vec(arb_status(), 1..10)
        ) {
            let mut list = TaskList::new("t", "");
            list.append(Task::stream("s", "n", "users", None)).unwrap();
            for status in statuses {
                list.update_status("s", status, Some("d".to_string())).unwrap();
            }
            let task = list.get_by_id("s").unwrap();
            prop_assert_eq!(task.category(), TaskCategory::Stream);
            prop_assert_eq!(task.stream_name(), Some("users"));
        }
    }
}
