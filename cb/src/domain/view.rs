//! Read-only projections of the task list for rendering

use serde::Serialize;

use super::task::{Task, TaskCategory, TaskStatus};
use super::task_list::{TaskList, TaskSummary};

impl TaskStatus {
    /// Progress-panel icon; stream and finalization panels mark completion with a check
    pub fn icon(&self, category: TaskCategory) -> &'static str {
        match (self, category) {
            (Self::NotStarted, _) => "○",
            (Self::InProgress, _) => "◐",
            (Self::Completed, TaskCategory::Connector) => "●",
            (Self::Completed, _) => "✅",
            (Self::Blocked, _) => "⛔",
        }
    }

    /// Progress-panel colour token
    pub fn color(&self) -> &'static str {
        match self {
            Self::NotStarted => "gray.400",
            Self::InProgress => "blue.400",
            Self::Completed => "green.400",
            Self::Blocked => "red.400",
        }
    }
}

/// One row in a progress panel
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskView {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream_name: Option<String>,
    pub title: String,
    pub details: String,
    pub status: TaskStatus,
    pub icon: &'static str,
    pub color: &'static str,
}

impl From<&Task> for TaskView {
    fn from(task: &Task) -> Self {
        let status = task.status();
        Self {
            id: task.id().to_string(),
            stream_name: task.stream_name().map(str::to_string),
            title: task.name().to_string(),
            details: task
                .status_detail()
                .or(task.description())
                .unwrap_or_default()
                .to_string(),
            status,
            icon: status.icon(task.category()),
            color: status.color(),
        }
    }
}

/// Name, description and counts shown above the panels
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TaskListHeader {
    pub name: String,
    pub description: String,
    pub summary: TaskSummary,
}

impl TaskListHeader {
    pub fn completed_label(&self) -> String {
        format!("{}/{} Completed", self.summary.completed, self.summary.total)
    }

    pub fn in_progress_label(&self) -> String {
        format!("{} In Progress", self.summary.in_progress)
    }

    pub fn blocked_label(&self) -> String {
        format!("{} Blocked", self.summary.blocked)
    }
}

/// Everything the progress panel renders
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProgressView {
    pub header: TaskListHeader,
    pub connector: Vec<TaskView>,
    pub stream: Vec<TaskView>,
    pub finalization: Vec<TaskView>,
}

impl ProgressView {
    /// Project a task list; `None` yields empty panels and a zeroed header
    pub fn from_task_list(list: Option<&TaskList>) -> Self {
        let Some(list) = list else {
            return Self::default();
        };

        let views = |category: TaskCategory| list.tasks(category).iter().map(TaskView::from).collect::<Vec<_>>();
        let mut stream = views(TaskCategory::Stream);
        stream.sort_by(|a, b| (&a.stream_name, &a.title).cmp(&(&b.stream_name, &b.title)));

        Self {
            header: TaskListHeader {
                name: list.name.clone(),
                description: list.description.clone(),
                summary: list.summary(),
            },
            connector: views(TaskCategory::Connector),
            stream,
            finalization: views(TaskCategory::Finalization),
        }
    }

    pub fn has_tasks(&self) -> bool {
        self.header.summary.total > 0
    }
}

impl std::fmt::Display for ProgressView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if !self.has_tasks() {
            return writeln!(f, "No tasks yet.");
        }
        writeln!(f, "{}", self.header.name)?;
        writeln!(
            f,
            "{}  {}  {}",
            self.header.completed_label(),
            self.header.in_progress_label(),
            self.header.blocked_label()
        )?;
        for (heading, rows) in [
            ("Connector", &self.connector),
            ("Streams", &self.stream),
            ("Finalization", &self.finalization),
        ] {
            if rows.is_empty() {
                continue;
            }
            writeln!(f, "\n{}", heading)?;
            for row in rows {
                match &row.stream_name {
                    Some(stream) => write!(f, "  {} [{}] {}", row.icon, stream, row.title)?,
                    None => write!(f, "  {} {}", row.icon, row.title)?,
                }
                if !row.details.is_empty() {
                    write!(f, " - {}", row.details)?;
                }
                writeln!(f)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_list_projects_empty() {
        let view = ProgressView::from_task_list(None);
        assert!(!view.has_tasks());
        assert_eq!(view.header.completed_label(), "0/0 Completed");
        assert!(view.connector.is_empty());
        assert!(view.stream.is_empty());
    }

    #[test]
    fn test_stream_views_sorted_by_stream_then_title() {
        let mut list = TaskList::new_connector_build();
        list.append(Task::stream("b2", "Schema", "users", None)).unwrap();
        list.append(Task::stream("a1", "Pagination", "posts", None)).unwrap();
        list.append(Task::stream("b1", "Auth", "users", None)).unwrap();

        let view = ProgressView::from_task_list(Some(&list));
        let order: Vec<&str> = view.stream.iter().map(|v| v.id.as_str()).collect();
        assert_eq!(order, vec!["a1", "b1", "b2"]);
    }

    #[test]
    fn test_header_labels() {
        let mut list = TaskList::new_connector_build();
        list.update_status("collect-info", TaskStatus::Completed, None).unwrap();
        list.update_status("research-api", TaskStatus::InProgress, None).unwrap();
        list.update_status("readiness-pass-2", TaskStatus::Blocked, None).unwrap();

        let view = ProgressView::from_task_list(Some(&list));
        assert_eq!(view.header.completed_label(), "1/5 Completed");
        assert_eq!(view.header.in_progress_label(), "1 In Progress");
        assert_eq!(view.header.blocked_label(), "1 Blocked");
    }

    #[test]
    fn test_task_view_icon_and_details() {
        let mut list = TaskList::new_connector_build();
        list.update_status("research-api", TaskStatus::InProgress, Some("reading docs".to_string()))
            .unwrap();
        let view = ProgressView::from_task_list(Some(&list));

        let row = &view.connector[1];
        assert_eq!(row.icon, "◐");
        assert_eq!(row.color, "blue.400");
        assert_eq!(row.details, "reading docs");

        let row = &view.connector[0];
        assert_eq!(row.icon, "○");
        assert!(row.details.starts_with("Gather requirements"));
    }

    #[test]
    fn test_completed_icon_depends_on_panel() {
        let mut list = TaskList::new_connector_build();
        list.append(Task::stream("users-setup", "Setup", "users", None)).unwrap();
        for id in ["collect-info", "users-setup", "readiness-pass-2"] {
            list.update_status(id, TaskStatus::Completed, None).unwrap();
        }
        let view = ProgressView::from_task_list(Some(&list));

        assert_eq!(view.connector[0].icon, "●");
        assert_eq!(view.stream[0].icon, "✅");
        let finalization = view.finalization.iter().find(|v| v.id == "readiness-pass-2").unwrap();
        assert_eq!(finalization.icon, "✅");
        assert_eq!(finalization.color, "green.400");
    }
}
