//! Task list tools
//!
//! Thin wrappers over [`TaskList`](crate::domain::TaskList). Every failure is
//! reported to the agent as an `Error:` result.

use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::debug;

use super::{optional_str, required_int, required_str};
use crate::domain::{Task, TaskCategory, TaskError, TaskStatus};
use crate::tools::{Tool, ToolContext, ToolError, ToolResult};

fn task_error(e: TaskError) -> ToolResult {
    ToolResult::error(e.to_string())
}

/// Build a task from the shared add/insert parameters
fn task_from_input(input: &Value) -> Result<Task, ToolResult> {
    let category = required_str(input, "category")?
        .parse::<TaskCategory>()
        .map_err(task_error)?;
    let id = required_str(input, "task_id")?;
    let name = required_str(input, "task_name")?;
    let description = optional_str(input, "description").map(str::to_string);
    let stream_name = optional_str(input, "stream_name").map(str::to_string);
    Task::new(category, id, name, description, stream_name).map_err(task_error)
}

fn task_properties() -> Value {
    json!({
        "category": {
            "type": "string",
            "enum": ["connector", "stream", "finalization"],
            "description": "Task category"
        },
        "task_id": {
            "type": "string",
            "description": "Unique task identifier"
        },
        "task_name": {
            "type": "string",
            "description": "Short task title"
        },
        "description": {
            "type": "string",
            "description": "Longer description of the work"
        },
        "stream_name": {
            "type": "string",
            "description": "Stream the task concerns (required for stream tasks, not allowed otherwise)"
        }
    })
}

/// Render the task list with progress
pub struct ListTasksTool;

#[async_trait]
impl Tool for ListTasksTool {
    fn name(&self) -> &str {
        "list_tasks"
    }

    fn description(&self) -> &str {
        "List all tasks with their ids, statuses and overall progress."
    }

    fn input_schema(&self) -> Value {
        json!({ "type": "object", "properties": {} })
    }

    async fn execute(&self, _input: Value, ctx: &ToolContext) -> Result<ToolResult, ToolError> {
        debug!("ListTasksTool::execute: called");
        Ok(ToolResult::success(ctx.session().await.task_list.render()))
    }
}

/// Append a task to its category
pub struct AddTaskTool;

#[async_trait]
impl Tool for AddTaskTool {
    fn name(&self) -> &str {
        "add_task"
    }

    fn description(&self) -> &str {
        "Add a new task at the end of its category. Stream tasks need a stream_name."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": task_properties(),
            "required": ["category", "task_id", "task_name"]
        })
    }

    async fn execute(&self, input: Value, ctx: &ToolContext) -> Result<ToolResult, ToolError> {
        debug!(?input, "AddTaskTool::execute: called");
        let task = arg!(task_from_input(&input));
        let (id, category) = (task.id().to_string(), task.category());

        let mut session = ctx.session().await;
        Ok(match session.task_list.append(task) {
            Ok(()) => ToolResult::success(format!("Added {} task '{}'", category, id)),
            Err(e) => task_error(e),
        })
    }
}

/// Insert a task at a position within its category
pub struct InsertTaskTool;

#[async_trait]
impl Tool for InsertTaskTool {
    fn name(&self) -> &str {
        "insert_task"
    }

    fn description(&self) -> &str {
        "Insert a new task at a 0-indexed position within its category. Positions past the end append."
    }

    fn input_schema(&self) -> Value {
        let mut properties = task_properties();
        if let Some(map) = properties.as_object_mut() {
            map.insert(
                "position".to_string(),
                json!({
                    "type": "integer",
                    "description": "0-indexed position within the category"
                }),
            );
        }
        json!({
            "type": "object",
            "properties": properties,
            "required": ["category", "task_id", "task_name", "position"]
        })
    }

    async fn execute(&self, input: Value, ctx: &ToolContext) -> Result<ToolResult, ToolError> {
        debug!(?input, "InsertTaskTool::execute: called");
        let position = arg!(required_int(&input, "position")).max(0) as usize;
        let task = arg!(task_from_input(&input));
        let (id, category) = (task.id().to_string(), task.category());

        let mut session = ctx.session().await;
        Ok(match session.task_list.insert(category, position, task) {
            Ok(used) => ToolResult::success(format!("Inserted {} task '{}' at position {}", category, id, used)),
            Err(e) => task_error(e),
        })
    }
}

/// Change a task's status
pub struct UpdateTaskStatusTool;

#[async_trait]
impl Tool for UpdateTaskStatusTool {
    fn name(&self) -> &str {
        "update_task_status"
    }

    fn description(&self) -> &str {
        "Set a task's status (not_started, in_progress, completed, blocked), optionally with a short detail \
        such as why it is blocked."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "task_id": {
                    "type": "string",
                    "description": "Task to update"
                },
                "status": {
                    "type": "string",
                    "enum": TaskStatus::ALL.iter().map(|s| s.as_str()).collect::<Vec<_>>(),
                    "description": "New status"
                },
                "status_detail": {
                    "type": "string",
                    "description": "Optional detail about the status"
                }
            },
            "required": ["task_id", "status"]
        })
    }

    async fn execute(&self, input: Value, ctx: &ToolContext) -> Result<ToolResult, ToolError> {
        debug!(?input, "UpdateTaskStatusTool::execute: called");
        let id = arg!(required_str(&input, "task_id"));
        let status = arg!(
            arg!(required_str(&input, "status"))
                .parse::<TaskStatus>()
                .map_err(task_error)
        );
        let detail = optional_str(&input, "status_detail").map(str::to_string);

        let mut session = ctx.session().await;
        Ok(match session.task_list.update_status(id, status, detail) {
            Ok(task) => ToolResult::success(format!("Updated task '{}' to {}: {}", id, status, task)),
            Err(e) => task_error(e),
        })
    }
}

/// Remove a task
pub struct RemoveTaskTool;

#[async_trait]
impl Tool for RemoveTaskTool {
    fn name(&self) -> &str {
        "remove_task"
    }

    fn description(&self) -> &str {
        "Remove a task by id."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "task_id": {
                    "type": "string",
                    "description": "Task to remove"
                }
            },
            "required": ["task_id"]
        })
    }

    async fn execute(&self, input: Value, ctx: &ToolContext) -> Result<ToolResult, ToolError> {
        debug!(?input, "RemoveTaskTool::execute: called");
        let id = arg!(required_str(&input, "task_id"));

        let mut session = ctx.session().await;
        Ok(match session.task_list.remove(id) {
            Ok(task) => ToolResult::success(format!("Removed task '{}' ({})", id, task.name())),
            Err(e) => task_error(e),
        })
    }
}
