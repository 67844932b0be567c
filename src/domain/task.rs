//! Task domain model
//!
//! A task is a named unit of work with an ordered list of prerequisites.
//! Tasks are immutable once registered in a graph.

use serde::{Deserialize, Serialize};

use super::id::TaskId;

/// A named unit of work and the tasks it requires first
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Unique identifier
    pub id: TaskId,

    /// Human-readable description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Tasks that must complete before this one, in declared order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<TaskId>,
}

impl Task {
    /// Creates a task with no dependencies
    pub fn new(id: TaskId) -> Self {
        Self {
            id,
            description: None,
            dependencies: Vec::new(),
        }
    }

    /// Sets the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Appends dependencies, keeping declared order and dropping repeats
    pub fn with_dependencies(mut self, deps: impl IntoIterator<Item = TaskId>) -> Self {
        for dep in deps {
            if !self.dependencies.contains(&dep) {
                self.dependencies.push(dep);
            }
        }
        self
    }
}

/// Execution state of a task
///
/// `Pending -> Running -> {Committed | Failed}`, and after a failure with
/// rollback enabled, `Committed -> {RolledBack | RollbackFailed}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    #[default]
    Pending,
    Running,
    Committed,
    Failed,
    RolledBack,
    RollbackFailed,
}

impl TaskState {
    /// Returns the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskState::Pending => "pending",
            TaskState::Running => "running",
            TaskState::Committed => "committed",
            TaskState::Failed => "failed",
            TaskState::RolledBack => "rolled_back",
            TaskState::RollbackFailed => "rollback_failed",
        }
    }
}

impl std::fmt::Display for TaskState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> TaskId {
        TaskId::new(s).unwrap()
    }

    #[test]
    fn new_task_has_no_dependencies() {
        let task = Task::new(id("a"));
        assert!(task.dependencies.is_empty());
        assert!(task.description.is_none());
    }

    #[test]
    fn dependencies_keep_declared_order() {
        let task = Task::new(id("d")).with_dependencies([id("c"), id("b"), id("c")]);
        assert_eq!(task.dependencies, vec![id("c"), id("b")]);
    }

    #[test]
    fn state_names_match_serialized_form() {
        for state in [TaskState::Pending, TaskState::RolledBack, TaskState::RollbackFailed] {
            let json = serde_json::to_string(&state).unwrap();
            assert_eq!(json, format!("\"{}\"", state.as_str()));
        }
        assert_eq!(TaskState::RollbackFailed.to_string(), "rollback_failed");
    }

    #[test]
    fn task_serialization_skips_empty_fields() {
        let task = Task::new(id("a"));
        let json = serde_json::to_string(&task).unwrap();
        assert_eq!(json, r#"{"id":"a"}"#);
    }
}
