//! Task graph
//!
//! Holds the declared tasks keyed by id, iterated in registration order so
//! that every derived ordering is deterministic. The graph is built once and
//! then only read; resolution lives in [`super::resolver`].

use petgraph::dot::{Config, Dot};
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::{HashMap, HashSet};
use thiserror::Error;

use super::id::TaskId;
use super::resolver;
use super::task::Task;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum GraphError {
    #[error("Unknown dependency: {id}")]
    UnknownDependency { id: TaskId },

    #[error("Dependency cycle detected: {}", join_path(.path))]
    CycleDetected { path: Vec<TaskId> },

    #[error("Duplicate task ID: {id}")]
    DuplicateTask { id: TaskId },
}

fn join_path(path: &[TaskId]) -> String {
    path.iter()
        .map(TaskId::as_str)
        .collect::<Vec<_>>()
        .join(" -> ")
}

/// The set of declared tasks, keyed by id
#[derive(Debug, Clone, Default)]
pub struct TaskGraph {
    /// Tasks in registration order
    tasks: Vec<Task>,

    /// Map from TaskId to position in `tasks`
    index: HashMap<TaskId, usize>,
}

impl TaskGraph {
    /// Creates an empty task graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a graph from a collection of tasks, in iteration order
    pub fn from_tasks(tasks: impl IntoIterator<Item = Task>) -> Result<Self, GraphError> {
        let mut graph = Self::new();
        for task in tasks {
            graph.add_task(task)?;
        }
        Ok(graph)
    }

    /// Registers a task
    ///
    /// Dependencies are not checked here; a task may name a dependency that
    /// is registered later. Unknown ids surface when the graph is resolved.
    pub fn add_task(&mut self, task: Task) -> Result<(), GraphError> {
        if self.index.contains_key(&task.id) {
            return Err(GraphError::DuplicateTask {
                id: task.id.clone(),
            });
        }

        self.index.insert(task.id.clone(), self.tasks.len());
        self.tasks.push(task);
        Ok(())
    }

    /// Returns the task with the given id
    pub fn get(&self, id: &str) -> Option<&Task> {
        self.index.get(id).map(|&i| &self.tasks[i])
    }

    /// Returns true if the graph contains the task
    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Returns the number of tasks in the graph
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Returns true if the graph is empty
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Returns all tasks in registration order
    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.tasks.iter()
    }

    /// Returns all task IDs in registration order
    pub fn task_ids(&self) -> impl Iterator<Item = &TaskId> {
        self.tasks.iter().map(|t| &t.id)
    }

    /// Returns the declared dependencies of a task
    pub fn dependencies(&self, id: &str) -> &[TaskId] {
        self.get(id).map(|t| t.dependencies.as_slice()).unwrap_or(&[])
    }

    /// Returns tasks that are not done and whose dependencies are all done
    pub fn ready_tasks(&self, done: &HashSet<TaskId>) -> Vec<TaskId> {
        self.tasks
            .iter()
            .filter(|t| !done.contains(&t.id))
            .filter(|t| t.dependencies.iter().all(|d| done.contains(d)))
            .map(|t| t.id.clone())
            .collect()
    }

    /// Returns tasks that are not done, paired with their unfinished dependencies
    pub fn blocked_tasks(&self, done: &HashSet<TaskId>) -> Vec<(TaskId, Vec<TaskId>)> {
        self.tasks
            .iter()
            .filter(|t| !done.contains(&t.id))
            .filter_map(|t| {
                let blockers: Vec<TaskId> = t
                    .dependencies
                    .iter()
                    .filter(|d| !done.contains(*d))
                    .cloned()
                    .collect();
                (!blockers.is_empty()).then(|| (t.id.clone(), blockers))
            })
            .collect()
    }

    /// Resolves an execution order for the given targets
    pub fn resolve(&self, roots: &[TaskId]) -> Result<Vec<TaskId>, GraphError> {
        resolver::resolve(self, Some(roots))
    }

    /// Resolves an execution order covering every task
    pub fn resolve_all(&self) -> Result<Vec<TaskId>, GraphError> {
        resolver::resolve(self, None)
    }

    /// Checks that every dependency exists and there are no cycles
    pub fn validate(&self) -> Result<(), GraphError> {
        self.resolve_all().map(|_| ())
    }

    /// Renders the graph in Graphviz DOT format
    ///
    /// Edges point from a dependency to the task that requires it.
    /// Dependencies on unknown tasks are drawn as extra nodes.
    pub fn to_dot(&self) -> String {
        let mut graph: DiGraph<&str, &str> = DiGraph::new();
        let mut nodes: HashMap<&str, NodeIndex> = HashMap::new();

        for task in &self.tasks {
            let idx = graph.add_node(task.id.as_str());
            nodes.insert(task.id.as_str(), idx);
        }

        for task in &self.tasks {
            let task_idx = nodes[task.id.as_str()];
            for dep in &task.dependencies {
                let dep_idx = *nodes
                    .entry(dep.as_str())
                    .or_insert_with(|| graph.add_node(dep.as_str()));
                graph.add_edge(dep_idx, task_idx, "");
            }
        }

        format!("{}", Dot::with_config(&graph, &[Config::EdgeNoLabel]))
    }
}
