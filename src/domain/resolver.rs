//! Execution order resolution
//!
//! Depth-first post-order topological sort over a [`TaskGraph`]. Each task is
//! emitted after all of its dependencies, dependencies are visited in the
//! order they were declared, and roots in the order they were given. The
//! traversal keeps its own stack instead of recursing, so long dependency
//! chains cannot overflow the call stack.
//!
//! Resolution is all-or-nothing: an unknown dependency or a cycle aborts the
//! whole call and no partial order is returned.

use std::collections::HashSet;

use tracing::debug;

use super::graph::{GraphError, TaskGraph};
use super::id::TaskId;
use super::task::Task;

/// Resolves an execution order for `roots`, or for every task when `roots` is `None`
///
/// The returned order contains every task reachable from the roots exactly
/// once, and every task appears after all of its dependencies.
pub fn resolve(graph: &TaskGraph, roots: Option<&[TaskId]>) -> Result<Vec<TaskId>, GraphError> {
    debug!(
        tasks = graph.len(),
        roots = ?roots.map(|r| r.len()),
        "Resolving execution order"
    );

    let mut state = ResolutionState::new(graph);

    match roots {
        Some(roots) => {
            for root in roots {
                state.visit(root)?;
            }
        }
        None => {
            for root in graph.task_ids() {
                state.visit(root)?;
            }
        }
    }

    debug!(scheduled = state.order.len(), "Resolved execution order");
    Ok(state.order)
}

/// A task on the active traversal path and the next dependency to visit
struct Frame<'g> {
    task: &'g Task,
    next_dep: usize,
}

/// Bookkeeping for a single resolution call
struct ResolutionState<'g> {
    graph: &'g TaskGraph,
    /// Tasks already appended to `order`
    visited: HashSet<&'g str>,
    /// Tasks on the active path
    visiting: HashSet<&'g str>,
    path: Vec<Frame<'g>>,
    order: Vec<TaskId>,
}

impl<'g> ResolutionState<'g> {
    fn new(graph: &'g TaskGraph) -> Self {
        Self {
            graph,
            visited: HashSet::new(),
            visiting: HashSet::new(),
            path: Vec::new(),
            order: Vec::with_capacity(graph.len()),
        }
    }

    /// Schedules `root` and everything it depends on
    fn visit(&mut self, root: &TaskId) -> Result<(), GraphError> {
        self.enter(root)?;

        while let Some(frame) = self.path.last_mut() {
            let task: &'g Task = frame.task;

            match task.dependencies.get(frame.next_dep) {
                Some(dep) => {
                    frame.next_dep += 1;
                    self.enter(dep)?;
                }
                None => {
                    self.path.pop();
                    self.visiting.remove(task.id.as_str());
                    self.visited.insert(task.id.as_str());
                    self.order.push(task.id.clone());
                }
            }
        }

        Ok(())
    }

    /// Pushes `id` onto the active path unless it is already scheduled
    fn enter(&mut self, id: &TaskId) -> Result<(), GraphError> {
        if self.visited.contains(id.as_str()) {
            return Ok(());
        }

        if self.visiting.contains(id.as_str()) {
            return Err(GraphError::CycleDetected {
                path: self.cycle_path(id),
            });
        }

        let task = self
            .graph
            .get(id.as_str())
            .ok_or_else(|| GraphError::UnknownDependency { id: id.clone() })?;

        self.visiting.insert(task.id.as_str());
        self.path.push(Frame { task, next_dep: 0 });
        Ok(())
    }

    /// The active path from the first occurrence of `id` back to `id`
    fn cycle_path(&self, id: &TaskId) -> Vec<TaskId> {
        let start = self
            .path
            .iter()
            .position(|frame| frame.task.id == *id)
            .unwrap_or(0);

        self.path[start..]
            .iter()
            .map(|frame| frame.task.id.clone())
            .chain(std::iter::once(id.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> TaskId {
        TaskId::new(s).unwrap()
    }

    fn ids(names: &[&str]) -> Vec<TaskId> {
        names.iter().map(|n| id(n)).collect()
    }

    fn graph(decl: &[(&str, &[&str])]) -> TaskGraph {
        TaskGraph::from_tasks(
            decl.iter()
                .map(|(name, deps)| Task::new(id(name)).with_dependencies(ids(deps))),
        )
        .unwrap()
    }

    fn position(order: &[TaskId], name: &str) -> usize {
        order.iter().position(|t| t.as_str() == name).unwrap()
    }

    #[test]
    fn empty_graph_resolves_to_empty_order() {
        let g = TaskGraph::new();
        assert!(resolve(&g, None).unwrap().is_empty());
        assert!(resolve(&g, Some(&[])).unwrap().is_empty());
    }

    #[test]
    fn empty_roots_schedule_nothing() {
        let g = graph(&[("a", &[]), ("b", &["a"])]);
        assert!(resolve(&g, Some(&[])).unwrap().is_empty());
    }

    #[test]
    fn linear_chain() {
        let g = graph(&[("c", &["b"]), ("b", &["a"]), ("a", &[])]);
        assert_eq!(resolve(&g, None).unwrap(), ids(&["a", "b", "c"]));
    }

    #[test]
    fn diamond_schedules_shared_dependency_once() {
        let g = graph(&[("A", &[]), ("B", &["A"]), ("C", &["A"]), ("D", &["B", "C"])]);

        let order = resolve(&g, Some(&ids(&["D"]))).unwrap();
        assert_eq!(order, ids(&["A", "B", "C", "D"]));
    }

    #[test]
    fn declared_dependency_order_breaks_ties() {
        let g = graph(&[("A", &[]), ("B", &["A"]), ("C", &["A"]), ("D", &["C", "B"])]);

        let order = resolve(&g, Some(&ids(&["D"]))).unwrap();
        assert_eq!(order, ids(&["A", "C", "B", "D"]));
    }

    #[test]
    fn only_reachable_tasks_are_scheduled() {
        let g = graph(&[("a", &[]), ("b", &["a"]), ("unrelated", &[])]);

        let order = resolve(&g, Some(&ids(&["b"]))).unwrap();
        assert_eq!(order, ids(&["a", "b"]));
    }

    #[test]
    fn repeated_and_overlapping_roots() {
        let g = graph(&[("a", &[]), ("b", &["a"]), ("c", &["a"])]);

        let order = resolve(&g, Some(&ids(&["b", "b", "c", "a"]))).unwrap();
        assert_eq!(order, ids(&["a", "b", "c"]));
    }

    #[test]
    fn disconnected_components_follow_registration_order() {
        let g = graph(&[("x2", &["x1"]), ("y", &[]), ("x1", &[]), ("z", &["y"])]);

        let order = resolve(&g, None).unwrap();
        assert_eq!(order, ids(&["x1", "x2", "y", "z"]));
    }

    #[test]
    fn resolution_is_idempotent() {
        let g = graph(&[("A", &[]), ("B", &["A"]), ("C", &["A"]), ("D", &["B", "C"])]);

        let first = resolve(&g, None).unwrap();
        let second = resolve(&g, None).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn self_dependency_is_a_cycle() {
        let g = graph(&[("A", &["A"])]);

        let err = resolve(&g, None).unwrap_err();
        assert_eq!(err, GraphError::CycleDetected { path: ids(&["A", "A"]) });
    }

    #[test]
    fn two_node_cycle() {
        let g = graph(&[("A", &["B"]), ("B", &["A"])]);

        let err = resolve(&g, None).unwrap_err();
        assert_eq!(
            err,
            GraphError::CycleDetected {
                path: ids(&["A", "B", "A"])
            }
        );
    }

    #[test]
    fn cycle_path_excludes_the_lead_in() {
        let g = graph(&[("top", &["x"]), ("x", &["y"]), ("y", &["z"]), ("z", &["x"])]);

        let err = resolve(&g, Some(&ids(&["top"]))).unwrap_err();
        assert_eq!(
            err,
            GraphError::CycleDetected {
                path: ids(&["x", "y", "z", "x"])
            }
        );
    }

    #[test]
    fn unknown_dependency() {
        let g = graph(&[("A", &["Z"])]);

        let err = resolve(&g, None).unwrap_err();
        assert_eq!(err, GraphError::UnknownDependency { id: id("Z") });
    }

    #[test]
    fn unknown_root() {
        let g = graph(&[("A", &[])]);

        let err = resolve(&g, Some(&ids(&["missing"]))).unwrap_err();
        assert_eq!(err, GraphError::UnknownDependency { id: id("missing") });
    }

    #[test]
    fn error_after_valid_prefix_returns_no_order() {
        // "a" resolves cleanly before "b" hits the unknown dependency
        let g = graph(&[("a", &[]), ("b", &["a", "ghost"])]);

        assert!(resolve(&g, None).is_err());
    }

    #[test]
    fn every_dependency_precedes_its_dependent() {
        let g = graph(&[
            ("link", &["compile", "assets"]),
            ("compile", &["fetch", "codegen"]),
            ("codegen", &["fetch"]),
            ("assets", &["fetch"]),
            ("fetch", &[]),
            ("package", &["link", "docs"]),
            ("docs", &["codegen"]),
        ]);

        let order = resolve(&g, None).unwrap();
        assert_eq!(order.len(), g.len());

        for task in g.tasks() {
            for dep in &task.dependencies {
                assert!(
                    position(&order, dep.as_str()) < position(&order, task.id.as_str()),
                    "{} must come before {}",
                    dep,
                    task.id
                );
            }
        }
    }

    #[test]
    fn shared_graph_resolves_from_many_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<TaskGraph>();

        let g = std::sync::Arc::new(graph(&[
            ("A", &[]),
            ("B", &["A"]),
            ("C", &["A"]),
            ("D", &["B", "C"]),
        ]));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let g = std::sync::Arc::clone(&g);
                std::thread::spawn(move || resolve(&g, None))
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap().unwrap(), ids(&["A", "B", "C", "D"]));
        }
    }

    #[test]
    fn deep_chain_does_not_overflow() {
        let names: Vec<String> = (0..50_000).map(|i| format!("t{}", i)).collect();
        let tasks = names.iter().enumerate().map(|(i, name)| {
            let task = Task::new(id(name));
            if i == 0 {
                task
            } else {
                task.with_dependencies([id(&names[i - 1])])
            }
        });
        let g = TaskGraph::from_tasks(tasks).unwrap();

        let last = id(&names[names.len() - 1]);
        let order = resolve(&g, Some(std::slice::from_ref(&last))).unwrap();
        assert_eq!(order.len(), 50_000);
        assert_eq!(order[0].as_str(), "t0");
        assert_eq!(order[49_999], last);
    }
}
