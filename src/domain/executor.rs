//! Sequential task execution with optional rollback
//!
//! Runs the actions of a resolved order one at a time. The first failure
//! stops the run; tasks after it are never invoked. When rollback is enabled
//! every committed task is unwound in reverse commit order, and a failing
//! rollback step does not prevent the remaining ones from running.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::id::TaskId;
use super::task::TaskState;

/// Error returned by an action, passed through to the caller unmodified
pub type ActionError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The side effect associated with a task
pub trait Action {
    /// Performs the task's work
    fn run(&mut self) -> Result<(), ActionError>;

    /// Undoes the work of a successful `run`
    fn rollback(&mut self) -> Result<(), ActionError> {
        Ok(())
    }
}

/// An [`Action`] built from a pair of closures
pub struct FnAction<R, U> {
    run: R,
    rollback: U,
}

impl<R, U> FnAction<R, U>
where
    R: FnMut() -> Result<(), ActionError>,
    U: FnMut() -> Result<(), ActionError>,
{
    pub fn new(run: R, rollback: U) -> Self {
        Self { run, rollback }
    }
}

impl<R, U> Action for FnAction<R, U>
where
    R: FnMut() -> Result<(), ActionError>,
    U: FnMut() -> Result<(), ActionError>,
{
    fn run(&mut self) -> Result<(), ActionError> {
        (self.run)()
    }

    fn rollback(&mut self) -> Result<(), ActionError> {
        (self.rollback)()
    }
}

/// Actions keyed by task id
#[derive(Default)]
pub struct Actions {
    actions: HashMap<TaskId, Box<dyn Action>>,
}

impl Actions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the action for a task, replacing any previous one
    pub fn insert(&mut self, id: TaskId, action: impl Action + 'static) {
        self.actions.insert(id, Box::new(action));
    }

    /// Registers a closure with no rollback step
    pub fn insert_fn<R>(&mut self, id: TaskId, run: R)
    where
        R: FnMut() -> Result<(), ActionError> + 'static,
    {
        self.insert(id, FnAction::new(run, || Ok(())));
    }

    /// Registers a closure together with its compensating rollback
    pub fn insert_fn_with_rollback<R, U>(&mut self, id: TaskId, run: R, rollback: U)
    where
        R: FnMut() -> Result<(), ActionError> + 'static,
        U: FnMut() -> Result<(), ActionError> + 'static,
    {
        self.insert(id, FnAction::new(run, rollback));
    }

    pub fn contains(&self, id: &str) -> bool {
        self.actions.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    fn get_mut(&mut self, id: &TaskId) -> Result<&mut Box<dyn Action>, ExecutionError> {
        self.actions
            .get_mut(id)
            .ok_or_else(|| ExecutionError::MissingAction { id: id.clone() })
    }
}

impl std::fmt::Debug for Actions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.actions.keys()).finish()
    }
}

/// Cooperative cancellation flag, checked before each task is started
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Options for [`execute`]
#[derive(Debug, Clone, Default)]
pub struct ExecuteOptions {
    /// Unwind committed tasks when a task fails
    pub rollback_on_failure: bool,
    pub cancel: Option<CancelToken>,
}

impl ExecuteOptions {
    pub fn with_rollback(rollback_on_failure: bool) -> Self {
        Self {
            rollback_on_failure,
            cancel: None,
        }
    }

    pub fn cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancelToken::is_cancelled)
    }
}

/// Why a task failed
#[derive(Debug, Error)]
pub enum FailureCause {
    #[error("{0}")]
    Action(ActionError),

    #[error("Execution cancelled")]
    Cancelled,
}

/// A rollback step that failed during unwind
#[derive(Debug, Error)]
#[error("Rollback of '{task}' failed: {cause}")]
pub struct RollbackFailure {
    pub task: TaskId,
    pub cause: ActionError,
}

#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("No action registered for task: {id}")]
    MissingAction { id: TaskId },

    #[error("Task '{task}' failed: {cause}")]
    ExecutionFailed {
        task: TaskId,
        cause: FailureCause,
        rollback_failures: Vec<RollbackFailure>,
        report: Box<ExecutionReport>,
    },
}

impl ExecutionError {
    /// Returns the execution report, if any task was started
    pub fn report(&self) -> Option<&ExecutionReport> {
        match self {
            ExecutionError::ExecutionFailed { report, .. } => Some(report.as_ref()),
            ExecutionError::MissingAction { .. } => None,
        }
    }
}

/// Final state of one task in a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskRecord {
    pub id: TaskId,
    pub state: TaskState,
}

/// Outcome of a run, in execution order
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub tasks: Vec<TaskRecord>,
    /// Tasks whose rollback was attempted, in the order it was attempted
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub rollback_order: Vec<TaskId>,
}

impl ExecutionReport {
    /// Returns the final state of a task
    pub fn state(&self, id: &str) -> Option<TaskState> {
        self.tasks
            .iter()
            .find(|r| r.id.as_str() == id)
            .map(|r| r.state)
    }

    /// Returns the tasks that are still committed
    pub fn committed(&self) -> Vec<&TaskId> {
        self.tasks_in(TaskState::Committed)
    }

    /// Returns the tasks in the given state
    pub fn tasks_in(&self, state: TaskState) -> Vec<&TaskId> {
        self.tasks
            .iter()
            .filter(|r| r.state == state)
            .map(|r| &r.id)
            .collect()
    }

    /// Returns true if every task committed
    pub fn is_success(&self) -> bool {
        self.tasks.iter().all(|r| r.state == TaskState::Committed)
    }
}

/// Runs `order` sequentially using `actions`
///
/// Every task in `order` must have an action; this is checked before
/// anything runs. Returns the report on full success, or
/// [`ExecutionError::ExecutionFailed`] with the report and any rollback
/// failures when a task fails or the run is cancelled.
pub fn execute(
    order: &[TaskId],
    actions: &mut Actions,
    options: &ExecuteOptions,
) -> Result<ExecutionReport, ExecutionError> {
    if let Some(missing) = order.iter().find(|id| !actions.contains(id.as_str())) {
        return Err(ExecutionError::MissingAction {
            id: missing.clone(),
        });
    }

    let started_at = Utc::now();
    let mut records: Vec<TaskRecord> = order
        .iter()
        .map(|id| TaskRecord {
            id: id.clone(),
            state: TaskState::Pending,
        })
        .collect();
    let mut commit_log: Vec<usize> = Vec::new();
    let mut failure: Option<(usize, FailureCause)> = None;

    info!(tasks = order.len(), "Starting execution");

    for (i, id) in order.iter().enumerate() {
        if options.is_cancelled() {
            warn!(task = %id, "Execution cancelled before task");
            failure = Some((i, FailureCause::Cancelled));
            break;
        }

        records[i].state = TaskState::Running;
        debug!(task = %id, "Running task");

        match actions.get_mut(id)?.run() {
            Ok(()) => {
                records[i].state = TaskState::Committed;
                commit_log.push(i);
                info!(task = %id, "Task committed");
            }
            Err(e) => {
                warn!(task = %id, error = %e, "Task failed");
                failure = Some((i, FailureCause::Action(e)));
                break;
            }
        }
    }

    let Some((failed_at, cause)) = failure else {
        info!(tasks = order.len(), "Execution finished");
        return Ok(ExecutionReport {
            started_at,
            finished_at: Utc::now(),
            tasks: records,
            rollback_order: Vec::new(),
        });
    };

    records[failed_at].state = TaskState::Failed;

    let mut rollback_order = Vec::new();
    let mut rollback_failures = Vec::new();

    if options.rollback_on_failure {
        info!(committed = commit_log.len(), "Rolling back committed tasks");

        for &i in commit_log.iter().rev() {
            let id = &order[i];
            rollback_order.push(id.clone());

            match actions.get_mut(id)?.rollback() {
                Ok(()) => {
                    records[i].state = TaskState::RolledBack;
                    debug!(task = %id, "Task rolled back");
                }
                Err(e) => {
                    records[i].state = TaskState::RollbackFailed;
                    warn!(task = %id, error = %e, "Rollback failed");
                    rollback_failures.push(RollbackFailure {
                        task: id.clone(),
                        cause: e,
                    });
                }
            }
        }
    }

    Err(ExecutionError::ExecutionFailed {
        task: order[failed_at].clone(),
        cause,
        rollback_failures,
        report: Box::new(ExecutionReport {
            started_at,
            finished_at: Utc::now(),
            tasks: records,
            rollback_order,
        }),
    })
}
