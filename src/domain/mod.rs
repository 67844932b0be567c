//! Domain models for buildorder
//!
//! Contains the task graph, order resolution and execution, without any
//! file or process I/O.

mod executor;
mod graph;
mod id;
mod resolver;
mod task;

pub use executor::{
    execute, Action, ActionError, Actions, CancelToken, ExecuteOptions, ExecutionError,
    ExecutionReport, FailureCause, FnAction, RollbackFailure, TaskRecord,
};
pub use graph::{GraphError, TaskGraph};
pub use id::{IdError, TaskId};
pub use resolver::resolve;
pub use task::{Task, TaskState};
