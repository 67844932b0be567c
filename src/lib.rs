//! buildorder - Dependency-order build scheduler
//!
//! Declares tasks and their prerequisites, resolves an execution order in
//! which every task follows its dependencies, detects cycles and unknown
//! dependencies, and runs the order one task at a time with optional
//! rollback of completed work when a later task fails.

pub mod domain;
pub mod storage;
pub mod runner;
pub mod cli;

pub use domain::{
    execute, resolve, ExecuteOptions, ExecutionError, ExecutionReport, GraphError, Task, TaskGraph,
    TaskId, TaskState,
};
