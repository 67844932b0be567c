//! # Task Runners
//!
//! Actions that perform the work of manifest tasks.
//!
//! ## Shell Actions
//!
//! A task's `command` is handed to the configured shell (`sh -c` on Unix,
//! `cmd /C` on Windows). A non-zero exit status is a task failure. The
//! optional `rollback` command is run the same way during unwind.
//! Tasks without a command succeed without doing anything.
//!
//! Command output is captured and logged at debug level so it does not
//! interleave with the CLI's own output.
//!
//! ## Interruption
//!
//! `buildorder run` does not attach a cancel token. Interrupting the process
//! (Ctrl-C) terminates it together with the running command, and tasks that
//! already committed are **not** rolled back. Library callers that need a
//! clean stop pass a [`CancelToken`](crate::domain::CancelToken) through
//! [`ExecuteOptions`](crate::domain::ExecuteOptions) instead.

mod shell;

pub use shell::{actions_for, ShellAction, ShellError};
