//! Shell command actions

use std::path::{Path, PathBuf};
use std::process::Command;

use thiserror::Error;
use tracing::debug;

use crate::domain::{Action, ActionError, Actions, TaskId};
use crate::storage::{Manifest, TaskSpec};

#[derive(Debug, Error)]
pub enum ShellError {
    #[error("Failed to spawn '{shell}' for task {task}: {source}")]
    Spawn {
        task: TaskId,
        shell: String,
        source: std::io::Error,
    },

    #[error("Command for task {task} exited with {status}{}", stderr_suffix(.stderr))]
    Failed {
        task: TaskId,
        status: String,
        stderr: String,
    },
}

fn stderr_suffix(stderr: &str) -> String {
    let last = stderr.lines().rev().find(|l| !l.trim().is_empty());
    match last {
        Some(line) => format!(": {}", line.trim()),
        None => String::new(),
    }
}

/// Runs a task's command (and rollback command) through a shell
#[derive(Debug, Clone)]
pub struct ShellAction {
    task: TaskId,
    shell: String,
    command: Option<String>,
    rollback: Option<String>,
    working_dir: PathBuf,
}

impl ShellAction {
    pub fn new(spec: &TaskSpec, shell: &str, working_dir: &Path) -> Self {
        Self {
            task: spec.id.clone(),
            shell: shell.to_string(),
            command: spec.command.clone(),
            rollback: spec.rollback.clone(),
            working_dir: working_dir.to_path_buf(),
        }
    }

    /// The flag that makes the shell run its next argument as a script
    fn command_flag(&self) -> &'static str {
        let name = Path::new(&self.shell)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default();

        if name.eq_ignore_ascii_case("cmd") {
            "/C"
        } else {
            "-c"
        }
    }

    fn run_command(&self, script: &str) -> Result<(), ShellError> {
        debug!(task = %self.task, shell = %self.shell, script, "Running command");

        let output = Command::new(&self.shell)
            .arg(self.command_flag())
            .arg(script)
            .current_dir(&self.working_dir)
            .output()
            .map_err(|source| ShellError::Spawn {
                task: self.task.clone(),
                shell: self.shell.clone(),
                source,
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stdout.trim().is_empty() {
            debug!(task = %self.task, "stdout: {}", stdout.trim_end());
        }
        if !stderr.trim().is_empty() {
            debug!(task = %self.task, "stderr: {}", stderr.trim_end());
        }

        if output.status.success() {
            Ok(())
        } else {
            Err(ShellError::Failed {
                task: self.task.clone(),
                status: output.status.to_string(),
                stderr: stderr.into_owned(),
            })
        }
    }
}

impl Action for ShellAction {
    fn run(&mut self) -> Result<(), ActionError> {
        match &self.command {
            Some(script) => Ok(self.run_command(script)?),
            None => Ok(()),
        }
    }

    fn rollback(&mut self) -> Result<(), ActionError> {
        match &self.rollback {
            Some(script) => Ok(self.run_command(script)?),
            None => Ok(()),
        }
    }
}

/// Builds shell actions for the tasks in `order`
///
/// Ids without a declaration in the manifest get no action, which the
/// executor reports before running anything.
pub fn actions_for(
    manifest: &Manifest,
    order: &[TaskId],
    shell: &str,
    working_dir: &Path,
) -> Actions {
    let mut actions = Actions::new();

    for id in order {
        if let Some(spec) = manifest.get(id.as_str()) {
            actions.insert(id.clone(), ShellAction::new(spec, shell, working_dir));
        }
    }

    actions
}
