//! The `run` command

use std::path::Path;

use anyhow::Result;
use tracing::info;

use super::output::Output;
use super::plan;
use crate::domain::{execute, ExecuteOptions, ExecutionError, ExecutionReport, TaskId, TaskState};
use crate::runner;
use crate::storage::Manifest;

pub struct RunOptions {
    pub rollback_on_failure: bool,
    pub dry_run: bool,
    pub shell: String,
}

pub fn run(
    output: &Output,
    manifest_path: &Path,
    targets: &[String],
    options: &RunOptions,
) -> Result<()> {
    let (manifest, graph) = plan::load(manifest_path)?;
    let order = plan::resolve_order(&graph, targets)?;

    if options.dry_run {
        return dry_run(output, &manifest, &order);
    }

    // Commands run relative to the manifest's directory
    let working_dir = match manifest_path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };

    info!(
        tasks = order.len(),
        rollback = options.rollback_on_failure,
        "Running tasks"
    );

    let mut actions = runner::actions_for(&manifest, &order, &options.shell, working_dir);
    let exec_options = ExecuteOptions::with_rollback(options.rollback_on_failure);

    match execute(&order, &mut actions, &exec_options) {
        Ok(report) => {
            let data = serde_json::json!({
                "success": report.is_success(),
                "report": report,
            });
            output.render(&data, || {
                print_table(&report);
                println!();
                println!("All {} task(s) completed.", report.committed().len());
            })
        }
        Err(ExecutionError::ExecutionFailed {
            task,
            cause,
            rollback_failures,
            report,
        }) => {
            let failures: Vec<String> = rollback_failures.iter().map(|f| f.to_string()).collect();
            let data = serde_json::json!({
                "success": report.is_success(),
                "report": report,
                "failed_task": task,
                "error": cause.to_string(),
                "rollback_failures": failures,
            });

            output.render(&data, || {
                print_table(&report);
                println!();
                if report.rollback_order.is_empty() {
                    println!(
                        "Stopped at '{}'; {} task(s) left in place.",
                        task,
                        report.committed().len()
                    );
                } else {
                    println!(
                        "Stopped at '{}'; rolled back {} task(s).",
                        task,
                        report.rollback_order.len()
                    );
                }
                let skipped = report.tasks_in(TaskState::Pending).len();
                if skipped > 0 {
                    println!("{} task(s) not started.", skipped);
                }
                for failure in &failures {
                    println!("  {}", failure);
                }
            })?;

            if rollback_failures.is_empty() {
                anyhow::bail!("Task '{}' failed: {}", task, cause)
            } else {
                anyhow::bail!(
                    "Task '{}' failed: {} ({} rollback step(s) also failed)",
                    task,
                    cause,
                    rollback_failures.len()
                )
            }
        }
        Err(e) => Err(e.into()),
    }
}

fn dry_run(output: &Output, manifest: &Manifest, order: &[TaskId]) -> Result<()> {
    let steps: Vec<_> = order
        .iter()
        .filter_map(|id| manifest.get(id.as_str()))
        .collect();

    output.render(&serde_json::json!({ "dry_run": true, "tasks": steps }), || {
        if steps.is_empty() {
            println!("Nothing to do.");
            return;
        }

        println!("Would run {} task(s):", steps.len());
        for (i, step) in steps.iter().enumerate() {
            let command = step.command.as_deref().unwrap_or("(no command)");
            println!("{:>3}. {:<24} {}", i + 1, step.id.as_str(), command);
        }
    })
}

fn print_table(report: &ExecutionReport) {
    println!("{:<24} STATE", "TASK");
    println!("{}", "-".repeat(40));
    for record in &report.tasks {
        println!("{:<24} {}", record.id.as_str(), record.state);
    }
}
