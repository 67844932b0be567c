//! Planning commands (resolve, check, graph, ready)
//!
//! These commands only read the manifest; nothing is executed.

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::debug;

use super::output::Output;
use crate::domain::{TaskGraph, TaskId};
use crate::storage::Manifest;

/// Loads the manifest and builds its task graph
pub(super) fn load(path: &Path) -> Result<(Manifest, TaskGraph)> {
    let manifest = Manifest::load(path)?;
    let graph = manifest
        .to_graph()
        .with_context(|| format!("Invalid manifest: {}", path.display()))?;

    debug!(tasks = graph.len(), manifest = %path.display(), "Loaded manifest");
    Ok((manifest, graph))
}

/// Parses task ids given on the command line
pub(super) fn parse_ids(raw: &[String]) -> Result<Vec<TaskId>> {
    raw.iter()
        .map(|s| TaskId::new(s.as_str()).with_context(|| format!("Invalid task ID: '{}'", s)))
        .collect()
}

/// Resolves the order for `targets`, or for every task when empty
pub(super) fn resolve_order(graph: &TaskGraph, targets: &[String]) -> Result<Vec<TaskId>> {
    let order = if targets.is_empty() {
        graph.resolve_all()?
    } else {
        graph.resolve(&parse_ids(targets)?)?
    };
    Ok(order)
}

/// Print the execution order
pub fn resolve(output: &Output, manifest_path: &Path, targets: &[String]) -> Result<()> {
    let (_, graph) = load(manifest_path)?;
    let order = resolve_order(&graph, targets)?;

    output.render(&serde_json::json!({ "order": order }), || {
        if order.is_empty() {
            println!("Nothing to do.");
        }
        for (i, id) in order.iter().enumerate() {
            let position = format!("{:>3}.", i + 1);
            match graph.get(id.as_str()).and_then(|t| t.description.as_deref()) {
                Some(description) => output.row(&[position.as_str(), id.as_str(), description]),
                None => output.row(&[position.as_str(), id.as_str()]),
            }
        }
    })
}

/// Validate the manifest
pub fn check(output: &Output, manifest_path: &Path) -> Result<()> {
    let (_, graph) = load(manifest_path)?;
    graph.validate()?;

    let data = serde_json::json!({ "valid": true, "tasks": graph.len() });
    output.render(&data, || {
        println!("Manifest OK: {} task(s), no cycles", graph.len());
    })
}

/// Export the graph in DOT format
pub fn graph(output: &Output, manifest_path: &Path) -> Result<()> {
    let (_, graph) = load(manifest_path)?;
    let dot = graph.to_dot();

    output.render(&serde_json::json!({ "dot": dot }), || print!("{}", dot))
}

/// Show ready and blocked tasks
pub fn ready(output: &Output, manifest_path: &Path, done: &[String]) -> Result<()> {
    let (_, graph) = load(manifest_path)?;
    let done: HashSet<TaskId> = parse_ids(done)?.into_iter().collect();

    if let Some(unknown) = done.iter().find(|id| !graph.contains(id.as_str())) {
        anyhow::bail!("Unknown task: {}", unknown);
    }

    let ready = graph.ready_tasks(&done);
    let blocked = graph.blocked_tasks(&done);

    let blocked_json: Vec<_> = blocked
        .iter()
        .map(|(id, blockers)| serde_json::json!({ "id": id, "blocked_by": blockers }))
        .collect();
    let data = serde_json::json!({ "ready": ready, "blocked": blocked_json });

    output.render(&data, || {
        if ready.is_empty() {
            println!("No tasks ready to run.");
        } else {
            println!("Ready tasks ({}):", ready.len());
            for id in &ready {
                println!("  {}", id);
            }
        }

        if !blocked.is_empty() {
            println!();
            println!("Blocked tasks ({}):", blocked.len());
            println!("  {:<24} BLOCKED BY", "ID");
            for (id, blockers) in &blocked {
                let blockers: Vec<_> = blockers.iter().map(TaskId::as_str).collect();
                println!("  {:<24} {}", id.as_str(), blockers.join(", "));
            }
        }
    })
}
