//! Task manifest files
//!
//! A manifest declares the tasks of a project, their dependencies, and the
//! shell commands that perform and undo them. TOML is the default format;
//! YAML and JSON are picked by file extension.
//!
//! ```toml
//! [[task]]
//! id = "compile"
//! description = "Compile sources"
//! depends_on = ["fetch"]
//! command = "make"
//! rollback = "make clean"
//! ```

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{GraphError, Task, TaskGraph, TaskId};

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("Failed to parse TOML manifest: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Failed to parse YAML manifest: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON manifest: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid manifest: {0}")]
    Graph(#[from] GraphError),
}

/// Manifest file format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestFormat {
    Toml,
    Yaml,
    Json,
}

impl ManifestFormat {
    /// Picks the format from a file extension, defaulting to TOML
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
            .as_deref()
        {
            Some("yml") | Some("yaml") => ManifestFormat::Yaml,
            Some("json") => ManifestFormat::Json,
            _ => ManifestFormat::Toml,
        }
    }
}

/// A task as declared in a manifest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSpec {
    pub id: TaskId,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, alias = "dependencies", skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<TaskId>,

    /// Shell command that performs the task
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,

    /// Shell command that undoes the task
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rollback: Option<String>,
}

impl TaskSpec {
    fn to_task(&self) -> Task {
        let task = Task::new(self.id.clone()).with_dependencies(self.depends_on.iter().cloned());
        match &self.description {
            Some(description) => task.with_description(description.clone()),
            None => task,
        }
    }
}

/// The parsed contents of a manifest file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default, rename = "task", alias = "tasks")]
    pub tasks: Vec<TaskSpec>,
}

impl Manifest {
    /// Reads and parses a manifest file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read manifest: {}", path.display()))?;

        Self::parse(&content, ManifestFormat::from_path(path))
            .with_context(|| format!("Failed to load manifest: {}", path.display()))
    }

    /// Parses manifest content in the given format
    pub fn parse(content: &str, format: ManifestFormat) -> Result<Self, ManifestError> {
        let manifest = match format {
            ManifestFormat::Toml => toml::from_str(content)?,
            ManifestFormat::Yaml => serde_yaml::from_str(content)?,
            ManifestFormat::Json => serde_json::from_str(content)?,
        };
        Ok(manifest)
    }

    /// Builds the task graph, rejecting duplicate ids
    pub fn to_graph(&self) -> Result<TaskGraph, ManifestError> {
        Ok(TaskGraph::from_tasks(self.tasks.iter().map(TaskSpec::to_task))?)
    }

    /// Returns the declaration of a task
    pub fn get(&self, id: &str) -> Option<&TaskSpec> {
        self.tasks.iter().find(|t| t.id.as_str() == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    const TOML_MANIFEST: &str = r#"
[[task]]
id = "fetch"
command = "echo fetch"

[[task]]
id = "compile"
description = "Compile sources"
depends_on = ["fetch"]
command = "make"
rollback = "make clean"
"#;

    #[test]
    fn format_from_extension() {
        assert_eq!(
            ManifestFormat::from_path(&PathBuf::from("tasks.toml")),
            ManifestFormat::Toml
        );
        assert_eq!(
            ManifestFormat::from_path(&PathBuf::from("tasks.YAML")),
            ManifestFormat::Yaml
        );
        assert_eq!(
            ManifestFormat::from_path(&PathBuf::from("tasks.yml")),
            ManifestFormat::Yaml
        );
        assert_eq!(
            ManifestFormat::from_path(&PathBuf::from("tasks.json")),
            ManifestFormat::Json
        );
        assert_eq!(
            ManifestFormat::from_path(&PathBuf::from("Buildfile")),
            ManifestFormat::Toml
        );
    }

    #[test]
    fn parse_toml() {
        let manifest = Manifest::parse(TOML_MANIFEST, ManifestFormat::Toml).unwrap();

        assert_eq!(manifest.tasks.len(), 2);
        let compile = manifest.get("compile").unwrap();
        assert_eq!(compile.description.as_deref(), Some("Compile sources"));
        assert_eq!(compile.depends_on, vec![TaskId::new("fetch").unwrap()]);
        assert_eq!(compile.rollback.as_deref(), Some("make clean"));
        assert!(manifest.get("fetch").unwrap().rollback.is_none());
    }

    #[test]
    fn parse_yaml() {
        let yaml = r#"
tasks:
  - id: a
  - id: b
    dependencies: [a]
    command: "true"
"#;
        let manifest = Manifest::parse(yaml, ManifestFormat::Yaml).unwrap();
        let graph = manifest.to_graph().unwrap();

        assert_eq!(graph.dependencies("b"), &[TaskId::new("a").unwrap()]);
    }

    #[test]
    fn parse_json() {
        let json = r#"{"tasks": [{"id": "x"}, {"id": "y", "depends_on": ["x"]}]}"#;
        let manifest = Manifest::parse(json, ManifestFormat::Json).unwrap();

        assert_eq!(manifest.tasks.len(), 2);
        assert_eq!(manifest.to_graph().unwrap().resolve_all().unwrap().len(), 2);
    }

    #[test]
    fn empty_manifest() {
        let manifest = Manifest::parse("", ManifestFormat::Toml).unwrap();
        assert!(manifest.tasks.is_empty());
        assert!(manifest.to_graph().unwrap().is_empty());
    }

    #[test]
    fn invalid_id_rejected() {
        let toml = r#"
[[task]]
id = "has space"
"#;
        assert!(matches!(
            Manifest::parse(toml, ManifestFormat::Toml),
            Err(ManifestError::Toml(_))
        ));
    }

    #[test]
    fn duplicate_id_rejected() {
        let toml = r#"
[[task]]
id = "a"

[[task]]
id = "a"
"#;
        let manifest = Manifest::parse(toml, ManifestFormat::Toml).unwrap();
        assert!(matches!(
            manifest.to_graph(),
            Err(ManifestError::Graph(GraphError::DuplicateTask { .. }))
        ));
    }

    #[test]
    fn graph_keeps_file_order() {
        let manifest = Manifest::parse(TOML_MANIFEST, ManifestFormat::Toml).unwrap();
        let graph = manifest.to_graph().unwrap();

        let ids: Vec<_> = graph.task_ids().map(|id| id.as_str()).collect();
        assert_eq!(ids, vec!["fetch", "compile"]);
        assert_eq!(
            graph.get("compile").unwrap().description.as_deref(),
            Some("Compile sources")
        );
    }

    #[test]
    fn load_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tasks.toml");
        fs::write(&path, TOML_MANIFEST).unwrap();

        let manifest = Manifest::load(&path).unwrap();
        assert_eq!(manifest.tasks.len(), 2);
    }

    #[test]
    fn load_missing_file_has_context() {
        let dir = TempDir::new().unwrap();
        let err = Manifest::load(&dir.path().join("nope.toml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read manifest"));
    }
}
