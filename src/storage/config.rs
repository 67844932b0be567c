//! Configuration handling for buildorder
//!
//! Configuration is read from `~/.config/buildorder/config.toml` (global)
//! and `.buildorder.toml` (project, found by walking up from the current
//! directory). Project values override global ones.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Name of the project configuration file
pub const PROJECT_CONFIG_FILE: &str = ".buildorder.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to parse configuration: {0}")]
    Parse(String),
}

/// Output format for commands
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Settings as they appear in a config file; every key is optional
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct ConfigFile {
    /// Default output format (text or json)
    pub default_format: Option<OutputFormat>,

    /// Undo committed tasks when a later task fails
    pub rollback_on_failure: Option<bool>,

    /// Shell used to run task commands (e.g. "sh", "bash", "cmd")
    pub shell: Option<String>,

    /// Log filter used when RUST_LOG is not set (e.g. "warn", "buildorder=debug")
    pub log_level: Option<String>,

    /// Manifest used when none is given on the command line
    pub manifest: Option<PathBuf>,
}

impl ConfigFile {
    /// Parses a config file body
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Reads a config file, returning defaults if it does not exist
    fn read(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;

        Self::parse(&content).with_context(|| format!("Failed to parse config: {}", path.display()))
    }

    /// Values from `other` win where set
    fn overlay(self, other: ConfigFile) -> Self {
        Self {
            default_format: other.default_format.or(self.default_format),
            rollback_on_failure: other.rollback_on_failure.or(self.rollback_on_failure),
            shell: other.shell.or(self.shell),
            log_level: other.log_level.or(self.log_level),
            manifest: other.manifest.or(self.manifest),
        }
    }
}

/// Effective configuration (defaults, then global, then project)
#[derive(Debug, Clone)]
pub struct Config {
    pub default_format: OutputFormat,
    pub rollback_on_failure: bool,
    pub shell: String,
    pub log_level: String,
    pub manifest: PathBuf,
    pub project_root: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self::from_file(ConfigFile::default(), None)
    }
}

impl Config {
    /// Loads configuration from default locations
    pub fn load() -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to determine current directory")?;
        Self::load_from(&cwd)
    }

    /// Loads configuration for the project containing `start`
    pub fn load_from(start: &Path) -> Result<Self> {
        let global = match Self::global_config_dir() {
            Some(dir) => ConfigFile::read(&dir.join("config.toml"))?,
            None => ConfigFile::default(),
        };

        let project_root = Self::find_project_root_from(start);
        let project = match &project_root {
            Some(root) => ConfigFile::read(&root.join(PROJECT_CONFIG_FILE))?,
            None => ConfigFile::default(),
        };

        let config = Self::from_file(global.overlay(project), project_root);
        config.validate()?;
        Ok(config)
    }

    /// Applies built-in defaults to a config file
    pub fn from_file(file: ConfigFile, project_root: Option<PathBuf>) -> Self {
        let manifest = file
            .manifest
            .unwrap_or_else(|| PathBuf::from("buildorder.toml"));
        let manifest = match &project_root {
            Some(root) if manifest.is_relative() => root.join(manifest),
            _ => manifest,
        };

        Self {
            default_format: file.default_format.unwrap_or_default(),
            rollback_on_failure: file.rollback_on_failure.unwrap_or(true),
            shell: file.shell.unwrap_or_else(|| default_shell().to_string()),
            log_level: file.log_level.unwrap_or_else(|| "warn".to_string()),
            manifest,
            project_root,
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.shell.trim().is_empty() {
            return Err(ConfigError::Invalid("shell must not be empty".to_string()));
        }
        Ok(())
    }

    /// Returns the global config directory
    pub fn global_config_dir() -> Option<PathBuf> {
        ProjectDirs::from("dev", "buildorder", "buildorder")
            .map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Finds the project root by looking for a `.buildorder.toml` file
    pub fn find_project_root_from(start: &Path) -> Option<PathBuf> {
        let mut current = start.to_path_buf();

        loop {
            if current.join(PROJECT_CONFIG_FILE).is_file() {
                return Some(current);
            }

            if !current.pop() {
                return None;
            }
        }
    }

    /// Returns true if a project config was found
    pub fn is_in_project(&self) -> bool {
        self.project_root.is_some()
    }
}

/// The shell used to run commands when none is configured
pub fn default_shell() -> &'static str {
    if cfg!(windows) {
        "cmd"
    } else {
        "sh"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config() {
        let config = Config::default();

        assert_eq!(config.default_format, OutputFormat::Text);
        assert!(config.rollback_on_failure);
        assert_eq!(config.shell, default_shell());
        assert_eq!(config.log_level, "warn");
        assert_eq!(config.manifest, PathBuf::from("buildorder.toml"));
        assert!(!config.is_in_project());
    }

    #[test]
    fn parse_config_file() {
        let toml = r#"
default_format = "json"
rollback_on_failure = false
shell = "bash"
log_level = "debug"
manifest = "build/tasks.yaml"
"#;

        let file = ConfigFile::parse(toml).unwrap();
        assert_eq!(file.default_format, Some(OutputFormat::Json));
        assert_eq!(file.rollback_on_failure, Some(false));
        assert_eq!(file.shell.as_deref(), Some("bash"));
        assert_eq!(file.log_level.as_deref(), Some("debug"));
        assert_eq!(file.manifest, Some(PathBuf::from("build/tasks.yaml")));
    }

    #[test]
    fn parse_error() {
        let result = ConfigFile::parse("rollback_on_failure = \"maybe\"");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn project_overrides_global() {
        let global = ConfigFile::parse("shell = \"zsh\"\nrollback_on_failure = false").unwrap();
        let project = ConfigFile::parse("rollback_on_failure = true").unwrap();

        let merged = global.overlay(project);
        assert_eq!(merged.shell.as_deref(), Some("zsh"));
        assert_eq!(merged.rollback_on_failure, Some(true));
    }

    #[test]
    fn find_project_root() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(PROJECT_CONFIG_FILE), "").unwrap();

        let sub_dir = dir.path().join("sub").join("dir");
        fs::create_dir_all(&sub_dir).unwrap();

        let root = Config::find_project_root_from(&sub_dir);
        assert_eq!(root.as_deref(), Some(dir.path()));
    }

    #[test]
    fn manifest_resolved_against_project_root() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join(PROJECT_CONFIG_FILE),
            "manifest = \"ci/tasks.toml\"\n",
        )
        .unwrap();

        let config = Config::load_from(dir.path()).unwrap();
        assert!(config.is_in_project());
        assert_eq!(config.manifest, dir.path().join("ci/tasks.toml"));
    }

    #[test]
    fn empty_shell_rejected() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(PROJECT_CONFIG_FILE), "shell = \"  \"\n").unwrap();

        assert!(Config::load_from(dir.path()).is_err());
    }
}
