//! # Storage Layer
//!
//! File formats read by buildorder.
//!
//! ## Files
//!
//! | Data | Format | Location |
//! |------|--------|----------|
//! | Tasks | TOML, YAML or JSON | `buildorder.toml` (or the path given on the command line) |
//! | Project config | TOML | `.buildorder.toml` in the project root |
//! | Global config | TOML | `~/.config/buildorder/config.toml` (platform config dir) |
//!
//! Nothing here is written back; the manifest is the single source of
//! truth for the task graph.
//!
//! ## Key Types
//!
//! - [`Manifest`] - Declared tasks, dependencies and commands
//! - [`Config`] - Merged global and project configuration

mod config;
mod manifest;

pub use config::{default_shell, Config, ConfigError, ConfigFile, OutputFormat, PROJECT_CONFIG_FILE};
pub use manifest::{Manifest, ManifestError, ManifestFormat, TaskSpec};
