//! # Command-Line Interface
//!
//! User-facing CLI commands and output formatting.
//!
//! ## Commands
//!
//! | Command | Purpose |
//! |---------|---------|
//! | `resolve [TARGET...]` | Print the execution order |
//! | `check` | Report unknown dependencies and cycles |
//! | `graph` | Export the dependency graph as Graphviz DOT |
//! | `ready [--done ID,...]` | Show tasks whose dependencies are all done |
//! | `run [TARGET...]` | Run task commands in order, rolling back on failure |
//!
//! ## Output Formats
//!
//! All commands support `--format` flag:
//! - `text` (default) - Human-readable output
//! - `json` - Machine-parseable JSON
//!
//! ## Verbose Mode
//!
//! Use `--verbose` (or `-v`) for debug logging on stderr:
//! ```bash
//! buildorder --verbose run package
//! ```
//!
//! ## Entry Point
//!
//! Call [`run()`] to parse arguments and execute the appropriate command.

mod app;
mod logging;
mod output;
mod plan;
mod run_cmd;

pub use app::{run, Cli, Commands};
pub use output::{Output, OutputFormat};
