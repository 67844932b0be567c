//! Main CLI application structure

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::debug;

use super::output::{Output, OutputFormat};
use super::{logging, plan, run_cmd};
use crate::storage::Config;

#[derive(Parser)]
#[command(name = "buildorder")]
#[command(author, version, about = "Resolve and run tasks in dependency order")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format (defaults to the configured format)
    #[arg(long, short = 'f', global = true)]
    pub format: Option<OutputFormat>,

    /// Enable verbose output for debugging
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Task manifest (TOML, YAML or JSON)
    #[arg(long, short = 'm', global = true, env = "BUILDORDER_MANIFEST")]
    pub manifest: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the execution order
    Resolve {
        /// Tasks to schedule (defaults to every task)
        targets: Vec<String>,
    },

    /// Check the manifest for unknown dependencies and cycles
    Check,

    /// Export the dependency graph in Graphviz DOT format
    Graph,

    /// Show tasks ready to run given the tasks already done
    Ready {
        /// Tasks that are already done
        #[arg(long, value_delimiter = ',')]
        done: Vec<String>,
    },

    /// Run task commands in dependency order
    ///
    /// Rollback covers task failures only. An interrupted run (Ctrl-C)
    /// leaves completed tasks in place.
    Run {
        /// Tasks to run (defaults to every task)
        targets: Vec<String>,

        /// Roll back completed tasks when a task fails
        #[arg(long, conflicts_with = "no_rollback")]
        rollback: bool,

        /// Leave completed tasks in place when a task fails
        #[arg(long)]
        no_rollback: bool,

        /// Print what would run without running it
        #[arg(long)]
        dry_run: bool,
    },
}

/// Main entry point for the CLI
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load()?;

    logging::init(cli.verbose, &config.log_level)?;

    let output = Output::new(cli.format.unwrap_or(config.default_format));
    let manifest_path = cli.manifest.clone().unwrap_or_else(|| config.manifest.clone());

    debug!(
        manifest = %manifest_path.display(),
        in_project = config.is_in_project(),
        project_root = ?config.project_root,
        "buildorder starting"
    );

    match cli.command {
        Commands::Resolve { targets } => plan::resolve(&output, &manifest_path, &targets)?,
        Commands::Check => plan::check(&output, &manifest_path)?,
        Commands::Graph => plan::graph(&output, &manifest_path)?,
        Commands::Ready { done } => plan::ready(&output, &manifest_path, &done)?,
        Commands::Run {
            targets,
            rollback,
            no_rollback,
            dry_run,
        } => {
            let rollback_on_failure = if rollback {
                true
            } else if no_rollback {
                false
            } else {
                config.rollback_on_failure
            };

            let options = run_cmd::RunOptions {
                rollback_on_failure,
                dry_run,
                shell: config.shell.clone(),
            };
            run_cmd::run(&output, &manifest_path, &targets, &options)?
        }
    }

    debug!("Command completed successfully");
    Ok(())
}
