//! Tracing setup
//!
//! Log output goes to stderr so it never mixes with command output. The
//! filter comes from `RUST_LOG` when set, otherwise from `--verbose`
//! (debug for this crate) or the configured `log_level`.

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

pub fn init(verbose: bool, log_level: &str) -> Result<()> {
    let filter = match std::env::var("RUST_LOG") {
        Ok(v) if !v.trim().is_empty() => EnvFilter::from_default_env(),
        _ if verbose => EnvFilter::try_new("buildorder=debug")
            .context("Failed to build verbose log filter")?,
        _ => EnvFilter::try_new(log_level)
            .with_context(|| format!("Invalid log_level in config: '{}'", log_level))?,
    };

    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();

    if let Err(e) = installed {
        // Events go to whichever subscriber is already global
        tracing::debug!(error = %e, "Tracing subscriber already installed");
    }

    Ok(())
}
