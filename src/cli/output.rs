//! Rendering of command results
//!
//! Every command produces one JSON document in `--format json` mode and a
//! human readable layout otherwise. [`Output::render`] picks between the two
//! so commands describe both forms in one place.

use anyhow::{Context, Result};
use serde::Serialize;

pub use crate::storage::OutputFormat;

pub struct Output {
    format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Prints `data` as JSON, or runs `text` to print the text layout
    pub fn render<T, F>(&self, data: &T, text: F) -> Result<()>
    where
        T: Serialize + ?Sized,
        F: FnOnce(),
    {
        match self.format {
            OutputFormat::Json => {
                let json = serde_json::to_string(data).context("Failed to encode JSON output")?;
                println!("{}", json);
            }
            OutputFormat::Text => text(),
        }
        Ok(())
    }

    /// Prints tab separated columns
    pub fn row(&self, columns: &[&str]) {
        println!("{}", columns.join("\t"));
    }
}
