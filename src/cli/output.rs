//! Output formatting for CLI commands

use anyhow::{Context, Result};
use serde::Serialize;

pub use crate::storage::OutputFormat;

/// Placeholder for a document without `metadata.name`
pub const UNNAMED: &str = "<unnamed>";

/// Output helper for consistent formatting
pub struct Output {
    format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Prints structured data
    pub fn data<T: Serialize>(&self, data: &T) -> Result<()> {
        let json = match self.format {
            // Callers render text themselves; this is the fallback
            OutputFormat::Text => serde_json::to_string_pretty(data),
            OutputFormat::Json => serde_json::to_string(data),
        }
        .context("Failed to serialize output")?;
        println!("{}", json);
        Ok(())
    }

    /// Prints a table row (text only, ignored in JSON mode)
    pub fn row(&self, columns: &[&str]) {
        if self.format == OutputFormat::Text {
            println!("{}", columns.join("\t"));
        }
    }

    /// Prints a blank line (text only)
    pub fn blank(&self) {
        if self.format == OutputFormat::Text {
            println!();
        }
    }

    /// Returns true if using JSON format
    pub fn is_json(&self) -> bool {
        self.format == OutputFormat::Json
    }
}

/// Joins names for a table cell, `-` when empty
pub fn list_cell(names: &[String]) -> String {
    if names.is_empty() {
        "-".to_string()
    } else {
        names.join(",")
    }
}
