//! Source text acquisition
//!
//! Reads document text from a file or stdin before any parsing happens. The
//! source identifier travels with the text for error and log context only.

use std::fs;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};

/// Path argument that selects stdin
pub const STDIN: &str = "-";

/// Raw document text plus the identifier it was read from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceText {
    pub source: String,
    pub text: String,
}

impl SourceText {
    /// Creates source text from memory
    pub fn new(source: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            text: text.into(),
        }
    }

    /// Reads a file, or stdin when `path` is `-`
    pub fn read(path: &str) -> Result<Self> {
        if path == STDIN {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .context("Failed to read stdin")?;
            return Ok(Self::new("<stdin>", text));
        }

        Self::read_file(Path::new(path))
    }

    /// Reads a file
    pub fn read_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Ok(Self::new(path.display().to_string(), text))
    }
}
