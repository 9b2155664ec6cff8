//! # Command-Line Interface
//!
//! Thin front end over the domain core: read text, classify, extract, print.
//!
//! | Command | Purpose |
//! |---------|---------|
//! | `kinds` | List recognized documents in a file |
//! | `tasks` | Declared pipeline tasks with their ordering |
//! | `resources` | Declared pipeline resources |
//! | `graph` | Topological order, roots, dangling references, or DOT |
//! | `run` | Pipeline run state merged with the pipeline's tasks |
//!
//! ## Output Formats
//!
//! All commands support the `--format` flag:
//! - `text` (default) - Human-readable output
//! - `json` - Machine-parseable JSON
//!
//! ## Verbose Mode
//!
//! `--verbose` (or `-v`) enables `debug` logging on stderr, which reports
//! every skipped document. `RUST_LOG` takes precedence.
//!
//! ## Entry Point
//!
//! Call [`run()`] to parse arguments and execute the appropriate command.

mod app;
mod output;
mod pipeline_cmd;
mod run_cmd;

pub use app::{run, Cli, Commands};
pub use output::{Output, OutputFormat};
