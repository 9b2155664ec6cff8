//! # Storage Layer
//!
//! Everything that touches the filesystem or process environment lives here,
//! so the domain core stays pure.
//!
//! | Data | Format | Location |
//! |------|--------|----------|
//! | Documents | Multi-document YAML | any file, or stdin via `-` |
//! | Config | TOML | `$TKN_GRAPH_CONFIG` or `~/.config/tkn-graph/config.toml` |
//!
//! ## Key Types
//!
//! - [`SourceText`] - Document text plus the identifier it came from
//! - [`Config`] - User configuration

mod config;
mod source;

pub use config::{Config, ConfigError, OutputFormat, CONFIG_ENV};
pub use source::{SourceText, STDIN};
