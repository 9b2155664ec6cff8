//! Main CLI application structure

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use super::output::{Output, OutputFormat};
use super::{pipeline_cmd, run_cmd};
use crate::domain::DocumentKind;
use crate::storage::Config;

#[derive(Parser)]
#[command(name = "tkn-graph")]
#[command(author, version, about = "Task graphs and run states from Tekton pipeline documents")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format (defaults to the configured format)
    #[arg(long, short = 'f', global = true)]
    pub format: Option<OutputFormat>,

    /// Enable verbose output for debugging
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List the recognized Tekton documents in a file
    Kinds {
        /// YAML file, or `-` for stdin
        file: String,

        /// Only list documents of this kind
        #[arg(long)]
        kind: Option<DocumentKind>,
    },

    /// Show pipeline tasks with explicit and inferred ordering
    Tasks {
        /// YAML file, or `-` for stdin
        file: String,

        /// Only show the pipeline with this name
        #[arg(long)]
        pipeline: Option<String>,
    },

    /// Show resources declared by pipelines
    Resources {
        /// YAML file, or `-` for stdin
        file: String,

        /// Only show the pipeline with this name
        #[arg(long)]
        pipeline: Option<String>,
    },

    /// Show the task dependency graph
    Graph {
        /// YAML file, or `-` for stdin
        file: String,

        /// Only show the pipeline with this name
        #[arg(long)]
        pipeline: Option<String>,

        /// Print Graphviz DOT instead of the ordering summary
        #[arg(long)]
        dot: bool,
    },

    /// Show pipeline run state per task
    Run {
        /// YAML file containing PipelineRun documents, or `-` for stdin
        file: String,

        /// Additional file holding the referenced Pipeline definitions
        #[arg(long)]
        pipeline_file: Option<String>,
    },
}

/// Main entry point for the CLI
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load()?;
    init_tracing(cli.verbose, config.log_filter.as_deref());

    let output = Output::new(cli.format.unwrap_or(config.default_format));
    debug!(?config, "tkn-graph starting");

    match cli.command {
        Commands::Kinds { file, kind } => pipeline_cmd::kinds(&output, &file, kind)?,
        Commands::Tasks { file, pipeline } => pipeline_cmd::tasks(&output, &file, pipeline.as_deref())?,
        Commands::Resources { file, pipeline } => {
            pipeline_cmd::resources(&output, &file, pipeline.as_deref())?
        }
        Commands::Graph { file, pipeline, dot } => {
            pipeline_cmd::graph(&output, &file, pipeline.as_deref(), dot)?
        }
        Commands::Run { file, pipeline_file } => run_cmd::run(&output, &file, pipeline_file.as_deref())?,
    }

    debug!("command completed successfully");
    Ok(())
}

/// Installs the stderr subscriber
///
/// `RUST_LOG` wins, then `--verbose`, then the configured filter, then `warn`.
fn init_tracing(verbose: bool, configured: Option<&str>) {
    let filter = std::env::var("RUST_LOG")
        .ok()
        .or_else(|| verbose.then(|| "debug".to_string()))
        .or_else(|| configured.map(str::to_string))
        .unwrap_or_else(|| "warn".to_string());

    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
