//! CLI command definitions and argument parsing.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Clinitag CLI - Extract clinical tags from protocol documents.
#[derive(Debug, Parser)]
#[command(name = "clinitag")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Output format
    #[arg(short, long, value_enum, global = true)]
    pub format: Option<CliFormat>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Configuration file path
    #[arg(short, long, global = true, env = "CLINITAG_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Output format options.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum CliFormat {
    /// Table format (default)
    Table,
    /// JSON format
    Json,
    /// Quiet format (identifiers only)
    Quiet,
}

/// CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store a protocol file and register it as a document
    Upload(UploadArgs),

    /// Register every stored object that has no document record
    Sync,

    /// List registered documents
    Documents,

    /// Run tag extraction over a registered document
    Extract(ExtractArgs),

    /// Show the chunk ledger of a document
    Chunks(ChunksArgs),

    /// List extracted tags
    Tags(TagsArgs),

    /// List recent extraction runs
    Runs(RunsArgs),

    /// Show the event trace of a run
    Events(EventsArgs),
}

/// Arguments for the upload command.
#[derive(Debug, Parser)]
pub struct UploadArgs {
    /// Local file to upload
    pub file: PathBuf,

    /// Object name (defaults to the file name), e.g. sepse__v2__adulto.pdf
    #[arg(short, long)]
    pub name: Option<String>,
}

/// Arguments for the extract command.
#[derive(Debug, Parser)]
pub struct ExtractArgs {
    /// Document identifier
    pub document: String,

    /// Document version to record on the run
    #[arg(long = "doc-version")]
    pub version: Option<String>,
}

/// Arguments for the chunks command.
#[derive(Debug, Parser)]
pub struct ChunksArgs {
    /// Document identifier
    pub document: String,

    /// Only show chunks that are not processed yet
    #[arg(long)]
    pub pending: bool,
}

/// Arguments for the tags command.
#[derive(Debug, Parser)]
pub struct TagsArgs {
    /// Only show tags in this category
    #[arg(long)]
    pub category: Option<String>,

    /// Show a single tag with its conditions
    #[arg(short, long, conflicts_with = "category")]
    pub name: Option<String>,
}

/// Arguments for the runs command.
#[derive(Debug, Parser)]
pub struct RunsArgs {
    /// Maximum number of runs
    #[arg(short, long, default_value = "20")]
    pub limit: usize,
}

/// Arguments for the events command.
#[derive(Debug, Parser)]
pub struct EventsArgs {
    /// Run identifier (UUID)
    pub run_id: String,
}

impl From<CliFormat> for crate::config::OutputFormat {
    fn from(format: CliFormat) -> Self {
        match format {
            CliFormat::Table => crate::config::OutputFormat::Table,
            CliFormat::Json => crate::config::OutputFormat::Json,
            CliFormat::Quiet => crate::config::OutputFormat::Quiet,
        }
    }
}
