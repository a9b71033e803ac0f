//! CLI command definitions and argument parsing.

use crate::error::{CliError, Result};
use clap::{Parser, Subcommand};
use ragline_domain::MetadataFilter;
use std::path::PathBuf;

/// Ragline CLI - Ask questions against an indexed corpus.
#[derive(Debug, Parser)]
#[command(name = "ragline")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Output format
    #[arg(short, long, value_enum, global = true)]
    pub format: Option<CliFormat>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Configuration file path
    #[arg(short, long, global = true, env = "RAGLINE_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Output format options.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum CliFormat {
    /// Table format (default)
    Table,
    /// JSON format
    Json,
    /// Quiet format (answer only)
    Quiet,
}

/// CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Answer one question
    Ask(AskArgs),

    /// Enter interactive REPL mode
    Repl,

    /// Answer and score a file of questions
    Eval(EvalArgs),

    /// Check that the index is reachable
    Health,

    /// Show or initialise configuration
    Config(ConfigArgs),
}

/// Arguments for the ask command.
#[derive(Debug, Clone, Parser)]
pub struct AskArgs {
    /// The question
    #[arg(required = true, num_args = 1..)]
    pub question: Vec<String>,

    /// Number of chunks to retrieve
    #[arg(short = 'k', long)]
    pub top_k: Option<usize>,

    /// Metadata filter (key=value); repeat to add values
    #[arg(long = "filter", value_name = "KEY=VALUE")]
    pub filters: Vec<String>,

    /// Leave sources out of the output
    #[arg(long)]
    pub no_sources: bool,

    /// Print the answer as it is generated
    #[arg(short, long)]
    pub stream: bool,

    /// Score the answer after it is printed
    #[arg(short, long)]
    pub evaluate: bool,
}

impl AskArgs {
    /// The question words joined back together
    pub fn question_text(&self) -> String {
        self.question.join(" ")
    }

    /// Parse `--filter` flags
    pub fn metadata_filter(&self) -> Result<MetadataFilter> {
        parse_filters(&self.filters)
    }
}

/// Arguments for the eval command.
#[derive(Debug, Parser)]
pub struct EvalArgs {
    /// File with one question per line, or a JSON array of query requests
    pub file: PathBuf,

    /// Append results to this JSONL file
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Arguments for the config command.
#[derive(Debug, Parser)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

/// Configuration actions.
#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Print the effective configuration
    Show,

    /// Print the configuration file path
    Path,

    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
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

/// Build a metadata filter from `key=value` pairs.
pub fn parse_filters(pairs: &[String]) -> Result<MetadataFilter> {
    pairs.iter().try_fold(MetadataFilter::new(), |filter, pair| {
        match pair.split_once('=') {
            Some((key, value)) if !key.trim().is_empty() => {
                Ok(filter.allow(key.trim(), [value.trim()]))
            }
            _ => Err(CliError::InvalidInput(format!(
                "Filter '{}' must look like key=value",
                pair
            ))),
        }
    })
}
