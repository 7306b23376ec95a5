use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "xmlrecon",
    about = "Reviewable diffs between two XML corpora, and replay of the approved changes",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Configuration file (default: ./xmlrecon.toml when present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Compare two document sets and write a change CSV for review
    Analyze(AnalyzeArgs),
    /// Apply the approved rows of a reviewed change CSV
    Apply(ApplyArgs),
}

#[derive(Args)]
pub struct AnalyzeArgs {
    /// Original documents
    pub set_a: Option<PathBuf>,
    /// Revised documents
    pub set_b: Option<PathBuf>,
    /// Change file to write (default: <output_dir>/xml_changes_<timestamp>.csv)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
    /// Report cross-file moves as separate DELETE and ADD records
    #[arg(long)]
    pub no_moves: bool,
}

#[derive(Args)]
pub struct ApplyArgs {
    /// Original documents the records were computed against
    pub source: Option<PathBuf>,
    /// Reviewed change file
    pub csv: Option<PathBuf>,
    /// Directory for the updated documents (default: <output_dir>/updated_xmls_<timestamp>)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}
