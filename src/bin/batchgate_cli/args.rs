//! Command-line surface for `batchgate-cli`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

pub const DEFAULT_GATEWAY_URL: &str = "http://127.0.0.1:3000";

#[derive(Parser, Debug)]
#[command(name = "batchgate-cli", version, about = "batchgate command-line client", long_about = None)]
pub struct Cli {
    /// Gateway base URL, e.g. <http://127.0.0.1:3000>
    #[arg(long, env = "BATCHGATE_GATEWAY_URL", default_value = DEFAULT_GATEWAY_URL)]
    pub gateway: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check that the gateway is up
    Health,
    /// Process files and save the single result or `processed_images.zip`
    Process(ProcessArgs),
    /// Process files through the preview route and save every rendered result
    Preview(PreviewArgs),
}

#[derive(Args, Debug, Clone)]
pub struct BatchArgs {
    /// Images to upload, in order
    #[arg(required = true, value_name = "FILE")]
    pub files: Vec<PathBuf>,

    /// Enable the engine's shadow effect
    #[arg(long)]
    pub shadow: bool,

    /// JSON object merged over the defaults, e.g. '{"orientation":"lying"}'
    #[arg(long, conflicts_with = "options_file")]
    pub options: Option<String>,

    /// Read the options override from a file
    #[arg(long, value_name = "PATH")]
    pub options_file: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct ProcessArgs {
    #[command(flatten)]
    pub batch: BatchArgs,

    /// Output path; defaults to the name the gateway suggests
    #[arg(long, short)]
    pub out: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct PreviewArgs {
    #[command(flatten)]
    pub batch: BatchArgs,

    /// Directory the results are written to
    #[arg(long, default_value = ".")]
    pub out_dir: PathBuf,

    /// Also bundle every result into `results.zip`
    #[arg(long)]
    pub zip: bool,
}
