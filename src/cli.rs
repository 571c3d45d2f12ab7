use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "lovit")]
#[command(about = "Inspect status classification and probe endpoints", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show the handler slot a status resolves to
    Status(StatusArgs),
    /// Fetch a URL through a wrapped entry function and report the outcome
    Probe(ProbeArgs),
}

#[derive(clap::Args, Debug)]
pub struct StatusArgs {
    /// Numeric status, e.g. 404
    pub code: String,
}

#[derive(clap::Args, Debug)]
pub struct ProbeArgs {
    /// URL to request
    #[arg(long)]
    pub url: String,

    /// `module.task` key the request is filed under
    #[arg(long, default_value = "probe.url")]
    pub key: String,

    /// Dotted path to the status in the response view
    #[arg(long)]
    pub status_path: Option<String>,

    /// Settings file (defaults to `LOVIT_CONFIG` or `config/lovit.toml`)
    #[arg(long)]
    pub config: Option<PathBuf>,
}
