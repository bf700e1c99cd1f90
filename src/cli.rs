use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "docsearch-index")]
#[command(about = "Decode, validate and re-emit documentation search indices", long_about = None)]
pub struct Cli {
    /// TOML config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
    /// Log at debug level
    #[arg(short, long, global = true)]
    pub verbose: bool,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Load scripts and report what each library contributes
    Inspect {
        #[command(flatten)]
        sources: Sources,
        /// Cache the decoded registry here (overrides the config)
        #[arg(long)]
        snapshot: Option<PathBuf>,
    },
    /// Load scripts and print the combined registry as a single script
    Dump {
        #[command(flatten)]
        sources: Sources,
        /// Write every field instead of run-length placeholders
        #[arg(long)]
        expanded: bool,
    },
}

#[derive(Args)]
pub struct Sources {
    /// `search-index*.js` files, or directories to search for them
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,
}
