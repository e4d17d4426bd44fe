//! CLI command definitions and subcommands

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::provider::ProviderSpec;

/// ratequeue - priority queue drained by rate-limited providers
#[derive(Parser, Debug)]
#[command(
    name = "rq",
    about = "Simulate a priority request queue drained by rate-limited providers",
    version
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(
        short = 'l',
        long = "log-level",
        global = true,
        help = "Log level (TRACE, DEBUG, INFO, WARN, ERROR)"
    )]
    pub log_level: Option<String>,

    /// Subcommand to execute; prompts interactively when omitted
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run a simulation non-interactively
    Run {
        /// Provider as NAME=RATE (requests per second); repeatable
        #[arg(short, long = "provider", value_name = "NAME=RATE")]
        providers: Vec<ProviderSpec>,

        /// Number of requests to generate
        #[arg(short = 'n', long)]
        requests: Option<u64>,

        /// Seed for random priorities
        #[arg(short, long)]
        seed: Option<u64>,

        /// Empty-queue backoff in milliseconds
        #[arg(short, long = "backoff-ms")]
        backoff_ms: Option<u64>,

        /// Print records as JSON lines
        #[arg(long)]
        json: bool,
    },

    /// Prompt for providers and request count, then run
    Interactive,

    /// Print the effective configuration as YAML
    Config,
}
