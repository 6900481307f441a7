//! CLI commands and argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// inflight-pager CLI
#[derive(Parser, Debug)]
#[command(name = "inflight-pager")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Pager configuration file (YAML or JSON)
    #[arg(short = 'C', long, global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true, default_value = "json")]
    pub format: OutputFormat,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Walk a JSON HTTP endpoint and print every entity
    Fetch {
        /// Endpoint URL (overrides http.url from the config file)
        #[arg(long)]
        url: Option<String>,

        /// Entities per page
        #[arg(long)]
        per_page: Option<u32>,

        /// Stop after this many pages
        #[arg(long)]
        max_pages: Option<u32>,

        /// Extra request header as NAME:VALUE (repeatable)
        #[arg(short = 'H', long = "header")]
        headers: Vec<String>,

        /// Retry a failed page this many times before giving up
        #[arg(long, default_value = "0")]
        retries: u32,
    },

    /// Walk the built-in mock source
    Demo {
        /// Number of entities in the source
        #[arg(long, default_value = "23")]
        total: u64,

        /// Entities per page
        #[arg(long, default_value = "5")]
        per_page: u32,

        /// Simulated latency per page in milliseconds
        #[arg(long, default_value = "100")]
        delay_ms: u64,

        /// Over-report the total by this many entities
        #[arg(long, default_value = "0")]
        inflate_total: u64,

        /// Fail the first request to show caller-driven retry
        #[arg(long)]
        fail_first: bool,
    },
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output (one message per line)
    Json,
    /// Human-readable output
    Pretty,
}
