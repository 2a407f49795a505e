//! Command-line interface for stacksplit.
//!
//! # Commands
//!
//! - `stats` - Resource, output, parameter, and byte counts against the limits
//! - `graph` - Resources, typed dependency edges, and circular groups
//! - `analyze` - Rank split options produced by every clustering strategy
//! - `split` - Write child stacks and a parent stack for the best option
//!
//! # Global Options
//!
//! - `--verbose` / `-v`: debug logging on stderr
//! - `--quiet` / `-q`: errors only
//! - `--config` / `-c`: explicit configuration file
//!
//! Without either flag the log level is `warn`, or whatever `RUST_LOG` says.

mod analyze;
mod common;
mod graph;
mod split;
mod stats;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use crate::config::SplitConfig;

pub use analyze::{AnalyzeCommand, ClusteringArgs};
pub use common::OutputFormat;
pub use graph::GraphCommand;
pub use split::{SplitCommand, write_stacks};
pub use stats::StatsCommand;

#[derive(Parser, Debug)]
#[command(
    name = "stacksplit",
    about = "Analyze infrastructure templates and split them into smaller stacks",
    version,
    long_about = "stacksplit builds a dependency graph of a resolved infrastructure template, \
                  clusters its resources into cohesive groups, and generates child stacks \
                  wired together through cross-stack exports and a parent stack."
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging on stderr
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Path to a configuration file (overrides STACKSPLIT_CONFIG and the default locations)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Report template size against the platform limits
    Stats(StatsCommand),

    /// Print the resource dependency graph
    Graph(GraphCommand),

    /// Suggest how to split a template
    Analyze(AnalyzeCommand),

    /// Split a template into child stacks and a parent stack
    Split(SplitCommand),
}

impl Cli {
    /// Install logging, load configuration, and run the subcommand.
    pub async fn execute(self) -> Result<()> {
        init_logging(self.verbose, self.quiet);

        match self.command {
            Commands::Stats(cmd) => cmd.execute().await,
            Commands::Graph(cmd) => cmd.execute().await,
            Commands::Analyze(cmd) => {
                let config = SplitConfig::load(self.config.as_deref()).await?;
                cmd.execute(&config).await
            }
            Commands::Split(cmd) => {
                let config = SplitConfig::load(self.config.as_deref()).await?;
                cmd.execute(&config).await
            }
        }
    }
}

/// Filter directive for the global flags; `None` defers to `RUST_LOG`.
fn log_directive(verbose: bool, quiet: bool) -> Option<&'static str> {
    if verbose {
        Some("stacksplit=debug")
    } else if quiet {
        Some("error")
    } else {
        None
    }
}

/// Install the stderr `tracing` subscriber.
///
/// Safe to call more than once; later calls are ignored.
pub fn init_logging(verbose: bool, quiet: bool) {
    let filter = match log_directive(verbose, quiet) {
        Some(directive) => EnvFilter::new(directive),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
