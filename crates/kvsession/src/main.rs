//! kvsession - versioned session storage with a write-through local cache
//!
//! Main entry point for the kvsession CLI.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::warn;

mod commands;

use commands::{config, smoke};

// ─────────────────────────────────────────────────────────────────────────────
// CLI Structure
// ─────────────────────────────────────────────────────────────────────────────

/// kvsession - versioned session storage with a write-through local cache
#[derive(Parser)]
#[command(name = "kvsession")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output as JSON (for scripting)
    #[arg(long, global = true)]
    pub json: bool,

    /// Load this config file on top of the discovered ones
    #[arg(long, global = true, env = "KVSESSION_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the end-to-end session scenarios against an in-process backend
    Smoke(smoke::SmokeArgs),

    /// Configuration management
    Config(config::ConfigArgs),
}

// ─────────────────────────────────────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "kvsession=debug,kvsession_client=debug,kvsession_metrics=debug,kvsession_cache=debug,kvsession_config=debug,info"
    } else {
        "kvsession=info,kvsession_client=info,kvsession_metrics=info,kvsession_cache=info,warn"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));

    use tracing_subscriber::prelude::*;
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr)
                .with_filter(filter),
        )
        .init();

    let loaded = kvsession_config::load_config_with_options(None, None, cli.config.as_deref())?;
    for warning in &loaded.warnings {
        warn!("{}", warning);
    }
    loaded.config.validate()?;

    let ctx = commands::Context {
        config: loaded,
        json_output: cli.json,
        verbose: cli.verbose,
    };

    match cli.command {
        Commands::Smoke(args) => smoke::run(args, &ctx).await,
        Commands::Config(args) => config::run(args, &ctx).await,
    }
}
