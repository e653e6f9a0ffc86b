//! Simforge CLI
//!
//! Command-line interface for compiling run bundles into container
//! pipelines and workflow objects.

mod commands;
mod config;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, handle_command};
use config::Config;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "simforge")]
#[command(about = "Simulation run pipeline compiler", long_about = None)]
struct Cli {
    /// Platform configuration file (YAML or JSON)
    #[arg(long, env = "SIMFORGE_PLATFORM_CONFIG")]
    platform_config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

fn main() -> Result<()> {
    // Logs go to stderr, stdout carries the command output
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "simforge=info,simforge_compiler=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let config = Config {
        platform_config: cli.platform_config,
    };

    handle_command(cli.command, &config)
}
