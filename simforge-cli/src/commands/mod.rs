//! Commands module
//!
//! Defines all CLI commands and their handlers.

mod pipeline;
mod sizing;
mod workflow;

pub use workflow::OutputFormat;

use anyhow::{Context, Result};
use clap::Subcommand;
use simforge_compiler::{PipelineCompiler, PlatformConfig};
use simforge_core::dto::container::ScenarioRunStartContainers;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::config::{Config, load_bundle};

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Compile a run bundle and print its container pipeline
    Pipeline {
        /// Run bundle file (YAML or JSON)
        #[arg(short, long)]
        bundle: PathBuf,

        /// Correlation id of the run, generated when omitted
        #[arg(long)]
        simulation_id: Option<String>,
    },
    /// Compile a run bundle and print the workflow object
    Workflow {
        /// Run bundle file (YAML or JSON)
        #[arg(short, long)]
        bundle: PathBuf,

        /// Output format
        #[arg(short, long, value_enum, default_value = "yaml")]
        format: OutputFormat,

        /// Correlation id of the run, generated when omitted
        #[arg(long)]
        simulation_id: Option<String>,
    },
    /// Resolve the node pool of a compute size
    Sizing {
        /// Compute size of a run template (e.g., highcpu or %NONE%)
        compute_size: Option<String>,
    },
}

/// Handle a CLI command
///
/// Routes the command to the appropriate handler module.
///
/// # Arguments
/// * `command` - The command to execute
/// * `config` - The CLI configuration
///
/// # Returns
/// Result indicating success or failure
pub fn handle_command(command: Commands, config: &Config) -> Result<()> {
    match command {
        Commands::Pipeline {
            bundle,
            simulation_id,
        } => pipeline::show_pipeline(config, &bundle, simulation_id),
        Commands::Workflow {
            bundle,
            format,
            simulation_id,
        } => workflow::show_workflow(config, &bundle, format, simulation_id),
        Commands::Sizing { compute_size } => sizing::show_sizing(compute_size.as_deref()),
    }
}

/// Compiles a bundle with the configured platform
fn compile_bundle(
    config: &Config,
    bundle_path: &Path,
    simulation_id: Option<String>,
) -> Result<(PlatformConfig, ScenarioRunStartContainers)> {
    let platform = config.load_platform_config()?;
    let bundle = load_bundle(bundle_path)?;
    let simulation_id = simulation_id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    info!(
        "Compiling scenario {} as simulation {}",
        bundle.scenario.id, simulation_id
    );

    let start = PipelineCompiler::new(&platform)
        .compile(&bundle, &simulation_id)
        .with_context(|| format!("Failed to compile scenario {}", bundle.scenario.id))?;

    Ok((platform, start))
}
