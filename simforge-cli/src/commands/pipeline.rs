//! Pipeline command handler
//!
//! Prints the compiled container pipeline of a run bundle, one stage per
//! line with its image and upstream stages.

use anyhow::Result;
use colored::*;
use simforge_core::dto::container::{DAG_ROOT, ScenarioRunContainer, ScenarioRunStartContainers};
use std::path::Path;

use super::compile_bundle;
use crate::config::Config;

/// Compile a bundle and print its pipeline
pub fn show_pipeline(config: &Config, bundle: &Path, simulation_id: Option<String>) -> Result<()> {
    let (_, start) = compile_bundle(config, bundle, simulation_id)?;
    print_pipeline(&start);
    Ok(())
}

fn print_pipeline(start: &ScenarioRunStartContainers) {
    println!(
        "{}",
        format!("Compiled {} container(s):", start.containers.len()).bold()
    );
    println!("  Simulation: {}", start.csm_simulation_id.cyan());
    if let Some(name) = &start.generate_name {
        println!("  Name:       {}", name.dimmed());
    }
    println!(
        "  Node pool:  {}",
        start
            .node_label
            .as_deref()
            .unwrap_or("default placement")
            .dimmed()
    );
    println!();

    for (index, container) in start.containers.iter().enumerate() {
        print_container(index + 1, container);
    }
}

fn print_container(position: usize, container: &ScenarioRunContainer) {
    println!(
        "  {} {}",
        format!("{:>2}.", position).dimmed(),
        container.name.bold()
    );
    println!("      Image:      {}", container.image);
    println!("      After:      {}", describe_dependencies(container));

    if let Some(entrypoint) = &container.entrypoint {
        println!("      Entrypoint: {}", entrypoint.dimmed());
    }
    if let Some(args) = &container.run_args {
        println!("      Args:       {}", args.join(" ").dimmed());
    }
    if let Some(mode) = container.env("CSM_CONTAINER_MODE") {
        println!("      Mode:       {}", mode.yellow());
    }
}

fn describe_dependencies(container: &ScenarioRunContainer) -> ColoredString {
    match container.dependencies.as_deref() {
        None | Some([]) => "-".dimmed(),
        Some([root]) if root == DAG_ROOT => "root".green(),
        Some(_) => container.upstream().collect::<Vec<_>>().join(", ").cyan(),
    }
}
