//! Workflow command handler
//!
//! Compiles a run bundle, lowers it and writes the workflow object to
//! stdout, ready to be submitted to the workflow engine.

use anyhow::{Context, Result};
use clap::ValueEnum;
use simforge_compiler::WorkflowLowering;
use simforge_core::dto::workflow::Workflow;
use std::path::Path;

use super::compile_bundle;
use crate::config::Config;

/// Output format of the workflow object
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Yaml,
}

/// Compile, lower and print a bundle's workflow
pub fn show_workflow(
    config: &Config,
    bundle: &Path,
    format: OutputFormat,
    simulation_id: Option<String>,
) -> Result<()> {
    let (platform, start) = compile_bundle(config, bundle, simulation_id)?;

    let workflow = WorkflowLowering::new(&platform)
        .lower(&start)
        .context("Failed to lower the compiled pipeline")?;

    println!("{}", render(&workflow, format)?);
    Ok(())
}

fn render(workflow: &Workflow, format: OutputFormat) -> Result<String> {
    let rendered = match format {
        OutputFormat::Json => serde_json::to_string_pretty(workflow)?,
        OutputFormat::Yaml => serde_yaml::to_string(workflow)?,
    };
    Ok(rendered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use simforge_core::dto::workflow::{ObjectMeta, WorkflowSpec};
    use std::collections::BTreeMap;

    fn workflow() -> Workflow {
        Workflow {
            api_version: "argoproj.io/v1alpha1".to_string(),
            kind: "Workflow".to_string(),
            metadata: ObjectMeta {
                generate_name: Some("demo-".to_string()),
                ..Default::default()
            },
            spec: WorkflowSpec {
                entrypoint: "entrypoint".to_string(),
                templates: Vec::new(),
                node_selector: BTreeMap::from([(
                    "kubernetes.io/os".to_string(),
                    "linux".to_string(),
                )]),
                service_account_name: None,
                volume_claim_templates: Vec::new(),
            },
        }
    }

    #[test]
    fn test_render_json() {
        let rendered = render(&workflow(), OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&rendered).unwrap();
        assert_eq!(value["metadata"]["generateName"], "demo-");
        assert!(value["spec"].get("serviceAccountName").is_none());
    }

    #[test]
    fn test_render_yaml() {
        let rendered = render(&workflow(), OutputFormat::Yaml).unwrap();
        assert!(rendered.contains("apiVersion: argoproj.io/v1alpha1"));
        assert!(rendered.contains("generateName: demo-"));

        let parsed: Workflow = serde_yaml::from_str(&rendered).unwrap();
        assert_eq!(parsed, workflow());
    }
}
