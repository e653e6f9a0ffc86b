//! Compiled container pipeline

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Dependency marker for stages with no predecessor that still belong to
/// the first fan-in layer of the graph
pub const DAG_ROOT: &str = "DAG_ROOT";

/// One pipeline stage
///
/// Created once per compile and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioRunContainer {
    pub name: String,
    pub image: String,
    /// Overrides the image entry point when set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entrypoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_args: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env_vars: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<BTreeMap<String, String>>,
    /// Names of earlier stages, or [`DAG_ROOT`]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dependencies: Option<Vec<String>>,
}

impl ScenarioRunContainer {
    /// Dependencies excluding the [`DAG_ROOT`] marker
    pub fn upstream(&self) -> impl Iterator<Item = &str> {
        self.dependencies
            .iter()
            .flatten()
            .map(String::as_str)
            .filter(|d| *d != DAG_ROOT)
    }

    pub fn env(&self, key: &str) -> Option<&str> {
        self.env_vars
            .as_ref()
            .and_then(|vars| vars.get(key))
            .map(String::as_str)
    }
}

/// The compiled pipeline of one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioRunStartContainers {
    /// Workflow name prefix
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generate_name: Option<String>,
    /// Node pool selected for the run
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_label: Option<String>,
    /// Correlation token shared by every container of the run
    pub csm_simulation_id: String,
    /// Always pull images instead of the platform pull policy
    #[serde(default)]
    pub always_pull: bool,
    /// Labels attached to the workflow object
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    pub containers: Vec<ScenarioRunContainer>,
}

impl ScenarioRunStartContainers {
    pub fn container(&self, name: &str) -> Option<&ScenarioRunContainer> {
        self.containers.iter().find(|c| c.name == name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.containers.iter().map(|c| c.name.as_str()).collect()
    }
}
