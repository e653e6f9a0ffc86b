//! Solution domain types
//!
//! A solution packages a simulator image together with its run templates
//! and the parameters those templates expose.

use serde::{Deserialize, Serialize};

/// Solution definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Solution {
    pub id: String,
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    /// Simulator image repository
    pub repository: String,
    /// Simulator image tag
    pub version: String,
    /// Force the workflow engine to pull the image on every run
    #[serde(default)]
    pub always_pull: Option<bool>,
    #[serde(default)]
    pub parameters: Vec<RunTemplateParameter>,
    #[serde(default)]
    pub parameter_groups: Vec<RunTemplateParameterGroup>,
    #[serde(default)]
    pub run_templates: Vec<RunTemplate>,
}

impl Solution {
    /// Finds a run template by id
    pub fn run_template(&self, id: &str) -> Option<&RunTemplate> {
        self.run_templates.iter().find(|t| t.id == id)
    }

    /// Parameters exposed by a run template, in group then declaration order
    pub fn run_template_parameters<'a>(
        &'a self,
        run_template: &'a RunTemplate,
    ) -> impl Iterator<Item = &'a RunTemplateParameter> {
        run_template
            .parameter_groups
            .iter()
            .filter_map(|group_id| self.parameter_groups.iter().find(|g| &g.id == group_id))
            .flat_map(|group| group.parameters.iter())
            .filter_map(|parameter_id| self.parameters.iter().find(|p| &p.id == parameter_id))
    }
}

/// Parameter declared by a solution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunTemplateParameter {
    pub id: String,
    #[serde(default)]
    pub label: Option<String>,
    /// Value type; `%DATASETID%` marks a parameter resolving to dataset ids
    pub var_type: String,
    #[serde(default)]
    pub default_value: Option<String>,
}

/// Named group of solution parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunTemplateParameterGroup {
    pub id: String,
    #[serde(default)]
    pub label: Option<String>,
    /// Parameter ids, in display order
    #[serde(default)]
    pub parameters: Vec<String>,
}

/// Where the code of a run-template step is taken from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepSource {
    /// Shipped inside the solution image
    #[default]
    Local,
    /// Uploaded to the workspace's cloud storage
    Cloud,
}

/// Declarative stage configuration of a run
///
/// Stage toggles are optional: see the `*_enabled` accessors for defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunTemplate {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    /// Simulation name passed to the engine
    #[serde(default)]
    pub csm_simulation: Option<String>,
    /// Requested compute profile; `%NONE%` means explicit none
    #[serde(default)]
    pub compute_size: Option<String>,
    #[serde(default)]
    pub fetch_datasets: Option<bool>,
    #[serde(default)]
    pub fetch_scenario_parameters: Option<bool>,
    #[serde(default)]
    pub apply_parameters: Option<bool>,
    #[serde(default)]
    pub validate_data: Option<bool>,
    #[serde(default)]
    pub send_datasets_to_data_warehouse: Option<bool>,
    #[serde(default)]
    pub send_input_parameters_to_data_warehouse: Option<bool>,
    #[serde(default)]
    pub pre_run: Option<bool>,
    #[serde(default)]
    pub run: Option<bool>,
    #[serde(default)]
    pub post_run: Option<bool>,
    /// Merge consecutive solution steps into shared containers
    #[serde(default)]
    pub stack_steps: Option<bool>,
    /// Fetch scenario parameters as JSON instead of CSV
    #[serde(default)]
    pub parameters_json: Option<bool>,
    #[serde(default)]
    pub parameters_handler_source: Option<StepSource>,
    #[serde(default)]
    pub dataset_validator_source: Option<StepSource>,
    #[serde(default)]
    pub pre_run_source: Option<StepSource>,
    #[serde(default)]
    pub run_source: Option<StepSource>,
    #[serde(default)]
    pub post_run_source: Option<StepSource>,
    /// Ids of the solution parameter groups this template exposes
    #[serde(default)]
    pub parameter_groups: Vec<String>,
}

impl RunTemplate {
    pub fn fetch_datasets_enabled(&self) -> bool {
        self.fetch_datasets.unwrap_or(true)
    }

    pub fn fetch_scenario_parameters_enabled(&self) -> bool {
        self.fetch_scenario_parameters.unwrap_or(true)
    }

    pub fn apply_parameters_enabled(&self) -> bool {
        self.apply_parameters.unwrap_or(false)
    }

    pub fn validate_data_enabled(&self) -> bool {
        self.validate_data.unwrap_or(false)
    }

    pub fn pre_run_enabled(&self) -> bool {
        self.pre_run.unwrap_or(false)
    }

    pub fn run_enabled(&self) -> bool {
        self.run.unwrap_or(true)
    }

    pub fn post_run_enabled(&self) -> bool {
        self.post_run.unwrap_or(false)
    }

    pub fn stack_steps_enabled(&self) -> bool {
        self.stack_steps.unwrap_or(false)
    }
}
