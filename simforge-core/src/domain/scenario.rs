//! Scenario domain types

use serde::{Deserialize, Serialize};

/// Scenario submitted for a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scenario {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    pub run_template_id: String,
    /// Dataset ids to fetch, in order
    #[serde(default)]
    pub dataset_list: Vec<String>,
    #[serde(default)]
    pub parameters_values: Vec<ScenarioParameterValue>,
    /// Overrides the run template and workspace defaults
    #[serde(default)]
    pub send_datasets_to_data_warehouse: Option<bool>,
    /// Overrides the run template and workspace defaults
    #[serde(default)]
    pub send_input_parameters_to_data_warehouse: Option<bool>,
}

impl Scenario {
    /// Value set for a parameter, if any
    pub fn parameter_value(&self, parameter_id: &str) -> Option<&str> {
        self.parameters_values
            .iter()
            .find(|v| v.parameter_id == parameter_id)
            .map(|v| v.value.as_str())
    }
}

/// Value of one run-template parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioParameterValue {
    pub parameter_id: String,
    #[serde(default)]
    pub var_type: Option<String>,
    pub value: String,
}
