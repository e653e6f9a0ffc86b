//! Scenario parameter fetch
//!
//! Builds the container downloading scenario parameter values, and resolves
//! which datasets dataset-typed parameters point to.

use simforge_core::domain::scenario::Scenario;
use simforge_core::domain::solution::{RunTemplate, Solution};
use simforge_core::dto::container::ScenarioRunContainer;
use tracing::warn;

use super::{FETCH_PARAMETERS_CONTAINER, FETCH_PATH_VAR, StageContext};
use crate::connector::DATASET_ID_TOKEN;
use crate::env::{Authentication, PARAMETERS_MOUNT_PATH};
use crate::error::{CompileError, Result};

pub const WRITE_CSV_VAR: &str = "WRITE_CSV";
pub const WRITE_JSON_VAR: &str = "WRITE_JSON";

/// One dataset referenced by a dataset-typed parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetParameter {
    pub parameter_id: String,
    pub dataset_id: String,
    /// Directory under the parameters volume the dataset is fetched into
    pub fetch_id: String,
}

/// Builds `fetchScenarioParametersContainer`
pub fn build_scenario_parameters_fetch(ctx: &StageContext<'_>) -> Result<ScenarioRunContainer> {
    let mut env = ctx.base_env(Authentication::Platform)?;
    let json = ctx.run_template.parameters_json.unwrap_or(false);
    env.insert(FETCH_PATH_VAR.into(), PARAMETERS_MOUNT_PATH.into());
    env.insert(WRITE_CSV_VAR.into(), (!json).to_string());
    env.insert(WRITE_JSON_VAR.into(), json.to_string());

    Ok(ScenarioRunContainer {
        name: FETCH_PARAMETERS_CONTAINER.to_string(),
        image: ctx.config.images.scenario_fetch_parameters.clone(),
        entrypoint: None,
        run_args: None,
        env_vars: Some(env),
        labels: ctx.labels(),
        dependencies: None,
    })
}

/// Resolves the datasets referenced by the run template's dataset-typed
/// parameters
///
/// A parameter value is either a single id or a JSON array of ids; the
/// solution's default value applies when the scenario sets none. Datasets
/// come back in parameter order, then value order. A single id is fetched
/// into `<parameterId>`, every id of an array into
/// `<parameterId>/<datasetId>`, even a one-element array.
///
/// # Errors
/// Returns `InvalidDatasetParameter` when a value starts like a list but is
/// not a JSON array of strings.
pub fn dataset_parameters(
    solution: &Solution,
    run_template: &RunTemplate,
    scenario: &Scenario,
) -> Result<Vec<DatasetParameter>> {
    let mut resolved = Vec::new();

    for parameter in solution
        .run_template_parameters(run_template)
        .filter(|p| p.var_type == DATASET_ID_TOKEN)
    {
        let Some(value) = scenario
            .parameter_value(&parameter.id)
            .or(parameter.default_value.as_deref())
        else {
            continue;
        };

        // A list keeps one directory per dataset, whatever its length
        let is_list = value.trim_start().starts_with('[');
        let ids = parse_dataset_ids(&parameter.id, value)?;
        for dataset_id in ids {
            let fetch_id = if is_list {
                format!("{}/{}", parameter.id, dataset_id)
            } else {
                parameter.id.clone()
            };
            resolved.push(DatasetParameter {
                parameter_id: parameter.id.clone(),
                dataset_id,
                fetch_id,
            });
        }
    }

    Ok(resolved)
}

fn parse_dataset_ids(parameter_id: &str, value: &str) -> Result<Vec<String>> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(Vec::new());
    }

    if value.starts_with('[') {
        let ids: Vec<String> =
            serde_json::from_str(value).map_err(|_| CompileError::InvalidDatasetParameter {
                parameter_id: parameter_id.to_string(),
                value: value.to_string(),
            })?;
        let count = ids.len();
        let ids: Vec<String> = ids.into_iter().filter(|id| !id.is_empty()).collect();
        if ids.len() < count {
            warn!(
                "Ignoring {} empty dataset id(s) in parameter {}",
                count - ids.len(),
                parameter_id
            );
        }
        return Ok(ids);
    }

    Ok(vec![value.to_string()])
}
