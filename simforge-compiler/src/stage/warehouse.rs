//! Send-to-warehouse container

use simforge_core::domain::organization::Workspace;
use simforge_core::domain::scenario::Scenario;
use simforge_core::domain::solution::RunTemplate;
use simforge_core::dto::container::ScenarioRunContainer;

use super::{SEND_DATA_WAREHOUSE_CONTAINER, StageContext};
use crate::env::Authentication;
use crate::error::Result;

pub const SEND_DATASETS_VAR: &str = "CSM_SEND_DATAWAREHOUSE_DATASETS";
pub const SEND_PARAMETERS_VAR: &str = "CSM_SEND_DATAWAREHOUSE_PARAMETERS";

/// Which inputs are sent to the data warehouse
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WarehouseFlags {
    pub datasets: bool,
    pub parameters: bool,
}

impl WarehouseFlags {
    /// Resolves both flags
    ///
    /// The scenario wins over the run template, which wins over the
    /// workspace default; everything is sent when nobody says otherwise.
    pub fn resolve(workspace: &Workspace, run_template: &RunTemplate, scenario: &Scenario) -> Self {
        let default = workspace.send_input_to_data_warehouse.unwrap_or(true);
        Self {
            datasets: scenario
                .send_datasets_to_data_warehouse
                .or(run_template.send_datasets_to_data_warehouse)
                .unwrap_or(default),
            parameters: scenario
                .send_input_parameters_to_data_warehouse
                .or(run_template.send_input_parameters_to_data_warehouse)
                .unwrap_or(default),
        }
    }

    pub fn any(&self) -> bool {
        self.datasets || self.parameters
    }
}

/// Builds `sendDataWarehouseContainer`
pub fn build_send_to_warehouse(
    ctx: &StageContext<'_>,
    image: &str,
    flags: WarehouseFlags,
) -> Result<ScenarioRunContainer> {
    let mut env = ctx.base_env(Authentication::Platform)?;
    env.insert(SEND_DATASETS_VAR.into(), flags.datasets.to_string());
    env.insert(SEND_PARAMETERS_VAR.into(), flags.parameters.to_string());

    Ok(ScenarioRunContainer {
        name: SEND_DATA_WAREHOUSE_CONTAINER.to_string(),
        image: image.to_string(),
        entrypoint: None,
        run_args: None,
        env_vars: Some(env),
        labels: ctx.labels(),
        dependencies: None,
    })
}
