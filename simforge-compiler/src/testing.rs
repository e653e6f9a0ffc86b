//! Test fixtures shared by the compiler's unit tests

use simforge_core::domain::dataset::{Connector, Dataset, DatasetConnector};
use simforge_core::domain::organization::{Organization, Workspace};
use simforge_core::domain::scenario::{Scenario, ScenarioParameterValue};
use simforge_core::domain::solution::{
    RunTemplate, RunTemplateParameter, RunTemplateParameterGroup, Solution,
};

use crate::compiler::RunInputs;
use crate::config::{PlatformConfig, TwinCacheConfig};
use crate::connector::DATASET_ID_TOKEN;
use crate::env::RunContext;
use crate::stage::StageContext;

pub const SIMULATION_ID: &str = "sim-1";
const RUN_TEMPLATE_ID: &str = "rt";
const DATASET_PARAMETERS_GROUP: &str = "datasetParameters";

pub fn platform_config() -> PlatformConfig {
    let mut config = PlatformConfig::default()
        .with_api_url("https://api.example.com/v1")
        .with_fetch_parameters_image("fetch-scenario-parameters:1.0.0");

    config.azure.credentials.core.tenant_id = "tenant-id".to_string();
    config.azure.credentials.core.client_id = "client-id".to_string();
    config.azure.credentials.core.client_secret = "client-secret".to_string();
    config.azure.storage.connection_string =
        "DefaultEndpointsProtocol=https;AccountName=csm".to_string();
    config.azure.event_bus.base_uri = Some("amqps://csm.servicebus.windows.net".to_string());
    config.azure.container_registries.core = Some("ghcr.io/platform".to_string());
    config.azure.container_registries.solutions = Some("ghcr.io/solutions".to_string());
    config.twincache = Some(TwinCacheConfig {
        host: "twincache".to_string(),
        port: "6379".to_string(),
        username: "default".to_string(),
        password: "cache-password".to_string(),
    });
    config.images.send_data_warehouse = Some("send-to-warehouse:1.0.0".to_string());

    config
}

pub fn connector(id: &str) -> Connector {
    Connector {
        id: id.to_string(),
        key: None,
        name: None,
        repository: format!("connectors/{}", id),
        version: "1.0.0".to_string(),
        azure_managed_identity: None,
        azure_authentication_with_customer_app_registration: None,
        parameter_groups: Vec::new(),
    }
}

pub fn dataset_connector(id: &str, values: &[(&str, &str)]) -> DatasetConnector {
    DatasetConnector {
        id: id.to_string(),
        name: None,
        version: None,
        parameters_values: values
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
    }
}

pub fn dataset(id: &str, connector_id: &str) -> Dataset {
    Dataset {
        id: id.to_string(),
        name: None,
        connector: Some(dataset_connector(connector_id, &[])),
    }
}

/// Declares a dataset-typed parameter visible to the fixture run template
pub fn add_dataset_parameter(solution: &mut Solution, id: &str, default_value: Option<&str>) {
    solution.parameters.push(RunTemplateParameter {
        id: id.to_string(),
        label: None,
        var_type: DATASET_ID_TOKEN.to_string(),
        default_value: default_value.map(str::to_string),
    });

    match solution
        .parameter_groups
        .iter_mut()
        .find(|g| g.id == DATASET_PARAMETERS_GROUP)
    {
        Some(group) => group.parameters.push(id.to_string()),
        None => solution.parameter_groups.push(RunTemplateParameterGroup {
            id: DATASET_PARAMETERS_GROUP.to_string(),
            label: None,
            parameters: vec![id.to_string()],
        }),
    }

    for template in solution.run_templates.iter_mut() {
        if !template.parameter_groups.iter().any(|g| g == DATASET_PARAMETERS_GROUP) {
            template.parameter_groups.push(DATASET_PARAMETERS_GROUP.to_string());
        }
    }
}

pub fn set_parameter(scenario: &mut Scenario, id: &str, value: &str) {
    scenario.parameters_values.push(ScenarioParameterValue {
        parameter_id: id.to_string(),
        var_type: None,
        value: value.to_string(),
    });
}

/// A complete run: one organization, workspace, solution and scenario
pub struct Fixture {
    pub config: PlatformConfig,
    pub organization: Organization,
    pub workspace: Workspace,
    pub scenario: Scenario,
    pub solution: Solution,
    pub datasets: Vec<Dataset>,
    pub connectors: Vec<Connector>,
}

impl Fixture {
    pub fn new() -> Self {
        Self {
            config: platform_config(),
            organization: Organization {
                id: "O-org".to_string(),
                name: Some("Organization".to_string()),
            },
            workspace: Workspace {
                id: "W-ws".to_string(),
                key: "wskey".to_string(),
                name: None,
                send_input_to_data_warehouse: None,
                use_dedicated_event_hub_namespace: None,
            },
            scenario: Scenario {
                id: "S-scenario".to_string(),
                name: None,
                run_template_id: RUN_TEMPLATE_ID.to_string(),
                dataset_list: Vec::new(),
                parameters_values: Vec::new(),
                send_datasets_to_data_warehouse: None,
                send_input_parameters_to_data_warehouse: None,
            },
            solution: Solution {
                id: "SOL".to_string(),
                key: None,
                name: None,
                repository: "simulator".to_string(),
                version: "2.0.0".to_string(),
                always_pull: None,
                parameters: Vec::new(),
                parameter_groups: Vec::new(),
                run_templates: vec![RunTemplate {
                    id: RUN_TEMPLATE_ID.to_string(),
                    csm_simulation: Some("BreweryDemoSimulation".to_string()),
                    ..Default::default()
                }],
            },
            datasets: Vec::new(),
            connectors: vec![connector("c-1")],
        }
    }

    /// Adds datasets `D-1`..`D-<count>` bound to `c-1` to the scenario
    pub fn with_datasets(mut self, count: usize) -> Self {
        for i in 1..=count {
            let id = format!("D-{}", i);
            self.datasets.push(dataset(&id, "c-1"));
            self.scenario.dataset_list.push(id);
        }
        self
    }

    pub fn run_template_mut(&mut self) -> &mut RunTemplate {
        let id = self.scenario.run_template_id.clone();
        self.solution
            .run_templates
            .iter_mut()
            .find(|t| t.id == id)
            .expect("fixture run template")
    }

    pub fn enable_all_stages(&mut self) {
        let template = self.run_template_mut();
        template.fetch_datasets = Some(true);
        template.fetch_scenario_parameters = Some(true);
        template.apply_parameters = Some(true);
        template.validate_data = Some(true);
        template.send_datasets_to_data_warehouse = Some(true);
        template.send_input_parameters_to_data_warehouse = Some(true);
        template.pre_run = Some(true);
        template.run = Some(true);
        template.post_run = Some(true);
        template.stack_steps = Some(false);
    }

    pub fn disable_all_stages(&mut self) {
        let template = self.run_template_mut();
        template.fetch_datasets = Some(false);
        template.fetch_scenario_parameters = Some(false);
        template.apply_parameters = Some(false);
        template.validate_data = Some(false);
        template.send_datasets_to_data_warehouse = Some(false);
        template.send_input_parameters_to_data_warehouse = Some(false);
        template.pre_run = Some(false);
        template.run = Some(false);
        template.post_run = Some(false);
        template.stack_steps = Some(false);
    }

    pub fn context(&self) -> StageContext<'_> {
        let run_template = self
            .solution
            .run_template(&self.scenario.run_template_id)
            .expect("fixture run template");

        StageContext {
            config: &self.config,
            run: RunContext {
                organization_id: &self.organization.id,
                workspace_id: &self.workspace.id,
                workspace_key: &self.workspace.key,
                scenario_id: &self.scenario.id,
                csm_simulation_id: SIMULATION_ID,
            },
            organization: &self.organization,
            workspace: &self.workspace,
            scenario: &self.scenario,
            solution: &self.solution,
            run_template,
        }
    }

    pub fn inputs(&self) -> RunInputs {
        RunInputs {
            organization: self.organization.clone(),
            workspace: self.workspace.clone(),
            scenario: self.scenario.clone(),
            solution: self.solution.clone(),
            datasets: self.datasets.clone(),
            connectors: self.connectors.clone(),
        }
    }
}
