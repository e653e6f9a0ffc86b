//! Pipeline compiler
//!
//! Turns a scenario and its run template into the ordered container DAG of
//! one run. Stages follow a fixed order; each present stage depends on the
//! closest present stage before it, so disabled stages are skipped without
//! breaking the chain:
//!
//! ```text
//! DatasetFetch* -> ScenarioParameterFetch -> DatasetTypeParameterFetch*
//!   -> ApplyParameters -> Validate -> SendToWarehouse -> PreRun -> Run -> PostRun
//! ```
//!
//! Compiling is pure: identical inputs give an identical pipeline.

use serde::{Deserialize, Serialize};
use simforge_core::domain::dataset::{Connector, Dataset};
use simforge_core::domain::organization::{Organization, Workspace};
use simforge_core::domain::scenario::Scenario;
use simforge_core::domain::solution::Solution;
use simforge_core::dto::container::{DAG_ROOT, ScenarioRunContainer, ScenarioRunStartContainers};
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, info, warn};

use crate::config::PlatformConfig;
use crate::env::{Authentication, RunContext};
use crate::error::{CompileError, Result};
use crate::sizing::resolve_sizing;
use crate::stage::StageContext;
use crate::stage::fetch::{build_dataset_fetch, build_dataset_parameter_fetch};
use crate::stage::parameters::{
    DatasetParameter, build_scenario_parameters_fetch, dataset_parameters,
};
use crate::stage::solution::{SolutionStep, build_stacked, build_step};
use crate::stage::warehouse::{WarehouseFlags, build_send_to_warehouse};

pub const DEFAULT_GENERATE_NAME: &str = "default-workflow-";
pub const LABEL_PREFIX: &str = "cosmotech.com/";

/// Validated inputs of one run
///
/// `datasets` and `connectors` hold every dataset and connector the run
/// may reference: the scenario's dataset list and the targets of its
/// dataset-typed parameters. Lookups happen before compiling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunInputs {
    pub organization: Organization,
    pub workspace: Workspace,
    pub scenario: Scenario,
    pub solution: Solution,
    #[serde(default)]
    pub datasets: Vec<Dataset>,
    #[serde(default)]
    pub connectors: Vec<Connector>,
}

impl RunInputs {
    /// Finds a dataset and the connector it is bound to
    ///
    /// Also rejects connectors requesting conflicting authentications, so
    /// no container is built for them.
    pub fn resolve_dataset(&self, dataset_id: &str) -> Result<(&Dataset, &Connector)> {
        let dataset = self
            .datasets
            .iter()
            .find(|d| d.id == dataset_id)
            .ok_or_else(|| CompileError::DatasetNotFound(dataset_id.to_string()))?;

        let binding = dataset
            .connector
            .as_ref()
            .ok_or_else(|| CompileError::DatasetWithoutConnector(dataset.id.clone()))?;

        let connector = self
            .connectors
            .iter()
            .find(|c| c.id == binding.id)
            .ok_or_else(|| CompileError::UnknownConnector {
                dataset_id: dataset.id.clone(),
                connector_id: binding.id.clone(),
            })?;

        Authentication::for_connector(connector)?;

        Ok((dataset, connector))
    }
}

/// Stage kinds, in pipeline order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageKind {
    DatasetFetch,
    ScenarioParameterFetch,
    DatasetTypeParameterFetch,
    ApplyParameters,
    Validate,
    SendToWarehouse,
    PreRun,
    Run,
    PostRun,
}

impl StageKind {
    /// Solution step run by this stage, if any
    pub fn solution_step(&self) -> Option<SolutionStep> {
        match self {
            Self::ApplyParameters => Some(SolutionStep::ApplyParameters),
            Self::Validate => Some(SolutionStep::Validate),
            Self::PreRun => Some(SolutionStep::PreRun),
            Self::Run => Some(SolutionStep::Run),
            Self::PostRun => Some(SolutionStep::PostRun),
            _ => None,
        }
    }

    /// Fetch stages opening the pipeline hang off [`DAG_ROOT`]
    fn is_fetch(&self) -> bool {
        matches!(
            self,
            Self::DatasetFetch | Self::ScenarioParameterFetch | Self::DatasetTypeParameterFetch
        )
    }
}

/// Per-compile state shared by stage builders
struct Compilation<'a> {
    ctx: StageContext<'a>,
    datasets: Vec<(&'a Dataset, &'a Connector)>,
    dataset_parameters: Vec<(DatasetParameter, &'a Dataset, &'a Connector)>,
    warehouse: WarehouseFlags,
    warehouse_image: Option<&'a str>,
}

type StageBuilder = fn(&Compilation<'_>) -> Result<Vec<ScenarioRunContainer>>;

enum PlannedStage {
    Single(StageKind, StageBuilder),
    Stacked(Vec<SolutionStep>),
}

/// Compiles runs against one platform configuration
#[derive(Debug, Clone, Copy)]
pub struct PipelineCompiler<'a> {
    config: &'a PlatformConfig,
}

impl<'a> PipelineCompiler<'a> {
    pub fn new(config: &'a PlatformConfig) -> Self {
        Self { config }
    }

    /// Compiles the container pipeline of a run
    ///
    /// # Arguments
    /// * `inputs` - Validated run inputs
    /// * `csm_simulation_id` - Correlation token of the run
    ///
    /// # Errors
    /// Any error aborts the compile; no partial pipeline is returned.
    pub fn compile(
        &self,
        inputs: &RunInputs,
        csm_simulation_id: &str,
    ) -> Result<ScenarioRunStartContainers> {
        let solution = &inputs.solution;
        let scenario = &inputs.scenario;
        let run_template = solution.run_template(&scenario.run_template_id).ok_or_else(|| {
            CompileError::RunTemplateNotFound {
                solution_id: solution.id.clone(),
                run_template_id: scenario.run_template_id.clone(),
            }
        })?;

        let ctx = StageContext {
            config: self.config,
            run: RunContext {
                organization_id: &inputs.organization.id,
                workspace_id: &inputs.workspace.id,
                workspace_key: &inputs.workspace.key,
                scenario_id: &scenario.id,
                csm_simulation_id,
            },
            organization: &inputs.organization,
            workspace: &inputs.workspace,
            scenario,
            solution,
            run_template,
        };

        // Parsed even when parameter fetching is off: a malformed value is
        // always reported to the submitter.
        let parameters = dataset_parameters(solution, run_template, scenario)?;

        let datasets = if run_template.fetch_datasets_enabled() {
            scenario
                .dataset_list
                .iter()
                .map(|id| inputs.resolve_dataset(id))
                .collect::<Result<Vec<_>>>()?
        } else {
            Vec::new()
        };

        let dataset_parameters = if run_template.fetch_scenario_parameters_enabled() {
            parameters
                .into_iter()
                .map(|p| -> Result<_> {
                    let (dataset, connector) = inputs.resolve_dataset(&p.dataset_id)?;
                    Ok((p, dataset, connector))
                })
                .collect::<Result<Vec<_>>>()?
        } else {
            Vec::new()
        };

        let warehouse = WarehouseFlags::resolve(&inputs.workspace, run_template, scenario);
        let warehouse_image = self.config.images.send_data_warehouse.as_deref();
        if warehouse.any() && warehouse_image.is_none() {
            warn!("Sending to the data warehouse requested but no image is configured, skipping");
        }

        let compilation = Compilation {
            ctx,
            datasets,
            dataset_parameters,
            warehouse,
            warehouse_image,
        };

        let containers = link(&compilation, plan(&compilation))?;
        if containers.is_empty() {
            return Err(CompileError::EmptyPipeline(run_template.id.clone()));
        }
        validate_dependencies(&containers)?;

        info!(
            "Compiled scenario {} with run template {}: {} container(s)",
            scenario.id,
            run_template.id,
            containers.len()
        );

        Ok(ScenarioRunStartContainers {
            generate_name: generate_name(scenario.name.as_deref()),
            node_label: resolve_sizing(run_template.compute_size.as_deref()),
            csm_simulation_id: csm_simulation_id.to_string(),
            always_pull: solution.always_pull.unwrap_or(false),
            labels: workflow_labels(&ctx, csm_simulation_id),
            containers,
        })
    }
}

/// Lists the present stages, merging solution steps when stacking
fn plan(compilation: &Compilation<'_>) -> Vec<PlannedStage> {
    let run_template = compilation.ctx.run_template;
    let stages: [(StageKind, bool, StageBuilder); 9] = [
        (
            StageKind::DatasetFetch,
            !compilation.datasets.is_empty(),
            build_dataset_fetches,
        ),
        (
            StageKind::ScenarioParameterFetch,
            run_template.fetch_scenario_parameters_enabled(),
            |c| Ok(vec![build_scenario_parameters_fetch(&c.ctx)?]),
        ),
        (
            StageKind::DatasetTypeParameterFetch,
            !compilation.dataset_parameters.is_empty(),
            build_dataset_parameter_fetches,
        ),
        (
            StageKind::ApplyParameters,
            SolutionStep::ApplyParameters.enabled(run_template),
            |c| Ok(vec![build_step(&c.ctx, SolutionStep::ApplyParameters)?]),
        ),
        (
            StageKind::Validate,
            SolutionStep::Validate.enabled(run_template),
            |c| Ok(vec![build_step(&c.ctx, SolutionStep::Validate)?]),
        ),
        (
            StageKind::SendToWarehouse,
            compilation.warehouse.any() && compilation.warehouse_image.is_some(),
            build_warehouse,
        ),
        (
            StageKind::PreRun,
            SolutionStep::PreRun.enabled(run_template),
            |c| Ok(vec![build_step(&c.ctx, SolutionStep::PreRun)?]),
        ),
        (
            StageKind::Run,
            SolutionStep::Run.enabled(run_template),
            |c| Ok(vec![build_step(&c.ctx, SolutionStep::Run)?]),
        ),
        (
            StageKind::PostRun,
            SolutionStep::PostRun.enabled(run_template),
            |c| Ok(vec![build_step(&c.ctx, SolutionStep::PostRun)?]),
        ),
    ];

    let stack = run_template.stack_steps_enabled();
    let mut planned = Vec::new();
    let mut group: Vec<SolutionStep> = Vec::new();

    for (kind, enabled, build) in stages {
        if !enabled {
            continue;
        }
        match kind.solution_step() {
            Some(step) if stack => group.push(step),
            _ => {
                if !group.is_empty() {
                    planned.push(PlannedStage::Stacked(std::mem::take(&mut group)));
                }
                planned.push(PlannedStage::Single(kind, build));
            }
        }
    }
    if !group.is_empty() {
        planned.push(PlannedStage::Stacked(group));
    }

    planned
}

/// Builds every planned stage and wires each layer to the previous one
fn link(
    compilation: &Compilation<'_>,
    planned: Vec<PlannedStage>,
) -> Result<Vec<ScenarioRunContainer>> {
    let mut containers: Vec<ScenarioRunContainer> = Vec::new();
    let mut previous: Option<Vec<String>> = None;
    let mut stacked = 0;

    for stage in planned {
        let (is_fetch, layer) = match stage {
            PlannedStage::Single(kind, build) => (kind.is_fetch(), build(compilation)?),
            PlannedStage::Stacked(steps) => {
                stacked += 1;
                (
                    false,
                    vec![build_stacked(&compilation.ctx, &steps, stacked)?],
                )
            }
        };
        if layer.is_empty() {
            continue;
        }

        let dependencies = match &previous {
            Some(names) => Some(names.clone()),
            None if is_fetch => Some(vec![DAG_ROOT.to_string()]),
            None => None,
        };
        previous = Some(layer.iter().map(|c| c.name.clone()).collect());

        for mut container in layer {
            debug!(
                "Linking {} after {:?}",
                container.name,
                dependencies.as_deref().unwrap_or_default()
            );
            container.dependencies = dependencies.clone();
            containers.push(container);
        }
    }

    Ok(containers)
}

fn build_dataset_fetches(compilation: &Compilation<'_>) -> Result<Vec<ScenarioRunContainer>> {
    compilation
        .datasets
        .iter()
        .enumerate()
        .map(|(i, (dataset, connector))| {
            build_dataset_fetch(&compilation.ctx, dataset, connector, i + 1)
        })
        .collect()
}

fn build_dataset_parameter_fetches(
    compilation: &Compilation<'_>,
) -> Result<Vec<ScenarioRunContainer>> {
    let offset = compilation.datasets.len();
    compilation
        .dataset_parameters
        .iter()
        .enumerate()
        .map(|(i, (parameter, dataset, connector))| {
            build_dataset_parameter_fetch(
                &compilation.ctx,
                parameter,
                dataset,
                connector,
                offset + i + 1,
            )
        })
        .collect()
}

fn build_warehouse(compilation: &Compilation<'_>) -> Result<Vec<ScenarioRunContainer>> {
    match compilation.warehouse_image {
        Some(image) => Ok(vec![build_send_to_warehouse(
            &compilation.ctx,
            image,
            compilation.warehouse,
        )?]),
        None => Ok(Vec::new()),
    }
}

/// Checks that names are unique and every dependency precedes its dependent
///
/// # Errors
/// Returns `DuplicateContainer` or `DanglingDependency`; both are defects.
pub fn validate_dependencies(containers: &[ScenarioRunContainer]) -> Result<()> {
    let mut seen: HashSet<&str> = HashSet::new();

    for container in containers {
        for dependency in container.upstream() {
            if !seen.contains(dependency) {
                return Err(CompileError::DanglingDependency {
                    container: container.name.clone(),
                    dependency: dependency.to_string(),
                });
            }
        }
        if !seen.insert(container.name.as_str()) {
            return Err(CompileError::DuplicateContainer(container.name.clone()));
        }
    }

    Ok(())
}

/// Workflow name prefix derived from the scenario name
///
/// Lower-cased, with every character outside `[a-z0-9-]` replaced by `-`.
pub fn generate_name(scenario_name: Option<&str>) -> Option<String> {
    let sanitized: String = scenario_name?
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' {
                c
            } else {
                '-'
            }
        })
        .collect();
    let sanitized = sanitized.trim_matches('-');

    if sanitized.is_empty() {
        None
    } else {
        Some(format!("{}-", sanitized))
    }
}

fn workflow_labels(ctx: &StageContext<'_>, csm_simulation_id: &str) -> BTreeMap<String, String> {
    [
        ("organizationId", ctx.run.organization_id),
        ("workspaceId", ctx.run.workspace_id),
        ("scenarioId", ctx.run.scenario_id),
        ("runTemplateId", ctx.run_template.id.as_str()),
        ("simulationId", csm_simulation_id),
    ]
    .into_iter()
    .map(|(key, value)| (format!("{}{}", LABEL_PREFIX, key), value.to_string()))
    .collect()
}
