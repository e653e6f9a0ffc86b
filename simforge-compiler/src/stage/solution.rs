//! Solution step containers
//!
//! Apply-parameters, validate, pre-run, run and post-run all execute the
//! solution image in a different container mode. Stacked containers run
//! several of these modes one after the other.

use simforge_core::domain::solution::{RunTemplate, StepSource};
use simforge_core::dto::container::ScenarioRunContainer;
use tracing::debug;

use super::{
    APPLY_PARAMETERS_CONTAINER, MULTIPLE_STEPS_CONTAINER, POST_RUN_CONTAINER, PRE_RUN_CONTAINER,
    RUN_CONTAINER, STORAGE_CONNECTION_STRING_VAR, StageContext, VALIDATE_DATA_CONTAINER,
    image_name, indexed_name,
};
use crate::env::{Authentication, EnvMap, resolve_event_bus_env};
use crate::error::Result;

pub const ENTRYPOINT: &str = "entrypoint.py";
pub const CONTAINER_MODE_VAR: &str = "CSM_CONTAINER_MODE";
pub const SIMULATION_VAR: &str = "CSM_SIMULATION";
pub const PROVIDER_VAR: &str = "CSM_PROVIDER";
pub const LOCATION_VAR: &str = "CSM_LOCATION";
pub const PATH_VAR: &str = "CSM_PATH";

const LOCAL_PROVIDER: &str = "local";
const CLOUD_PROVIDER: &str = "azureStorage";
const LOCAL_LOCATION: &str = "/pkg/share";

/// A step executed by the solution image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolutionStep {
    ApplyParameters,
    Validate,
    PreRun,
    Run,
    PostRun,
}

impl SolutionStep {
    pub fn container_name(&self) -> &'static str {
        match self {
            Self::ApplyParameters => APPLY_PARAMETERS_CONTAINER,
            Self::Validate => VALIDATE_DATA_CONTAINER,
            Self::PreRun => PRE_RUN_CONTAINER,
            Self::Run => RUN_CONTAINER,
            Self::PostRun => POST_RUN_CONTAINER,
        }
    }

    /// Value of `CSM_CONTAINER_MODE`
    pub fn mode(&self) -> &'static str {
        match self {
            Self::ApplyParameters => "handle-parameters",
            Self::Validate => "validate",
            Self::PreRun => "prerun",
            Self::Run => "engine",
            Self::PostRun => "postrun",
        }
    }

    /// Name of the step's code resource
    pub fn resource(&self) -> &'static str {
        match self {
            Self::ApplyParameters => "parameters_handler",
            Self::Validate => "validator",
            Self::PreRun => "prerun",
            Self::Run => "engine",
            Self::PostRun => "postrun",
        }
    }

    pub fn source(&self, run_template: &RunTemplate) -> StepSource {
        let source = match self {
            Self::ApplyParameters => run_template.parameters_handler_source,
            Self::Validate => run_template.dataset_validator_source,
            Self::PreRun => run_template.pre_run_source,
            Self::Run => run_template.run_source,
            Self::PostRun => run_template.post_run_source,
        };
        source.unwrap_or_default()
    }

    pub fn enabled(&self, run_template: &RunTemplate) -> bool {
        match self {
            Self::ApplyParameters => run_template.apply_parameters_enabled(),
            Self::Validate => run_template.validate_data_enabled(),
            Self::PreRun => run_template.pre_run_enabled(),
            Self::Run => run_template.run_enabled(),
            Self::PostRun => run_template.post_run_enabled(),
        }
    }
}

/// Builds the container of a single step
pub fn build_step(ctx: &StageContext<'_>, step: SolutionStep) -> Result<ScenarioRunContainer> {
    build_solution_container(ctx, step.container_name().to_string(), &[step])
}

/// Builds `multipleStepsContainer-<index>` running `steps` in order
pub fn build_stacked(
    ctx: &StageContext<'_>,
    steps: &[SolutionStep],
    index: usize,
) -> Result<ScenarioRunContainer> {
    build_solution_container(ctx, indexed_name(MULTIPLE_STEPS_CONTAINER, index), steps)
}

fn build_solution_container(
    ctx: &StageContext<'_>,
    name: String,
    steps: &[SolutionStep],
) -> Result<ScenarioRunContainer> {
    let mut env = ctx.base_env(Authentication::Platform)?;

    let modes: Vec<&str> = steps.iter().map(SolutionStep::mode).collect();
    env.insert(CONTAINER_MODE_VAR.into(), modes.join(","));

    if let Some(simulation) = &ctx.run_template.csm_simulation {
        env.insert(SIMULATION_VAR.into(), simulation.clone());
    }

    // Stacked containers read all their code from the first step's source
    if let Some(first) = steps.first() {
        env.extend(source_env(ctx, *first));
    }

    if steps.contains(&SolutionStep::Run) {
        env.extend(resolve_event_bus_env(
            ctx.config,
            &ctx.run,
            ctx.workspace.dedicated_event_hub_namespace(),
        )?);
    }

    debug!("Built solution container {} with modes {:?}", name, modes);

    Ok(ScenarioRunContainer {
        name,
        image: image_name(
            ctx.config.azure.container_registries.solutions.as_deref(),
            &ctx.solution.repository,
            &ctx.solution.version,
        ),
        entrypoint: Some(ENTRYPOINT.to_string()),
        run_args: None,
        env_vars: Some(env),
        labels: ctx.labels(),
        dependencies: None,
    })
}

fn source_env(ctx: &StageContext<'_>, step: SolutionStep) -> EnvMap {
    let run_template_id = &ctx.run_template.id;
    let mut env = EnvMap::new();

    match step.source(ctx.run_template) {
        StepSource::Local => {
            env.insert(PROVIDER_VAR.into(), LOCAL_PROVIDER.into());
            env.insert(LOCATION_VAR.into(), LOCAL_LOCATION.into());
            env.insert(
                PATH_VAR.into(),
                format!("code/run_templates/{}/{}", run_template_id, step.resource()),
            );
        }
        StepSource::Cloud => {
            env.insert(PROVIDER_VAR.into(), CLOUD_PROVIDER.into());
            env.insert(
                LOCATION_VAR.into(),
                format!("{}/{}", ctx.run.organization_id, ctx.run.workspace_key),
            );
            env.insert(
                PATH_VAR.into(),
                format!("{}/{}.zip", run_template_id, step.resource()),
            );
            env.insert(
                STORAGE_CONNECTION_STRING_VAR.into(),
                ctx.storage_connection_string().to_string(),
            );
        }
    }

    env
}
