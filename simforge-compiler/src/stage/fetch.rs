//! Dataset fetch containers
//!
//! A fetch container runs the dataset's connector image. It writes under
//! the datasets volume for scenario datasets, or under the parameters
//! volume for datasets referenced by a dataset-typed parameter.

use simforge_core::domain::dataset::{Connector, Dataset};
use simforge_core::dto::container::ScenarioRunContainer;
use tracing::debug;

use super::parameters::DatasetParameter;
use super::{
    FETCH_DATASET_CONTAINER, FETCH_DATASET_PARAMETERS_CONTAINER, FETCH_PATH_VAR, StageContext,
    image_name, indexed_name,
};
use crate::connector::{BindingContext, resolve_bindings};
use crate::env::{Authentication, DATASETS_MOUNT_PATH, PARAMETERS_MOUNT_PATH};
use crate::error::{CompileError, Result};

/// Builds `fetchDatasetContainer-<index>`
pub fn build_dataset_fetch(
    ctx: &StageContext<'_>,
    dataset: &Dataset,
    connector: &Connector,
    index: usize,
) -> Result<ScenarioRunContainer> {
    build_fetch(
        ctx,
        dataset,
        connector,
        indexed_name(FETCH_DATASET_CONTAINER, index),
        format!("{}/{}", DATASETS_MOUNT_PATH, dataset.id),
    )
}

/// Builds `fetchScenarioDatasetParametersContainer-<index>`
pub fn build_dataset_parameter_fetch(
    ctx: &StageContext<'_>,
    parameter: &DatasetParameter,
    dataset: &Dataset,
    connector: &Connector,
    index: usize,
) -> Result<ScenarioRunContainer> {
    build_fetch(
        ctx,
        dataset,
        connector,
        indexed_name(FETCH_DATASET_PARAMETERS_CONTAINER, index),
        format!("{}/{}", PARAMETERS_MOUNT_PATH, parameter.fetch_id),
    )
}

fn build_fetch(
    ctx: &StageContext<'_>,
    dataset: &Dataset,
    connector: &Connector,
    name: String,
    fetch_path: String,
) -> Result<ScenarioRunContainer> {
    let dataset_connector = dataset
        .connector
        .as_ref()
        .ok_or_else(|| CompileError::DatasetWithoutConnector(dataset.id.clone()))?;

    let auth = Authentication::for_connector(connector)?;
    let mut env = ctx.base_env(auth)?;

    let bindings = resolve_bindings(
        connector,
        dataset_connector,
        &BindingContext {
            organization_id: ctx.run.organization_id,
            workspace_id: ctx.run.workspace_id,
            storage_connection_string: ctx.storage_connection_string(),
            dataset_id: &dataset.id,
        },
    )?;
    env.extend(bindings.env);
    env.insert(FETCH_PATH_VAR.into(), fetch_path);

    debug!(
        "Built fetch container {} for dataset {} with connector {}",
        name, dataset.id, connector.id
    );

    Ok(ScenarioRunContainer {
        name,
        image: image_name(
            ctx.config.azure.container_registries.core.as_deref(),
            &connector.repository,
            &connector.version,
        ),
        entrypoint: None,
        run_args: Some(bindings.args).filter(|args| !args.is_empty()),
        env_vars: Some(env),
        labels: ctx.labels(),
        dependencies: None,
    })
}
