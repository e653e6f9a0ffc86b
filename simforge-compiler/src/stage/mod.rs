//! Stage container builders
//!
//! One builder per stage kind. Each builder produces a complete container
//! descriptor or fails; it never returns a partial container. Dependencies
//! are left unset: linking stages is the compiler's job.
//!
//! - `fetch`: dataset and dataset-typed parameter fetch containers
//! - `parameters`: scenario parameter fetch and dataset-id parameter parsing
//! - `warehouse`: send-to-warehouse container and flag precedence
//! - `solution`: apply/validate/prerun/run/postrun and stacked containers

pub mod fetch;
pub mod parameters;
pub mod solution;
pub mod warehouse;

use simforge_core::domain::organization::{Organization, Workspace};
use simforge_core::domain::scenario::Scenario;
use simforge_core::domain::solution::{RunTemplate, Solution};
use std::collections::BTreeMap;

use crate::config::PlatformConfig;
use crate::env::{Authentication, EnvMap, RunContext, resolve_base_env};
use crate::error::Result;

pub const FETCH_DATASET_CONTAINER: &str = "fetchDatasetContainer";
pub const FETCH_PARAMETERS_CONTAINER: &str = "fetchScenarioParametersContainer";
pub const FETCH_DATASET_PARAMETERS_CONTAINER: &str = "fetchScenarioDatasetParametersContainer";
pub const APPLY_PARAMETERS_CONTAINER: &str = "applyParametersContainer";
pub const VALIDATE_DATA_CONTAINER: &str = "validateDataContainer";
pub const SEND_DATA_WAREHOUSE_CONTAINER: &str = "sendDataWarehouseContainer";
pub const PRE_RUN_CONTAINER: &str = "preRunContainer";
pub const RUN_CONTAINER: &str = "runContainer";
pub const POST_RUN_CONTAINER: &str = "postRunContainer";
pub const MULTIPLE_STEPS_CONTAINER: &str = "multipleStepsContainer";

pub const RUN_TEMPLATE_ID_VAR: &str = "CSM_RUN_TEMPLATE_ID";
pub const FETCH_PATH_VAR: &str = "CSM_FETCH_ABSOLUTE_PATH";
pub const STORAGE_CONNECTION_STRING_VAR: &str = "AZURE_STORAGE_CONNECTION_STRING";

pub const IDENTITY_BINDING_LABEL: &str = "aadpodidbinding";

/// Everything a stage builder reads
#[derive(Debug, Clone, Copy)]
pub struct StageContext<'a> {
    pub config: &'a PlatformConfig,
    pub run: RunContext<'a>,
    pub organization: &'a Organization,
    pub workspace: &'a Workspace,
    pub scenario: &'a Scenario,
    pub solution: &'a Solution,
    pub run_template: &'a RunTemplate,
}

impl<'a> StageContext<'a> {
    /// Base environment plus the run template id
    pub fn base_env(&self, auth: Authentication) -> Result<EnvMap> {
        let mut env = resolve_base_env(self.config, &self.run, auth)?;
        env.insert(RUN_TEMPLATE_ID_VAR.into(), self.run_template.id.clone());
        Ok(env)
    }

    /// Labels shared by every container of the run
    pub fn labels(&self) -> Option<BTreeMap<String, String>> {
        self.config
            .azure
            .credentials
            .core
            .aad_pod_id_binding
            .as_ref()
            .map(|binding| BTreeMap::from([(IDENTITY_BINDING_LABEL.to_string(), binding.clone())]))
    }

    pub fn storage_connection_string(&self) -> &'a str {
        &self.config.azure.storage.connection_string
    }
}

/// Builds `<registry>/<repository>:<version>`, without registry when unset
pub fn image_name(registry: Option<&str>, repository: &str, version: &str) -> String {
    match registry.filter(|r| !r.is_empty()) {
        Some(registry) => format!("{}/{}:{}", registry.trim_end_matches('/'), repository, version),
        None => format!("{}:{}", repository, version),
    }
}

/// `<base>-<index>`
pub fn indexed_name(base: &str, index: usize) -> String {
    format!("{}-{}", base, index)
}
