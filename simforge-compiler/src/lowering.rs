//! Workflow lowering
//!
//! Converts a compiled pipeline into the workflow engine's custom resource:
//!
//! - one container template per pipeline stage
//! - one DAG template, `entrypoint`, whose tasks mirror the stages 1:1
//! - the scratch volume claims shared by every stage
//! - the node selector derived from the resolved node pool
//!
//! Template names, task names and dependency references are lower-cased
//! with the same rule, so every reference resolves.

use simforge_core::dto::container::{ScenarioRunContainer, ScenarioRunStartContainers};
use simforge_core::dto::workflow::{
    Container, DagTask, DagTemplate, EnvVar, ObjectMeta, PersistentVolumeClaim,
    PersistentVolumeClaimSpec, ResourceRequirements, Template, TemplateMetadata, VolumeMount,
    WORKFLOW_API_VERSION, WORKFLOW_KIND, Workflow, WorkflowSpec,
};
use std::collections::BTreeMap;
use tracing::{debug, info};

use crate::compiler::{DEFAULT_GENERATE_NAME, validate_dependencies};
use crate::config::{
    DEFAULT_ACCESS_MODE, DEFAULT_STORAGE_REQUEST, PlatformConfig, WorkflowConfig,
};
use crate::env::{DATASETS_MOUNT_PATH, PARAMETERS_MOUNT_PATH};
use crate::error::Result;

pub const ENTRYPOINT_TEMPLATE: &str = "entrypoint";
pub const OS_LABEL: &str = "kubernetes.io/os";
pub const OS_VALUE: &str = "linux";
pub const ALWAYS_PULL_POLICY: &str = "Always";

pub const DATASETS_CLAIM: &str = "datasetsdir";
pub const PARAMETERS_CLAIM: &str = "parametersdir";
pub const SCRATCH_CLAIM: &str = "scenariorundata";
const DATASETS_SUB_PATH: &str = "datasets";
const PARAMETERS_SUB_PATH: &str = "parameters";
const STORAGE_RESOURCE: &str = "storage";

/// Template and task name of a pipeline stage
pub fn task_name(container_name: &str) -> String {
    container_name.to_lowercase()
}

/// Lowers compiled pipelines with one platform's workflow settings
#[derive(Debug, Clone, Copy)]
pub struct WorkflowLowering<'a> {
    config: &'a WorkflowConfig,
}

impl<'a> WorkflowLowering<'a> {
    pub fn new(config: &'a PlatformConfig) -> Self {
        Self {
            config: &config.workflow,
        }
    }

    /// Lowers a pipeline into a complete workflow object
    ///
    /// # Errors
    /// Returns `DuplicateContainer` or `DanglingDependency` when the
    /// pipeline is not a valid DAG.
    pub fn lower(&self, start: &ScenarioRunStartContainers) -> Result<Workflow> {
        let spec = self.lower_spec(start)?;
        let generate_name = start
            .generate_name
            .clone()
            .unwrap_or_else(|| DEFAULT_GENERATE_NAME.to_string());

        Ok(Workflow {
            api_version: WORKFLOW_API_VERSION.to_string(),
            kind: WORKFLOW_KIND.to_string(),
            metadata: ObjectMeta {
                name: None,
                generate_name: Some(generate_name),
                labels: Some(start.labels.clone()).filter(|labels| !labels.is_empty()),
            },
            spec,
        })
    }

    /// Lowers a pipeline into the workflow spec only
    pub fn lower_spec(&self, start: &ScenarioRunStartContainers) -> Result<WorkflowSpec> {
        validate_dependencies(&start.containers)?;

        let pull_policy = if start.always_pull {
            ALWAYS_PULL_POLICY
        } else {
            self.config.image_pull_policy.as_str()
        };
        let mounts = self.volume_mounts();

        let mut templates: Vec<Template> = start
            .containers
            .iter()
            .map(|container| container_template(container, pull_policy, &mounts))
            .collect();
        templates.push(dag_template(&start.containers));

        info!(
            "Lowered {} container(s) for simulation {}",
            start.containers.len(),
            start.csm_simulation_id
        );

        Ok(WorkflowSpec {
            entrypoint: ENTRYPOINT_TEMPLATE.to_string(),
            templates,
            node_selector: self.node_selector(start.node_label.as_deref()),
            service_account_name: self.config.service_account_name.clone(),
            volume_claim_templates: self.volume_claims(),
        })
    }

    fn volume_mounts(&self) -> Vec<VolumeMount> {
        if self.config.single_scratch_volume {
            vec![
                mount(SCRATCH_CLAIM, DATASETS_MOUNT_PATH, Some(DATASETS_SUB_PATH)),
                mount(SCRATCH_CLAIM, PARAMETERS_MOUNT_PATH, Some(PARAMETERS_SUB_PATH)),
            ]
        } else {
            vec![
                mount(DATASETS_CLAIM, DATASETS_MOUNT_PATH, None),
                mount(PARAMETERS_CLAIM, PARAMETERS_MOUNT_PATH, None),
            ]
        }
    }

    fn volume_claims(&self) -> Vec<PersistentVolumeClaim> {
        let claims: &[&str] = if self.config.single_scratch_volume {
            &[SCRATCH_CLAIM]
        } else {
            &[DATASETS_CLAIM, PARAMETERS_CLAIM]
        };

        claims.iter().map(|name| self.volume_claim(name)).collect()
    }

    fn volume_claim(&self, name: &str) -> PersistentVolumeClaim {
        let access_modes = if self.config.access_modes.is_empty() {
            vec![DEFAULT_ACCESS_MODE.to_string()]
        } else {
            self.config.access_modes.clone()
        };
        let request = self
            .config
            .storage_request
            .clone()
            .unwrap_or_else(|| DEFAULT_STORAGE_REQUEST.to_string());

        PersistentVolumeClaim {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                ..Default::default()
            },
            spec: PersistentVolumeClaimSpec {
                access_modes,
                storage_class_name: self.config.storage_class.clone(),
                resources: ResourceRequirements {
                    requests: BTreeMap::from([(STORAGE_RESOURCE.to_string(), request)]),
                },
            },
        }
    }

    /// OS label plus the node pool, or the default tier without one
    fn node_selector(&self, node_label: Option<&str>) -> BTreeMap<String, String> {
        let mut selector = BTreeMap::from([(OS_LABEL.to_string(), OS_VALUE.to_string())]);
        match node_label {
            Some(pool) => {
                selector.insert(self.config.node_pool_label.clone(), pool.to_string());
            }
            None => {
                selector.insert(self.config.tier_label.clone(), self.config.tier_value.clone());
            }
        }
        selector
    }
}

fn mount(name: &str, path: &str, sub_path: Option<&str>) -> VolumeMount {
    VolumeMount {
        name: name.to_string(),
        mount_path: path.to_string(),
        sub_path: sub_path.map(str::to_string),
    }
}

fn container_template(
    container: &ScenarioRunContainer,
    pull_policy: &str,
    mounts: &[VolumeMount],
) -> Template {
    let name = task_name(&container.name);
    debug!("Lowering container {} into template {}", container.name, name);

    Template {
        name,
        metadata: container.labels.clone().map(|labels| TemplateMetadata {
            labels: Some(labels),
        }),
        container: Some(Container {
            image: container.image.clone(),
            image_pull_policy: Some(pull_policy.to_string()),
            command: container.entrypoint.clone().map(|entrypoint| vec![entrypoint]),
            args: container.run_args.clone(),
            env: container.env_vars.as_ref().map(|vars| {
                vars.iter()
                    .map(|(name, value)| EnvVar {
                        name: name.clone(),
                        value: value.clone(),
                    })
                    .collect()
            }),
            volume_mounts: mounts.to_vec(),
        }),
        dag: None,
    }
}

fn dag_template(containers: &[ScenarioRunContainer]) -> Template {
    let tasks = containers
        .iter()
        .map(|container| {
            let dependencies: Vec<String> = container.upstream().map(task_name).collect();
            DagTask {
                name: task_name(&container.name),
                template: task_name(&container.name),
                dependencies: Some(dependencies).filter(|d| !d.is_empty()),
            }
        })
        .collect();

    Template {
        name: ENTRYPOINT_TEMPLATE.to_string(),
        metadata: None,
        container: None,
        dag: Some(DagTemplate { tasks }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::PipelineCompiler;
    use crate::error::CompileError;
    use crate::testing::{Fixture, SIMULATION_ID};
    use serde_json::json;

    fn compile(fixture: &Fixture) -> ScenarioRunStartContainers {
        PipelineCompiler::new(&fixture.config)
            .compile(&fixture.inputs(), SIMULATION_ID)
            .unwrap()
    }

    #[test]
    fn test_lower_templates_and_dag() {
        let fixture = Fixture::new();
        let start = compile(&fixture);

        let spec = WorkflowLowering::new(&fixture.config)
            .lower_spec(&start)
            .unwrap();

        assert_eq!(spec.entrypoint, "entrypoint");
        assert_eq!(spec.templates.len(), start.containers.len() + 1);

        let run = spec.template("runcontainer").unwrap();
        let container = run.container.as_ref().unwrap();
        assert_eq!(container.image, "ghcr.io/solutions/simulator:2.0.0");
        assert_eq!(container.image_pull_policy.as_deref(), Some("IfNotPresent"));
        assert_eq!(container.command, Some(vec!["entrypoint.py".to_string()]));
        assert_eq!(container.volume_mounts.len(), 2);

        let env = container.env.as_ref().unwrap();
        let names: Vec<&str> = env.iter().map(|e| e.name.as_str()).collect();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);

        let dag = serde_json::to_value(spec.template("entrypoint").unwrap()).unwrap();
        assert_eq!(
            dag["dag"]["tasks"],
            json!([
                {
                    "name": "fetchscenarioparameterscontainer",
                    "template": "fetchscenarioparameterscontainer"
                },
                {
                    "name": "senddatawarehousecontainer",
                    "template": "senddatawarehousecontainer",
                    "dependencies": ["fetchscenarioparameterscontainer"]
                },
                {
                    "name": "runcontainer",
                    "template": "runcontainer",
                    "dependencies": ["senddatawarehousecontainer"]
                }
            ])
        );
    }

    #[test]
    fn test_fetch_fan_in_is_lower_cased() {
        let fixture = Fixture::new().with_datasets(2);
        let start = compile(&fixture);

        let spec = WorkflowLowering::new(&fixture.config)
            .lower_spec(&start)
            .unwrap();

        let dag = spec.template(ENTRYPOINT_TEMPLATE).unwrap().dag.as_ref().unwrap();
        let fetch = dag
            .tasks
            .iter()
            .find(|t| t.name == "fetchscenarioparameterscontainer")
            .unwrap();
        assert_eq!(
            fetch.dependencies,
            Some(vec![
                "fetchdatasetcontainer-1".to_string(),
                "fetchdatasetcontainer-2".to_string(),
            ])
        );
        assert!(dag.tasks[0].dependencies.is_none());
        assert!(spec.template("fetchdatasetcontainer-1").is_some());
    }

    #[test]
    fn test_always_pull() {
        let mut fixture = Fixture::new();
        fixture.solution.always_pull = Some(true);
        let start = compile(&fixture);

        let spec = WorkflowLowering::new(&fixture.config)
            .lower_spec(&start)
            .unwrap();

        for template in spec.templates.iter().filter(|t| t.container.is_some()) {
            let container = template.container.as_ref().unwrap();
            assert_eq!(container.image_pull_policy.as_deref(), Some("Always"));
        }
    }

    #[test]
    fn test_node_selector() {
        let mut fixture = Fixture::new();
        let lowering_config = fixture.config.clone();
        let lowering = WorkflowLowering::new(&lowering_config);

        let spec = lowering.lower_spec(&compile(&fixture)).unwrap();
        assert_eq!(
            serde_json::to_value(&spec.node_selector).unwrap(),
            json!({ "kubernetes.io/os": "linux", "cosmotech.com/tier": "compute" })
        );

        fixture.run_template_mut().compute_size = Some("highcpu".to_string());
        let spec = lowering.lower_spec(&compile(&fixture)).unwrap();
        assert_eq!(
            serde_json::to_value(&spec.node_selector).unwrap(),
            json!({ "kubernetes.io/os": "linux", "cosmotech.com/size": "highcpupool" })
        );
    }

    #[test]
    fn test_volume_claims() {
        let mut fixture = Fixture::new();
        let start = compile(&fixture);

        let spec = WorkflowLowering::new(&fixture.config)
            .lower_spec(&start)
            .unwrap();
        assert_eq!(
            serde_json::to_value(&spec.volume_claim_templates).unwrap(),
            json!([
                {
                    "metadata": { "name": "datasetsdir" },
                    "spec": {
                        "accessModes": ["ReadWriteOnce"],
                        "resources": { "requests": { "storage": "1Gi" } }
                    }
                },
                {
                    "metadata": { "name": "parametersdir" },
                    "spec": {
                        "accessModes": ["ReadWriteOnce"],
                        "resources": { "requests": { "storage": "1Gi" } }
                    }
                }
            ])
        );

        fixture.config.workflow.single_scratch_volume = true;
        fixture.config.workflow.storage_class = Some("premium".to_string());
        fixture.config.workflow.access_modes = vec!["ReadWriteMany".to_string()];
        fixture.config.workflow.storage_request = Some("10Gi".to_string());

        let spec = WorkflowLowering::new(&fixture.config)
            .lower_spec(&start)
            .unwrap();
        assert_eq!(
            serde_json::to_value(&spec.volume_claim_templates).unwrap(),
            json!([
                {
                    "metadata": { "name": "scenariorundata" },
                    "spec": {
                        "accessModes": ["ReadWriteMany"],
                        "storageClassName": "premium",
                        "resources": { "requests": { "storage": "10Gi" } }
                    }
                }
            ])
        );
        let run = spec.template("runcontainer").unwrap().container.as_ref().unwrap();
        assert_eq!(
            serde_json::to_value(&run.volume_mounts).unwrap(),
            json!([
                {
                    "name": "scenariorundata",
                    "mountPath": "/mnt/scenariorun-data",
                    "subPath": "datasets"
                },
                {
                    "name": "scenariorundata",
                    "mountPath": "/mnt/scenariorun-parameters",
                    "subPath": "parameters"
                }
            ])
        );
    }

    #[test]
    fn test_workflow_object() {
        let mut fixture = Fixture::new();
        fixture.config.workflow.service_account_name = Some("workflow".to_string());
        let start = compile(&fixture);

        let workflow = WorkflowLowering::new(&fixture.config)
            .lower(&start)
            .unwrap();
        let value = serde_json::to_value(&workflow).unwrap();

        assert_eq!(value["apiVersion"], "argoproj.io/v1alpha1");
        assert_eq!(value["kind"], "Workflow");
        assert_eq!(value["metadata"]["generateName"], "default-workflow-");
        assert_eq!(value["metadata"]["labels"]["cosmotech.com/simulationId"], "sim-1");
        assert_eq!(value["spec"]["serviceAccountName"], "workflow");
        assert_eq!(value["spec"]["entrypoint"], "entrypoint");

        fixture.scenario.name = Some("Demo".to_string());
        let workflow = WorkflowLowering::new(&fixture.config)
            .lower(&compile(&fixture))
            .unwrap();
        assert_eq!(workflow.metadata.generate_name.as_deref(), Some("demo-"));
    }

    #[test]
    fn test_identity_binding_label() {
        let mut fixture = Fixture::new();
        fixture.config.azure.credentials.core.aad_pod_id_binding = Some("csm-pod".to_string());
        let start = compile(&fixture);

        let spec = WorkflowLowering::new(&fixture.config)
            .lower_spec(&start)
            .unwrap();

        let run = serde_json::to_value(spec.template("runcontainer").unwrap()).unwrap();
        assert_eq!(run["metadata"], json!({ "labels": { "aadpodidbinding": "csm-pod" } }));
    }

    #[test]
    fn test_rejects_dangling_dependency() {
        let fixture = Fixture::new();
        let mut start = compile(&fixture);
        start.containers[0].dependencies = Some(vec!["ghostContainer".to_string()]);

        let result = WorkflowLowering::new(&fixture.config).lower(&start);
        assert!(matches!(
            result,
            Err(CompileError::DanglingDependency { .. })
        ));
    }
}
