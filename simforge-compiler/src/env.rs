//! Credential and environment resolver
//!
//! Produces the environment variables shared by every container of a run:
//! identity provider credentials, run correlation ids, scratch paths, data
//! warehouse endpoints and cache connection. Event-bus variables are only
//! needed by the simulation itself and are resolved separately.

use simforge_core::domain::dataset::Connector;
use std::collections::BTreeMap;
use tracing::debug;

use crate::config::{EventBusStrategy, IdentityProviderCode, PlatformConfig};
use crate::error::{CompileError, Result};

/// Environment variables of a container, sorted by key
pub type EnvMap = BTreeMap<String, String>;

pub const DATASETS_MOUNT_PATH: &str = "/mnt/scenariorun-data";
pub const PARAMETERS_MOUNT_PATH: &str = "/mnt/scenariorun-parameters";

pub const IDENTITY_PROVIDER_VAR: &str = "IDENTITY_PROVIDER";
pub const AZURE_TENANT_ID_VAR: &str = "AZURE_TENANT_ID";
pub const AZURE_CLIENT_ID_VAR: &str = "AZURE_CLIENT_ID";
pub const AZURE_CLIENT_SECRET_VAR: &str = "AZURE_CLIENT_SECRET";
pub const OKTA_CLIENT_ID_VAR: &str = "OKTA_CLIENT_ID";
pub const OKTA_CLIENT_SECRET_VAR: &str = "OKTA_CLIENT_SECRET";
pub const OKTA_CLIENT_ISSUER_VAR: &str = "OKTA_CLIENT_ISSUER";
pub const MANAGED_IDENTITY_VAR: &str = "CSM_AZURE_MANAGED_IDENTITY";
pub const SIMULATION_ID_VAR: &str = "CSM_SIMULATION_ID";
pub const API_URL_VAR: &str = "CSM_API_URL";
pub const API_SCOPE_VAR: &str = "CSM_API_SCOPE";
pub const DATASET_PATH_VAR: &str = "CSM_DATASET_ABSOLUTE_PATH";
pub const PARAMETERS_PATH_VAR: &str = "CSM_PARAMETERS_ABSOLUTE_PATH";
pub const ORGANIZATION_ID_VAR: &str = "CSM_ORGANIZATION_ID";
pub const WORKSPACE_ID_VAR: &str = "CSM_WORKSPACE_ID";
pub const SCENARIO_ID_VAR: &str = "CSM_SCENARIO_ID";
pub const DATA_EXPLORER_URI_VAR: &str = "AZURE_DATA_EXPLORER_RESOURCE_URI";
pub const DATA_EXPLORER_INGEST_URI_VAR: &str = "AZURE_DATA_EXPLORER_RESOURCE_INGEST_URI";
pub const DATA_EXPLORER_DATABASE_VAR: &str = "AZURE_DATA_EXPLORER_DATABASE_NAME";
pub const TWIN_CACHE_HOST_VAR: &str = "TWIN_CACHE_HOST";
pub const TWIN_CACHE_PORT_VAR: &str = "TWIN_CACHE_PORT";
pub const TWIN_CACHE_USERNAME_VAR: &str = "TWIN_CACHE_USERNAME";
pub const TWIN_CACHE_PASSWORD_VAR: &str = "TWIN_CACHE_PASSWORD";
pub const MEASURES_TOPIC_VAR: &str = "CSM_PROBES_MEASURES_TOPIC";
pub const CONTROL_PLANE_TOPIC_VAR: &str = "CSM_CONTROL_PLANE_TOPIC";
pub const SHARED_ACCESS_POLICY_VAR: &str = "AZURE_EVENT_HUB_SHARED_ACCESS_POLICY";
pub const SHARED_ACCESS_KEY_VAR: &str = "AZURE_EVENT_HUB_SHARED_ACCESS_KEY";

const CONTROL_PLANE_SUFFIX: &str = "-scenariorun";

/// Identifiers of the run being compiled
#[derive(Debug, Clone, Copy)]
pub struct RunContext<'a> {
    pub organization_id: &'a str,
    pub workspace_id: &'a str,
    pub workspace_key: &'a str,
    pub scenario_id: &'a str,
    pub csm_simulation_id: &'a str,
}

impl RunContext<'_> {
    /// `<organizationId>-<workspaceKey>`, used for warehouse and event-bus names
    pub fn workspace_resource_name(&self) -> String {
        format!("{}-{}", self.organization_id, self.workspace_key)
    }
}

/// How a container authenticates against cloud resources
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Authentication {
    /// Platform core credentials
    Platform,
    /// Pod managed identity, no client secret
    ManagedIdentity,
    /// Customer app registration credentials
    CustomerAppRegistration,
}

impl Authentication {
    /// Selects the authentication requested by a connector
    ///
    /// # Errors
    /// Returns `ConflictingAuthentication` when the connector requests both
    /// managed identity and customer app registration.
    pub fn for_connector(connector: &Connector) -> Result<Self> {
        let managed = connector.azure_managed_identity.unwrap_or(false);
        let customer = connector
            .azure_authentication_with_customer_app_registration
            .unwrap_or(false);

        match (managed, customer) {
            (true, true) => Err(CompileError::ConflictingAuthentication(
                connector.id.clone(),
            )),
            (true, false) => Ok(Self::ManagedIdentity),
            (false, true) => Ok(Self::CustomerAppRegistration),
            (false, false) => Ok(Self::Platform),
        }
    }
}

/// Resolves the environment common to every container of a run
///
/// # Arguments
/// * `config` - Platform configuration
/// * `ctx` - Identifiers of the run
/// * `auth` - Authentication selected for the container
///
/// # Errors
/// Returns `MissingCredentials` when `auth` needs credentials the platform
/// does not configure.
pub fn resolve_base_env(
    config: &PlatformConfig,
    ctx: &RunContext<'_>,
    auth: Authentication,
) -> Result<EnvMap> {
    let mut env = identity_env(config, auth)?;

    env.insert(SIMULATION_ID_VAR.into(), ctx.csm_simulation_id.into());
    env.insert(API_URL_VAR.into(), config.api.base_url.clone());
    if let Some(scope) = &config.api.scope {
        env.insert(API_SCOPE_VAR.into(), scope.clone());
    }
    env.insert(DATASET_PATH_VAR.into(), DATASETS_MOUNT_PATH.into());
    env.insert(PARAMETERS_PATH_VAR.into(), PARAMETERS_MOUNT_PATH.into());
    env.insert(ORGANIZATION_ID_VAR.into(), ctx.organization_id.into());
    env.insert(WORKSPACE_ID_VAR.into(), ctx.workspace_id.into());
    env.insert(SCENARIO_ID_VAR.into(), ctx.scenario_id.into());

    if let Some(warehouse) = &config.azure.data_warehouse_cluster {
        env.insert(DATA_EXPLORER_URI_VAR.into(), warehouse.base_uri.clone());
        env.insert(DATA_EXPLORER_INGEST_URI_VAR.into(), warehouse.ingest_uri.clone());
        env.insert(DATA_EXPLORER_DATABASE_VAR.into(), ctx.workspace_resource_name());
    }

    if let Some(cache) = &config.twincache {
        env.insert(TWIN_CACHE_HOST_VAR.into(), cache.host.clone());
        env.insert(TWIN_CACHE_PORT_VAR.into(), cache.port.clone());
        env.insert(TWIN_CACHE_USERNAME_VAR.into(), cache.username.clone());
        env.insert(TWIN_CACHE_PASSWORD_VAR.into(), cache.password.clone());
    }

    Ok(env)
}

fn identity_env(config: &PlatformConfig, auth: Authentication) -> Result<EnvMap> {
    let mut env = EnvMap::new();
    let provider = config.identity_provider.code;
    env.insert(IDENTITY_PROVIDER_VAR.into(), provider.as_str().into());

    if provider == IdentityProviderCode::Okta {
        let okta = config
            .identity_provider
            .okta
            .as_ref()
            .ok_or_else(|| CompileError::MissingCredentials("identityProvider.okta".into()))?;
        env.insert(OKTA_CLIENT_ID_VAR.into(), okta.client_id.clone());
        env.insert(OKTA_CLIENT_SECRET_VAR.into(), okta.client_secret.clone());
        env.insert(OKTA_CLIENT_ISSUER_VAR.into(), okta.issuer.clone());
    }

    let core = &config.azure.credentials.core;
    match auth {
        Authentication::Platform => {
            if provider == IdentityProviderCode::Azure {
                env.insert(AZURE_TENANT_ID_VAR.into(), core.tenant_id.clone());
                env.insert(AZURE_CLIENT_ID_VAR.into(), core.client_id.clone());
                env.insert(AZURE_CLIENT_SECRET_VAR.into(), core.client_secret.clone());
            }
        }
        Authentication::ManagedIdentity => {
            env.insert(AZURE_TENANT_ID_VAR.into(), core.tenant_id.clone());
            env.insert(MANAGED_IDENTITY_VAR.into(), "true".into());
        }
        Authentication::CustomerAppRegistration => {
            let customer = config.azure.credentials.customer.as_ref().ok_or_else(|| {
                CompileError::MissingCredentials("azure.credentials.customer".into())
            })?;
            env.insert(AZURE_TENANT_ID_VAR.into(), customer.tenant_id.clone());
            env.insert(AZURE_CLIENT_ID_VAR.into(), customer.client_id.clone());
            env.insert(AZURE_CLIENT_SECRET_VAR.into(), customer.client_secret.clone());
        }
    }

    Ok(env)
}

/// Resolves the event-bus topics and credentials of the simulation
///
/// The dedicated-namespace flag only changes how topic URIs are composed.
/// Returns an empty map when the platform has no shared namespace and the
/// workspace has no dedicated one.
///
/// # Errors
/// Returns `MissingSharedAccessPolicy` when the shared access policy
/// strategy is selected without policy credentials, even when no topic is
/// configured.
pub fn resolve_event_bus_env(
    config: &PlatformConfig,
    ctx: &RunContext<'_>,
    dedicated_namespace: bool,
) -> Result<EnvMap> {
    let mut env = EnvMap::new();
    let event_bus = &config.azure.event_bus;

    // Checked before any early return: the strategy is fatal without credentials
    let policy = match event_bus.authentication.strategy {
        EventBusStrategy::TenantClientCredentials => None,
        EventBusStrategy::SharedAccessPolicy => Some(
            event_bus
                .authentication
                .shared_access_policy
                .as_ref()
                .and_then(|p| p.namespace.as_ref())
                .ok_or(CompileError::MissingSharedAccessPolicy)?,
        ),
    };

    let (measures, control_plane) = if dedicated_namespace {
        let namespace = format!(
            "amqps://{}.servicebus.windows.net",
            ctx.workspace_resource_name()
        );
        (
            format!("{}/probesmeasures", namespace),
            format!("{}/scenariorun", namespace),
        )
    } else {
        let Some(base_uri) = &event_bus.base_uri else {
            debug!("No event bus configured, skipping topic variables");
            return Ok(env);
        };
        let measures = format!(
            "{}/{}",
            base_uri.trim_end_matches('/'),
            ctx.workspace_resource_name()
        );
        let control_plane = format!("{}{}", measures, CONTROL_PLANE_SUFFIX);
        (measures, control_plane)
    };

    env.insert(MEASURES_TOPIC_VAR.into(), measures);
    env.insert(CONTROL_PLANE_TOPIC_VAR.into(), control_plane);

    if let Some(credentials) = policy {
        env.insert(SHARED_ACCESS_POLICY_VAR.into(), credentials.name.clone());
        env.insert(SHARED_ACCESS_KEY_VAR.into(), credentials.key.clone());
    }

    Ok(env)
}
