//! Platform configuration
//!
//! Defines every platform-level setting the compiler reads: identity
//! provider, tenant credentials, storage, cache, data warehouse, event bus,
//! image registries and workflow engine settings.
//!
//! The configuration is a plain value handed to the compiler; nothing here
//! reads the process environment.

use serde::{Deserialize, Serialize};

use crate::error::{CompileError, Result};

pub const DEFAULT_IMAGE_PULL_POLICY: &str = "IfNotPresent";
pub const DEFAULT_NODE_POOL_LABEL: &str = "cosmotech.com/size";
pub const DEFAULT_TIER_LABEL: &str = "cosmotech.com/tier";
pub const DEFAULT_TIER_VALUE: &str = "compute";
pub const DEFAULT_ACCESS_MODE: &str = "ReadWriteOnce";
pub const DEFAULT_STORAGE_REQUEST: &str = "1Gi";

/// Platform configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlatformConfig {
    pub api: ApiConfig,
    pub identity_provider: IdentityProviderConfig,
    pub azure: AzureConfig,
    /// Twin cache connection, passed to every container when set
    pub twincache: Option<TwinCacheConfig>,
    pub images: ImagesConfig,
    pub workflow: WorkflowConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ApiConfig {
    /// Public URL of the platform API (e.g., "https://api.example.com/v1")
    pub base_url: String,
    /// OAuth scope containers request tokens for
    pub scope: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentityProviderCode {
    #[default]
    Azure,
    Okta,
}

impl IdentityProviderCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Azure => "azure",
            Self::Okta => "okta",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IdentityProviderConfig {
    pub code: IdentityProviderCode,
    pub okta: Option<OktaConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OktaConfig {
    pub client_id: String,
    pub client_secret: String,
    pub issuer: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AzureConfig {
    pub credentials: AzureCredentials,
    pub storage: StorageConfig,
    pub data_warehouse_cluster: Option<DataWarehouseConfig>,
    pub event_bus: EventBusConfig,
    pub container_registries: ContainerRegistries,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AzureCredentials {
    /// Platform app registration used by default
    pub core: CoreCredentials,
    /// Customer app registration, for connectors that request it
    pub customer: Option<ClientCredentials>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CoreCredentials {
    pub tenant_id: String,
    pub client_id: String,
    pub client_secret: String,
    /// Pod identity binding label value attached to every container
    pub aad_pod_id_binding: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientCredentials {
    pub tenant_id: String,
    pub client_id: String,
    pub client_secret: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StorageConfig {
    pub connection_string: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataWarehouseConfig {
    pub base_uri: String,
    pub ingest_uri: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EventBusConfig {
    /// Shared namespace URI (e.g., "amqps://csm.servicebus.windows.net")
    pub base_uri: Option<String>,
    pub authentication: EventBusAuthentication,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EventBusAuthentication {
    pub strategy: EventBusStrategy,
    pub shared_access_policy: Option<SharedAccessPolicy>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventBusStrategy {
    /// Containers authenticate with the tenant credentials already in scope
    #[default]
    TenantClientCredentials,
    /// Containers authenticate with a named policy key pair
    SharedAccessPolicy,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SharedAccessPolicy {
    pub namespace: Option<SharedAccessPolicyCredentials>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharedAccessPolicyCredentials {
    pub name: String,
    pub key: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ContainerRegistries {
    /// Registry hosting platform images such as connectors
    pub core: Option<String>,
    /// Registry hosting solution images
    pub solutions: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TwinCacheConfig {
    pub host: String,
    pub port: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ImagesConfig {
    /// Image fetching scenario parameters
    pub scenario_fetch_parameters: String,
    /// Image sending inputs to the data warehouse; no warehouse stage when unset
    pub send_data_warehouse: Option<String>,
}

/// Workflow engine settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WorkflowConfig {
    pub image_pull_policy: String,
    pub service_account_name: Option<String>,
    /// Node label key carrying the resolved pool
    pub node_pool_label: String,
    /// Node label applied when no pool is resolved
    pub tier_label: String,
    pub tier_value: String,
    pub storage_class: Option<String>,
    pub access_modes: Vec<String>,
    pub storage_request: Option<String>,
    /// Use one scratch volume for datasets and parameters
    pub single_scratch_volume: bool,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            image_pull_policy: DEFAULT_IMAGE_PULL_POLICY.to_string(),
            service_account_name: None,
            node_pool_label: DEFAULT_NODE_POOL_LABEL.to_string(),
            tier_label: DEFAULT_TIER_LABEL.to_string(),
            tier_value: DEFAULT_TIER_VALUE.to_string(),
            storage_class: None,
            access_modes: Vec::new(),
            storage_request: None,
            single_scratch_volume: false,
        }
    }
}

impl PlatformConfig {
    /// Sets the platform API URL
    pub fn with_api_url(mut self, base_url: impl Into<String>) -> Self {
        self.api.base_url = base_url.into();
        self
    }

    /// Sets the scenario parameter fetch image
    pub fn with_fetch_parameters_image(mut self, image: impl Into<String>) -> Self {
        self.images.scenario_fetch_parameters = image.into();
        self
    }

    /// Validates the configuration
    ///
    /// Catches misconfigurations that would otherwise only surface when a
    /// run reaches the affected stage.
    pub fn validate(&self) -> Result<()> {
        if self.api.base_url.is_empty() {
            return Err(CompileError::InvalidConfig(
                "api.baseUrl cannot be empty".to_string(),
            ));
        }

        if !self.api.base_url.starts_with("http://") && !self.api.base_url.starts_with("https://")
        {
            return Err(CompileError::InvalidConfig(
                "api.baseUrl must start with http:// or https://".to_string(),
            ));
        }

        if self.images.scenario_fetch_parameters.is_empty() {
            return Err(CompileError::InvalidConfig(
                "images.scenarioFetchParameters cannot be empty".to_string(),
            ));
        }

        match self.identity_provider.code {
            IdentityProviderCode::Azure => {
                if self.azure.credentials.core.tenant_id.is_empty() {
                    return Err(CompileError::InvalidConfig(
                        "azure.credentials.core.tenantId cannot be empty".to_string(),
                    ));
                }
            }
            IdentityProviderCode::Okta => {
                if self.identity_provider.okta.is_none() {
                    return Err(CompileError::InvalidConfig(
                        "identityProvider.okta is required for the okta provider".to_string(),
                    ));
                }
            }
        }

        let authentication = &self.azure.event_bus.authentication;
        if authentication.strategy == EventBusStrategy::SharedAccessPolicy
            && authentication
                .shared_access_policy
                .as_ref()
                .and_then(|p| p.namespace.as_ref())
                .is_none()
        {
            return Err(CompileError::MissingSharedAccessPolicy);
        }

        if self.workflow.node_pool_label.is_empty() {
            return Err(CompileError::InvalidConfig(
                "workflow.nodePoolLabel cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> PlatformConfig {
        let mut config = PlatformConfig::default()
            .with_api_url("https://api.example.com/v1")
            .with_fetch_parameters_image("fetch-scenario-parameters:1.0.0");
        config.azure.credentials.core.tenant_id = "tenant".to_string();
        config
    }

    #[test]
    fn test_default_workflow_config() {
        let config = PlatformConfig::default();
        assert_eq!(config.workflow.image_pull_policy, "IfNotPresent");
        assert_eq!(config.workflow.node_pool_label, "cosmotech.com/size");
        assert_eq!(config.workflow.tier_label, "cosmotech.com/tier");
        assert!(!config.workflow.single_scratch_volume);
    }

    #[test]
    fn test_config_validation() {
        let mut config = valid_config();
        assert!(config.validate().is_ok());

        config.api.base_url = "not-a-url".to_string();
        assert!(matches!(
            config.validate(),
            Err(CompileError::InvalidConfig(_))
        ));

        config.api.base_url = "https://api.example.com/v1".to_string();
        config.identity_provider.code = IdentityProviderCode::Okta;
        assert!(config.validate().is_err());

        config.identity_provider.okta = Some(OktaConfig {
            client_id: "id".to_string(),
            client_secret: "secret".to_string(),
            issuer: "https://okta.example.com".to_string(),
        });
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_shared_access_policy_requires_credentials() {
        let mut config = valid_config();
        config.azure.event_bus.authentication.strategy = EventBusStrategy::SharedAccessPolicy;
        assert_eq!(
            config.validate(),
            Err(CompileError::MissingSharedAccessPolicy)
        );

        config.azure.event_bus.authentication.shared_access_policy = Some(SharedAccessPolicy {
            namespace: Some(SharedAccessPolicyCredentials {
                name: "csm-policy".to_string(),
                key: "secret".to_string(),
            }),
        });
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_deserialize_partial_config() {
        let json = r#"{
            "api": { "baseUrl": "https://api.example.com/v1" },
            "azure": {
                "credentials": { "core": { "tenantId": "t", "clientId": "c", "clientSecret": "s" } },
                "eventBus": { "authentication": { "strategy": "SHARED_ACCESS_POLICY" } }
            },
            "images": { "scenarioFetchParameters": "fetch:1.0" },
            "workflow": { "serviceAccountName": "workflow" }
        }"#;

        let config: PlatformConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.azure.credentials.core.client_id, "c");
        assert_eq!(
            config.azure.event_bus.authentication.strategy,
            EventBusStrategy::SharedAccessPolicy
        );
        assert_eq!(
            config.workflow.service_account_name.as_deref(),
            Some("workflow")
        );
        assert_eq!(config.workflow.image_pull_policy, "IfNotPresent");
        assert_eq!(config.identity_provider.code, IdentityProviderCode::Azure);
    }
}
