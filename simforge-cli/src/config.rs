//! Configuration module
//!
//! Locates and loads the files the CLI works from: the platform
//! configuration and run bundles. Both may be written in YAML or JSON.

use anyhow::{Context, Result, bail};
use serde::de::DeserializeOwned;
use simforge_compiler::{PlatformConfig, RunInputs};
use std::path::{Path, PathBuf};
use tracing::debug;

/// CLI configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Path of the platform configuration file
    pub platform_config: Option<PathBuf>,
}

impl Config {
    /// Loads and validates the platform configuration
    pub fn load_platform_config(&self) -> Result<PlatformConfig> {
        let Some(path) = &self.platform_config else {
            bail!("No platform configuration given, use --platform-config or SIMFORGE_PLATFORM_CONFIG");
        };

        let config: PlatformConfig = read_document(path)?;
        config
            .validate()
            .with_context(|| format!("Invalid platform configuration: {}", path.display()))?;

        debug!("Loaded platform configuration from {}", path.display());
        Ok(config)
    }
}

/// Loads a run bundle
///
/// A bundle holds everything one run references: organization, workspace,
/// scenario, solution, datasets and connectors.
pub fn load_bundle(path: &Path) -> Result<RunInputs> {
    read_document(path)
}

/// Document formats accepted by the CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Json,
    Yaml,
}

impl Format {
    /// Picks the format from a file extension, YAML when unknown
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_lowercase())
            .as_deref()
        {
            Some("json") => Self::Json,
            _ => Self::Yaml,
        }
    }
}

fn read_document<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read file: {}", path.display()))?;

    parse_document(&content, Format::from_path(path))
        .with_context(|| format!("Failed to parse file: {}", path.display()))
}

/// Parses a document in the given format
pub fn parse_document<T: DeserializeOwned>(content: &str, format: Format) -> Result<T> {
    let value = match format {
        Format::Json => serde_json::from_str(content)?,
        Format::Yaml => serde_yaml::from_str(content)?,
    };
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_path() {
        assert_eq!(Format::from_path(Path::new("platform.json")), Format::Json);
        assert_eq!(Format::from_path(Path::new("platform.JSON")), Format::Json);
        assert_eq!(Format::from_path(Path::new("platform.yaml")), Format::Yaml);
        assert_eq!(Format::from_path(Path::new("platform")), Format::Yaml);
    }

    #[test]
    fn test_parse_yaml_platform_config() {
        let yaml = r#"
api:
  baseUrl: https://api.example.com/v1
azure:
  credentials:
    core:
      tenantId: tenant-id
      clientId: client-id
      clientSecret: client-secret
  eventBus:
    baseUri: amqps://csm.servicebus.windows.net
    authentication:
      strategy: SHARED_ACCESS_POLICY
      sharedAccessPolicy:
        namespace:
          name: policy
          key: secret
images:
  scenarioFetchParameters: fetch-scenario-parameters:1.0.0
workflow:
  serviceAccountName: workflow
"#;

        let config: PlatformConfig = parse_document(yaml, Format::Yaml).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.workflow.service_account_name.as_deref(), Some("workflow"));
        assert_eq!(config.workflow.image_pull_policy, "IfNotPresent");
    }

    #[test]
    fn test_parse_json_bundle() {
        let json = r#"{
            "organization": { "id": "O-org" },
            "workspace": { "id": "W-ws", "key": "wskey" },
            "scenario": { "id": "S-1", "runTemplateId": "rt", "datasetList": ["D-1"] },
            "solution": {
                "id": "SOL",
                "repository": "simulator",
                "version": "1.0.0",
                "runTemplates": [ { "id": "rt" } ]
            },
            "datasets": [ { "id": "D-1", "connector": { "id": "c-1" } } ],
            "connectors": [ { "id": "c-1", "repository": "connectors/adt", "version": "1.0.0" } ]
        }"#;

        let bundle: RunInputs = parse_document(json, Format::Json).unwrap();
        let (dataset, connector) = bundle.resolve_dataset("D-1").unwrap();
        assert_eq!(dataset.id, "D-1");
        assert_eq!(connector.repository, "connectors/adt");
    }

    #[test]
    fn test_missing_platform_config() {
        let config = Config {
            platform_config: None,
        };
        assert!(config.load_platform_config().is_err());
    }
}
