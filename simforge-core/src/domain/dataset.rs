//! Dataset and connector domain types

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Dataset referenced by a scenario
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dataset {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    /// Connector binding with the concrete parameter values
    #[serde(default)]
    pub connector: Option<DatasetConnector>,
}

/// Concrete values for a subset of a connector's parameters
///
/// `id` must designate an existing [`Connector`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetConnector {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    /// Parameter id -> raw value (placeholders not yet substituted)
    #[serde(default)]
    pub parameters_values: BTreeMap<String, String>,
}

/// Connector definition
///
/// Declares the container image fetching a dataset and how each of its
/// parameters reaches that container.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connector {
    pub id: String,
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    pub repository: String,
    pub version: String,
    #[serde(default)]
    pub azure_managed_identity: Option<bool>,
    #[serde(default)]
    pub azure_authentication_with_customer_app_registration: Option<bool>,
    #[serde(default)]
    pub parameter_groups: Vec<ConnectorParameterGroup>,
}

impl Connector {
    /// Iterates parameter definitions in declaration order
    pub fn parameters(&self) -> impl Iterator<Item = &ConnectorParameter> {
        self.parameter_groups.iter().flat_map(|g| g.parameters.iter())
    }

    /// Finds the definition of a parameter by id
    pub fn parameter(&self, id: &str) -> Option<&ConnectorParameter> {
        self.parameters().find(|p| p.id == id)
    }
}

/// Group of connector parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectorParameterGroup {
    pub id: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub parameters: Vec<ConnectorParameter>,
}

/// Connector parameter definition
///
/// A parameter with an `env_var` is passed as that environment variable,
/// otherwise as a positional argument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectorParameter {
    pub id: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub value_type: Option<String>,
    #[serde(default)]
    pub env_var: Option<String>,
}
