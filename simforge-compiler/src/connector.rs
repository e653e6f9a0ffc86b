//! Connector binding resolver
//!
//! Splits a dataset connector's values into environment variables and
//! positional arguments of the fetch container, after substituting the
//! placeholder tokens a value may carry.

use simforge_core::domain::dataset::{Connector, DatasetConnector};

use crate::env::EnvMap;
use crate::error::{CompileError, Result};

pub const WORKSPACE_FILE_TOKEN: &str = "%WORKSPACE_FILE%";
pub const STORAGE_CONNECTION_STRING_TOKEN: &str = "%STORAGE_CONNECTION_STRING%";
pub const DATASET_ID_TOKEN: &str = "%DATASETID%";

/// What a raw connector value resolves to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParameterSource<'a> {
    /// A file of the workspace; holds what follows the token
    WorkspaceFile(&'a str),
    /// The platform storage connection string
    StorageConnectionString,
    /// The id of the dataset being fetched
    DatasetId,
    /// Used as is
    Literal(&'a str),
}

impl<'a> ParameterSource<'a> {
    /// Classifies a raw value
    pub fn parse(value: &'a str) -> Self {
        if let Some(rest) = value.strip_prefix(WORKSPACE_FILE_TOKEN) {
            Self::WorkspaceFile(rest)
        } else if value == STORAGE_CONNECTION_STRING_TOKEN {
            Self::StorageConnectionString
        } else if value == DATASET_ID_TOKEN {
            Self::DatasetId
        } else {
            Self::Literal(value)
        }
    }

    pub fn resolve(&self, ctx: &BindingContext<'_>) -> String {
        match self {
            Self::WorkspaceFile(rest) => {
                format!("{}/{}{}", ctx.organization_id, ctx.workspace_id, rest)
            }
            Self::StorageConnectionString => ctx.storage_connection_string.to_string(),
            Self::DatasetId => ctx.dataset_id.to_string(),
            Self::Literal(value) => value.to_string(),
        }
    }
}

/// Values placeholders resolve to
#[derive(Debug, Clone, Copy)]
pub struct BindingContext<'a> {
    pub organization_id: &'a str,
    pub workspace_id: &'a str,
    pub storage_connection_string: &'a str,
    pub dataset_id: &'a str,
}

/// Connector values routed to the fetch container
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bindings {
    pub env: EnvMap,
    pub args: Vec<String>,
}

/// Resolves a dataset connector's values against its connector
///
/// Values whose parameter declares an environment variable go to `env`.
/// The others become positional arguments in the connector's declaration
/// order, followed by values with no declaration in key order.
///
/// # Errors
/// Returns `ConnectorMismatch` when the values belong to another connector.
pub fn resolve_bindings(
    connector: &Connector,
    dataset_connector: &DatasetConnector,
    ctx: &BindingContext<'_>,
) -> Result<Bindings> {
    if dataset_connector.id != connector.id {
        return Err(CompileError::ConnectorMismatch {
            connector_id: connector.id.clone(),
            dataset_connector_id: dataset_connector.id.clone(),
        });
    }

    let values = &dataset_connector.parameters_values;
    let mut bindings = Bindings::default();

    for parameter in connector.parameters() {
        let Some(raw) = values.get(&parameter.id) else {
            continue;
        };
        let value = ParameterSource::parse(raw).resolve(ctx);
        match &parameter.env_var {
            Some(env_var) => {
                bindings.env.insert(env_var.clone(), value);
            }
            None => bindings.args.push(value),
        }
    }

    for (id, raw) in values {
        if connector.parameter(id).is_none() {
            bindings.args.push(ParameterSource::parse(raw).resolve(ctx));
        }
    }

    Ok(bindings)
}
