//! Organization and workspace domain types

use serde::{Deserialize, Serialize};

/// Organization owning workspaces and solutions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Organization {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// Workspace a scenario runs in
///
/// Only the identity and option bag used when compiling a run are modelled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workspace {
    pub id: String,
    /// Short key used to compose data-warehouse and event-bus names
    pub key: String,
    #[serde(default)]
    pub name: Option<String>,
    /// Default for both send-to-warehouse flags
    #[serde(default)]
    pub send_input_to_data_warehouse: Option<bool>,
    /// Each workspace owns its own event-bus namespace
    #[serde(default)]
    pub use_dedicated_event_hub_namespace: Option<bool>,
}

impl Workspace {
    pub fn dedicated_event_hub_namespace(&self) -> bool {
        self.use_dedicated_event_hub_namespace.unwrap_or(false)
    }
}
