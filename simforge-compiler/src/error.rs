//! Error types for the pipeline compiler

use thiserror::Error;

/// Result type alias for compiler operations
pub type Result<T> = std::result::Result<T, CompileError>;

/// Errors that abort a compile
///
/// No variant is retryable and none leaves a partial pipeline behind.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CompileError {
    /// A dataset references a connector that was not supplied
    #[error("Unknown connector '{connector_id}' for dataset '{dataset_id}'")]
    UnknownConnector {
        dataset_id: String,
        connector_id: String,
    },

    /// A dataset has no connector binding at all
    #[error("Dataset '{0}' has no connector")]
    DatasetWithoutConnector(String),

    /// Dataset connector values bound to a different connector
    #[error("Dataset connector '{dataset_connector_id}' does not match connector '{connector_id}'")]
    ConnectorMismatch {
        connector_id: String,
        dataset_connector_id: String,
    },

    /// Managed identity and customer app registration both requested
    #[error(
        "Connector '{0}' cannot use both managed identity and customer app registration authentication"
    )]
    ConflictingAuthentication(String),

    /// Credentials required by the selected authentication are not configured
    #[error("Missing credentials: {0}")]
    MissingCredentials(String),

    /// Shared access policy strategy selected without policy credentials
    #[error("Event bus shared access policy strategy selected but no policy credentials are configured")]
    MissingSharedAccessPolicy,

    /// The scenario's run template does not exist in the solution
    #[error("Run template '{run_template_id}' not found in solution '{solution_id}'")]
    RunTemplateNotFound {
        solution_id: String,
        run_template_id: String,
    },

    /// Every stage of the run template is disabled
    #[error("Run template '{0}' enables no stage")]
    EmptyPipeline(String),

    /// A dataset id was not part of the resolved inputs
    #[error("Dataset not found: {0}")]
    DatasetNotFound(String),

    /// A dataset-id parameter value cannot be parsed
    #[error("Invalid dataset id list for parameter '{parameter_id}': {value}")]
    InvalidDatasetParameter { parameter_id: String, value: String },

    /// A stage depends on a stage that does not precede it
    #[error("Container '{container}' depends on unknown container '{dependency}'")]
    DanglingDependency {
        container: String,
        dependency: String,
    },

    /// Two stages share a name
    #[error("Duplicate container name: {0}")]
    DuplicateContainer(String),

    /// Platform configuration failed validation
    #[error("Invalid platform configuration: {0}")]
    InvalidConfig(String),
}

impl CompileError {
    /// Check if this error is caused by the submitted scenario values
    ///
    /// Client errors are reported back to the submitter, everything else is
    /// a platform misconfiguration or a defect.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::InvalidDatasetParameter { .. })
    }

    /// Check if this error is a programmer invariant violation
    pub fn is_invariant_violation(&self) -> bool {
        matches!(
            self,
            Self::DanglingDependency { .. } | Self::DuplicateContainer(_)
        )
    }

    /// Check if this error comes from configuration or domain inputs
    pub fn is_configuration_error(&self) -> bool {
        !self.is_client_error() && !self.is_invariant_violation()
    }
}
