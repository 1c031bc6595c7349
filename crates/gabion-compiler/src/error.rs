use thiserror::Error;

use gabion_contract::ContractError;

/// Errors produced during policy compilation.
#[derive(Debug, Error)]
pub enum CompileError {
    /// Contract loading or parsing failed.
    #[error(transparent)]
    Contract(#[from] ContractError),

    /// The requested path/method pair does not exist in the contract.
    #[error("no operation for {method} {template} in contract")]
    MissingOperation { template: String, method: String },

    /// Two artifacts would carry the same name. Indicates a contract with
    /// duplicate operationIds.
    #[error("duplicate policy artifact name: {0}")]
    DuplicateArtifactName(String),

    /// A flow step references an artifact that was never built.
    #[error("flow '{flow}' references unknown policy '{step}'")]
    DanglingFlowReference { flow: String, step: String },

    /// JSON serialization error (schema rendering).
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error writing generated documents.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
