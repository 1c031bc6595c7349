use thiserror::Error;

/// Errors produced while loading or parsing a contract.
#[derive(Debug, Error)]
pub enum ContractError {
    /// The contract text is not parsable YAML/JSON.
    #[error("contract parse error: {0}")]
    Parse(String),

    /// The contract parsed but violates a structural invariant.
    #[error("invalid contract: {0}")]
    Invalid(String),

    /// A schema `$ref` points at nothing in the document.
    #[error("unresolved schema reference: {0}")]
    UnresolvedRef(String),

    /// Contract was requested from an environment variable that is unset.
    #[error("environment variable '{0}' is not set")]
    MissingEnv(String),

    /// I/O error reading the contract file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
