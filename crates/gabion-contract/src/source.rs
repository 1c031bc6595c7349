//! Contract sources.
//!
//! A [`ContractSource`] supplies a parsed contract without the core caring
//! where the text came from: a file on disk, or serialized JSON held in an
//! environment variable (the gateway-callout shape).

use std::path::PathBuf;

use crate::error::ContractError;
use crate::model::Contract;
use crate::parser::{parse_contract, parse_contract_file};

/// Supplies a parsed contract. Implementations fail fast on malformed input.
pub trait ContractSource {
    fn load(&self) -> Result<Contract, ContractError>;
}

/// Reads the contract from a YAML/JSON file.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ContractSource for FileSource {
    fn load(&self) -> Result<Contract, ContractError> {
        parse_contract_file(&self.path)
    }
}

/// Reads serialized contract JSON from an environment variable.
#[derive(Debug, Clone)]
pub struct EnvSource {
    var: String,
}

impl EnvSource {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

impl ContractSource for EnvSource {
    fn load(&self) -> Result<Contract, ContractError> {
        let text = std::env::var(&self.var)
            .map_err(|_| ContractError::MissingEnv(self.var.clone()))?;
        parse_contract(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn file_source_loads_contract() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("contract.yaml");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(
            b"swagger: \"2.0\"\npaths:\n  /pet:\n    get:\n      operationId: listPets\n      responses:\n        \"200\":\n          description: OK\n",
        )
        .unwrap();

        let contract = FileSource::new(&path).load().unwrap();
        assert_eq!(contract.paths.len(), 1);
    }

    #[test]
    fn file_source_missing_file_is_io_error() {
        let result = FileSource::new("/nonexistent/contract.yaml").load();
        assert!(matches!(result, Err(ContractError::Io(_))));
    }

    #[test]
    fn env_source_missing_var_is_an_error() {
        let result = EnvSource::new("GABION_TEST_UNSET_CONTRACT_VAR").load();
        assert!(matches!(result, Err(ContractError::MissingEnv(_))));
    }
}
