//! Runtime response auditing.
//!
//! Answers one question for the data plane: is the status code a backend
//! returned actually declared by the contract for the operation the request
//! matched? Path templates are matched with wildcard semantics, and 200 is
//! always treated as declared.

use tracing::debug;

use gabion_contract::{parse_contract, Contract, ContractError, PathItem};
use gabion_matcher::MatchPattern;

/// A contract with its path templates precompiled for matching.
///
/// Borrows the contract; compile once, audit many times.
#[derive(Debug)]
pub struct ContractAuditor<'c> {
    contract: &'c Contract,
    patterns: Vec<MatchPattern>,
}

impl<'c> ContractAuditor<'c> {
    pub fn new(contract: &'c Contract) -> Self {
        let patterns = contract
            .paths
            .iter()
            .map(|path| MatchPattern::compile(&path.template))
            .collect();
        Self { contract, patterns }
    }

    /// Whether `status` is declared for `method` on the path matching
    /// `subpath`.
    ///
    /// The first matching path template decides: if the method is not
    /// declared on that path, the answer is `false` even when a later
    /// template would also match and carry the method.
    pub fn is_declared(&self, subpath: &str, method: &str, status: u16) -> bool {
        let Some(path) = self.matched_path(subpath) else {
            debug!(subpath, "no path template matches");
            return false;
        };

        let Some(operation) = path
            .operations
            .iter()
            .find(|op| op.method.eq_ignore_ascii_case(method))
        else {
            debug!(subpath, method, template = %path.template, "method not declared on matched path");
            return false;
        };

        is_status_declared(&operation.responses, status)
    }

    fn matched_path(&self, subpath: &str) -> Option<&'c PathItem> {
        self.patterns
            .iter()
            .zip(&self.contract.paths)
            .find(|(pattern, _)| pattern.matches(subpath))
            .map(|(_, path)| path)
    }
}

/// Whether a status code is declared. 200 is implicitly declared even when
/// the response list omits it.
pub fn is_status_declared(declared: &[u16], status: u16) -> bool {
    status == 200 || declared.contains(&status)
}

/// One-shot audit for the gateway-callout shape: parse the serialized
/// contract, match, and decide. Fails only on malformed contract text.
pub fn audit_response(
    contract_text: &str,
    subpath: &str,
    method: &str,
    status: u16,
) -> Result<bool, ContractError> {
    let contract = parse_contract(contract_text)?;
    Ok(ContractAuditor::new(&contract).is_declared(subpath, method, status))
}
