//! Contract-to-policy compiler.
//!
//! Takes a parsed API contract, builds the fixed policy artifact set for a
//! selected operation, serializes it into the three gateway documents, and
//! reports a summary with per-document checksums.

pub mod builder;
pub mod documents;
pub mod error;
pub mod policy;
pub mod sink;
pub mod xml;

use std::collections::BTreeMap;

use sha2::{Digest, Sha256};
use tracing::info;

use gabion_contract::Contract;

pub use builder::{build_operation_policies, AUTH_CHECK_NAME, SCOPE_CHECK_NAME};
pub use documents::{serialize_documents, PolicyDocuments};
pub use error::CompileError;
pub use policy::{Element, Flow, Node, OperationPolicies, PolicyArtifact, PolicyKind, RoutingInfo};
pub use sink::{DirSink, DocumentSink, StdoutSink, POLICIES_FILE, PROXIES_FILE, TARGETS_FILE};

/// Compiler version (from Cargo.toml).
pub const COMPILER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Which operation of the contract to compile.
#[derive(Debug, Clone)]
pub enum OperationSelector {
    /// The contract's first declared operation.
    First,
    /// An explicit path template and method.
    Operation { template: String, method: String },
}

/// Everything a compile produces: the documents plus the summary.
#[derive(Debug, Clone)]
pub struct CompileOutput {
    pub documents: PolicyDocuments,
    pub summary: CompileSummary,
}

/// Human-readable record of one compile.
#[derive(Debug, Clone, serde::Serialize)]
pub struct CompileSummary {
    pub compiler_version: String,
    /// operationId of the compiled operation.
    pub operation_id: String,
    pub template: String,
    pub method: String,
    /// Names of the built artifacts, in document order.
    pub artifacts: Vec<String>,
    /// Checksums use BTreeMap for deterministic JSON serialization order.
    pub checksums: BTreeMap<String, String>,
}

/// Compile one operation of the contract into the three documents.
pub fn compile_contract(
    contract: &Contract,
    selector: &OperationSelector,
    routing: &RoutingInfo,
) -> Result<CompileOutput, CompileError> {
    let (template, method) = select_operation(contract, selector)?;

    let policies = build_operation_policies(contract, &template, &method)?;
    let documents = serialize_documents(&policies, routing);

    let mut checksums = BTreeMap::new();
    checksums.insert(
        POLICIES_FILE.to_string(),
        format!("sha256:{}", compute_sha256(&documents.policies)),
    );
    checksums.insert(
        PROXIES_FILE.to_string(),
        format!("sha256:{}", compute_sha256(&documents.proxy_endpoints)),
    );
    checksums.insert(
        TARGETS_FILE.to_string(),
        format!("sha256:{}", compute_sha256(&documents.target_endpoints)),
    );

    let summary = CompileSummary {
        compiler_version: COMPILER_VERSION.to_string(),
        operation_id: policies.operation_id.clone(),
        template: template.clone(),
        method: method.clone(),
        artifacts: policies.artifacts.iter().map(|a| a.name.clone()).collect(),
        checksums,
    };

    info!(
        operation = %summary.operation_id,
        template = %template,
        method = %method,
        artifacts = summary.artifacts.len(),
        "compiled operation"
    );

    Ok(CompileOutput { documents, summary })
}

fn select_operation(
    contract: &Contract,
    selector: &OperationSelector,
) -> Result<(String, String), CompileError> {
    match selector {
        OperationSelector::Operation { template, method } => {
            Ok((template.clone(), method.to_uppercase()))
        }
        OperationSelector::First => {
            for path in &contract.paths {
                if let Some(op) = path.operations.first() {
                    return Ok((path.template.clone(), op.method.clone()));
                }
            }
            Err(CompileError::MissingOperation {
                template: String::new(),
                method: String::new(),
            })
        }
    }
}

/// Hex-encoded SHA-256 of a document's text.
fn compute_sha256(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}
