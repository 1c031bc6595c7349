//! REST API contract model and parser.
//!
//! Reads YAML/JSON contracts, extracts `paths`, declared response statuses,
//! and security schemes. Declaration order of paths, schemes, and flows is
//! preserved so downstream policy generation is deterministic.

pub mod error;
pub mod model;
pub mod parser;
pub mod scopes;
pub mod source;

pub use error::ContractError;
pub use model::{
    Contract, OAuthFlow, Operation, Parameter, PathItem, SchemeKind, SecurityRequirement,
    SecurityScheme,
};
pub use parser::{parse_contract, parse_contract_file};
pub use scopes::{oauth_scopes, operation_scopes};
pub use source::{ContractSource, EnvSource, FileSource};
