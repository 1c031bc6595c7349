use serde::{Deserialize, Serialize};

/// A parsed API contract.
///
/// `paths` and `security_schemes` keep the declaration order of the source
/// document. The model is read-only after construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contract {
    /// Path templates with their operations, in declaration order.
    pub paths: Vec<PathItem>,
    /// Security schemes, in declaration order.
    pub security_schemes: Vec<SecurityScheme>,
}

impl Contract {
    /// Find a security scheme by name.
    pub fn scheme(&self, name: &str) -> Option<&SecurityScheme> {
        self.security_schemes.iter().find(|s| s.name == name)
    }

    /// Find an operation by path template and method (method case-insensitive).
    pub fn operation(&self, template: &str, method: &str) -> Option<&Operation> {
        self.paths
            .iter()
            .find(|p| p.template == template)?
            .operations
            .iter()
            .find(|op| op.method.eq_ignore_ascii_case(method))
    }
}

/// One path template and its operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathItem {
    /// The path template (e.g. "/pet/{petId}").
    pub template: String,
    /// Operations keyed by method, in declaration order.
    pub operations: Vec<Operation>,
}

/// A single operation (path + method).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Operation {
    /// The HTTP method (uppercase).
    pub method: String,
    /// The operationId, unique within the contract.
    pub operation_id: String,
    /// The operation summary, if present.
    pub summary: Option<String>,
    /// Declared parameters, in declaration order.
    pub parameters: Vec<Parameter>,
    /// Declared response status codes, in declaration order.
    pub responses: Vec<u16>,
    /// Security requirements, in declaration order.
    pub security: Vec<SecurityRequirement>,
    /// Resolved request body schema, if the operation declares one.
    pub request_schema: Option<serde_json::Value>,
}

/// A declared parameter descriptor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    /// Where the parameter lives ("path", "query", "header", "body").
    pub location: String,
    pub required: bool,
}

/// A reference from an operation to a security scheme.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityRequirement {
    /// Name of the referenced scheme.
    pub scheme: String,
    /// Scopes the operation requests from that scheme.
    pub scopes: Vec<String>,
}

/// A named security scheme.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityScheme {
    pub name: String,
    pub kind: SchemeKind,
}

/// The scheme type. Types other than oauth2/apiKey are carried as `Other`
/// and ignored by policy generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemeKind {
    OAuth2 {
        /// Flows in declaration order.
        flows: Vec<OAuthFlow>,
    },
    ApiKey {
        /// Credential parameter name (e.g. "api_key").
        param_name: String,
        /// Credential location ("header" or "query").
        location: String,
    },
    Other,
}

/// One OAuth2 flow and its scopes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthFlow {
    /// Flow name (e.g. "implicit").
    pub name: String,
    /// (scope name, description) pairs in declaration order.
    pub scopes: Vec<(String, String)>,
}
