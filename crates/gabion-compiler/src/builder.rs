//! Policy model builder.
//!
//! Derives the fixed artifact set for one operation: credential checks
//! shared by every operation, then the six per-operation steps wired into a
//! conditional flow. Artifact names come deterministically from the
//! operationId, so repeated builds are idempotent and distinct operations
//! cannot collide while operationIds are unique.

use std::collections::HashSet;

use serde_json::json;

use gabion_contract::{operation_scopes, Contract, Operation, SchemeKind};

use crate::error::CompileError;
use crate::policy::{Element, Flow, OperationPolicies, PolicyArtifact, PolicyKind};

/// Name of the shared API-key verification policy.
pub const AUTH_CHECK_NAME: &str = "Verify-API-Key";
/// Name of the shared access-token verification policy.
pub const SCOPE_CHECK_NAME: &str = "OAuthV2-VerifyAccessToken";

/// Build the policy artifacts and flow for one operation.
///
/// Fails with [`CompileError::MissingOperation`] when the path/method pair
/// is not declared. Never mutates the contract.
pub fn build_operation_policies(
    contract: &Contract,
    template: &str,
    method: &str,
) -> Result<OperationPolicies, CompileError> {
    let operation =
        contract
            .operation(template, method)
            .ok_or_else(|| CompileError::MissingOperation {
                template: template.to_string(),
                method: method.to_uppercase(),
            })?;

    let condition = guard_condition(template, &operation.method);
    let extracted = extraction_variables(operation);

    let schema_validation = schema_validation(operation)?;

    let artifacts = vec![
        auth_check(contract),
        scope_check(contract, operation),
        variable_assignment(operation),
        method_guard(operation, &condition),
        schema_validation,
        variable_extraction(operation, &extracted),
        fault_on_missing_parameters(operation, &extracted),
        fault_on_invalid_content_type(operation),
    ];

    ensure_unique_names(&artifacts)?;

    let flow = Flow {
        name: operation.operation_id.clone(),
        description: operation.summary.clone(),
        condition,
        request_steps: artifacts[2..].iter().map(|a| a.name.clone()).collect(),
        response_steps: Vec::new(),
    };

    let policies = OperationPolicies {
        operation_id: operation.operation_id.clone(),
        artifacts,
        preflow_steps: vec![AUTH_CHECK_NAME.to_string(), SCOPE_CHECK_NAME.to_string()],
        flow,
    };

    ensure_flow_resolvable(&policies)?;

    Ok(policies)
}

/// Render a path template as a pathsuffix wildcard expression:
/// each `{param}` segment becomes `*`.
fn pathsuffix_expression(template: &str) -> String {
    template
        .split('/')
        .map(|seg| {
            if seg.len() > 2 && seg.starts_with('{') && seg.ends_with('}') {
                "*"
            } else {
                seg
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// The boolean condition gating an operation's flow.
fn guard_condition(template: &str, method: &str) -> String {
    format!(
        "(proxy.pathsuffix MatchesPath \"{}\") and (request.verb = \"{}\")",
        pathsuffix_expression(template),
        method
    )
}

/// A variable extracted from the request body.
struct ExtractedVariable {
    name: String,
    json_type: String,
}

/// Decide which body properties get extracted: the schema's required
/// properties, or every property when none are marked required.
fn extraction_variables(operation: &Operation) -> Vec<ExtractedVariable> {
    let Some(schema) = &operation.request_schema else {
        return Vec::new();
    };
    let Some(properties) = schema.get("properties").and_then(|v| v.as_object()) else {
        return Vec::new();
    };

    let required: Vec<&str> = schema
        .get("required")
        .and_then(|v| v.as_array())
        .map(|arr| arr.iter().filter_map(|v| v.as_str()).collect())
        .unwrap_or_default();

    let names: Vec<&str> = if required.is_empty() {
        properties.keys().map(|k| k.as_str()).collect()
    } else {
        required
    };

    names
        .into_iter()
        .filter_map(|name| {
            let prop = properties.get(name)?;
            let json_type = prop
                .get("type")
                .and_then(|v| v.as_str())
                .unwrap_or("string")
                .to_string();
            Some(ExtractedVariable {
                name: name.to_string(),
                json_type,
            })
        })
        .collect()
}

/// VerifyAPIKey against the contract's apiKey scheme. Falls back to a
/// header named "apikey" when the contract declares no apiKey scheme.
fn auth_check(contract: &Contract) -> PolicyArtifact {
    let (param_name, location) = contract
        .security_schemes
        .iter()
        .find_map(|s| match &s.kind {
            SchemeKind::ApiKey {
                param_name,
                location,
            } => Some((param_name.clone(), location.clone())),
            _ => None,
        })
        .unwrap_or_else(|| ("apikey".to_string(), "header".to_string()));

    let source = match location.as_str() {
        "query" => format!("request.queryparam.{}", param_name),
        _ => format!("request.header.{}", param_name),
    };

    let element = Element::new("VerifyAPIKey")
        .attr("async", "false")
        .attr("continueOnError", "false")
        .attr("enabled", "true")
        .attr("name", AUTH_CHECK_NAME)
        .child(Element::new("DisplayName").text("Verify API Key"))
        .child(Element::new("APIKey").attr("ref", format!("request.queryparam.{}", param_name)))
        .child(Element::new("Source").text(source))
        .child(Element::new("Verifier").child(Element::new("Parameter").text(param_name)));

    PolicyArtifact {
        name: AUTH_CHECK_NAME.to_string(),
        kind: PolicyKind::AuthCheck,
        element,
    }
}

/// OAuthV2 VerifyAccessToken requiring the scopes of the schemes the
/// operation's security list references.
fn scope_check(contract: &Contract, operation: &Operation) -> PolicyArtifact {
    let mut scopes_element = Element::new("Scopes");
    for scope in operation_scopes(contract, operation) {
        scopes_element = scopes_element.child(Element::new("Scope").text(scope));
    }

    let element = Element::new("OAuthV2")
        .attr("async", "false")
        .attr("continueOnError", "false")
        .attr("enabled", "true")
        .attr("name", SCOPE_CHECK_NAME)
        .child(Element::new("DisplayName").text("OAuth v2 Verify Access Token"))
        .child(Element::new("Operation").text("VerifyAccessToken"))
        .child(Element::new("AccessToken").text("{request.queryparam.access_token}"))
        .child(scopes_element);

    PolicyArtifact {
        name: SCOPE_CHECK_NAME.to_string(),
        kind: PolicyKind::ScopeCheck,
        element,
    }
}

/// AssignMessage binding `operation` and `method` context variables.
fn variable_assignment(operation: &Operation) -> PolicyArtifact {
    let name = format!("Assign-Operation-{}", operation.operation_id);

    let element = Element::new("AssignMessage")
        .attr("name", &name)
        .child(
            Element::new("AssignVariable")
                .child(Element::new("Name").text("operation"))
                .child(Element::new("Value").text(&operation.operation_id)),
        )
        .child(
            Element::new("AssignVariable")
                .child(Element::new("Name").text("method"))
                .child(Element::new("Value").text(&operation.method)),
        )
        .child(Element::new("IgnoreUnresolvedVariables").text("false"));

    PolicyArtifact {
        name,
        kind: PolicyKind::VariableAssignment,
        element,
    }
}

/// StepDefinition carrying the flow's gating condition.
fn method_guard(operation: &Operation, condition: &str) -> PolicyArtifact {
    let name = format!("MethodCheck-{}", operation.operation_id);

    let element = Element::new("StepDefinition")
        .attr("name", &name)
        .child(Element::new("Condition").text(condition));

    PolicyArtifact {
        name,
        kind: PolicyKind::MethodGuard,
        element,
    }
}

/// ValidateRequest with the operation's body schema wrapped under a `body`
/// property, copied verbatim from the contract.
fn schema_validation(operation: &Operation) -> Result<PolicyArtifact, CompileError> {
    let name = format!("Validate-Request-{}", operation.operation_id);

    let body_schema = operation
        .request_schema
        .clone()
        .unwrap_or_else(|| json!({ "type": "object" }));
    let schema_value = serde_json::to_string(&json!({
        "type": "object",
        "properties": { "body": body_schema },
    }))?;

    let element = Element::new("ValidateRequest")
        .attr("name", &name)
        .child(Element::new("Source").text("request"))
        .child(
            Element::new("Schemas").child(
                Element::new("Schema")
                    .attr("id", "jsonSchema")
                    .child(Element::new("SchemaValue").text(schema_value)),
            ),
        )
        .child(
            Element::new("RequestValidation")
                .child(Element::new("Message").text("Invalid request format"))
                .child(Element::new("Variable").text("request"))
                .child(Element::new("SchemaRef").text("jsonSchema")),
        );

    Ok(PolicyArtifact {
        name,
        kind: PolicyKind::SchemaValidation,
        element,
    })
}

/// ExtractVariables with one JSONPath per extracted body property.
fn variable_extraction(operation: &Operation, variables: &[ExtractedVariable]) -> PolicyArtifact {
    let name = format!("Extract-Parameters-{}", operation.operation_id);

    let mut payload = Element::new("JSONPayload");
    for var in variables {
        payload = payload.child(
            Element::new("Variable")
                .attr("name", &var.name)
                .attr("type", &var.json_type)
                .child(Element::new("JSONPath").text(format!("$.{}", var.name))),
        );
    }

    let element = Element::new("ExtractVariables")
        .attr("name", &name)
        .child(Element::new("Source").text("request"))
        .child(payload);

    PolicyArtifact {
        name,
        kind: PolicyKind::VariableExtraction,
        element,
    }
}

/// RaiseFault (HTTP 422) when any extracted variable is empty.
fn fault_on_missing_parameters(
    operation: &Operation,
    variables: &[ExtractedVariable],
) -> PolicyArtifact {
    let name = format!("Raise-Fault-Invalid-Parameters-{}", operation.operation_id);

    // No extracted variables means the rule can never fire.
    let condition = if variables.is_empty() {
        "false".to_string()
    } else {
        variables
            .iter()
            .map(|v| format!("({} = \"\")", v.name))
            .collect::<Vec<_>>()
            .join(" or ")
    };

    let element = raise_fault(
        &name,
        "Raise Fault Invalid Parameters",
        &condition,
        "Fault-Parameter-Missing",
        r#"{ "error": "Invalid or missing parameters" }"#,
        422,
        "Unprocessable Entity",
    );

    PolicyArtifact {
        name,
        kind: PolicyKind::FaultOnMissingParameters,
        element,
    }
}

/// RaiseFault (HTTP 400) when the request content-type is neither JSON nor XML.
fn fault_on_invalid_content_type(operation: &Operation) -> PolicyArtifact {
    let name = format!("Raise-Fault-Invalid-Input-{}", operation.operation_id);

    let condition = "(request.header.Content-Type != \"application/json\") and \
                     (request.header.Content-Type != \"application/xml\")";

    let element = raise_fault(
        &name,
        "Raise Fault Invalid Input",
        condition,
        "Fault-Invalid-Input",
        r#"{ "error": "Invalid input format" }"#,
        400,
        "Bad Request",
    );

    PolicyArtifact {
        name,
        kind: PolicyKind::FaultOnInvalidContentType,
        element,
    }
}

/// Shared RaiseFault element shape.
fn raise_fault(
    name: &str,
    display_name: &str,
    condition: &str,
    step_name: &str,
    payload: &str,
    status_code: u16,
    reason_phrase: &str,
) -> Element {
    Element::new("RaiseFault")
        .attr("async", "false")
        .attr("continueOnError", "false")
        .attr("enabled", "true")
        .attr("name", name)
        .child(Element::new("DisplayName").text(display_name))
        .child(
            Element::new("FaultRules").child(
                Element::new("FaultRule")
                    .child(Element::new("Condition").text(condition))
                    .child(Element::new("Step").child(Element::new("Name").text(step_name))),
            ),
        )
        .child(
            Element::new("FaultResponse").child(
                Element::new("Set")
                    .child(Element::new("Headers"))
                    .child(
                        Element::new("Payload")
                            .attr("contentType", "application/json")
                            .text(payload),
                    )
                    .child(Element::new("StatusCode").text(status_code.to_string()))
                    .child(Element::new("ReasonPhrase").text(reason_phrase)),
            ),
        )
}

/// Artifact names must be pairwise distinct within one document set.
fn ensure_unique_names(artifacts: &[PolicyArtifact]) -> Result<(), CompileError> {
    let mut seen: HashSet<&str> = HashSet::new();
    for artifact in artifacts {
        if !seen.insert(artifact.name.as_str()) {
            return Err(CompileError::DuplicateArtifactName(artifact.name.clone()));
        }
    }
    Ok(())
}

/// Every step reference (preflow and flow) must resolve to a built artifact.
fn ensure_flow_resolvable(policies: &OperationPolicies) -> Result<(), CompileError> {
    let names: HashSet<&str> = policies.artifacts.iter().map(|a| a.name.as_str()).collect();

    let steps = policies
        .preflow_steps
        .iter()
        .chain(&policies.flow.request_steps)
        .chain(&policies.flow.response_steps);

    for step in steps {
        if !names.contains(step.as_str()) {
            return Err(CompileError::DanglingFlowReference {
                flow: policies.flow.name.clone(),
                step: step.clone(),
            });
        }
    }
    Ok(())
}
