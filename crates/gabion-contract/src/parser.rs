use std::collections::HashSet;

use serde_json::Value as Json;
use serde_yaml::Value as Yaml;

use crate::error::ContractError;
use crate::model::{
    Contract, OAuthFlow, Operation, Parameter, PathItem, SchemeKind, SecurityRequirement,
    SecurityScheme,
};

/// HTTP methods we recognize in contract paths.
const HTTP_METHODS: &[&str] = &[
    "get", "post", "put", "delete", "patch", "head", "options", "trace",
];

/// Maximum `$ref` nesting while resolving schemas. Exceeding it means the
/// document contains a reference cycle.
const MAX_REF_DEPTH: usize = 32;

/// Parse a contract from a YAML/JSON string.
///
/// Accepts both the Swagger 2.0 (`securityDefinitions`, body parameters)
/// and OpenAPI 3.x (`components.securitySchemes`, `requestBody`) security
/// and schema vocabularies. Declaration order of paths, methods, schemes,
/// and flows is preserved.
pub fn parse_contract(input: &str) -> Result<Contract, ContractError> {
    // YAML parsing also handles JSON since JSON is valid YAML.
    let root: Yaml =
        serde_yaml::from_str(input).map_err(|e| ContractError::Parse(e.to_string()))?;

    if root.as_mapping().is_none() {
        return Err(ContractError::Parse("contract root must be an object".into()));
    }

    // JSON view of the whole document, used for $ref resolution. Schema maps
    // go through serde_json's sorted maps, which keeps rendering stable.
    let json_root = yaml_to_json(&root)?;

    let security_schemes = parse_security_schemes(&root)?;
    let paths = parse_paths(&root, &json_root)?;

    Ok(Contract {
        paths,
        security_schemes,
    })
}

/// Parse a contract from a file path.
pub fn parse_contract_file(path: &std::path::Path) -> Result<Contract, ContractError> {
    let content = std::fs::read_to_string(path)?;
    parse_contract(&content)
}

/// Render a mapping key as a string. Contract keys are strings in JSON, but
/// YAML allows bare numerics (unquoted response statuses).
fn key_str(key: &Yaml) -> Option<String> {
    match key {
        Yaml::String(s) => Some(s.clone()),
        Yaml::Number(n) => Some(n.to_string()),
        Yaml::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Convert a YAML value into a JSON value, stringifying scalar keys.
fn yaml_to_json(value: &Yaml) -> Result<Json, ContractError> {
    match value {
        Yaml::Null => Ok(Json::Null),
        Yaml::Bool(b) => Ok(Json::Bool(*b)),
        Yaml::Number(n) => serde_json::to_value(n).map_err(|e| ContractError::Parse(e.to_string())),
        Yaml::String(s) => Ok(Json::String(s.clone())),
        Yaml::Sequence(seq) => {
            let items = seq.iter().map(yaml_to_json).collect::<Result<Vec<_>, _>>()?;
            Ok(Json::Array(items))
        }
        Yaml::Mapping(map) => {
            let mut out = serde_json::Map::new();
            for (k, v) in map {
                let key = key_str(k)
                    .ok_or_else(|| ContractError::Parse("mapping key must be a scalar".into()))?;
                out.insert(key, yaml_to_json(v)?);
            }
            Ok(Json::Object(out))
        }
        Yaml::Tagged(tagged) => yaml_to_json(&tagged.value),
    }
}

/// Parse the `paths` object into path items.
fn parse_paths(root: &Yaml, json_root: &Json) -> Result<Vec<PathItem>, ContractError> {
    let mut items = Vec::new();

    let paths = match root.get("paths").and_then(Yaml::as_mapping) {
        Some(p) => p,
        None => return Ok(items), // No paths is valid (empty contract)
    };

    let mut seen_templates: HashSet<String> = HashSet::new();

    for (template_key, path_value) in paths {
        let template = key_str(template_key)
            .ok_or_else(|| ContractError::Invalid("path template must be a string".into()))?;

        validate_template(&template)?;

        if !seen_templates.insert(template.clone()) {
            return Err(ContractError::Invalid(format!(
                "duplicate path template '{}'",
                template
            )));
        }

        let path_map = path_value.as_mapping().ok_or_else(|| {
            ContractError::Invalid(format!("path item for '{}' must be an object", template))
        })?;

        let mut operations = Vec::new();
        let mut seen_methods: HashSet<String> = HashSet::new();

        for (method_key, op_value) in path_map {
            let Some(method) = key_str(method_key) else {
                continue;
            };
            let method_lower = method.to_ascii_lowercase();
            if !HTTP_METHODS.contains(&method_lower.as_str()) {
                // "parameters", vendor extensions, descriptions, etc.
                continue;
            }
            if !seen_methods.insert(method_lower.clone()) {
                return Err(ContractError::Invalid(format!(
                    "duplicate method '{}' for path '{}'",
                    method_lower.to_uppercase(),
                    template
                )));
            }

            operations.push(parse_operation(&template, &method_lower, op_value, json_root)?);
        }

        items.push(PathItem {
            template,
            operations,
        });
    }

    Ok(items)
}

/// Parse a single operation object.
fn parse_operation(
    template: &str,
    method: &str,
    value: &Yaml,
    json_root: &Json,
) -> Result<Operation, ContractError> {
    let location = format!("{} {}", method.to_uppercase(), template);

    if value.as_mapping().is_none() {
        return Err(ContractError::Invalid(format!(
            "operation {} must be an object",
            location
        )));
    }

    let operation_id = value
        .get("operationId")
        .and_then(Yaml::as_str)
        .ok_or_else(|| {
            ContractError::Invalid(format!("operation {} is missing operationId", location))
        })?
        .to_string();

    let summary = value
        .get("summary")
        .and_then(Yaml::as_str)
        .map(|s| s.to_string());

    let parameters = parse_parameters(value);
    let responses = parse_responses(value);
    let security = parse_security_requirements(value);
    let request_schema = parse_request_schema(value, json_root)?;

    Ok(Operation {
        method: method.to_uppercase(),
        operation_id,
        summary,
        parameters,
        responses,
        security,
        request_schema,
    })
}

/// Parse the declared parameter descriptors.
fn parse_parameters(op: &Yaml) -> Vec<Parameter> {
    op.get("parameters")
        .and_then(Yaml::as_sequence)
        .map(|seq| {
            seq.iter()
                .filter_map(|item| {
                    Some(Parameter {
                        name: item.get("name")?.as_str()?.to_string(),
                        location: item.get("in")?.as_str()?.to_string(),
                        required: item.get("required").and_then(Yaml::as_bool).unwrap_or(false),
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Parse declared response statuses. Non-numeric keys ("default") are skipped.
fn parse_responses(op: &Yaml) -> Vec<u16> {
    op.get("responses")
        .and_then(Yaml::as_mapping)
        .map(|map| {
            map.iter()
                .filter_map(|(k, _)| key_str(k)?.parse::<u16>().ok())
                .collect()
        })
        .unwrap_or_default()
}

/// Parse the operation's security requirement list.
///
/// Each list entry is a mapping from scheme name to requested scopes; an
/// entry with several keys contributes one requirement per key, in order.
fn parse_security_requirements(op: &Yaml) -> Vec<SecurityRequirement> {
    let mut out = Vec::new();

    let Some(entries) = op.get("security").and_then(Yaml::as_sequence) else {
        return out;
    };

    for entry in entries {
        let Some(map) = entry.as_mapping() else {
            continue;
        };
        for (scheme_key, scopes_value) in map {
            let Some(scheme) = key_str(scheme_key) else {
                continue;
            };
            let scopes = scopes_value
                .as_sequence()
                .map(|seq| {
                    seq.iter()
                        .filter_map(|s| s.as_str().map(|s| s.to_string()))
                        .collect()
                })
                .unwrap_or_default();
            out.push(SecurityRequirement { scheme, scopes });
        }
    }

    out
}

/// Extract and resolve the request body schema.
///
/// Swagger 2.0 declares it as a parameter with `in: body`; OpenAPI 3.x under
/// `requestBody.content.<media-type>.schema`. Any `$ref` is resolved against
/// the document so the schema is self-contained.
fn parse_request_schema(op: &Yaml, json_root: &Json) -> Result<Option<Json>, ContractError> {
    // Swagger 2.0 body parameter
    let body_param_schema = op.get("parameters").and_then(Yaml::as_sequence).and_then(|seq| {
        seq.iter()
            .find(|item| item.get("in").and_then(Yaml::as_str) == Some("body"))
            .and_then(|item| item.get("schema"))
    });

    // OpenAPI 3.x requestBody, preferring application/json
    let request_body_schema = op
        .get("requestBody")
        .and_then(|rb| rb.get("content"))
        .and_then(Yaml::as_mapping)
        .and_then(|content| {
            content
                .iter()
                .find(|(k, _)| key_str(k).as_deref() == Some("application/json"))
                .or_else(|| content.iter().next())
                .and_then(|(_, media)| media.get("schema"))
        });

    let Some(schema) = body_param_schema.or(request_body_schema) else {
        return Ok(None);
    };

    let schema_json = yaml_to_json(schema)?;
    resolve_schema(&schema_json, json_root, 0).map(Some)
}

/// Replace every `$ref` in a schema with its resolved target.
fn resolve_schema(value: &Json, root: &Json, depth: usize) -> Result<Json, ContractError> {
    if depth > MAX_REF_DEPTH {
        return Err(ContractError::UnresolvedRef(
            "reference nesting too deep (circular $ref?)".into(),
        ));
    }

    match value {
        Json::Object(obj) => {
            if let Some(ref_path) = obj.get("$ref").and_then(|v| v.as_str()) {
                let target = resolve_json_pointer(root, ref_path)
                    .ok_or_else(|| ContractError::UnresolvedRef(ref_path.to_string()))?;
                return resolve_schema(target, root, depth + 1);
            }
            let mut out = serde_json::Map::new();
            for (k, v) in obj {
                out.insert(k.clone(), resolve_schema(v, root, depth + 1)?);
            }
            Ok(Json::Object(out))
        }
        Json::Array(arr) => {
            let items = arr
                .iter()
                .map(|v| resolve_schema(v, root, depth + 1))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Json::Array(items))
        }
        other => Ok(other.clone()),
    }
}

/// Resolve a JSON reference (e.g. "#/definitions/Pet").
fn resolve_json_pointer<'a>(root: &'a Json, ref_path: &str) -> Option<&'a Json> {
    let path = ref_path.strip_prefix("#/")?;
    let mut current = root;

    for segment in path.split('/') {
        // JSON Pointer escaping
        let unescaped = segment.replace("~1", "/").replace("~0", "~");
        current = current.get(&unescaped)?;
    }

    Some(current)
}

/// Parse security schemes from `securityDefinitions` (Swagger 2.0) or
/// `components.securitySchemes` (OpenAPI 3.x), in declaration order.
fn parse_security_schemes(root: &Yaml) -> Result<Vec<SecurityScheme>, ContractError> {
    let definitions = root
        .get("securityDefinitions")
        .or_else(|| root.get("components").and_then(|c| c.get("securitySchemes")));

    let Some(map) = definitions.and_then(Yaml::as_mapping) else {
        return Ok(Vec::new());
    };

    let mut schemes = Vec::new();
    for (name_key, value) in map {
        let name = key_str(name_key)
            .ok_or_else(|| ContractError::Invalid("security scheme name must be a string".into()))?;
        let kind = parse_scheme_kind(&name, value)?;
        schemes.push(SecurityScheme { name, kind });
    }

    Ok(schemes)
}

fn parse_scheme_kind(name: &str, value: &Yaml) -> Result<SchemeKind, ContractError> {
    let scheme_type = value.get("type").and_then(Yaml::as_str).unwrap_or_default();

    match scheme_type {
        "oauth2" => Ok(SchemeKind::OAuth2 {
            flows: parse_oauth_flows(value),
        }),
        "apiKey" => {
            let param_name = value
                .get("name")
                .and_then(Yaml::as_str)
                .ok_or_else(|| {
                    ContractError::Invalid(format!("apiKey scheme '{}' is missing 'name'", name))
                })?
                .to_string();
            let location = value
                .get("in")
                .and_then(Yaml::as_str)
                .unwrap_or("header")
                .to_string();
            Ok(SchemeKind::ApiKey {
                param_name,
                location,
            })
        }
        _ => Ok(SchemeKind::Other),
    }
}

/// Collect a scheme's OAuth2 flows in declaration order.
///
/// Swagger 2.0 puts a single flow name in `flow` with `scopes` alongside;
/// OpenAPI 3.x nests named flow objects under `flows`.
fn parse_oauth_flows(value: &Yaml) -> Vec<OAuthFlow> {
    if let Some(flows) = value.get("flows").and_then(Yaml::as_mapping) {
        return flows
            .iter()
            .filter_map(|(flow_key, flow_value)| {
                Some(OAuthFlow {
                    name: key_str(flow_key)?,
                    scopes: parse_scope_map(flow_value.get("scopes")),
                })
            })
            .collect();
    }

    let name = value
        .get("flow")
        .and_then(Yaml::as_str)
        .unwrap_or("implicit")
        .to_string();
    vec![OAuthFlow {
        name,
        scopes: parse_scope_map(value.get("scopes")),
    }]
}

/// Scope map: scope name to description, in declaration order.
fn parse_scope_map(scopes: Option<&Yaml>) -> Vec<(String, String)> {
    scopes
        .and_then(Yaml::as_mapping)
        .map(|map| {
            map.iter()
                .filter_map(|(k, v)| {
                    let name = key_str(k)?;
                    let description = v.as_str().unwrap_or_default().to_string();
                    Some((name, description))
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Validate path template syntax: balanced braces, non-empty parameter
/// names, valid name characters, no duplicate parameter names.
fn validate_template(template: &str) -> Result<(), ContractError> {
    let mut seen_params: HashSet<String> = HashSet::new();
    let mut current_param = String::new();
    let mut in_param = false;

    for ch in template.chars() {
        match ch {
            '{' => {
                if in_param {
                    return Err(ContractError::Invalid(format!(
                        "path '{}': nested braces not allowed",
                        template
                    )));
                }
                in_param = true;
            }
            '}' => {
                if !in_param {
                    return Err(ContractError::Invalid(format!(
                        "path '{}': unmatched closing brace",
                        template
                    )));
                }
                in_param = false;

                if current_param.is_empty() {
                    return Err(ContractError::Invalid(format!(
                        "path '{}': empty parameter name",
                        template
                    )));
                }
                if !seen_params.insert(current_param.clone()) {
                    return Err(ContractError::Invalid(format!(
                        "path '{}': duplicate parameter '{}'",
                        template, current_param
                    )));
                }
                current_param.clear();
            }
            _ if in_param => {
                if !ch.is_alphanumeric() && ch != '_' {
                    return Err(ContractError::Invalid(format!(
                        "path '{}': invalid character '{}' in parameter name",
                        template, ch
                    )));
                }
                current_param.push(ch);
            }
            _ => {}
        }
    }

    if in_param {
        return Err(ContractError::Invalid(format!(
            "path '{}': unclosed brace",
            template
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const PETSTORE: &str = r##"
swagger: "2.0"
info:
  title: Petstore
  version: "1.0.0"
paths:
  /pet:
    post:
      summary: Add a new pet to the store
      operationId: addPet
      parameters:
        - in: body
          name: body
          required: true
          schema:
            $ref: "#/definitions/Pet"
      responses:
        "400":
          description: Invalid input
        "422":
          description: Validation exception
      security:
        - petstore_auth:
            - "write:pets"
            - "read:pets"
securityDefinitions:
  petstore_auth:
    type: oauth2
    flow: implicit
    scopes:
      "write:pets": modify pets in your account
      "read:pets": read your pets
  api_key:
    type: apiKey
    name: api_key
    in: header
definitions:
  Pet:
    type: object
    required:
      - name
      - photoUrls
    properties:
      id:
        type: integer
      name:
        type: string
      photoUrls:
        type: array
        items:
          type: string
      status:
        type: string
        enum: [available, pending, sold]
"##;

    #[test]
    fn parse_petstore_contract() {
        let contract = parse_contract(PETSTORE).unwrap();
        assert_eq!(contract.paths.len(), 1);

        let path = &contract.paths[0];
        assert_eq!(path.template, "/pet");
        assert_eq!(path.operations.len(), 1);

        let op = &path.operations[0];
        assert_eq!(op.method, "POST");
        assert_eq!(op.operation_id, "addPet");
        assert_eq!(op.summary.as_deref(), Some("Add a new pet to the store"));
        assert_eq!(op.responses, vec![400, 422]);
    }

    #[test]
    fn parse_security_requirements_in_order() {
        let contract = parse_contract(PETSTORE).unwrap();
        let op = contract.operation("/pet", "POST").unwrap();

        assert_eq!(op.security.len(), 1);
        assert_eq!(op.security[0].scheme, "petstore_auth");
        assert_eq!(op.security[0].scopes, vec!["write:pets", "read:pets"]);
    }

    #[test]
    fn parse_schemes_preserves_declaration_order() {
        let contract = parse_contract(PETSTORE).unwrap();
        assert_eq!(contract.security_schemes.len(), 2);
        assert_eq!(contract.security_schemes[0].name, "petstore_auth");
        assert_eq!(contract.security_schemes[1].name, "api_key");

        match &contract.security_schemes[0].kind {
            SchemeKind::OAuth2 { flows } => {
                assert_eq!(flows.len(), 1);
                assert_eq!(flows[0].name, "implicit");
                assert_eq!(flows[0].scopes[0].0, "write:pets");
                assert_eq!(flows[0].scopes[1].0, "read:pets");
            }
            other => panic!("expected oauth2 scheme, got {:?}", other),
        }

        match &contract.security_schemes[1].kind {
            SchemeKind::ApiKey {
                param_name,
                location,
            } => {
                assert_eq!(param_name, "api_key");
                assert_eq!(location, "header");
            }
            other => panic!("expected apiKey scheme, got {:?}", other),
        }
    }

    #[test]
    fn body_schema_ref_is_resolved() {
        let contract = parse_contract(PETSTORE).unwrap();
        let op = contract.operation("/pet", "POST").unwrap();

        let schema = op.request_schema.as_ref().unwrap();
        assert_eq!(schema.get("type").and_then(|v| v.as_str()), Some("object"));

        let required = schema.get("required").and_then(|v| v.as_array()).unwrap();
        assert_eq!(required.len(), 2);

        let props = schema.get("properties").and_then(|v| v.as_object()).unwrap();
        assert!(props.contains_key("photoUrls"));
    }

    #[test]
    fn parse_openapi3_security_schemes() {
        let yaml = r#"
openapi: "3.0.1"
info:
  title: Test API
  version: "1.0.0"
paths:
  /order:
    post:
      operationId: placeOrder
      requestBody:
        content:
          application/json:
            schema:
              type: object
              required: [sku]
              properties:
                sku:
                  type: string
      responses:
        "201":
          description: Created
components:
  securitySchemes:
    shop_auth:
      type: oauth2
      flows:
        implicit:
          scopes:
            "write:orders": place orders
        clientCredentials:
          scopes:
            "read:orders": read orders
            "write:orders": place orders
"#;
        let contract = parse_contract(yaml).unwrap();

        let op = contract.operation("/order", "POST").unwrap();
        assert_eq!(op.responses, vec![201]);
        assert!(op.request_schema.is_some());

        match &contract.security_schemes[0].kind {
            SchemeKind::OAuth2 { flows } => {
                assert_eq!(flows.len(), 2);
                assert_eq!(flows[0].name, "implicit");
                assert_eq!(flows[1].name, "clientCredentials");
                assert_eq!(flows[1].scopes.len(), 2);
            }
            other => panic!("expected oauth2 scheme, got {:?}", other),
        }
    }

    #[test]
    fn unquoted_numeric_response_keys() {
        let yaml = r#"
swagger: "2.0"
paths:
  /thing:
    get:
      operationId: getThing
      responses:
        200:
          description: OK
        404:
          description: Missing
"#;
        let contract = parse_contract(yaml).unwrap();
        let op = contract.operation("/thing", "GET").unwrap();
        assert_eq!(op.responses, vec![200, 404]);
    }

    #[test]
    fn missing_operation_id_is_invalid() {
        let yaml = r#"
swagger: "2.0"
paths:
  /thing:
    get:
      responses:
        "200":
          description: OK
"#;
        let result = parse_contract(yaml);
        assert!(matches!(result, Err(ContractError::Invalid(_))));
    }

    #[test]
    fn unresolved_ref_is_an_error() {
        let yaml = r##"
swagger: "2.0"
paths:
  /thing:
    post:
      operationId: addThing
      parameters:
        - in: body
          name: body
          schema:
            $ref: "#/definitions/Missing"
      responses:
        "200":
          description: OK
"##;
        let result = parse_contract(yaml);
        assert!(matches!(result, Err(ContractError::UnresolvedRef(_))));
    }

    #[test]
    fn malformed_input_is_a_parse_error() {
        assert!(matches!(
            parse_contract("{ not json or yaml ["),
            Err(ContractError::Parse(_))
        ));
        assert!(matches!(
            parse_contract("just a string"),
            Err(ContractError::Parse(_))
        ));
    }

    #[test]
    fn invalid_path_templates_rejected() {
        for path in ["/pet/{id", "/pet/{}", "/pet/{id}/photo/{id}", "/pet/{{id}}"] {
            let yaml = format!(
                "swagger: \"2.0\"\npaths:\n  {}:\n    get:\n      operationId: op\n      responses:\n        \"200\":\n          description: OK\n",
                path
            );
            assert!(
                matches!(parse_contract(&yaml), Err(ContractError::Invalid(_))),
                "expected '{}' to be rejected",
                path
            );
        }
    }

    #[test]
    fn non_method_path_keys_are_skipped() {
        let yaml = r#"
swagger: "2.0"
paths:
  /thing:
    x-internal: true
    get:
      operationId: getThing
      responses:
        "200":
          description: OK
"#;
        let contract = parse_contract(yaml).unwrap();
        assert_eq!(contract.paths[0].operations.len(), 1);
    }
}
