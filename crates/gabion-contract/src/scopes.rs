//! OAuth2 scope extraction.
//!
//! Walks oauth2 security schemes and their flows and collects scope names
//! in declaration order, without duplicates. Schemes of other types, schemes
//! without flows, and flows without scopes contribute nothing.

use std::collections::HashSet;

use crate::model::{Contract, Operation, SchemeKind, SecurityScheme};

/// Collect the ordered, duplicate-free scope names across the given schemes.
pub fn oauth_scopes<'a>(schemes: impl IntoIterator<Item = &'a SecurityScheme>) -> Vec<String> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut out = Vec::new();

    for scheme in schemes {
        let SchemeKind::OAuth2 { flows } = &scheme.kind else {
            continue;
        };
        for flow in flows {
            for (scope, _description) in &flow.scopes {
                if seen.insert(scope.as_str()) {
                    out.push(scope.clone());
                }
            }
        }
    }

    out
}

/// Collect scopes for the schemes an operation's `security` list references,
/// in requirement declaration order. Unknown scheme names are skipped.
pub fn operation_scopes(contract: &Contract, operation: &Operation) -> Vec<String> {
    let referenced = operation
        .security
        .iter()
        .filter_map(|req| contract.scheme(&req.scheme));
    oauth_scopes(referenced)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::OAuthFlow;

    fn oauth2_scheme(name: &str, flows: Vec<OAuthFlow>) -> SecurityScheme {
        SecurityScheme {
            name: name.to_string(),
            kind: SchemeKind::OAuth2 { flows },
        }
    }

    fn flow(name: &str, scopes: &[&str]) -> OAuthFlow {
        OAuthFlow {
            name: name.to_string(),
            scopes: scopes.iter().map(|s| (s.to_string(), String::new())).collect(),
        }
    }

    #[test]
    fn scopes_keep_declaration_order() {
        let schemes = vec![oauth2_scheme(
            "petstore_auth",
            vec![flow("implicit", &["write:pets", "read:pets"])],
        )];
        assert_eq!(oauth_scopes(&schemes), vec!["write:pets", "read:pets"]);
    }

    #[test]
    fn duplicate_scopes_reported_once() {
        let schemes = vec![
            oauth2_scheme(
                "a",
                vec![
                    flow("implicit", &["write:pets", "read:pets"]),
                    flow("password", &["read:pets", "admin:pets"]),
                ],
            ),
            oauth2_scheme("b", vec![flow("implicit", &["write:pets"])]),
        ];
        assert_eq!(
            oauth_scopes(&schemes),
            vec!["write:pets", "read:pets", "admin:pets"]
        );
    }

    #[test]
    fn non_oauth_schemes_contribute_nothing() {
        let schemes = vec![
            SecurityScheme {
                name: "api_key".to_string(),
                kind: SchemeKind::ApiKey {
                    param_name: "api_key".to_string(),
                    location: "header".to_string(),
                },
            },
            SecurityScheme {
                name: "basic".to_string(),
                kind: SchemeKind::Other,
            },
        ];
        assert!(oauth_scopes(&schemes).is_empty());
    }

    #[test]
    fn empty_flows_yield_empty_scopes() {
        let schemes = vec![oauth2_scheme("auth", vec![]), oauth2_scheme("auth2", vec![flow("implicit", &[])])];
        assert!(oauth_scopes(&schemes).is_empty());
    }
}
