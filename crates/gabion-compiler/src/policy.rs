//! Policy artifact model.
//!
//! Artifacts are immutable element trees built once by the builder and
//! consumed only by the serializer. Keeping the tree explicit (instead of
//! concatenating text) lets tests assert structure before rendering.

use serde::Serialize;

/// A nested element with attributes and children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    /// Attributes in declaration order.
    pub attributes: Vec<(String, String)>,
    /// Child nodes in declaration order.
    pub children: Vec<Node>,
}

/// A child of an element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((name.into(), value.into()));
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.children.push(Node::Text(text.into()));
        self
    }

    pub fn child(mut self, element: Element) -> Self {
        self.children.push(Node::Element(element));
        self
    }

    /// Find the first direct child element with the given name.
    pub fn find(&self, name: &str) -> Option<&Element> {
        self.children.iter().find_map(|node| match node {
            Node::Element(el) if el.name == name => Some(el),
            _ => None,
        })
    }

    /// The element's concatenated direct text content.
    pub fn text_content(&self) -> String {
        self.children
            .iter()
            .filter_map(|node| match node {
                Node::Text(t) => Some(t.as_str()),
                _ => None,
            })
            .collect()
    }
}

/// The fixed artifact kinds the builder produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PolicyKind {
    AuthCheck,
    ScopeCheck,
    VariableAssignment,
    MethodGuard,
    SchemaValidation,
    VariableExtraction,
    FaultOnMissingParameters,
    FaultOnInvalidContentType,
}

/// A named, typed unit of generated behavior. Never mutated after creation.
#[derive(Debug, Clone)]
pub struct PolicyArtifact {
    /// Unique name within the generated Policies document.
    pub name: String,
    pub kind: PolicyKind,
    /// The rendered element tree.
    pub element: Element,
}

/// An ordered sequence of policy references executed for a matched operation.
#[derive(Debug, Clone)]
pub struct Flow {
    /// Flow name (the operationId).
    pub name: String,
    pub description: Option<String>,
    /// Condition gating the flow (path suffix + verb).
    pub condition: String,
    /// Request-phase step names, in execution order.
    pub request_steps: Vec<String>,
    /// Response-phase step names (currently always empty).
    pub response_steps: Vec<String>,
}

/// Everything built for one operation: the shared pre-processing steps, the
/// per-operation artifacts, and the flow wiring that references them.
#[derive(Debug, Clone)]
pub struct OperationPolicies {
    pub operation_id: String,
    /// All built artifacts, in document order.
    pub artifacts: Vec<PolicyArtifact>,
    /// Names of artifacts applied before any flow is selected.
    pub preflow_steps: Vec<String>,
    pub flow: Flow,
}

impl OperationPolicies {
    /// Look up a built artifact by name.
    pub fn artifact(&self, name: &str) -> Option<&PolicyArtifact> {
        self.artifacts.iter().find(|a| a.name == name)
    }
}

/// Endpoint constants for the routing and target documents.
#[derive(Debug, Clone)]
pub struct RoutingInfo {
    /// Base path the proxy listens on (e.g. "/v2").
    pub base_path: String,
    /// Virtual host name.
    pub virtual_host: String,
    /// Backend target URL.
    pub target_url: String,
}

impl RoutingInfo {
    pub fn new(base_path: impl Into<String>, target_url: impl Into<String>) -> Self {
        Self {
            base_path: base_path.into(),
            virtual_host: "default".to_string(),
            target_url: target_url.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn element_builder_orders_children() {
        let el = Element::new("Parent")
            .attr("name", "p")
            .child(Element::new("First"))
            .child(Element::new("Second").text("two"));

        assert_eq!(el.attributes, vec![("name".to_string(), "p".to_string())]);
        assert!(el.find("First").is_some());
        assert_eq!(el.find("Second").unwrap().text_content(), "two");
        assert!(el.find("Third").is_none());
    }
}
