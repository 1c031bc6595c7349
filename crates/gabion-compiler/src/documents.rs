//! Document assembly.
//!
//! Turns the built [`OperationPolicies`] plus routing constants into the
//! three XML documents a gateway deployment expects: the policy bundle, the
//! proxy endpoint, and the target endpoint.

use crate::policy::{Element, Flow, OperationPolicies, RoutingInfo};
use crate::xml::render_document;

/// The three serialized documents for one compiled operation.
#[derive(Debug, Clone)]
pub struct PolicyDocuments {
    /// `<Policies>` wrapping every built artifact, in document order.
    pub policies: String,
    /// `<ProxyEndpoint>` with PreFlow, Flows, PostFlow and routing.
    pub proxy_endpoints: String,
    /// `<TargetEndpoint>` with the backend connection.
    pub target_endpoints: String,
}

/// Serialize the built policies into the three documents.
pub fn serialize_documents(policies: &OperationPolicies, routing: &RoutingInfo) -> PolicyDocuments {
    PolicyDocuments {
        policies: render_document(&policies_root(policies)),
        proxy_endpoints: render_document(&proxy_endpoint_root(policies, routing)),
        target_endpoints: render_document(&target_endpoint_root(routing)),
    }
}

fn policies_root(policies: &OperationPolicies) -> Element {
    let mut root = Element::new("Policies");
    for artifact in &policies.artifacts {
        root = root.child(artifact.element.clone());
    }
    root
}

fn proxy_endpoint_root(policies: &OperationPolicies, routing: &RoutingInfo) -> Element {
    let mut preflow_request = Element::new("Request");
    for step in &policies.preflow_steps {
        preflow_request = preflow_request.child(step_element(step));
    }

    Element::new("ProxyEndpoint")
        .attr("name", "default")
        .child(
            Element::new("PreFlow")
                .attr("name", "PreFlow")
                .child(preflow_request)
                .child(Element::new("Response")),
        )
        .child(Element::new("Flows").child(flow_element(&policies.flow)))
        .child(
            Element::new("PostFlow")
                .attr("name", "PostFlow")
                .child(Element::new("Request"))
                .child(Element::new("Response")),
        )
        .child(
            Element::new("HTTPProxyConnection")
                .child(Element::new("BasePath").text(&routing.base_path))
                .child(Element::new("VirtualHost").text(&routing.virtual_host)),
        )
        .child(
            Element::new("RouteRule")
                .attr("name", "default")
                .child(Element::new("TargetEndpoint").text("default")),
        )
}

fn flow_element(flow: &Flow) -> Element {
    let mut request = Element::new("Request");
    for step in &flow.request_steps {
        request = request.child(step_element(step));
    }
    let mut response = Element::new("Response");
    for step in &flow.response_steps {
        response = response.child(step_element(step));
    }

    let mut element = Element::new("Flow").attr("name", &flow.name);
    if let Some(description) = &flow.description {
        element = element.child(Element::new("Description").text(description));
    }
    element
        .child(request)
        .child(response)
        .child(Element::new("Condition").text(&flow.condition))
}

fn step_element(name: &str) -> Element {
    Element::new("Step").child(Element::new("Name").text(name))
}

fn target_endpoint_root(routing: &RoutingInfo) -> Element {
    Element::new("TargetEndpoint")
        .attr("name", "default")
        .child(
            Element::new("PreFlow")
                .attr("name", "PreFlow")
                .child(Element::new("Request"))
                .child(Element::new("Response")),
        )
        .child(
            Element::new("HTTPTargetConnection")
                .child(Element::new("URL").text(&routing.target_url)),
        )
}
