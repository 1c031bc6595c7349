//! Element-tree to XML text rendering.
//!
//! Pure functions over [`Element`] trees: no I/O, no mutation, and
//! byte-identical output for identical input. Attributes and children are
//! rendered in stored order with 2-space indentation.

use std::fmt::Write;

use crate::policy::{Element, Node};

const XML_DECLARATION: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>";
const INDENT: &str = "  ";

/// Render a complete document: declaration line plus the element tree.
pub fn render_document(root: &Element) -> String {
    let mut out = String::new();
    out.push_str(XML_DECLARATION);
    out.push('\n');
    render_element(&mut out, root, 0);
    out
}

fn render_element(out: &mut String, element: &Element, depth: usize) {
    for _ in 0..depth {
        out.push_str(INDENT);
    }
    out.push('<');
    out.push_str(&element.name);
    for (name, value) in &element.attributes {
        // A write to String cannot fail.
        let _ = write!(out, " {}=\"{}\"", name, escape_attribute(value));
    }

    if element.children.is_empty() {
        out.push_str("/>\n");
        return;
    }

    // Text-only elements render on one line; anything with child elements
    // gets one line per child.
    let only_text = element
        .children
        .iter()
        .all(|node| matches!(node, Node::Text(_)));

    if only_text {
        out.push('>');
        for node in &element.children {
            if let Node::Text(text) = node {
                out.push_str(&escape_text(text));
            }
        }
        let _ = writeln!(out, "</{}>", element.name);
        return;
    }

    out.push_str(">\n");
    for node in &element.children {
        match node {
            Node::Element(child) => render_element(out, child, depth + 1),
            Node::Text(text) => {
                for _ in 0..=depth {
                    out.push_str(INDENT);
                }
                out.push_str(&escape_text(text));
                out.push('\n');
            }
        }
    }
    for _ in 0..depth {
        out.push_str(INDENT);
    }
    let _ = writeln!(out, "</{}>", element.name);
}

fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
    out
}

fn escape_attribute(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_declaration_and_empty_element() {
        let doc = render_document(&Element::new("Policies"));
        assert_eq!(doc, "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<Policies/>\n");
    }

    #[test]
    fn text_only_elements_render_inline() {
        let root = Element::new("Step").child(Element::new("Name").text("Verify-API-Key"));
        let doc = render_document(&root);
        assert_eq!(
            doc,
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
             <Step>\n  <Name>Verify-API-Key</Name>\n</Step>\n"
        );
    }

    #[test]
    fn nesting_indents_two_spaces_per_level() {
        let root = Element::new("A").child(Element::new("B").child(Element::new("C").text("x")));
        let doc = render_document(&root);
        assert!(doc.contains("\n  <B>\n    <C>x</C>\n  </B>\n"));
    }

    #[test]
    fn attributes_keep_stored_order() {
        let root = Element::new("RaiseFault")
            .attr("async", "false")
            .attr("name", "RF");
        let doc = render_document(&root);
        assert!(doc.contains("<RaiseFault async=\"false\" name=\"RF\"/>"));
    }

    #[test]
    fn text_and_attributes_are_escaped() {
        let root = Element::new("Condition")
            .attr("note", "a<b \"quoted\"")
            .text("(x != \"\") and (y < 2) & more");
        let doc = render_document(&root);
        assert!(doc.contains("note=\"a&lt;b &quot;quoted&quot;\""));
        assert!(doc.contains("(x != \"\") and (y &lt; 2) &amp; more"));
    }

    #[test]
    fn rendering_is_deterministic() {
        let root = Element::new("Flow")
            .attr("name", "addPet")
            .child(Element::new("Description").text("Add a pet"))
            .child(Element::new("Request").child(
                Element::new("Step").child(Element::new("Name").text("MethodCheck-addPet")),
            ));
        assert_eq!(render_document(&root), render_document(&root));
    }
}
