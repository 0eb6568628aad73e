//! Stage two: reduce a tree to the allowed tag vocabulary.

use super::dom::{Element, Node};

/// Tags that survive simplification
pub const ALLOWED_TAGS: &[&str] = &[
    "p", "br", "ul", "ol", "li", "b", "strong", "i", "em", "u", "h1", "h2", "h3", "h4", "h5", "h6",
    "a",
];

/// Containers replaced by a paragraph when they only hold inline content
const BLOCK_CONTAINERS: &[&str] = &[
    "div", "section", "article", "main", "aside", "td", "th", "dd", "dt", "blockquote", "figure",
    "figcaption", "center", "address", "fieldset", "pre",
];

/// Allowed tags that already give text its own block
const BLOCK_ALLOWED: &[&str] = &["p", "ul", "ol", "li", "h1", "h2", "h3", "h4", "h5", "h6"];

/// Tags removed when they are left without visible text
const DROP_WHEN_EMPTY: &[&str] = &["p", "li", "h1", "h2", "h3", "h4", "h5", "h6"];

/// Unwrap disallowed elements, strip attributes, and drop empty paragraphs,
/// list items and headings.
pub fn simplify_nodes(nodes: Vec<Node>) -> Vec<Node> {
    let mut out = Vec::with_capacity(nodes.len());
    for node in nodes {
        match node {
            Node::Text(text) => out.push(Node::Text(text)),
            Node::Element(el) => simplify_element(el, &mut out),
        }
    }
    out
}

fn simplify_element(el: Element, out: &mut Vec<Node>) {
    let Element {
        name,
        attrs,
        children,
    } = el;
    let children = simplify_nodes(children);

    if ALLOWED_TAGS.contains(&name.as_str()) {
        let attrs = if name == "a" {
            attrs.into_iter().filter(|(key, _)| key == "href").collect()
        } else {
            Vec::new()
        };
        let simplified = Element {
            name,
            attrs,
            children,
        };
        if DROP_WHEN_EMPTY.contains(&simplified.name.as_str()) && !simplified.has_visible_text() {
            return;
        }
        out.push(Node::Element(simplified));
        return;
    }

    let wrapper = Element::new("p", children);
    if BLOCK_CONTAINERS.contains(&name.as_str())
        && !wrapper.has_descendant(BLOCK_ALLOWED)
        && wrapper.has_visible_text()
    {
        out.push(Node::Element(trim_paragraph(wrapper)));
    } else {
        out.extend(wrapper.children);
    }
}

/// Drop leading and trailing whitespace-only text and line breaks
fn trim_paragraph(mut p: Element) -> Element {
    let is_blank = |node: &Node| match node {
        Node::Text(text) => text.trim().is_empty(),
        Node::Element(el) => el.name == "br",
    };
    while p.children.first().is_some_and(is_blank) {
        p.children.remove(0);
    }
    while p.children.last().is_some_and(is_blank) {
        p.children.pop();
    }
    p
}
