//! A small owned DOM used by the sanitizer.
//!
//! `scraper` trees are read-only; the sanitizer needs to unwrap, replace and
//! delete nodes, so fragments are converted into this representation,
//! rewritten, and serialized back to HTML.

use scraper::{ElementRef, Html};

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub name: String,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<Node>,
}

const VOID_TAGS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

impl Element {
    pub fn new(name: &str, children: Vec<Node>) -> Self {
        Self {
            name: name.to_string(),
            attrs: Vec::new(),
            children,
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// `class` and `id` joined and lower-cased, for hint matching
    pub fn class_and_id(&self) -> String {
        let class = self.attr("class").unwrap_or_default();
        let id = self.attr("id").unwrap_or_default();
        format!("{class} {id}").to_lowercase()
    }

    /// Concatenated text of all descendants
    pub fn text(&self) -> String {
        let mut out = String::new();
        collect_text(&self.children, &mut out);
        out
    }

    /// Number of non-whitespace characters in the visible text
    pub fn text_len(&self) -> usize {
        self.text().chars().filter(|c| !c.is_whitespace()).count()
    }

    pub fn has_visible_text(&self) -> bool {
        self.text().chars().any(|c| !c.is_whitespace())
    }

    /// Check if any descendant element has one of the given tag names
    pub fn has_descendant(&self, names: &[&str]) -> bool {
        self.children.iter().any(|child| match child {
            Node::Element(el) => names.contains(&el.name.as_str()) || el.has_descendant(names),
            Node::Text(_) => false,
        })
    }
}

pub fn collect_text(nodes: &[Node], out: &mut String) {
    for node in nodes {
        match node {
            Node::Text(text) => out.push_str(text),
            Node::Element(el) => collect_text(&el.children, out),
        }
    }
}

/// Parse an HTML fragment into owned nodes, dropping comments and every
/// element for which `skip` returns true (together with its subtree).
pub fn parse_fragment_filtered(html: &str, skip: &dyn Fn(ElementRef<'_>) -> bool) -> Vec<Node> {
    let fragment = Html::parse_fragment(html);
    convert_children(fragment.root_element(), skip)
}

/// Parse an HTML fragment into owned nodes
pub fn parse_fragment(html: &str) -> Vec<Node> {
    parse_fragment_filtered(html, &|_: ElementRef<'_>| false)
}

fn convert_children(parent: ElementRef<'_>, skip: &dyn Fn(ElementRef<'_>) -> bool) -> Vec<Node> {
    let mut nodes = Vec::new();
    for child in parent.children() {
        if let Some(child_el) = ElementRef::wrap(child) {
            if skip(child_el) {
                continue;
            }
            let value = child_el.value();
            nodes.push(Node::Element(Element {
                name: value.name().to_string(),
                attrs: value
                    .attrs()
                    .map(|(key, val)| (key.to_string(), val.to_string()))
                    .collect(),
                children: convert_children(child_el, skip),
            }));
        } else if let scraper::Node::Text(text) = child.value() {
            nodes.push(Node::Text(String::from(&**text)));
        }
    }
    nodes
}

/// Serialize nodes back to HTML
pub fn serialize(nodes: &[Node]) -> String {
    let mut out = String::new();
    for node in nodes {
        write_node(node, &mut out);
    }
    out
}

fn write_node(node: &Node, out: &mut String) {
    match node {
        Node::Text(text) => escape_into(text, false, out),
        Node::Element(el) => {
            out.push('<');
            out.push_str(&el.name);
            for (key, value) in &el.attrs {
                out.push(' ');
                out.push_str(key);
                out.push_str("=\"");
                escape_into(value, true, out);
                out.push('"');
            }
            out.push('>');
            if VOID_TAGS.contains(&el.name.as_str()) {
                return;
            }
            for child in &el.children {
                write_node(child, out);
            }
            out.push_str("</");
            out.push_str(&el.name);
            out.push('>');
        }
    }
}

/// Escape text for use as HTML character data
pub fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    escape_into(text, false, &mut out);
    out
}

fn escape_into(text: &str, attribute: bool, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' if !attribute => out.push_str("&lt;"),
            '>' if !attribute => out.push_str("&gt;"),
            '"' if attribute => out.push_str("&quot;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            _ => out.push(c),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_serialize_fragment() {
        let html = r#"<p class="x">Fish &amp; <b>chips</b><br></p><!-- note -->"#;
        let nodes = parse_fragment(html);
        assert_eq!(serialize(&nodes), r#"<p class="x">Fish &amp; <b>chips</b><br></p>"#);
    }

    #[test]
    fn test_filtered_parse_drops_subtree() {
        let html = "<div><nav><a href=\"/\">Home</a></nav><p>Body</p></div>";
        let nodes = parse_fragment_filtered(html, &|el: ElementRef<'_>| el.value().name() == "nav");
        assert_eq!(serialize(&nodes), "<div><p>Body</p></div>");
    }

    #[test]
    fn test_text_len_ignores_whitespace() {
        let nodes = parse_fragment("<div> a b \n c </div>");
        let Node::Element(div) = &nodes[0] else {
            panic!("expected element");
        };
        assert_eq!(div.text_len(), 3);
        assert!(div.has_visible_text());
    }
}
