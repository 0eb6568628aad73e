use scraper::{ElementRef, Html, Node};

/// Elements whose boundaries separate text into lines
const BLOCK_TAGS: &[&str] = &[
    "address", "article", "aside", "blockquote", "br", "dd", "div", "dl", "dt", "fieldset",
    "figcaption", "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr",
    "li", "main", "nav", "ol", "p", "pre", "section", "table", "td", "th", "tr", "ul",
];

/// Elements whose content is never visible text
const HIDDEN_TAGS: &[&str] = &["script", "style", "noscript", "template", "head", "title"];

/// Collects the visible text below `element`, one line per block boundary.
///
/// The output is raw: runs of whitespace inside a line are untouched and
/// empty lines are kept. Use [`normalize_lines`] or [`normalize_whitespace`]
/// on the result.
pub fn visible_text(element: ElementRef<'_>) -> String {
    let mut out = String::new();
    push_text(element, &mut out);
    out
}

fn push_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(el) => {
                let name = el.name();
                if HIDDEN_TAGS.contains(&name) {
                    continue;
                }
                let Some(child_el) = ElementRef::wrap(child) else {
                    continue;
                };
                let block = BLOCK_TAGS.contains(&name);
                if block {
                    out.push('\n');
                }
                push_text(child_el, out);
                if block {
                    out.push('\n');
                }
            }
            _ => {}
        }
    }
}

/// Tag-stripped, whitespace-normalized text of an HTML fragment
pub fn html_to_text(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    normalize_whitespace(&visible_text(fragment.root_element()))
}

/// Collapses every run of whitespace into a single space and trims the ends
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Normalizes whitespace within each line and drops empty lines
pub fn normalize_lines(text: &str) -> String {
    text.lines()
        .map(normalize_whitespace)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Decodes HTML character references (`&amp;`, `&eacute;`, ...) in plain text
pub fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    let fragment = Html::parse_fragment(text);
    fragment.root_element().text().collect()
}

/// Upper-cases the first letter of each word and lower-cases the rest
pub fn title_case(words: &[&str]) -> String {
    words
        .iter()
        .filter(|w| !w.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

/// Trimmed, whitespace-normalized text, or `None` when nothing is left
pub fn clean(text: &str) -> Option<String> {
    let cleaned = normalize_whitespace(text);
    (!cleaned.is_empty()).then_some(cleaned)
}
