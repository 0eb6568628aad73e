//! Stage one: drop layout noise and keep the densest content block.

use super::dom::{Element, Node};

/// Elements removed with their whole subtree
pub const NOISE_TAGS: &[&str] = &[
    "script", "style", "link", "noscript", "form", "header", "nav", "footer", "iframe", "svg",
    "template", "button", "select", "input", "textarea",
];

/// Elements that can be collapsed into their child and compete as content blocks
const STRUCTURAL_TAGS: &[&str] = &["div", "section", "article", "main", "span"];

/// Elements that may be selected as the densest block
const CANDIDATE_TAGS: &[&str] = &["div", "section", "article", "main", "td"];

/// Replace each wrapper whose only content is a single structural child with
/// identical text by that child. Returns true when anything changed.
pub fn collapse_once(nodes: &mut [Node]) -> bool {
    let mut changed = false;
    for node in nodes.iter_mut() {
        let Node::Element(el) = node else {
            continue;
        };
        if let Some(child) = sole_structural_child(el) {
            *node = Node::Element(child);
            changed = true;
        } else {
            changed |= collapse_once(&mut el.children);
        }
    }
    changed
}

fn sole_structural_child(el: &Element) -> Option<Element> {
    if !STRUCTURAL_TAGS.contains(&el.name.as_str()) {
        return None;
    }
    let mut only: Option<&Element> = None;
    for child in &el.children {
        match child {
            Node::Text(text) if text.trim().is_empty() => {}
            Node::Element(child_el) if only.is_none() => only = Some(child_el),
            _ => return None,
        }
    }
    let child = only?;
    if !STRUCTURAL_TAGS.contains(&child.name.as_str()) {
        return None;
    }
    if child.text().trim() != el.text().trim() {
        return None;
    }
    Some(child.clone())
}

/// Collapse redundant wrappers until a fixed point, capped at `max_iterations`
pub fn collapse_wrappers(nodes: &mut [Node], max_iterations: usize) -> usize {
    let mut iterations = 0;
    while iterations < max_iterations && collapse_once(nodes) {
        iterations += 1;
    }
    if iterations == max_iterations {
        ::log::debug!("Wrapper collapsing stopped at the {} iteration cap", max_iterations);
    }
    iterations
}

/// Find the candidate block with the most visible text.
///
/// Blocks whose class/id contains one of `excluded_hints` are skipped along
/// with everything inside them. Ties go to the block found first in document
/// order.
pub fn densest_block<'a>(nodes: &'a [Node], excluded_hints: &[String]) -> Option<&'a Element> {
    let mut best: Option<(&Element, usize)> = None;
    visit_candidates(nodes, excluded_hints, &mut best);
    best.map(|(el, _)| el)
}

fn visit_candidates<'a>(
    nodes: &'a [Node],
    excluded_hints: &[String],
    best: &mut Option<(&'a Element, usize)>,
) {
    for node in nodes {
        let Node::Element(el) = node else {
            continue;
        };
        if is_excluded(el, excluded_hints) {
            continue;
        }
        if CANDIDATE_TAGS.contains(&el.name.as_str()) {
            let len = el.text_len();
            if best.is_none_or(|(_, best_len)| len > best_len) {
                *best = Some((el, len));
            }
        }
        visit_candidates(&el.children, excluded_hints, best);
    }
}

fn is_excluded(el: &Element, excluded_hints: &[String]) -> bool {
    if el.attr("class").is_none() && el.attr("id").is_none() {
        return false;
    }
    let hints = el.class_and_id();
    excluded_hints
        .iter()
        .any(|hint| hints.split(|c: char| !c.is_alphanumeric()).any(|word| word.starts_with(hint.as_str())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sanitize::dom::{parse_fragment, serialize};

    fn hints() -> Vec<String> {
        vec!["nav".to_string(), "filter".to_string(), "pagination".to_string()]
    }

    #[test]
    fn test_collapse_nested_wrappers() {
        let mut nodes = parse_fragment("<div><div> <section><p>Text</p></section> </div></div>");
        let iterations = collapse_wrappers(&mut nodes, 10);
        assert_eq!(iterations, 2);
        assert_eq!(serialize(&nodes), "<section><p>Text</p></section>");
    }

    #[test]
    fn test_collapse_keeps_wrappers_with_extra_content() {
        let mut nodes = parse_fragment("<div>Intro<div><p>Body</p></div></div>");
        assert_eq!(collapse_wrappers(&mut nodes, 10), 0);
        assert_eq!(serialize(&nodes), "<div>Intro<div><p>Body</p></div></div>");
    }

    #[test]
    fn test_collapse_respects_iteration_cap() {
        let mut nodes = parse_fragment("<div><div><div><p>x</p></div></div></div>");
        assert_eq!(collapse_wrappers(&mut nodes, 0), 0);
        assert_eq!(
            serialize(&nodes),
            "<div><div><div><p>x</p></div></div></div>"
        );
    }

    #[test]
    fn test_densest_block_skips_navigation_hints() {
        let nodes = parse_fragment(
            r#"<div class="filter-panel">Lots and lots and lots of filter words here</div>
               <div class="offer">Short offer text</div>"#,
        );
        let best = densest_block(&nodes, &hints()).unwrap();
        assert_eq!(best.attr("class"), Some("offer"));
    }

    #[test]
    fn test_densest_block_prefers_longest_text() {
        let nodes = parse_fragment(
            "<section><p>tiny</p></section><article><p>a much longer body of text</p></article>",
        );
        let best = densest_block(&nodes, &hints()).unwrap();
        assert_eq!(best.name, "article");
    }

    #[test]
    fn test_no_candidates() {
        let nodes = parse_fragment("<p>Only a paragraph</p>");
        assert!(densest_block(&nodes, &hints()).is_none());
    }
}
