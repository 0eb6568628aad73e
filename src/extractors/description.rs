//! Raw description HTML, before sanitizing.

use scraper::{ElementRef, Selector};
use std::collections::HashSet;
use std::sync::LazyLock;

use super::{ExtractionRules, Page, element_text};
use crate::sanitize::{Sanitizer, dom};
use crate::text;

static HEADINGS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("h1, h2, h3, h4, h5, h6").expect("valid selector"));

/// Content under the configured section headings, concatenated in document
/// order. Each section runs from its heading up to the next heading of the
/// same or a higher level among its siblings.
pub fn from_sections(page: &Page<'_>, rules: &ExtractionRules) -> Option<String> {
    let mut included = HashSet::new();
    let mut html = String::new();
    let mut body_len = 0;

    for heading in page.document.select(&HEADINGS) {
        if included.contains(&heading.id()) || heading.ancestors().any(|a| included.contains(&a.id())) {
            continue;
        }
        if !is_description_heading(&element_text(heading), &rules.description_headings) {
            continue;
        }

        let level = heading_level(heading.value().name()).unwrap_or(6);
        included.insert(heading.id());
        html.push_str(&heading.html());

        for sibling in heading.next_siblings() {
            if let Some(el) = ElementRef::wrap(sibling) {
                if heading_level(el.value().name()).is_some_and(|l| l <= level) {
                    break;
                }
                body_len += element_text(el).chars().count();
                html.push_str(&el.html());
            } else if let Some(text) = sibling.value().as_text() {
                body_len += text.trim().chars().count();
                html.push_str(&dom::escape_text(text));
            }
            included.insert(sibling.id());
        }
    }

    (body_len > 0).then_some(html)
}

/// Inner HTML of the first known container with enough text
pub fn from_containers(page: &Page<'_>, rules: &ExtractionRules) -> Option<String> {
    rules.description_selectors.iter().find_map(|selector| {
        page.document
            .select(selector)
            .find(|el| element_text(*el).chars().count() > rules.min_description_len)
            .map(|el| el.inner_html())
    })
}

/// Densest block of the first central-column container that has one
pub fn from_central_column(
    page: &Page<'_>,
    rules: &ExtractionRules,
    sanitizer: &Sanitizer,
) -> Option<String> {
    rules.central_column_selectors.iter().find_map(|selector| {
        page.document.select(selector).find_map(|column| {
            let block = sanitizer.densest_block(&column.inner_html());
            let mut block_text = String::new();
            dom::collect_text(&block, &mut block_text);
            (text::normalize_whitespace(&block_text).chars().count() >= rules.min_description_len)
                .then(|| dom::serialize(&block))
        })
    })
}

fn is_description_heading(heading: &str, prefixes: &[String]) -> bool {
    let normalized = heading.trim().trim_end_matches(':').trim().to_lowercase();
    !normalized.is_empty() && prefixes.iter().any(|prefix| normalized.starts_with(prefix.as_str()))
}

fn heading_level(name: &str) -> Option<u8> {
    match name {
        "h1" => Some(1),
        "h2" => Some(2),
        "h3" => Some(3),
        "h4" => Some(4),
        "h5" => Some(5),
        "h6" => Some(6),
        _ => None,
    }
}
