//! Title, company and location from the page's primary heading and
//! dedicated elements.

use regex::Regex;
use scraper::Selector;
use std::sync::LazyLock;

use super::{ExtractionRules, Page, element_text, first_text, meta_content};
use crate::text;

static H1: LazyLock<Selector> = LazyLock::new(|| Selector::parse("h1").expect("valid selector"));
static OG_TITLE: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"meta[property="og:title"]"#).expect("valid selector")
});
static TITLE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("title").expect("valid selector"));
static MICRODATA_LOCALITY: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"[itemprop="addressLocality"], [itemprop="jobLocation"]"#)
        .expect("valid selector")
});

/// Hyphen, en/em dash or pipe used as a field separator
static SEPARATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*\|\s*|\s+[-–—]\s+").expect("valid separator pattern"));

/// "Lieu : Rabat", "Location: Rabat", "based in Rabat"
static LABELED_LOCATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?im)(?:\bbased\s+in\b|\blocation\s*:|\blocalisation\s*:|\blieu(?:\s+de\s+travail)?\s*:|\bville\s*:|\brégion\s*:)\s*([^\n,;|()]{2,60})",
    )
    .expect("valid location pattern")
});

/// Title, company and location as laid out in a heading
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HeadingParts {
    pub title: Option<String>,
    pub company: Option<String>,
    pub location: Option<String>,
}

/// Split a heading into title, company and location, in that order.
///
/// With more than three separators the remainder stays in the location.
pub fn split_heading(heading: &str) -> HeadingParts {
    let heading = text::normalize_whitespace(heading);
    let mut parts = SEPARATOR.splitn(&heading, 3).map(|part| {
        text::clean(part.trim_matches(|c: char| c == '-' || c == '|' || c.is_whitespace()))
    });
    HeadingParts {
        title: parts.next().flatten(),
        company: parts.next().flatten(),
        location: parts.next().flatten(),
    }
}

/// Heading parts of the first `<h1>` on the page
pub fn from_primary_heading(page: &Page<'_>) -> HeadingParts {
    page.first(&H1)
        .map(|h1| split_heading(&element_text(h1)))
        .unwrap_or_default()
}

/// Title from `og:title` or the document `<title>`, first segment only
pub fn document_title(page: &Page<'_>) -> Option<String> {
    meta_content(page, &OG_TITLE)
        .or_else(|| page.first(&TITLE).map(element_text_raw))
        .and_then(|title| split_heading(&title).title)
}

fn element_text_raw(el: scraper::ElementRef<'_>) -> String {
    el.text().collect()
}

pub fn company_from_selectors(page: &Page<'_>, rules: &ExtractionRules) -> Option<String> {
    first_text(page, &rules.company_selectors)
}

pub fn location_from_selectors(page: &Page<'_>, rules: &ExtractionRules) -> Option<String> {
    first_text(page, &rules.location_selectors)
}

/// `itemprop` microdata location
pub fn location_from_microdata(page: &Page<'_>) -> Option<String> {
    page.document.select(&MICRODATA_LOCALITY).find_map(|el| {
        el.value()
            .attr("content")
            .and_then(text::clean)
            .or_else(|| text::clean(&element_text(el)))
    })
}

/// Location from a labeled phrase in the body text (French or English)
pub fn location_from_label(page: &Page<'_>) -> Option<String> {
    LABELED_LOCATION
        .captures_iter(page.lines())
        .find_map(|caps| text::clean(caps[1].trim_end_matches(['.', ':'])))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_three_parts() {
        let parts = split_heading("Senior Engineer - Acme Corp - Casablanca");
        assert_eq!(parts.title.as_deref(), Some("Senior Engineer"));
        assert_eq!(parts.company.as_deref(), Some("Acme Corp"));
        assert_eq!(parts.location.as_deref(), Some("Casablanca"));
    }

    #[test]
    fn test_split_mixed_separators() {
        let parts = split_heading("Chef de projet | Beta SA – Rabat");
        assert_eq!(parts.title.as_deref(), Some("Chef de projet"));
        assert_eq!(parts.company.as_deref(), Some("Beta SA"));
        assert_eq!(parts.location.as_deref(), Some("Rabat"));
    }

    #[test]
    fn test_hyphenated_words_are_not_split() {
        let parts = split_heading("Développeur Full-Stack");
        assert_eq!(parts.title.as_deref(), Some("Développeur Full-Stack"));
        assert_eq!(parts.company, None);
        assert_eq!(parts.location, None);
    }

    #[test]
    fn test_extra_parts_stay_in_location() {
        let parts = split_heading("Dev - Acme - Casablanca - Maroc");
        assert_eq!(parts.location.as_deref(), Some("Casablanca - Maroc"));
    }

    #[test]
    fn test_empty_heading() {
        assert_eq!(split_heading("   "), HeadingParts::default());
    }
}
