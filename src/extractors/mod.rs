//! Field extractors for job detail pages.
//!
//! Each extractor inspects a parsed [`Page`] and returns a candidate value or
//! `None`. Extractors are pure; the reconciler decides which candidate wins.

pub mod contract;
pub mod date;
pub mod description;
pub mod heading;
pub mod jsonld;
pub mod language;
pub mod location;


use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::config::{ExtractionConfig, compile_selectors};
use crate::error::ConfigError;
use crate::text;

/// A parsed document together with its URL and text projections
pub struct Page<'a> {
    pub url: &'a Url,
    pub document: &'a Html,
    /// Visible body text, one block per line
    lines: String,
    /// Visible body text on a single line
    flat: String,
}

impl<'a> Page<'a> {
    pub fn new(url: &'a Url, document: &'a Html) -> Self {
        let raw = text::visible_text(document.root_element());
        let lines = text::normalize_lines(&raw);
        let flat = text::normalize_whitespace(&lines);
        Self {
            url,
            document,
            lines,
            flat,
        }
    }

    /// Body text with block boundaries kept as newlines
    pub fn lines(&self) -> &str {
        &self.lines
    }

    /// Body text with all whitespace collapsed
    pub fn text(&self) -> &str {
        &self.flat
    }

    /// First element matching `selector`
    pub fn first(&self, selector: &Selector) -> Option<ElementRef<'a>> {
        self.document.select(selector).next()
    }
}

/// One way of producing a value for a field
pub trait Strategy<T> {
    fn name(&self) -> &'static str;
    fn extract(&self, page: &Page<'_>) -> Option<T>;
}

impl<T, F> Strategy<T> for (&'static str, F)
where
    F: Fn(&Page<'_>) -> Option<T>,
{
    fn name(&self) -> &'static str {
        self.0
    }

    fn extract(&self, page: &Page<'_>) -> Option<T> {
        (self.1)(page)
    }
}

/// Runs strategies in order and returns the first value produced
pub fn cascade<T>(field: &str, page: &Page<'_>, strategies: &[&dyn Strategy<T>]) -> Option<T> {
    for strategy in strategies {
        if let Some(value) = strategy.extract(page) {
            ::log::trace!("{} resolved by {} on {}", field, strategy.name(), page.url);
            return Some(value);
        }
    }
    ::log::trace!("{} not found on {}", field, page.url);
    None
}

/// Compiled selectors and thresholds shared by the extractors
#[derive(Debug)]
pub struct ExtractionRules {
    pub description_headings: Vec<String>,
    pub description_selectors: Vec<Selector>,
    pub central_column_selectors: Vec<Selector>,
    pub company_selectors: Vec<Selector>,
    pub location_selectors: Vec<Selector>,
    pub min_description_len: usize,
}

impl ExtractionRules {
    pub fn new(config: &ExtractionConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            description_headings: config
                .description_headings
                .iter()
                .map(|h| h.to_lowercase())
                .collect(),
            description_selectors: compile_selectors(&config.description_selectors)?,
            central_column_selectors: compile_selectors(&config.central_column_selectors)?,
            company_selectors: compile_selectors(&config.company_selectors)?,
            location_selectors: compile_selectors(&config.location_selectors)?,
            min_description_len: config.min_description_len,
        })
    }
}

/// Whitespace-normalized visible text of an element
pub fn element_text(element: ElementRef<'_>) -> String {
    text::normalize_whitespace(&text::visible_text(element))
}

/// Text of the first element, across `selectors` in order, with non-empty text
pub fn first_text(page: &Page<'_>, selectors: &[Selector]) -> Option<String> {
    selectors.iter().find_map(|selector| {
        page.document
            .select(selector)
            .map(element_text)
            .find(|text| !text.is_empty())
    })
}

/// `content` attribute of the first matching `<meta>` element
pub fn meta_content(page: &Page<'_>, selector: &Selector) -> Option<String> {
    page.first(selector)
        .and_then(|el| el.value().attr("content"))
        .and_then(text::clean)
}
