//! Last-resort location guesses from secondary headings and the URL slug.

use regex::Regex;
use scraper::Selector;
use std::sync::LazyLock;

use super::{Page, element_text};
use crate::text;

static SECONDARY_HEADINGS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("h2, h3").expect("valid selector"));

/// "Comptable - Rabat", "Comptable (Rabat)", "Comptable | Rabat"
static HEADING_SUFFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:\s[-–—|]\s*|\()\s*([\p{L}][\p{L}' .-]{1,40}?)\s*\)?\s*$")
        .expect("valid suffix pattern")
});

/// Leading words kept attached to the city that follows them
const PARTICLES: &[&str] = &["el", "al", "ben", "sidi", "ain", "dar", "beni", "moulay"];

/// Slug tokens that are never part of a place name
const STOPWORDS: &[&str] = &["emploi", "offre", "hf", "fh", "h", "f", "job"];

pub fn from_secondary_heading(page: &Page<'_>) -> Option<String> {
    page.document.select(&SECONDARY_HEADINGS).find_map(|heading| {
        let text = element_text(heading);
        HEADING_SUFFIX
            .captures(&text)
            .and_then(|caps| text::clean(caps[1].trim_matches(['-', '.', ' '])))
            .filter(|place| !place.chars().any(|c| c.is_ascii_digit()))
    })
}

/// City from a slug such as `/offre-emploi-comptable-sidi-kacem-12345.html`:
/// the segment right before the numeric id, plus any particle in front of it.
pub fn from_url_slug(page: &Page<'_>) -> Option<String> {
    let slug = page.url.path_segments()?.next_back()?;
    slug_location(slug)
}

fn slug_location(slug: &str) -> Option<String> {
    let stem = slug.rsplit_once('.').map_or(slug, |(stem, _)| stem);
    let tokens: Vec<&str> = stem.split('-').filter(|t| !t.is_empty()).collect();

    let id_idx = tokens
        .iter()
        .rposition(|t| t.chars().all(|c| c.is_ascii_digit()))?;
    let city_idx = id_idx.checked_sub(1)?;
    let city = tokens[city_idx];
    if !is_place_word(city) {
        return None;
    }

    let mut start = city_idx;
    while start > 0 && PARTICLES.contains(&tokens[start - 1].to_lowercase().as_str()) {
        start -= 1;
    }
    Some(text::title_case(&tokens[start..=city_idx]))
}

fn is_place_word(token: &str) -> bool {
    token.chars().count() >= 3
        && token.chars().all(char::is_alphabetic)
        && !STOPWORDS.contains(&token.to_lowercase().as_str())
}
