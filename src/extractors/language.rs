//! Posting language: `fr` or `en`.

use regex::Regex;
use scraper::Selector;
use std::sync::LazyLock;

use super::Page;

static HTML_LANG: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("html[lang]").expect("valid selector"));

static FRENCH_WORDS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:poste|profil|recherch[ée]e?|entreprise|candidat(?:ure)?s?|expérience|missions?|compétences|nous|vous|et|pour|avec|des|les)\b",
    )
    .expect("valid keyword pattern")
});

static ENGLISH_WORDS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:job|position|requirements|company|candidates?|experience|skills|responsibilities|we|you|and|for|with|the)\b",
    )
    .expect("valid keyword pattern")
});

pub fn from_document(page: &Page<'_>) -> Option<String> {
    page.document
        .select(&HTML_LANG)
        .next()
        .and_then(|html| html.value().attr("lang"))
        .and_then(primary_subtag)
}

pub fn from_url(page: &Page<'_>) -> Option<String> {
    let first = page.url.path_segments()?.next()?;
    match first.to_ascii_lowercase().as_str() {
        "en" => Some("en".to_string()),
        "fr" => Some("fr".to_string()),
        _ => None,
    }
}

pub fn from_keywords(page: &Page<'_>) -> Option<String> {
    by_keywords(page.text())
}

fn by_keywords(text: &str) -> Option<String> {
    let french = FRENCH_WORDS.find_iter(text).count();
    let english = ENGLISH_WORDS.find_iter(text).count();
    match french.cmp(&english) {
        std::cmp::Ordering::Greater => Some("fr".to_string()),
        std::cmp::Ordering::Less => Some("en".to_string()),
        std::cmp::Ordering::Equal => None,
    }
}

/// `fr-FR` -> `fr`
fn primary_subtag(lang: &str) -> Option<String> {
    let primary = lang.trim().split(['-', '_']).next()?.to_ascii_lowercase();
    (!primary.is_empty()).then_some(primary)
}
