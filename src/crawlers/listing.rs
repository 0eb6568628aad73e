//! Listing page analysis: job links, the next page, block detection.

use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use std::sync::LazyLock;
use url::Url;

use crate::config::{SiteConfig, compile_selectors};
use crate::error::ConfigError;
use crate::links::LinkFilter;
use crate::text;

static ANCHORS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("valid selector"));

/// What a listing page links to
#[derive(Debug, Default, PartialEq)]
pub struct ListingPage {
    /// Canonical job URLs in page order, without duplicates
    pub job_links: Vec<Url>,
    pub next_page: Option<Url>,
}

#[derive(Debug)]
pub struct ListingRules {
    link_selectors: Vec<Selector>,
    next_selectors: Vec<Selector>,
    next_texts: Vec<String>,
}

impl ListingRules {
    pub fn new(site: &SiteConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            link_selectors: compile_selectors(&site.listing_link_selectors)?,
            next_selectors: compile_selectors(&site.next_page_selectors)?,
            next_texts: site
                .next_page_texts
                .iter()
                .map(|t| text::normalize_whitespace(t).to_lowercase())
                .filter(|t| !t.is_empty())
                .collect(),
        })
    }

    pub fn analyze(&self, page_url: &Url, document: &Html, filter: &LinkFilter) -> ListingPage {
        ListingPage {
            job_links: self.job_links(page_url, document, filter),
            next_page: self.next_page(page_url, document, filter),
        }
    }

    /// Job links from the first selector that yields any
    fn job_links(&self, page_url: &Url, document: &Html, filter: &LinkFilter) -> Vec<Url> {
        for selector in &self.link_selectors {
            let mut seen = HashSet::new();
            let links: Vec<Url> = document
                .select(selector)
                .filter_map(|anchor| anchor.value().attr("href"))
                .filter_map(|href| filter.resolve(page_url, href))
                .filter(|url| filter.is_job_link(url))
                .map(|url| filter.canonical_job_url(&url))
                .filter(|url| seen.insert(url.to_string()))
                .collect();
            if !links.is_empty() {
                return links;
            }
        }
        Vec::new()
    }

    /// The explicit next-page marker, else an anchor whose text says "next"
    fn next_page(&self, page_url: &Url, document: &Html, filter: &LinkFilter) -> Option<Url> {
        let current = filter.normalize_url(page_url);
        let acceptable = |url: &Url| {
            filter.is_in_scope(url) && !filter.is_job_link(url) && *url != current
        };

        let marked = self.next_selectors.iter().find_map(|selector| {
            document
                .select(selector)
                .filter_map(|el| el.value().attr("href"))
                .filter_map(|href| filter.resolve(page_url, href))
                .find(|url| acceptable(url))
        });
        if marked.is_some() {
            return marked;
        }

        document
            .select(&ANCHORS)
            .filter(|anchor| self.says_next(*anchor))
            .filter_map(|anchor| anchor.value().attr("href"))
            .filter_map(|href| filter.resolve(page_url, href))
            .find(|url| acceptable(url))
    }

    fn says_next(&self, anchor: ElementRef<'_>) -> bool {
        let label = text::normalize_whitespace(&anchor.text().collect::<String>()).to_lowercase();
        let title = anchor
            .value()
            .attr("aria-label")
            .or_else(|| anchor.value().attr("title"))
            .map(|t| text::normalize_whitespace(t).to_lowercase())
            .unwrap_or_default();
        self.next_texts.iter().any(|t| *t == label || *t == title)
    }
}

/// Recognizes block and CAPTCHA pages by marker phrases in their text
#[derive(Debug)]
pub struct BlockDetector {
    markers: Vec<String>,
}

impl BlockDetector {
    pub fn new(site: &SiteConfig) -> Self {
        Self {
            markers: site
                .block_markers
                .iter()
                .map(|m| m.trim().to_lowercase())
                .filter(|m| !m.is_empty())
                .collect(),
        }
    }

    pub fn is_blocked(&self, text: &str) -> bool {
        let text = text.to_lowercase();
        self.markers.iter().any(|marker| text.contains(marker.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analyze(html: &str, page: &str) -> ListingPage {
        let site = SiteConfig::default();
        let rules = ListingRules::new(&site).unwrap();
        let filter = LinkFilter::new(&site).unwrap();
        let url = Url::parse(page).unwrap();
        rules.analyze(&url, &Html::parse_document(html), &filter)
    }

    const PAGE: &str = "https://www.rekrute.com/offres.html?p=1";

    #[test]
    fn test_job_links_are_scoped_and_deduplicated() {
        let html = r#"<html><body>
            <a class="titreJob" href="/offre-emploi-senior-dev-123456.html">Senior dev</a>
            <a class="titreJob" href="/offre-emploi-senior-dev-123456.html#apply">Again</a>
            <a class="titreJob" href="/offre-emploi-comptable-42.html?utm=x">Comptable</a>
            <a class="titreJob" href="https://other.example/offre-emploi-x-1.html">Elsewhere</a>
            <a class="titreJob" href="/offres.html">All offers</a>
            <a href="/offre-emploi-ignored-7.html">Not a titreJob link</a>
        </body></html>"#;
        let listing = analyze(html, PAGE);
        let links: Vec<&str> = listing.job_links.iter().map(Url::as_str).collect();
        assert_eq!(
            links,
            vec![
                "https://www.rekrute.com/offre-emploi-senior-dev-123456.html",
                "https://www.rekrute.com/offre-emploi-comptable-42.html",
            ]
        );
    }

    #[test]
    fn test_falls_back_to_generic_anchors() {
        let html = r#"<html><body>
            <a href="/offre-emploi-secteur-informatique-1.html">Sector</a>
            <a href="/offre-emploi-data-analyst-555.html">Data analyst</a>
        </body></html>"#;
        let listing = analyze(html, PAGE);
        assert_eq!(listing.job_links.len(), 1);
        assert!(listing.job_links[0].path().ends_with("data-analyst-555.html"));
    }

    #[test]
    fn test_next_page_prefers_rel_marker() {
        let html = r#"<html><body>
            <a href="/offres.html?p=9">Suivant</a>
            <a rel="next" href="/offres.html?p=2">2</a>
        </body></html>"#;
        let listing = analyze(html, PAGE);
        assert_eq!(
            listing.next_page.as_ref().map(Url::as_str),
            Some("https://www.rekrute.com/offres.html?p=2")
        );
    }

    #[test]
    fn test_next_page_by_text_or_glyph() {
        let html = r#"<html><body><a href="/offres.html?p=2"> Page  suivante </a></body></html>"#;
        assert!(analyze(html, PAGE).next_page.is_some());

        let html = r#"<html><body><a href="/en/offres.html?p=2">»</a></body></html>"#;
        assert!(analyze(html, PAGE).next_page.is_some());

        let html = r#"<html><body><a href="/offres.html?p=1">Next</a></body></html>"#;
        assert_eq!(analyze(html, PAGE).next_page, None);
    }

    #[test]
    fn test_block_detection() {
        let detector = BlockDetector::new(&SiteConfig::default());
        assert!(detector.is_blocked("Our systems have detected Unusual Traffic from your network"));
        assert!(detector.is_blocked("Please solve the CAPTCHA"));
        assert!(!detector.is_blocked("Offres d'emploi au Maroc"));
    }
}
