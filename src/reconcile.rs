//! Merges extractor candidates into one [`JobRecord`].
//!
//! Per field the order is: JSON-LD metadata, heading and selector values,
//! text patterns. The first value found wins.

use scraper::Html;
use url::Url;

use crate::config::ScraperConfig;
use crate::error::ConfigError;
use crate::extractors::{
    ExtractionRules, Page, cascade, contract, date, description, heading, jsonld,
    language, location,
};
use crate::results::JobRecord;
use crate::sanitize::Sanitizer;
use crate::text;

#[derive(Debug)]
pub struct Reconciler {
    rules: ExtractionRules,
    sanitizer: Sanitizer,
    source: String,
}

impl Reconciler {
    pub fn new(config: &ScraperConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            rules: ExtractionRules::new(&config.extraction)?,
            sanitizer: Sanitizer::new(&config.extraction)?,
            source: config.site.source.clone(),
        })
    }

    /// Parse `html` and reconcile it
    pub fn reconcile_html(&self, url: &Url, html: &str) -> JobRecord {
        let document = Html::parse_document(html);
        self.reconcile(url, &document)
    }

    pub fn reconcile(&self, url: &Url, document: &Html) -> JobRecord {
        let page = Page::new(url, document);
        let meta = jsonld::extract(document).unwrap_or_default();
        let parts = heading::from_primary_heading(&page);
        let rules = &self.rules;

        let mut record = JobRecord::new(url.to_string(), self.source.clone());

        record.title = cascade(
            "title",
            &page,
            &[
                &("json-ld", |_: &Page<'_>| meta.title.clone()),
                &("heading", |_: &Page<'_>| parts.title.clone()),
                &("document title", heading::document_title),
            ],
        );

        record.company = cascade(
            "company",
            &page,
            &[
                &("json-ld", |_: &Page<'_>| meta.company.clone()),
                &("heading", |_: &Page<'_>| parts.company.clone()),
                &("selectors", |p: &Page<'_>| heading::company_from_selectors(p, rules)),
            ],
        );

        record.location = cascade(
            "location",
            &page,
            &[
                &("json-ld", |_: &Page<'_>| meta.location.clone()),
                &("heading", |_: &Page<'_>| parts.location.clone()),
                &("selectors", |p: &Page<'_>| heading::location_from_selectors(p, rules)),
                &("microdata", heading::location_from_microdata),
                &("label", heading::location_from_label),
                &("secondary heading", location::from_secondary_heading),
                &("url slug", location::from_url_slug),
            ],
        );

        let raw_description = cascade(
            "description",
            &page,
            &[
                &("json-ld", |_: &Page<'_>| {
                    meta.description
                        .clone()
                        .filter(|d| text::html_to_text(d).chars().count() >= rules.min_description_len)
                }),
                &("sections", |p: &Page<'_>| description::from_sections(p, rules)),
                &("containers", |p: &Page<'_>| description::from_containers(p, rules)),
                &("central column", |p: &Page<'_>| {
                    description::from_central_column(p, rules, &self.sanitizer)
                }),
                // Short metadata descriptions still beat nothing
                &("json-ld short", |_: &Page<'_>| meta.description.clone()),
            ],
        );
        if let Some(raw) = raw_description {
            let html = self.sanitizer.clean(&raw);
            let plain = text::html_to_text(&html);
            if !plain.is_empty() {
                record.description_html = Some(html);
                record.description_text = Some(plain);
            }
        }

        record.date_posted = cascade(
            "datePosted",
            &page,
            &[
                &("json-ld", |_: &Page<'_>| meta.date_posted.clone()),
                &("text", date::date_posted),
            ],
        );

        record.valid_through = cascade(
            "validThrough",
            &page,
            &[
                &("json-ld", |_: &Page<'_>| meta.valid_through.clone()),
                &("text", date::valid_through),
            ],
        );

        let description_text = record.description_text.as_deref();
        record.employment_type = cascade(
            "employmentType",
            &page,
            &[
                &("json-ld", |_: &Page<'_>| meta.employment_type.clone()),
                &("description", |_: &Page<'_>| description_text.and_then(contract::employment_type)),
                &("body", |p: &Page<'_>| contract::employment_type(p.lines())),
            ],
        );

        record.salary = cascade(
            "salary",
            &page,
            &[
                &("json-ld", |_: &Page<'_>| meta.salary.clone()),
                &("description", |_: &Page<'_>| description_text.and_then(contract::salary)),
                &("body", |p: &Page<'_>| contract::salary(p.lines())),
            ],
        );

        record.language = cascade(
            "language",
            &page,
            &[
                &("document", language::from_document),
                &("url", language::from_url),
                &("keywords", language::from_keywords),
            ],
        );

        record
    }
}
