use regex::Regex;
use url::Url;

use crate::config::SiteConfig;
use crate::error::ConfigError;

/// Resolves, scopes and classifies links found on the site's pages
#[derive(Debug)]
pub struct LinkFilter {
    /// Host the crawl is restricted to, without a leading `www.`
    host: String,
    job_regex: Regex,
    listing_regexes: Vec<Regex>,
}

impl LinkFilter {
    /// Create a link filter from the site configuration
    pub fn new(site: &SiteConfig) -> Result<Self, ConfigError> {
        let base = Url::parse(&site.base_url).map_err(|source| ConfigError::Url {
            url: site.base_url.clone(),
            source,
        })?;
        let host = base
            .host_str()
            .map(bare_host)
            .unwrap_or_default()
            .to_string();

        let job_regex = Regex::new(&site.job_link_pattern)?;
        let mut listing_regexes = Vec::with_capacity(site.listing_exclude_patterns.len());
        for pattern in &site.listing_exclude_patterns {
            listing_regexes.push(Regex::new(pattern)?);
        }

        Ok(Self {
            host,
            job_regex,
            listing_regexes,
        })
    }

    /// Resolve `href` against the page it was found on.
    ///
    /// Returns `None` for non-HTTP schemes (`mailto:`, `javascript:`, ...) and
    /// unparsable references. The fragment is always dropped.
    pub fn resolve(&self, base: &Url, href: &str) -> Option<Url> {
        let href = href.trim();
        if href.is_empty() || href.starts_with('#') {
            return None;
        }
        let resolved = base.join(href).ok()?;
        if !matches!(resolved.scheme(), "http" | "https") {
            return None;
        }
        Some(self.normalize_url(&resolved))
    }

    /// Check if a URL belongs to the crawled site
    pub fn is_in_scope(&self, url: &Url) -> bool {
        match url.host_str() {
            Some(host) => bare_host(host).eq_ignore_ascii_case(&self.host),
            None => false,
        }
    }

    /// Check if a URL path is a listing/index page
    pub fn is_listing(&self, url: &Url) -> bool {
        let path = url.path();
        self.listing_regexes.iter().any(|re| re.is_match(path))
    }

    /// Check if a URL is an in-scope job detail page.
    ///
    /// Listing paths are rejected even when they also match the job pattern.
    pub fn is_job_link(&self, url: &Url) -> bool {
        self.is_in_scope(url) && self.job_regex.is_match(url.path()) && !self.is_listing(url)
    }

    /// Canonical form of a job URL used for deduplication (no query, no fragment)
    pub fn canonical_job_url(&self, url: &Url) -> Url {
        let mut canonical = self.normalize_url(url);
        canonical.set_query(None);
        canonical
    }

    /// Create a normalized version of the URL (e.g., removing fragments)
    pub fn normalize_url(&self, url: &Url) -> Url {
        let mut normalized = url.clone();
        normalized.set_fragment(None);
        normalized
    }
}

fn bare_host(host: &str) -> &str {
    host.strip_prefix("www.").unwrap_or(host)
}
