use scraper::Selector;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use url::Url;

use crate::error::ConfigError;

/// Which language editions of the site to crawl
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LanguageSelector {
    #[default]
    Fr,
    En,
    Both,
}

/// Which fetch backend resolves requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchBackend {
    /// Plain HTTP client
    #[default]
    Http,
    /// WebDriver-controlled browser
    Webdriver,
}

/// Top-level configuration for a crawl run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScraperConfig {
    /// Free-text search keyword
    #[serde(default)]
    pub keyword: Option<String>,

    /// Location filter
    #[serde(default)]
    pub location: Option<String>,

    /// Category (sector) filter
    #[serde(default)]
    pub category: Option<String>,

    /// Language edition(s) to crawl
    #[serde(default)]
    pub language: LanguageSelector,

    /// Explicit start URLs; when present they replace the filter-derived URLs
    #[serde(default)]
    pub start_urls: Vec<String>,

    /// Visit each job's detail page; when false only job URLs are emitted
    #[serde(default = "default_collect_details")]
    pub collect_details: bool,

    /// Maximum number of records to emit
    #[serde(default = "default_results_wanted")]
    pub results_wanted: usize,

    /// Maximum listing page number to paginate to
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,

    /// Number of concurrent workers
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    #[serde(default)]
    pub site: SiteConfig,

    #[serde(default)]
    pub extraction: ExtractionConfig,

    #[serde(default)]
    pub fetch: FetchConfig,
}

/// Site-specific URL conventions and listing-page markup
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Site root, used to derive listing URLs and to scope links
    pub base_url: String,

    /// Path of the search results page, relative to the base URL
    pub listing_path: String,

    /// Path prefix of the English edition
    pub english_prefix: String,

    /// Regex a URL path must match to count as a job detail page
    pub job_link_pattern: String,

    /// Regexes for listing/index paths that are never job pages
    pub listing_exclude_patterns: Vec<String>,

    /// Selectors tried in order to find job anchors on a listing page
    pub listing_link_selectors: Vec<String>,

    /// Selectors for an explicit "next page" element
    pub next_page_selectors: Vec<String>,

    /// Anchor texts (case-insensitive) that mean "next page"
    pub next_page_texts: Vec<String>,

    /// Phrases in the body text that indicate a block or CAPTCHA page
    pub block_markers: Vec<String>,

    /// Value written to the `source` field of every record
    pub source: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.rekrute.com".to_string(),
            listing_path: "offres.html".to_string(),
            english_prefix: "en".to_string(),
            job_link_pattern: r"(?i)/offre-emploi-[a-z0-9][a-z0-9-]*-\d+\.html$".to_string(),
            listing_exclude_patterns: vec![
                r"(?i)/offres\.html$".to_string(),
                r"(?i)/offres-emploi[^/]*\.html$".to_string(),
                r"(?i)/offre-emploi-(?:secteur|region|ville|fonction|domaine|metier)-[^/]*\.html$"
                    .to_string(),
            ],
            listing_link_selectors: vec![
                "a.titreJob".to_string(),
                "#fixed .section h2 a".to_string(),
                "h2 a[href]".to_string(),
                "a[href]".to_string(),
            ],
            next_page_selectors: vec![
                "a[rel~=\"next\"]".to_string(),
                "link[rel~=\"next\"]".to_string(),
                ".pagination a.next".to_string(),
                "a.next".to_string(),
            ],
            next_page_texts: vec![
                "suivant".to_string(),
                "page suivante".to_string(),
                "next".to_string(),
                "next page".to_string(),
                "»".to_string(),
                "›".to_string(),
                "→".to_string(),
                ">".to_string(),
                ">>".to_string(),
            ],
            block_markers: vec![
                "unusual traffic".to_string(),
                "captcha".to_string(),
                "are you a robot".to_string(),
                "are you human".to_string(),
                "access denied".to_string(),
                "trafic inhabituel".to_string(),
                "vous n'êtes pas un robot".to_string(),
            ],
            source: "rekrute".to_string(),
        }
    }
}

/// Thresholds and selector lists used by the field extractors and the sanitizer
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Minimum visible text length for a description container to count
    pub min_description_len: usize,

    /// Minimum visible text length for the densest block to replace the fragment
    pub min_block_len: usize,

    /// Section headings (lowercase prefixes) whose content forms the description
    pub description_headings: Vec<String>,

    /// Known description containers on detail pages
    pub description_selectors: Vec<String>,

    /// Central-column containers searched for the densest block
    pub central_column_selectors: Vec<String>,

    /// Dedicated company name elements
    pub company_selectors: Vec<String>,

    /// Dedicated location elements
    pub location_selectors: Vec<String>,

    /// Layout elements removed before densest-block selection
    pub noise_selectors: Vec<String>,

    /// class/id fragments that disqualify a block from being the densest
    pub excluded_block_hints: Vec<String>,

    /// Safety cap for the wrapper-collapsing loop
    pub max_collapse_iterations: usize,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            min_description_len: 80,
            min_block_len: 80,
            description_headings: vec![
                "poste".to_string(),
                "description du poste".to_string(),
                "job description".to_string(),
                "profil recherché".to_string(),
                "profil recherche".to_string(),
                "requirements".to_string(),
            ],
            description_selectors: vec![
                "#job-description".to_string(),
                ".job-description".to_string(),
                "[itemprop=\"description\"]".to_string(),
                ".contentbloc".to_string(),
                "div.blc".to_string(),
                "#recap".to_string(),
            ],
            central_column_selectors: vec![
                ".col-md-9".to_string(),
                "#fixed".to_string(),
                "main".to_string(),
                "#content".to_string(),
                ".content".to_string(),
            ],
            company_selectors: vec![
                "#recruiterName".to_string(),
                ".company-name".to_string(),
                ".entreprise".to_string(),
                "[itemprop=\"hiringOrganization\"] [itemprop=\"name\"]".to_string(),
                "[itemprop=\"hiringOrganization\"]".to_string(),
            ],
            location_selectors: vec![
                ".job-location".to_string(),
                ".location".to_string(),
                "#location".to_string(),
            ],
            noise_selectors: vec![
                "aside".to_string(),
                ".sidebar".to_string(),
                "#sidebar".to_string(),
                ".pagination".to_string(),
                ".modal".to_string(),
                ".login".to_string(),
                ".signup".to_string(),
                "#auth".to_string(),
                ".breadcrumb".to_string(),
                ".share".to_string(),
                ".social".to_string(),
                ".cookie-banner".to_string(),
            ],
            excluded_block_hints: vec![
                "nav".to_string(),
                "menu".to_string(),
                "filter".to_string(),
                "filtre".to_string(),
                "pagination".to_string(),
                "pager".to_string(),
                "breadcrumb".to_string(),
            ],
            max_collapse_iterations: 64,
        }
    }
}

/// Options handed to the fetch service
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub backend: FetchBackend,

    /// URL for the WebDriver instance
    pub webdriver_url: String,

    /// Extra request headers
    pub headers: BTreeMap<String, String>,

    /// Cookies sent with every request
    pub cookies: BTreeMap<String, String>,

    /// Proxy URL, passed through untouched
    pub proxy: Option<String>,

    pub timeout_secs: u64,

    /// Attempts after the first one before a request is abandoned
    pub max_retries: u32,

    /// Base delay between attempts, multiplied by the attempt number
    pub retry_backoff_ms: u64,

    /// Upper bound of the random delay before each fetch (0 disables it)
    pub max_jitter_ms: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            backend: FetchBackend::Http,
            webdriver_url: default_webdriver_url(),
            headers: BTreeMap::new(),
            cookies: BTreeMap::new(),
            proxy: None,
            timeout_secs: 30,
            max_retries: 3,
            retry_backoff_ms: 500,
            max_jitter_ms: 400,
        }
    }
}

pub const MAX_RESULTS_WANTED: usize = 10_000;
pub const MAX_PAGES: u32 = 1_000;
pub const MAX_CONCURRENCY: usize = 50;

fn default_collect_details() -> bool {
    true
}

fn default_results_wanted() -> usize {
    100
}

fn default_max_pages() -> u32 {
    10
}

fn default_max_concurrency() -> usize {
    20
}

fn default_webdriver_url() -> String {
    "http://localhost:4444".to_string()
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            keyword: None,
            location: None,
            category: None,
            language: LanguageSelector::default(),
            start_urls: Vec::new(),
            collect_details: default_collect_details(),
            results_wanted: default_results_wanted(),
            max_pages: default_max_pages(),
            max_concurrency: default_max_concurrency(),
            site: SiteConfig::default(),
            extraction: ExtractionConfig::default(),
            fetch: FetchConfig::default(),
        }
    }
}

impl ScraperConfig {
    /// Load configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let mut file = File::open(path)?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;

        Self::from_json(&contents)
    }

    /// Parse configuration from a JSON string
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Clamp numeric settings into their supported ranges
    pub fn normalized(mut self) -> Self {
        self.results_wanted = self.results_wanted.clamp(1, MAX_RESULTS_WANTED);
        self.max_pages = self.max_pages.clamp(1, MAX_PAGES);
        self.max_concurrency = self.max_concurrency.clamp(1, MAX_CONCURRENCY);
        self.keyword = non_blank(self.keyword.take());
        self.location = non_blank(self.location.take());
        self.category = non_blank(self.category.take());
        self
    }

    /// URLs the crawl starts from.
    ///
    /// Explicit start URLs win; otherwise one search URL is built per selected
    /// language edition from the keyword/location/category filters.
    pub fn seed_urls(&self) -> Result<Vec<Url>, ConfigError> {
        let explicit: Vec<&str> = self
            .start_urls
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .collect();
        if !explicit.is_empty() {
            return explicit.into_iter().map(parse_url).collect();
        }

        let base = parse_url(&self.site.base_url)?;
        let prefixes: Vec<String> = match self.language {
            LanguageSelector::Fr => vec![String::new()],
            LanguageSelector::En => vec![format!("{}/", self.site.english_prefix)],
            LanguageSelector::Both => {
                vec![String::new(), format!("{}/", self.site.english_prefix)]
            }
        };

        let mut urls = Vec::with_capacity(prefixes.len());
        for prefix in prefixes {
            let path = format!("{}{}", prefix, self.site.listing_path);
            let mut url = base.join(&path).map_err(|source| ConfigError::Url {
                url: path.clone(),
                source,
            })?;
            {
                let mut query = url.query_pairs_mut();
                if let Some(keyword) = &self.keyword {
                    query.append_pair("keyword", keyword);
                }
                if let Some(location) = &self.location {
                    query.append_pair("location", location);
                }
                if let Some(category) = &self.category {
                    query.append_pair("sector", category);
                }
            }
            if url.query() == Some("") {
                url.set_query(None);
            }
            urls.push(url);
        }
        Ok(urls)
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_url(raw: &str) -> Result<Url, ConfigError> {
    Url::parse(raw).map_err(|source| ConfigError::Url {
        url: raw.to_string(),
        source,
    })
}

/// Compile a list of CSS selectors, failing on the first invalid one
pub(crate) fn compile_selectors(patterns: &[String]) -> Result<Vec<Selector>, ConfigError> {
    patterns
        .iter()
        .map(|pattern| {
            Selector::parse(pattern).map_err(|e| ConfigError::Selector {
                selector: pattern.clone(),
                message: format!("{e:?}"),
            })
        })
        .collect()
}
