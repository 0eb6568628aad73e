use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use job_yield::ScraperConfig;
use job_yield::config::{FetchBackend, LanguageSelector};

#[derive(Parser, Debug)]
#[command(name = "job-yield")]
#[command(about = "Crawler that yields job postings from a job board as JSON lines")]
#[command(version)]
pub struct Args {
    /// JSON configuration file; flags override its values
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Start URLs (replace the keyword/location/category search)
    pub start_urls: Vec<String>,

    /// Search keyword
    #[arg(short, long)]
    pub keyword: Option<String>,

    /// Location filter
    #[arg(short, long)]
    pub location: Option<String>,

    /// Category (sector) filter
    #[arg(long)]
    pub category: Option<String>,

    /// Site edition(s) to crawl
    #[arg(long, value_enum)]
    pub language: Option<LanguageArg>,

    /// Only emit job URLs, without visiting detail pages
    #[arg(long)]
    pub urls_only: bool,

    /// Maximum number of records
    #[arg(short, long)]
    pub results_wanted: Option<usize>,

    /// Maximum number of listing pages to paginate through
    #[arg(short, long)]
    pub max_pages: Option<u32>,

    /// Number of concurrent workers
    #[arg(short, long)]
    pub concurrency: Option<usize>,

    /// Fetch backend
    #[arg(short, long, value_enum)]
    pub backend: Option<BackendArg>,

    /// Proxy URL handed to the fetch backend
    #[arg(long)]
    pub proxy: Option<String>,

    /// Extra request header, as `Name: value` (repeatable)
    #[arg(short = 'H', long = "header")]
    pub headers: Vec<String>,

    /// Cookie, as `name=value` (repeatable)
    #[arg(long = "cookie")]
    pub cookies: Vec<String>,

    /// Append records to this file instead of writing them to stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum LanguageArg {
    Fr,
    En,
    Both,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum BackendArg {
    Http,
    Webdriver,
}

impl From<LanguageArg> for LanguageSelector {
    fn from(arg: LanguageArg) -> Self {
        match arg {
            LanguageArg::Fr => LanguageSelector::Fr,
            LanguageArg::En => LanguageSelector::En,
            LanguageArg::Both => LanguageSelector::Both,
        }
    }
}

impl From<BackendArg> for FetchBackend {
    fn from(arg: BackendArg) -> Self {
        match arg {
            BackendArg::Http => FetchBackend::Http,
            BackendArg::Webdriver => FetchBackend::Webdriver,
        }
    }
}

impl Args {
    /// Apply command-line overrides on top of `config`
    pub fn apply(&self, mut config: ScraperConfig) -> ScraperConfig {
        if !self.start_urls.is_empty() {
            config.start_urls = self.start_urls.clone();
        }
        if let Some(keyword) = &self.keyword {
            config.keyword = Some(keyword.clone());
        }
        if let Some(location) = &self.location {
            config.location = Some(location.clone());
        }
        if let Some(category) = &self.category {
            config.category = Some(category.clone());
        }
        if let Some(language) = self.language {
            config.language = language.into();
        }
        if self.urls_only {
            config.collect_details = false;
        }
        if let Some(results_wanted) = self.results_wanted {
            config.results_wanted = results_wanted;
        }
        if let Some(max_pages) = self.max_pages {
            config.max_pages = max_pages;
        }
        if let Some(concurrency) = self.concurrency {
            config.max_concurrency = concurrency;
        }
        if let Some(backend) = self.backend {
            config.fetch.backend = backend.into();
        }
        if let Some(proxy) = &self.proxy {
            config.fetch.proxy = Some(proxy.clone());
        }
        for header in &self.headers {
            match header.split_once(':') {
                Some((name, value)) => {
                    config
                        .fetch
                        .headers
                        .insert(name.trim().to_string(), value.trim().to_string());
                }
                None => ::log::warn!("Ignoring malformed header: {}", header),
            }
        }
        for cookie in &self.cookies {
            match cookie.split_once('=') {
                Some((name, value)) => {
                    config
                        .fetch
                        .cookies
                        .insert(name.trim().to_string(), value.trim().to_string());
                }
                None => ::log::warn!("Ignoring malformed cookie: {}", cookie),
            }
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_config() {
        let args = Args::parse_from([
            "job-yield",
            "--keyword",
            "comptable",
            "--language",
            "both",
            "--urls-only",
            "-r",
            "25",
            "-H",
            "Accept-Language: fr-FR",
            "--cookie",
            "consent=yes",
        ]);
        let config = args.apply(ScraperConfig::default());
        assert_eq!(config.keyword.as_deref(), Some("comptable"));
        assert_eq!(config.language, LanguageSelector::Both);
        assert!(!config.collect_details);
        assert_eq!(config.results_wanted, 25);
        assert_eq!(config.fetch.headers["Accept-Language"], "fr-FR");
        assert_eq!(config.fetch.cookies["consent"], "yes");
    }

    #[test]
    fn test_positional_start_urls() {
        let args = Args::parse_from(["job-yield", "https://www.rekrute.com/offres.html?p=3"]);
        let config = args.apply(ScraperConfig::default());
        assert_eq!(config.start_urls, vec!["https://www.rekrute.com/offres.html?p=3"]);
        assert!(config.collect_details);
    }
}
