// Re-export modules
pub mod config;
pub mod crawlers;
pub mod error;
pub mod extractors;
pub mod fetch;
pub mod links;
pub mod reconcile;
pub mod results;
pub mod sanitize;
pub mod text;

// Re-export commonly used types for convenience
pub use config::ScraperConfig;
pub use crawlers::CrawlSummary;
pub use error::{ConfigError, ScraperError};
pub use results::{DiscoveredLink, JobRecord, Output};

use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use config::{FetchBackend, LanguageSelector};
use fetch::{AnyFetcher, Fetcher};

/// Main builder for a job board crawl
pub struct JobScraper {
    config: ScraperConfig,
}

impl JobScraper {
    /// Create a new builder from a configuration
    pub fn new(config: ScraperConfig) -> Self {
        Self { config }
    }

    /// Load configuration from a JSON file
    pub fn from_config_file(path: impl AsRef<std::path::Path>) -> Result<Self, ConfigError> {
        Ok(Self::new(ScraperConfig::from_file(path)?))
    }

    /// Load configuration from a JSON string
    pub fn from_config_str(config_str: &str) -> Result<Self, ConfigError> {
        Ok(Self::new(ScraperConfig::from_json(config_str)?))
    }

    pub fn config(&self) -> &ScraperConfig {
        &self.config
    }

    pub fn with_keyword(mut self, keyword: impl Into<String>) -> Self {
        self.config.keyword = Some(keyword.into());
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.config.location = Some(location.into());
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.config.category = Some(category.into());
        self
    }

    pub fn with_language(mut self, language: LanguageSelector) -> Self {
        self.config.language = language;
        self
    }

    /// Replace the filter-derived start URLs
    pub fn with_start_urls(mut self, urls: Vec<String>) -> Self {
        self.config.start_urls = urls;
        self
    }

    pub fn with_collect_details(mut self, collect_details: bool) -> Self {
        self.config.collect_details = collect_details;
        self
    }

    pub fn with_results_wanted(mut self, results_wanted: usize) -> Self {
        self.config.results_wanted = results_wanted;
        self
    }

    pub fn with_max_pages(mut self, max_pages: u32) -> Self {
        self.config.max_pages = max_pages;
        self
    }

    /// Set the maximum number of concurrent workers
    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.config.max_concurrency = max_concurrency;
        self
    }

    pub fn with_backend(mut self, backend: FetchBackend) -> Self {
        self.config.fetch.backend = backend;
        self
    }

    pub fn with_proxy(mut self, proxy: impl Into<String>) -> Self {
        self.config.fetch.proxy = Some(proxy.into());
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.fetch.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.fetch.cookies.insert(name.into(), value.into());
        self
    }

    /// Start the crawl with the configured fetch backend.
    ///
    /// The WebDriver URL can be overridden with the `WEBDRIVER_URL`
    /// environment variable.
    pub async fn generate(
        mut self,
    ) -> Result<(mpsc::Receiver<Output>, JoinHandle<CrawlSummary>), ScraperError> {
        if let Ok(webdriver_url) = std::env::var("WEBDRIVER_URL") {
            if !webdriver_url.is_empty() {
                self.config.fetch.webdriver_url = webdriver_url;
            }
        }
        let fetcher = AnyFetcher::from_config(&self.config.fetch)?;
        self.generate_with(Arc::new(fetcher)).await
    }

    /// Start the crawl with a caller-supplied fetch service
    pub async fn generate_with<F: Fetcher>(
        self,
        fetcher: Arc<F>,
    ) -> Result<(mpsc::Receiver<Output>, JoinHandle<CrawlSummary>), ScraperError> {
        Ok(crawlers::web::start(self.config, fetcher).await?)
    }

    /// Run the crawl to completion and collect every item
    pub async fn run_to_vec<F: Fetcher>(
        self,
        fetcher: Arc<F>,
    ) -> Result<(Vec<Output>, CrawlSummary), ScraperError> {
        let (mut rx, handle) = self.generate_with(fetcher).await?;
        let mut outputs = Vec::new();
        while let Some(output) = rx.recv().await {
            outputs.push(output);
        }
        let summary = handle.await?;
        Ok((outputs, summary))
    }
}
