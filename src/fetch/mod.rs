//! Fetch service used by the crawler.
//!
//! The crawler only sees the [`Fetcher`] trait: give it a URL, get back the
//! page body and the URL it resolved to after redirects, or an error once the
//! fetcher's own retries are used up.

pub mod http;
pub mod webdriver;

use rand::Rng;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use url::Url;

use crate::config::{FetchBackend, FetchConfig};

pub use http::HttpFetcher;
pub use webdriver::WebDriverFetcher;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected status {status} for {url}")]
    Status { status: u16, url: String },

    #[error("WebDriver command failed: {0}")]
    WebDriver(#[from] fantoccini::error::CmdError),

    #[error("could not start a WebDriver session: {0}")]
    Session(#[from] fantoccini::error::NewSessionError),

    #[error("timed out fetching {url}")]
    Timeout { url: String },

    #[error("giving up on {url} after {attempts} attempts: {last}")]
    Exhausted {
        url: String,
        attempts: u32,
        #[source]
        last: Box<FetchError>,
    },

    #[error("invalid fetch configuration: {0}")]
    Config(String),
}

impl FetchError {
    /// Whether another attempt could succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::Http(e) => !e.is_builder() && !e.is_redirect(),
            FetchError::Status { status, .. } => *status == 429 || *status >= 500,
            FetchError::WebDriver(_) | FetchError::Timeout { .. } => true,
            FetchError::Session(_) | FetchError::Exhausted { .. } | FetchError::Config(_) => false,
        }
    }
}

/// A fetched page
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// URL after redirects
    pub final_url: Url,
    pub status: u16,
    pub body: String,
}

/// Resolves URLs to page bodies
pub trait Fetcher: Send + Sync + 'static {
    fn fetch(&self, url: &Url) -> impl Future<Output = Result<FetchedPage, FetchError>> + Send;

    /// Drop whatever session identity served a blocked page
    fn retire_session(&self) -> impl Future<Output = ()> + Send {
        async {}
    }
}

/// Attempt count and backoff between attempts
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &FetchConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            backoff: Duration::from_millis(config.retry_backoff_ms),
        }
    }
}

/// Run `attempt` until it succeeds, fails with a permanent error, or the
/// policy runs out. Backoff grows linearly with the attempt number.
pub async fn with_retries<F, Fut>(
    url: &Url,
    policy: RetryPolicy,
    mut attempt: F,
) -> Result<FetchedPage, FetchError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<FetchedPage, FetchError>>,
{
    let attempts = policy.max_retries + 1;
    let mut n = 0;
    loop {
        match attempt(n).await {
            Ok(page) => return Ok(page),
            Err(e) if !e.is_retryable() => return Err(e),
            Err(e) => {
                n += 1;
                if n >= attempts {
                    return Err(FetchError::Exhausted {
                        url: url.to_string(),
                        attempts,
                        last: Box::new(e),
                    });
                }
                ::log::debug!("Attempt {} for {} failed: {}, retrying", n, url, e);
                tokio::time::sleep(policy.backoff * n).await;
            }
        }
    }
}

/// Sleep for a random duration up to `max_ms`
pub async fn jitter(max_ms: u64) {
    if max_ms == 0 {
        return;
    }
    let delay = rand::thread_rng().gen_range(0..=max_ms);
    tokio::time::sleep(Duration::from_millis(delay)).await;
}

/// The fetch backend selected in the configuration
pub enum AnyFetcher {
    Http(HttpFetcher),
    WebDriver(WebDriverFetcher),
}

impl AnyFetcher {
    pub fn from_config(config: &FetchConfig) -> Result<Self, FetchError> {
        match config.backend {
            FetchBackend::Http => Ok(AnyFetcher::Http(HttpFetcher::new(config)?)),
            FetchBackend::Webdriver => Ok(AnyFetcher::WebDriver(WebDriverFetcher::new(config))),
        }
    }
}

impl Fetcher for AnyFetcher {
    async fn fetch(&self, url: &Url) -> Result<FetchedPage, FetchError> {
        match self {
            AnyFetcher::Http(fetcher) => fetcher.fetch(url).await,
            AnyFetcher::WebDriver(fetcher) => fetcher.fetch(url).await,
        }
    }

    async fn retire_session(&self) {
        match self {
            AnyFetcher::Http(fetcher) => fetcher.retire_session().await,
            AnyFetcher::WebDriver(fetcher) => fetcher.retire_session().await,
        }
    }
}
