use reqwest::header::{COOKIE, HeaderMap, HeaderName, HeaderValue, USER_AGENT};
use std::time::Duration;
use url::Url;

use super::{FetchError, FetchedPage, Fetcher, RetryPolicy, with_retries};
use crate::config::FetchConfig;

const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

/// Plain HTTP fetcher on top of a shared `reqwest` client
pub struct HttpFetcher {
    client: reqwest::Client,
    policy: RetryPolicy,
}

impl HttpFetcher {
    pub fn new(config: &FetchConfig) -> Result<Self, FetchError> {
        let mut builder = reqwest::Client::builder()
            .default_headers(default_headers(config)?)
            .timeout(Duration::from_secs(config.timeout_secs));

        if let Some(proxy) = config.proxy.as_deref().filter(|p| !p.trim().is_empty()) {
            builder = builder.proxy(reqwest::Proxy::all(proxy)?);
        }

        Ok(Self {
            client: builder.build()?,
            policy: RetryPolicy::from_config(config),
        })
    }

    async fn fetch_once(&self, url: &Url) -> Result<FetchedPage, FetchError> {
        let response = self.client.get(url.as_str()).send().await?;
        let status = response.status();
        let final_url = response.url().clone();

        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: final_url.to_string(),
            });
        }

        let body = response.text().await?;
        ::log::trace!("Fetched {} ({} bytes)", final_url, body.len());
        Ok(FetchedPage {
            final_url,
            status: status.as_u16(),
            body,
        })
    }
}

impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &Url) -> Result<FetchedPage, FetchError> {
        with_retries(url, self.policy, |_| self.fetch_once(url)).await
    }
}

/// Configured headers plus a `Cookie` header built from the cookie map
fn default_headers(config: &FetchConfig) -> Result<HeaderMap, FetchError> {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static(DEFAULT_USER_AGENT));

    for (name, value) in &config.headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| FetchError::Config(format!("header name `{name}`: {e}")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| FetchError::Config(format!("header value for `{name}`: {e}")))?;
        headers.insert(name, value);
    }

    if !config.cookies.is_empty() {
        let cookie = config
            .cookies
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join("; ");
        let value = HeaderValue::from_str(&cookie)
            .map_err(|e| FetchError::Config(format!("cookie header: {e}")))?;
        headers.insert(COOKIE, value);
    }

    Ok(headers)
}
