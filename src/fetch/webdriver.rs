use fantoccini::wd::Capabilities;
use fantoccini::{Client, ClientBuilder};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::timeout;
use url::Url;

use super::{FetchError, FetchedPage, Fetcher, RetryPolicy, with_retries};
use crate::config::FetchConfig;

/// Common WebDriver endpoints tried when the configured one is unreachable
const FALLBACK_URLS: &[&str] = &[
    "http://localhost:9515", // ChromeDriver default
    "http://localhost:4444", // Selenium / geckodriver default
    "http://127.0.0.1:4444",
];

/// Browser-backed fetcher.
///
/// Sessions are opened lazily and pooled; a worker takes one for the duration
/// of a single navigation and hands it back afterwards.
pub struct WebDriverFetcher {
    webdriver_url: String,
    capabilities: Capabilities,
    idle: Mutex<Vec<Client>>,
    page_timeout: Duration,
    policy: RetryPolicy,
}

impl WebDriverFetcher {
    pub fn new(config: &FetchConfig) -> Self {
        Self {
            webdriver_url: config.webdriver_url.clone(),
            capabilities: chrome_capabilities(config),
            idle: Mutex::new(Vec::new()),
            page_timeout: Duration::from_secs(config.timeout_secs),
            policy: RetryPolicy::from_config(config),
        }
    }

    async fn checkout(&self) -> Result<Client, FetchError> {
        let pooled = self.idle.lock().await.pop();
        match pooled {
            Some(client) => Ok(client),
            None => self.connect().await,
        }
    }

    async fn checkin(&self, client: Client) {
        self.idle.lock().await.push(client);
    }

    /// Connects to the configured WebDriver, then to the fallbacks
    async fn connect(&self) -> Result<Client, FetchError> {
        let mut last_error = None;
        let candidates = std::iter::once(self.webdriver_url.as_str())
            .chain(FALLBACK_URLS.iter().copied().filter(|u| *u != self.webdriver_url));

        for endpoint in candidates {
            let mut builder = ClientBuilder::native();
            builder.capabilities(self.capabilities.clone());
            match builder.connect(endpoint).await {
                Ok(client) => {
                    ::log::debug!("Connected to WebDriver at {}", endpoint);
                    return Ok(client);
                }
                Err(e) => {
                    ::log::debug!("WebDriver at {} unavailable: {}", endpoint, e);
                    last_error = Some(e);
                }
            }
        }

        ::log::error!(
            "Failed to connect to any WebDriver server; make sure one is running or set WEBDRIVER_URL"
        );
        match last_error {
            Some(e) => Err(FetchError::Session(e)),
            None => Err(FetchError::Config("no WebDriver endpoint configured".to_string())),
        }
    }

    async fn navigate(&self, client: &Client, url: &Url) -> Result<FetchedPage, FetchError> {
        let navigation = async {
            client.goto(url.as_str()).await?;
            let body = client.source().await?;
            let final_url = client.current_url().await?;
            Ok::<_, FetchError>(FetchedPage {
                final_url,
                status: 200,
                body,
            })
        };
        match timeout(self.page_timeout, navigation).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::Timeout {
                url: url.to_string(),
            }),
        }
    }

    async fn fetch_once(&self, url: &Url) -> Result<FetchedPage, FetchError> {
        let client = self.checkout().await?;
        match self.navigate(&client, url).await {
            Ok(page) => {
                self.checkin(client).await;
                Ok(page)
            }
            Err(e) if is_lost_session(&e) => {
                ::log::warn!("Lost WebDriver session while fetching {}, reconnecting", url);
                let client = self.connect().await?;
                let page = self.navigate(&client, url).await;
                if page.is_ok() {
                    self.checkin(client).await;
                } else {
                    close(client).await;
                }
                page
            }
            Err(e) => {
                close(client).await;
                Err(e)
            }
        }
    }
}

impl Fetcher for WebDriverFetcher {
    async fn fetch(&self, url: &Url) -> Result<FetchedPage, FetchError> {
        with_retries(url, self.policy, |_| self.fetch_once(url)).await
    }

    async fn retire_session(&self) {
        let pooled = self.idle.lock().await.pop();
        if let Some(client) = pooled {
            ::log::info!("Retiring a WebDriver session after a blocked page");
            close(client).await;
        }
    }
}

async fn close(client: Client) {
    if let Err(e) = client.close().await {
        ::log::warn!("Failed to close WebDriver client: {}", e);
    }
}

fn is_lost_session(error: &FetchError) -> bool {
    match error {
        FetchError::WebDriver(e) => {
            let message = e.to_string();
            message.contains("Unable to find session") || message.contains("invalid session id")
        }
        _ => false,
    }
}

/// Headless Chrome with the proxy and user agent from the fetch settings
fn chrome_capabilities(config: &FetchConfig) -> Capabilities {
    let mut args = vec![
        "--headless=new".to_string(),
        "--disable-gpu".to_string(),
        "--no-sandbox".to_string(),
    ];
    if let Some(proxy) = config.proxy.as_deref().filter(|p| !p.trim().is_empty()) {
        args.push(format!("--proxy-server={proxy}"));
    }
    if let Some((_, agent)) = config
        .headers
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case("user-agent"))
    {
        args.push(format!("--user-agent={agent}"));
    }

    let mut capabilities = Capabilities::new();
    capabilities.insert(
        "goog:chromeOptions".to_string(),
        serde_json::json!({ "args": args }),
    );
    capabilities
}
