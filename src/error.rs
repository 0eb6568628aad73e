use thiserror::Error;

use crate::fetch::FetchError;

/// Errors raised while loading or compiling configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid regex pattern: {0}")]
    Regex(#[from] regex::Error),

    #[error("invalid CSS selector `{selector}`: {message}")]
    Selector { selector: String, message: String },

    #[error("invalid URL `{url}`: {source}")]
    Url {
        url: String,
        #[source]
        source: url::ParseError,
    },
}

/// Top-level error for library entry points
#[derive(Debug, Error)]
pub enum ScraperError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("crawl task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}
