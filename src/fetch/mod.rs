pub mod proxy;

pub use proxy::ProxyFetcher;

use async_trait::async_trait;
use thiserror::Error;

/// Failure to retrieve the HTML of a page
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("{source_name} returned status {status}")]
    Status { source_name: String, status: u16 },

    #[error("{source_name} returned no usable content")]
    NoContent { source_name: String },

    #[error("{source_name} request failed: {source}")]
    Transport {
        source_name: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("no fetch strategy configured for {0}")]
    NoStrategy(String),

    #[error("{0}")]
    Other(String),
}

/// Anything able to turn a URL into page HTML
#[async_trait]
pub trait HtmlFetcher: Send + Sync {
    async fn fetch_html(&self, url: &str) -> Result<String, FetchError>;
}
