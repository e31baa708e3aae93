use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("invalid seed URL {url}: {reason}")]
    InvalidSeed { url: String, reason: String },
}

/// Base trait for anything producing the list of pages to analyze
#[async_trait]
pub trait SiteDiscoverer: Send + Sync {
    /// Discover same-site pages reachable from the seed URL.
    ///
    /// Returns a sorted, deduplicated list that always contains the seed.
    async fn discover(
        &self,
        seed_url: &str,
        max_depth: usize,
        max_pages: usize,
    ) -> Result<Vec<String>, DiscoveryError>;
}
