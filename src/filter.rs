use regex::Regex;
use serde::{Deserialize, Serialize};
use url::Url;

/// Configuration for URL filtering during discovery
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UrlFilterConfig {
    /// Hostname every accepted URL must share with the seed
    pub required_host: String,

    /// Regex patterns matched against the URL path; a match rejects the URL
    #[serde(default = "default_exclude_patterns")]
    pub exclude_patterns: Vec<String>,
}

/// Binary downloads never worth crawling
fn default_exclude_patterns() -> Vec<String> {
    vec![r"(?i)\.(pdf|jpg|png|zip|exe)$".to_string()]
}

impl UrlFilterConfig {
    /// Create a configuration scoped to the host of the seed URL
    pub fn for_seed(seed: &Url) -> Self {
        Self {
            required_host: seed.host_str().unwrap_or_default().to_ascii_lowercase(),
            exclude_patterns: default_exclude_patterns(),
        }
    }
}

/// URL filter deciding which discovered links belong to the crawl
#[derive(Debug)]
pub struct UrlFilter {
    config: UrlFilterConfig,
    exclude_regexes: Vec<Regex>,
}

impl UrlFilter {
    /// Create a new URL filter from configuration
    pub fn new(config: UrlFilterConfig) -> Result<Self, regex::Error> {
        let mut exclude_regexes = Vec::with_capacity(config.exclude_patterns.len());
        for pattern in &config.exclude_patterns {
            exclude_regexes.push(Regex::new(pattern)?);
        }

        Ok(Self {
            config,
            exclude_regexes,
        })
    }

    /// Create a filter for the given seed using the default exclusions
    pub fn for_seed(seed: &Url) -> Result<Self, regex::Error> {
        Self::new(UrlFilterConfig::for_seed(seed))
    }

    /// Determine if a resolved URL should be part of the crawl
    pub fn should_crawl(&self, url: &Url) -> bool {
        // mailto:, tel:, javascript: and friends
        if !is_web_scheme(url) {
            return false;
        }

        if !self.is_in_host_scope(url) {
            return false;
        }

        let path = url.path();
        !self.exclude_regexes.iter().any(|regex| regex.is_match(path))
    }

    /// Check if a URL is on the same host as the seed (scheme and port ignored)
    fn is_in_host_scope(&self, url: &Url) -> bool {
        url.host_str()
            .map(|host| host.eq_ignore_ascii_case(&self.config.required_host))
            .unwrap_or(false)
    }

    /// Create a normalized version of the URL
    pub fn normalize_url(&self, url: &Url) -> String {
        normalize_url(url)
    }
}

pub fn is_web_scheme(url: &Url) -> bool {
    matches!(url.scheme(), "http" | "https")
}

/// Normalize a URL to origin + path, dropping query and fragment.
///
/// The root path is rendered as the bare origin so `https://a.com` and
/// `https://a.com/` collapse into one entry.
pub fn normalize_url(url: &Url) -> String {
    let origin = url.origin().ascii_serialization();
    match url.path() {
        "" | "/" => origin,
        path => format!("{}{}", origin, path),
    }
}

/// Resolve an href against the page it was found on
pub fn resolve_href(page_url: &Url, href: &str) -> Option<Url> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }
    page_url.join(href).ok()
}

pub fn is_localhost(url: &str) -> bool {
    url.contains("localhost") || url.contains("127.0.0.1")
}
