use crate::crawlers::{DiscoveryError, SiteDiscoverer};
use crate::fetch::HtmlFetcher;
use crate::filter::{UrlFilter, is_web_scheme, normalize_url, resolve_href};
use crate::parsers::{ParserType, html};
use async_trait::async_trait;
use std::collections::{BTreeSet, HashSet, VecDeque};
use std::sync::Arc;
use url::Url;

/// Mutable bookkeeping of one discovery run
struct DiscoveryState {
    visited: HashSet<String>,
    discovered: BTreeSet<String>,
    queue: VecDeque<(String, usize)>,
}

impl DiscoveryState {
    fn new(seed: String) -> Self {
        let mut discovered = BTreeSet::new();
        discovered.insert(seed.clone());

        let mut queue = VecDeque::new();
        queue.push_back((seed, 0));

        Self {
            visited: HashSet::new(),
            discovered,
            queue,
        }
    }

    /// Checks if a URL has been visited and marks it as visited if not
    fn mark_visited(&mut self, url: &str) -> bool {
        if self.visited.contains(url) {
            ::log::trace!("Skipping already visited: {}", url);
            return false;
        }
        self.visited.insert(url.to_string());
        true
    }
}

/// Breadth-first, same-host link discovery bounded by depth and page count
pub struct LinkDiscoverer {
    fetcher: Arc<dyn HtmlFetcher>,
}

impl LinkDiscoverer {
    pub fn new(fetcher: Arc<dyn HtmlFetcher>) -> Self {
        Self { fetcher }
    }

    /// Fetch a page and return its raw anchor hrefs.
    ///
    /// A failed fetch is logged and yields no links.
    async fn page_links(&self, url: &str) -> Vec<String> {
        if !ParserType::from_url(url).should_extract_links() {
            return Vec::new();
        }

        match self.fetcher.fetch_html(url).await {
            Ok(page) => {
                let links = html::parse_links_only(&page);
                ::log::info!("Found {} links in {}", links.len(), url);
                links
            }
            Err(e) => {
                ::log::warn!("Discovery failed for {}: {}", url, e);
                Vec::new()
            }
        }
    }
}

#[async_trait]
impl SiteDiscoverer for LinkDiscoverer {
    async fn discover(
        &self,
        seed_url: &str,
        max_depth: usize,
        max_pages: usize,
    ) -> Result<Vec<String>, DiscoveryError> {
        let invalid_seed = |reason: String| DiscoveryError::InvalidSeed {
            url: seed_url.to_string(),
            reason,
        };

        let seed = Url::parse(seed_url.trim()).map_err(|e| invalid_seed(e.to_string()))?;
        if !is_web_scheme(&seed) || seed.host_str().is_none() {
            return Err(invalid_seed("not an http(s) URL".to_string()));
        }
        let filter = UrlFilter::for_seed(&seed).map_err(|e| invalid_seed(e.to_string()))?;
        let max_pages = max_pages.max(1);

        ::log::info!(
            "Starting discovery from {} (depth {}, max {} pages)",
            seed,
            max_depth,
            max_pages
        );

        let mut state = DiscoveryState::new(normalize_url(&seed));

        while let Some((url, depth)) = state.queue.pop_front() {
            if state.discovered.len() >= max_pages {
                ::log::debug!("Page limit of {} reached", max_pages);
                break;
            }
            if depth > max_depth || !state.mark_visited(&url) {
                continue;
            }
            // Links found here would sit beyond the depth bound
            if depth >= max_depth {
                continue;
            }

            let page_url = match Url::parse(&url) {
                Ok(page_url) => page_url,
                Err(e) => {
                    ::log::warn!("Skipping unparsable queued URL {}: {}", url, e);
                    continue;
                }
            };

            for href in self.page_links(&url).await {
                if state.discovered.len() >= max_pages {
                    break;
                }

                let Some(resolved) = resolve_href(&page_url, &href) else {
                    continue;
                };
                if !filter.should_crawl(&resolved) {
                    ::log::trace!("URL filter rejected: {}", resolved);
                    continue;
                }

                let normalized = filter.normalize_url(&resolved);
                if state.discovered.insert(normalized.clone()) {
                    ::log::debug!("Discovered {} at depth {}", normalized, depth + 1);
                    state.queue.push_back((normalized, depth + 1));
                }
            }
        }

        ::log::info!("Discovery finished with {} pages", state.discovered.len());
        Ok(state.discovered.into_iter().collect())
    }
}
