use crate::crawlers::{DiscoveryError, LinkDiscoverer, SiteDiscoverer};
use crate::test_support::FixtureFetcher;
use std::sync::Arc;

#[cfg(test)]
mod tests {
    use super::*;

    fn page(links: &[&str]) -> String {
        let anchors: String = links
            .iter()
            .map(|href| format!("<a href=\"{}\">link</a>", href))
            .collect();
        format!("<html><body><nav>{}</nav><p>Fixture page content for discovery.</p></body></html>", anchors)
    }

    fn discoverer(fetcher: FixtureFetcher) -> (LinkDiscoverer, Arc<FixtureFetcher>) {
        let fetcher = Arc::new(fetcher);
        (LinkDiscoverer::new(fetcher.clone()), fetcher)
    }

    #[tokio::test]
    async fn test_same_host_scenario() {
        let (discoverer, _) = discoverer(FixtureFetcher::new().with_page(
            "https://example.com",
            &page(&["/about", "/contact", "https://other.com/x"]),
        ));

        let urls = discoverer.discover("https://example.com", 1, 10).await.unwrap();
        assert_eq!(
            urls,
            vec![
                "https://example.com",
                "https://example.com/about",
                "https://example.com/contact",
            ]
        );
    }

    #[tokio::test]
    async fn test_depth_zero_returns_only_seed() {
        let (discoverer, fetcher) = discoverer(
            FixtureFetcher::new().with_page("https://example.com", &page(&["/about", "/contact"])),
        );

        let urls = discoverer.discover("https://example.com", 0, 10).await.unwrap();
        assert_eq!(urls, vec!["https://example.com"]);
        assert!(fetcher.calls().is_empty());
    }

    #[tokio::test]
    async fn test_page_bound() {
        let hrefs: Vec<String> = (0..20).map(|i| format!("/page-{}", i)).collect();
        let hrefs: Vec<&str> = hrefs.iter().map(|s| s.as_str()).collect();
        let (discoverer, _) =
            discoverer(FixtureFetcher::new().with_page("https://example.com", &page(&hrefs)));

        let urls = discoverer.discover("https://example.com", 2, 5).await.unwrap();
        assert_eq!(urls.len(), 5);
        assert!(urls.contains(&"https://example.com".to_string()));
    }

    #[tokio::test]
    async fn test_equivalent_hrefs_collapse() {
        let (discoverer, _) = discoverer(FixtureFetcher::new().with_page(
            "https://example.com",
            &page(&[
                "/about",
                "/about?ref=footer",
                "/about#team",
                "https://example.com/about",
                "/",
                "https://example.com/",
            ]),
        ));

        let urls = discoverer.discover("https://example.com", 1, 50).await.unwrap();
        assert_eq!(urls, vec!["https://example.com", "https://example.com/about"]);
    }

    #[tokio::test]
    async fn test_failed_seed_still_listed() {
        let (discoverer, fetcher) = discoverer(FixtureFetcher::new());

        let urls = discoverer.discover("https://example.com", 2, 50).await.unwrap();
        assert_eq!(urls, vec!["https://example.com"]);
        assert_eq!(fetcher.calls(), vec!["https://example.com"]);
    }

    #[tokio::test]
    async fn test_text_documents_listed_but_not_fetched() {
        let (discoverer, fetcher) = discoverer(FixtureFetcher::new().with_page(
            "https://example.com",
            &page(&["/robots.txt", "/sitemap.xml", "/about"]),
        ));

        let urls = discoverer.discover("https://example.com", 2, 50).await.unwrap();
        assert_eq!(
            urls,
            vec![
                "https://example.com",
                "https://example.com/about",
                "https://example.com/robots.txt",
                "https://example.com/sitemap.xml",
            ]
        );
        assert_eq!(
            fetcher.calls(),
            vec!["https://example.com", "https://example.com/about"]
        );
    }

    #[tokio::test]
    async fn test_links_resolve_against_current_page() {
        let (discoverer, _) = discoverer(
            FixtureFetcher::new()
                .with_page("https://example.com", &page(&["/blog/"]))
                .with_page("https://example.com/blog/", &page(&["post-1", "../team"])),
        );

        let urls = discoverer.discover("https://example.com", 2, 50).await.unwrap();
        assert_eq!(
            urls,
            vec![
                "https://example.com",
                "https://example.com/blog/",
                "https://example.com/blog/post-1",
                "https://example.com/team",
            ]
        );
    }

    #[tokio::test]
    async fn test_rejected_links() {
        let (discoverer, _) = discoverer(FixtureFetcher::new().with_page(
            "https://example.com",
            &page(&[
                "mailto:info@example.com",
                "tel:+4912345",
                "javascript:void(0)",
                "/brochure.PDF",
                "/logo.png",
                "/setup.exe",
                "https://cdn.example.com/app",
                "/pricing",
            ]),
        ));

        let urls = discoverer.discover("https://example.com", 1, 50).await.unwrap();
        assert_eq!(urls, vec!["https://example.com", "https://example.com/pricing"]);
    }

    #[tokio::test]
    async fn test_discovery_is_deterministic() {
        let build = || {
            FixtureFetcher::new()
                .with_page("https://example.com", &page(&["/b", "/a", "/c"]))
                .with_page("https://example.com/a", &page(&["/a/1", "/b"]))
                .with_page("https://example.com/b", &page(&["/b/1", "/a/1"]))
                .with_page("https://example.com/c", &page(&["/"]))
        };

        let (first, _) = discoverer(build());
        let (second, _) = discoverer(build());
        let a = first.discover("https://example.com", 2, 50).await.unwrap();
        let b = second.discover("https://example.com", 2, 50).await.unwrap();

        assert_eq!(a, b);
        let mut sorted = a.clone();
        sorted.sort();
        assert_eq!(a, sorted);
        assert_eq!(a.len(), 6);
    }

    #[tokio::test]
    async fn test_invalid_seed() {
        let (discoverer, _) = discoverer(FixtureFetcher::new());

        let err = discoverer.discover("not a url", 2, 50).await.unwrap_err();
        assert!(matches!(err, DiscoveryError::InvalidSeed { .. }));

        let err = discoverer.discover("mailto:a@b.c", 2, 50).await.unwrap_err();
        assert!(matches!(err, DiscoveryError::InvalidSeed { .. }));
    }
}
