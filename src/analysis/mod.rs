pub mod checks;


use crate::capture::VisualCaptureAdapter;
use crate::config::CheckToggles;
use crate::fetch::HtmlFetcher;
use crate::filter::is_localhost;
use crate::grammar::{self, GrammarChecker};
use crate::results::{Issue, PageResult, ScreenshotSet};
use futures::future::join_all;
use std::sync::Arc;
use url::Url;

/// Characters of body text sent to the grammar service
pub const GRAMMAR_SAMPLE_CHARS: usize = 1000;

/// Shorter body text is not worth a grammar request
const MIN_GRAMMAR_CHARS: usize = 10;

/// Number of same-host links probed per page
const LINK_PROBE_LIMIT: usize = 3;

/// Runs every check against one page and folds the findings into a result
pub struct PageAnalyzer {
    fetcher: Arc<dyn HtmlFetcher>,
    capture: Option<VisualCaptureAdapter>,
    grammar: Option<Arc<dyn GrammarChecker>>,
    checks: CheckToggles,
}

impl PageAnalyzer {
    pub fn new(fetcher: Arc<dyn HtmlFetcher>, checks: CheckToggles) -> Self {
        Self {
            fetcher,
            capture: None,
            grammar: None,
            checks,
        }
    }

    /// Attach the screenshot adapter used by the visual quality stage
    pub fn with_capture(mut self, capture: VisualCaptureAdapter) -> Self {
        self.capture = Some(capture);
        self
    }

    /// Attach the grammar service used when grammar checks are enabled
    pub fn with_grammar(mut self, grammar: Arc<dyn GrammarChecker>) -> Self {
        self.grammar = Some(grammar);
        self
    }

    pub fn checks(&self) -> &CheckToggles {
        &self.checks
    }

    /// Analyze a page. Never fails; an unreachable page becomes an error result.
    pub async fn analyze(&self, url: &str, live_site_url: Option<&str>) -> PageResult {
        let page_url = match Url::parse(url) {
            Ok(page_url) => page_url,
            Err(e) => {
                ::log::warn!("Cannot analyze invalid URL {}: {}", url, e);
                return PageResult::fetch_failed(url, &format!("invalid URL: {}", e));
            }
        };

        let page = match self.fetcher.fetch_html(url).await {
            Ok(page) => page,
            Err(e) => {
                ::log::warn!("Analysis fetch failed for {}: {}", url, e);
                return PageResult::fetch_failed(url, &e.to_string());
            }
        };

        // The parsed document stays inside this call; only owned findings cross an await
        let findings = checks::inspect(&page_url, &page, &self.checks);
        let mut issues = findings.issues;

        if self.checks.check_broken_links {
            issues.extend(self.probe_links(&findings.internal_links).await);
        }

        if self.checks.check_grammar {
            issues.extend(self.check_grammar(url, &findings.body_text).await);
        }

        let (screenshots, live_screenshots) = if self.checks.check_visual_quality {
            self.check_visual(&page_url, live_site_url, &mut issues).await
        } else {
            (None, None)
        };

        let title = findings.title.unwrap_or_else(|| "No Title".to_string());
        ::log::debug!("Analyzed {} with {} issues", url, issues.len());
        PageResult::new(url, &title, issues, screenshots, live_screenshots)
    }

    /// Fetch a sample of same-host links concurrently; each failure is a broken link
    async fn probe_links(&self, links: &[String]) -> Vec<Issue> {
        let sample: Vec<&String> = links.iter().take(LINK_PROBE_LIMIT).collect();
        let outcomes = join_all(sample.iter().map(|link| self.fetcher.fetch_html(link))).await;

        sample
            .into_iter()
            .zip(outcomes)
            .filter_map(|(link, outcome)| match outcome {
                Ok(_) => None,
                Err(e) => {
                    ::log::debug!("Link probe failed for {}: {}", link, e);
                    Some(Issue::error(
                        "Links",
                        format!("Broken Link Detected: {}", link),
                    ))
                }
            })
            .collect()
    }

    async fn check_grammar(&self, url: &str, body_text: &str) -> Vec<Issue> {
        let Some(checker) = &self.grammar else {
            ::log::debug!("Grammar check enabled but no grammar service configured");
            return Vec::new();
        };
        if body_text.chars().count() < MIN_GRAMMAR_CHARS {
            return Vec::new();
        }

        match checker.check(grammar::sample(body_text, GRAMMAR_SAMPLE_CHARS)).await {
            Ok(matches) if !matches.is_empty() => vec![Issue::warning(
                "Grammar",
                format!(
                    "Found {} potential grammar/spelling issues (first 1000 chars)",
                    matches.len()
                ),
            )],
            Ok(_) => Vec::new(),
            Err(e) => {
                ::log::warn!("Grammar check failed for {}: {}", url, e);
                Vec::new()
            }
        }
    }

    async fn check_visual(
        &self,
        page_url: &Url,
        live_site_url: Option<&str>,
        issues: &mut Vec<Issue>,
    ) -> (Option<ScreenshotSet>, Option<ScreenshotSet>) {
        if is_localhost(page_url.as_str()) {
            issues.push(Issue::warning(
                "Visual",
                "Visual check skipped for localhost (requires public URL)",
            ));
            return (None, None);
        }
        let Some(capture) = &self.capture else {
            ::log::debug!("Visual check enabled but no capture service configured");
            return (None, None);
        };

        let screenshots = capture.capture(page_url.as_str()).await;
        if screenshots.is_empty() {
            issues.push(Issue::error("Visual", "Failed to capture screenshots"));
        } else {
            issues.push(Issue::success(
                "Visual",
                format!("Captured {}/3 device screenshots", screenshots.captured()),
            ));
        }

        let live_screenshots = match live_site_url.and_then(|live| live_page_url(live, page_url)) {
            Some(live_url) => Some(capture.capture(&live_url).await),
            None => None,
        };

        (Some(screenshots), live_screenshots)
    }
}

/// The live counterpart of a beta page: live origin joined with the beta path
pub fn live_page_url(live_site_url: &str, beta_page: &Url) -> Option<String> {
    match Url::parse(live_site_url) {
        Ok(live) => Some(format!(
            "{}{}",
            live.origin().ascii_serialization(),
            beta_page.path()
        )),
        Err(e) => {
            ::log::warn!("Ignoring invalid live site URL {}: {}", live_site_url, e);
            None
        }
    }
}
