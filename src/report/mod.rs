//! Exported QA report.
//!
//! The JSON document keeps the exact key set
//! `{project, date, summary, checklist, url_comparison, seo_analysis,
//! keyword_density, grammar_issues}` so existing report consumers can read it.

pub mod compare;
pub mod content;

use crate::analysis::GRAMMAR_SAMPLE_CHARS;
use crate::fetch::HtmlFetcher;
use crate::grammar::{self, GrammarChecker, GrammarMatch};
use crate::results::{IssueKind, PageResult, ProjectRef, Verdict};
use crate::store::StoreError;
use crate::utils::sanitize_filename;
use chrono::{Local, NaiveDate};
use compare::{Availability, ProbeStatus, StatusProbe, UrlComparison, compare_sites, page_paths};
use content::{KeywordDensity, PageSeoAnalysis, analyze_page, keyword_density};
use serde::{Serialize, Serializer};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use url::Url;

/// Marker written for sections that were not produced
pub const NOT_RUN: &str = "Not run";

/// A report section that is either present or serialized as `"Not run"`
#[derive(Debug, Clone, PartialEq)]
pub enum Section<T> {
    Ran(T),
    NotRun,
}

impl<T> Section<T> {
    pub fn as_ran(&self) -> Option<&T> {
        match self {
            Section::Ran(value) => Some(value),
            Section::NotRun => None,
        }
    }
}

impl<T: Serialize> Serialize for Section<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Section::Ran(value) => value.serialize(serializer),
            Section::NotRun => serializer.serialize_str(NOT_RUN),
        }
    }
}

/// Ordered from least to most decisive; `Fail` wins when results are merged
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChecklistStatus {
    Pending,
    Pass,
    Fail,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChecklistItem {
    pub category: String,
    pub status: ChecklistStatus,
    pub comment: String,
    /// Number of attached files
    pub attachments: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GrammarFinding {
    pub message: String,
    pub context: String,
    pub rule: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GrammarSummary {
    pub count: usize,
    pub matches: Vec<GrammarFinding>,
}

impl From<&[GrammarMatch]> for GrammarSummary {
    fn from(matches: &[GrammarMatch]) -> Self {
        Self {
            count: matches.len(),
            matches: matches
                .iter()
                .map(|m| GrammarFinding {
                    message: m.message.clone(),
                    context: m.context.text.clone(),
                    rule: m.rule.id.clone(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QaReport {
    pub project: String,
    pub date: String,
    pub summary: String,
    pub checklist: Vec<ChecklistItem>,
    pub url_comparison: Vec<UrlComparison>,
    pub seo_analysis: Section<PageSeoAnalysis>,
    pub keyword_density: Section<Vec<KeywordDensity>>,
    pub grammar_issues: Section<GrammarSummary>,
}

impl QaReport {
    /// Write the report as pretty JSON into `dir` and return the file path
    pub fn save_to<P: AsRef<Path>>(&self, dir: P) -> Result<PathBuf, StoreError> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;
        let path = dir.join(export_filename(&self.project, Local::now().date_naive()));
        fs::write(&path, serde_json::to_vec_pretty(self)?)?;
        ::log::info!("Report written to {}", path.display());
        Ok(path)
    }
}

/// `QA_Report_<project>_<yyyy-mm-dd>.json`
pub fn export_filename(project: &str, date: NaiveDate) -> String {
    format!(
        "QA_Report_{}_{}.json",
        sanitize_filename(project),
        date.format("%Y-%m-%d")
    )
}

const PERFORMANCE: &str = "Load Performance";
const SECURITY: &str = "Basic Security Checks";

/// Live-site round trips below these bounds are fast and acceptable
const FAST_RESPONSE_MS: u64 = 1000;
const ACCEPTABLE_RESPONSE_MS: u64 = 3000;

/// Checklist areas and the issue categories that decide them
const CHECKLIST: [(&str, &[&str]); 6] = [
    ("UI/UX Responsiveness", &["Visual"]),
    ("Core Functionality", &["Fetch"]),
    ("Navigation Links", &["Links"]),
    (PERFORMANCE, &[]),
    (SECURITY, &["Security"]),
    ("Content Verification", &["Content", "Grammar"]),
];

/// Default checklist, assessed from the analyzed pages where possible
pub fn assess_checklist(pages: &[PageResult]) -> Vec<ChecklistItem> {
    CHECKLIST
        .iter()
        .map(|(label, categories)| {
            let (status, comment) = if pages.is_empty() || categories.is_empty() {
                (ChecklistStatus::Pending, String::new())
            } else {
                let problems = pages
                    .iter()
                    .flat_map(|page| page.issues())
                    .filter(|issue| {
                        matches!(issue.kind, IssueKind::Error | IssueKind::Warning)
                            && categories.contains(&issue.category.as_str())
                    })
                    .count();
                if problems == 0 {
                    (ChecklistStatus::Pass, "No issues found by automated scan".to_string())
                } else {
                    (
                        ChecklistStatus::Fail,
                        format!("{} issue(s) found by automated scan", problems),
                    )
                }
            };
            ChecklistItem {
                category: label.to_string(),
                status,
                comment,
                attachments: 0,
            }
        })
        .collect()
}

/// Fold the live-site checks into an assessed checklist.
///
/// The live URL's scheme decides the security item. When the site was
/// probed, its response time decides the performance item. A failing
/// auto-check overrides a pass from the page scan, never the reverse.
pub fn apply_auto_checks(
    checklist: &mut [ChecklistItem],
    live_url: &str,
    availability: Option<Availability>,
) {
    let (status, comment) = if live_url.trim().starts_with("https://") {
        (ChecklistStatus::Pass, "Auto-check: URL uses HTTPS.")
    } else {
        (ChecklistStatus::Fail, "Auto-check: URL does not use HTTPS.")
    };
    record(checklist, SECURITY, status, comment.to_string());

    let Some(availability) = availability else {
        return;
    };
    let ms = availability.time_ms;
    let (status, comment) = match availability.status {
        ProbeStatus::Pass if ms < FAST_RESPONSE_MS => {
            (ChecklistStatus::Pass, format!("Auto-check: Fast response ({}ms).", ms))
        }
        ProbeStatus::Pass if ms < ACCEPTABLE_RESPONSE_MS => {
            (ChecklistStatus::Pass, format!("Auto-check: Acceptable response ({}ms).", ms))
        }
        ProbeStatus::Pass => (ChecklistStatus::Fail, format!("Auto-check: Slow response ({}ms).", ms)),
        ProbeStatus::Fail | ProbeStatus::Pending => {
            (ChecklistStatus::Fail, "Auto-check: Connection failed.".to_string())
        }
    };
    record(checklist, PERFORMANCE, status, comment);
}

fn record(checklist: &mut [ChecklistItem], category: &str, status: ChecklistStatus, comment: String) {
    let Some(item) = checklist.iter_mut().find(|item| item.category == category) else {
        return;
    };
    item.status = item.status.max(status);
    item.comment = if item.comment.is_empty() {
        comment
    } else {
        format!("{} {}", comment, item.comment)
    };
}

/// One-line overview of the analyzed pages
pub fn summarize(pages: &[PageResult]) -> String {
    let count = |verdict: Verdict| pages.iter().filter(|p| p.status() == verdict).count();
    let issues: usize = pages.iter().map(|p| p.issues().len()).sum();
    format!(
        "Analyzed {} pages: {} passed, {} with warnings, {} with errors ({} issues in total)",
        pages.len(),
        count(Verdict::Pass),
        count(Verdict::Warning),
        count(Verdict::Error),
        issues
    )
}

/// Assembles a `QaReport` from stored results plus a fresh look at the seed page
pub struct ReportExporter {
    fetcher: Arc<dyn HtmlFetcher>,
    probe: Option<Arc<dyn StatusProbe>>,
    grammar: Option<Arc<dyn GrammarChecker>>,
}

impl ReportExporter {
    pub fn new(fetcher: Arc<dyn HtmlFetcher>) -> Self {
        Self {
            fetcher,
            probe: None,
            grammar: None,
        }
    }

    /// Enable the live/beta availability comparison
    pub fn with_probe(mut self, probe: Arc<dyn StatusProbe>) -> Self {
        self.probe = Some(probe);
        self
    }

    /// Enable the grammar section
    pub fn with_grammar(mut self, grammar: Arc<dyn GrammarChecker>) -> Self {
        self.grammar = Some(grammar);
        self
    }

    pub async fn export(
        &self,
        project: &ProjectRef,
        pages: &[PageResult],
        summary: Option<String>,
    ) -> QaReport {
        let (seo_analysis, keywords, text) = self.inspect_seed(project).await;

        let grammar_issues = match (&self.grammar, text.as_deref()) {
            (Some(checker), Some(text)) if !text.is_empty() => {
                match checker.check(grammar::sample(text, GRAMMAR_SAMPLE_CHARS)).await {
                    Ok(matches) => Section::Ran(GrammarSummary::from(matches.as_slice())),
                    Err(e) => {
                        ::log::warn!("Grammar analysis for report failed: {}", e);
                        Section::NotRun
                    }
                }
            }
            _ => Section::NotRun,
        };

        let mut checklist = assess_checklist(pages);
        let live_site_url = project
            .live_site_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty());
        if let Some(live) = live_site_url {
            let availability = match &self.probe {
                Some(probe) => Some(probe.check(live).await),
                None => None,
            };
            ::log::debug!("Live site auto-check for {}: {:?}", live, availability);
            apply_auto_checks(&mut checklist, live, availability);
        }

        QaReport {
            project: project.name.clone(),
            date: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            summary: summary.unwrap_or_else(|| summarize(pages)),
            checklist,
            url_comparison: self.compare(project, pages).await,
            seo_analysis,
            keyword_density: keywords,
            grammar_issues,
        }
    }

    /// SEO summary, keyword table and visible text of the project's seed page
    async fn inspect_seed(
        &self,
        project: &ProjectRef,
    ) -> (Section<PageSeoAnalysis>, Section<Vec<KeywordDensity>>, Option<String>) {
        let Some(seed) = project.beta_site_url.as_deref() else {
            return (Section::NotRun, Section::NotRun, None);
        };
        let Ok(seed_url) = Url::parse(seed) else {
            ::log::warn!("Seed URL {} is not valid; skipping content analysis", seed);
            return (Section::NotRun, Section::NotRun, None);
        };

        match self.fetcher.fetch_html(seed).await {
            Ok(page) => {
                let (analysis, text) = analyze_page(&seed_url, &page);
                let keywords = keyword_density(&text);
                let keywords = if keywords.is_empty() {
                    Section::NotRun
                } else {
                    Section::Ran(keywords)
                };
                (Section::Ran(analysis), keywords, Some(text))
            }
            Err(e) => {
                ::log::warn!("Could not fetch {} for content analysis: {}", seed, e);
                (Section::NotRun, Section::NotRun, None)
            }
        }
    }

    async fn compare(&self, project: &ProjectRef, pages: &[PageResult]) -> Vec<UrlComparison> {
        let (Some(probe), Some(live), Some(beta)) = (
            &self.probe,
            project.live_site_url.as_deref(),
            project.beta_site_url.as_deref(),
        ) else {
            return Vec::new();
        };
        let paths = page_paths(pages.iter().map(|p| p.url.as_str()));
        compare_sites(probe.as_ref(), live, beta, &paths).await
    }
}
