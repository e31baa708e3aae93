use serde::{Deserialize, Deserializer, Serialize};

/// Project record that seeds a scan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectRef {
    /// Display name of the project
    pub name: String,

    /// Pre-release site the crawl starts from
    #[serde(default)]
    pub beta_site_url: Option<String>,

    /// Production site used for screenshot comparison
    #[serde(default)]
    pub live_site_url: Option<String>,
}

impl ProjectRef {
    /// Create a new project reference
    pub fn new(name: &str, beta_site_url: &str, live_site_url: Option<&str>) -> Self {
        Self {
            name: name.to_string(),
            beta_site_url: Some(beta_site_url.to_string()),
            live_site_url: live_site_url.map(|s| s.to_string()),
        }
    }
}

/// Severity of an issue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueKind {
    Error,
    Warning,
    Info,
    Success,
}

/// A single finding produced by one of the page checks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    #[serde(rename = "type")]
    pub kind: IssueKind,
    pub category: String,
    pub message: String,
}

impl Issue {
    pub fn new(kind: IssueKind, category: &str, message: impl Into<String>) -> Self {
        Self {
            kind,
            category: category.to_string(),
            message: message.into(),
        }
    }

    pub fn error(category: &str, message: impl Into<String>) -> Self {
        Self::new(IssueKind::Error, category, message)
    }

    pub fn warning(category: &str, message: impl Into<String>) -> Self {
        Self::new(IssueKind::Warning, category, message)
    }

    pub fn info(category: &str, message: impl Into<String>) -> Self {
        Self::new(IssueKind::Info, category, message)
    }

    pub fn success(category: &str, message: impl Into<String>) -> Self {
        Self::new(IssueKind::Success, category, message)
    }

    pub fn is_error(&self) -> bool {
        self.kind == IssueKind::Error
    }
}

/// Overall verdict of an analyzed page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    Pass,
    Warning,
    Error,
}

impl Verdict {
    /// Derive the verdict from a list of issues.
    ///
    /// Any `error` issue makes the page `Error`; otherwise any issue at all
    /// (including info and success entries) makes it `Warning`.
    pub fn from_issues(issues: &[Issue]) -> Self {
        if issues.iter().any(Issue::is_error) {
            Verdict::Error
        } else if !issues.is_empty() {
            Verdict::Warning
        } else {
            Verdict::Pass
        }
    }
}

/// Screenshots captured for one URL, one slot per device
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenshotSet {
    pub mobile: Option<String>,
    pub tablet: Option<String>,
    pub desktop: Option<String>,
}

impl ScreenshotSet {
    /// Number of devices that produced an image
    pub fn captured(&self) -> usize {
        [&self.mobile, &self.tablet, &self.desktop]
            .iter()
            .filter(|slot| slot.is_some())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.captured() == 0
    }
}

/// Result of analyzing a single page
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageResult {
    pub url: String,
    pub title: String,
    status: Verdict,
    issues: Vec<Issue>,
    pub screenshots: Option<ScreenshotSet>,
    pub live_screenshots: Option<ScreenshotSet>,
}

impl PageResult {
    /// Create a page result; the verdict is derived from the issues
    pub fn new(
        url: &str,
        title: &str,
        issues: Vec<Issue>,
        screenshots: Option<ScreenshotSet>,
        live_screenshots: Option<ScreenshotSet>,
    ) -> Self {
        Self {
            url: url.to_string(),
            title: title.to_string(),
            status: Verdict::from_issues(&issues),
            issues,
            screenshots,
            live_screenshots,
        }
    }

    /// Result for a page that could not be fetched at all
    pub fn fetch_failed(url: &str, reason: &str) -> Self {
        Self::new(
            url,
            "Fetch Failed",
            vec![Issue::error(
                "Fetch",
                format!("Could not fetch page: {}", reason),
            )],
            None,
            None,
        )
    }

    pub fn status(&self) -> Verdict {
        self.status
    }

    pub fn issues(&self) -> &[Issue] {
        &self.issues
    }

    pub fn count(&self, kind: IssueKind) -> usize {
        self.issues.iter().filter(|i| i.kind == kind).count()
    }
}

// Stored results recompute their verdict so a hand-edited or stale status
// can never disagree with the issue list.
impl<'de> Deserialize<'de> for PageResult {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Raw {
            url: String,
            #[serde(default)]
            title: String,
            #[serde(default)]
            issues: Vec<Issue>,
            #[serde(default)]
            screenshots: Option<ScreenshotSet>,
            #[serde(default)]
            live_screenshots: Option<ScreenshotSet>,
        }

        let raw = Raw::deserialize(deserializer)?;
        Ok(PageResult::new(
            &raw.url,
            &raw.title,
            raw.issues,
            raw.screenshots,
            raw.live_screenshots,
        ))
    }
}
