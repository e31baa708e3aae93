use crate::results::{PageResult, ProjectRef, Verdict};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Lifecycle of a scan
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanPhase {
    #[default]
    Idle,
    Discovering,
    AwaitingSelection,
    Scanning,
    Completed,
    Cancelled,
}

impl ScanPhase {
    /// Whether a fresh analysis may start from this phase
    pub fn can_begin_analysis(self) -> bool {
        matches!(
            self,
            ScanPhase::AwaitingSelection | ScanPhase::Completed | ScanPhase::Cancelled
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, ScanPhase::Completed | ScanPhase::Cancelled)
    }
}

/// Everything needed to display or resume a scan
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanState {
    #[serde(default)]
    pub project: Option<ProjectRef>,

    #[serde(default)]
    pub phase: ScanPhase,

    #[serde(default)]
    pub discovered_urls: Vec<String>,

    /// Pages chosen for analysis, in selection order without duplicates
    #[serde(default)]
    pub selected_urls: Vec<String>,

    /// Page results in completion order
    #[serde(default)]
    pub results: Vec<PageResult>,

    #[serde(default)]
    pub progress_percent: u8,

    #[serde(default)]
    pub is_running: bool,

    #[serde(default)]
    pub cancel_requested: bool,
}

impl ScanState {
    pub fn new(project: ProjectRef) -> Self {
        Self {
            project: Some(project),
            ..Self::default()
        }
    }

    /// Number of selected pages that already have a result
    pub fn completed(&self) -> usize {
        let selected: HashSet<&str> = self.selected_urls.iter().map(String::as_str).collect();
        self.results
            .iter()
            .filter(|r| selected.contains(r.url.as_str()))
            .count()
    }

    /// Selected pages still waiting for a result, in selection order
    pub fn pending_urls(&self) -> Vec<String> {
        let done: HashSet<&str> = self.results.iter().map(|r| r.url.as_str()).collect();
        self.selected_urls
            .iter()
            .filter(|url| !done.contains(url.as_str()))
            .cloned()
            .collect()
    }

    pub fn recompute_progress(&mut self) {
        self.progress_percent = progress_percent(self.completed(), self.selected_urls.len());
    }

    /// Insert a result, replacing any earlier result for the same URL
    pub fn upsert_result(&mut self, result: PageResult) {
        self.results.retain(|r| r.url != result.url);
        self.results.push(result);
    }
}

/// `round(100 * completed / total)`, zero when nothing is selected
pub fn progress_percent(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let percent = (100.0 * completed as f64 / total as f64).round();
    percent.clamp(0.0, 100.0) as u8
}

/// Remove duplicates and blanks, keeping the first occurrence
pub fn dedupe_urls(urls: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    urls.into_iter()
        .map(|url| url.trim().to_string())
        .filter(|url| !url.is_empty() && seen.insert(url.clone()))
        .collect()
}

/// Notifications emitted while a scan runs
#[derive(Debug, Clone, PartialEq)]
pub enum ScanEvent {
    PhaseChanged(ScanPhase),
    DiscoveryFinished { urls: usize },
    ChunkStarted { index: usize, size: usize },
    PageAnalyzed { url: String, status: Verdict },
    Progress { completed: usize, total: usize, percent: u8 },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(url: &str) -> PageResult {
        PageResult::new(url, "t", Vec::new(), None, None)
    }

    #[test]
    fn test_progress_percent_rounds() {
        assert_eq!(progress_percent(0, 0), 0);
        assert_eq!(progress_percent(1, 3), 33);
        assert_eq!(progress_percent(2, 3), 67);
        assert_eq!(progress_percent(3, 3), 100);
        assert_eq!(progress_percent(1, 8), 13);
    }

    #[test]
    fn test_dedupe_keeps_first_occurrence() {
        let urls = vec!["b", "a", " b ", "", "c", "a"]
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(dedupe_urls(urls), vec!["b", "a", "c"]);
    }

    #[test]
    fn test_upsert_replaces_by_url() {
        let mut state = ScanState::default();
        state.selected_urls = vec!["a".into(), "b".into()];
        state.upsert_result(result("a"));
        state.upsert_result(result("b"));
        state.upsert_result(PageResult::new("a", "again", Vec::new(), None, None));

        assert_eq!(state.results.len(), 2);
        assert_eq!(state.results[1].title, "again");
        assert_eq!(state.completed(), 2);
    }

    #[test]
    fn test_pending_urls() {
        let mut state = ScanState::default();
        state.selected_urls = vec!["a".into(), "b".into(), "c".into()];
        state.results = vec![result("b")];
        assert_eq!(state.pending_urls(), vec!["a", "c"]);

        state.recompute_progress();
        assert_eq!(state.progress_percent, 33);
    }

    #[test]
    fn test_state_json_shape() {
        let state = ScanState::new(ProjectRef::new("Shop", "https://beta.example.com", None));
        let value = serde_json::to_value(&state).unwrap();
        assert_eq!(value["phase"], "idle");
        assert_eq!(value["progressPercent"], 0);
        assert_eq!(value["isRunning"], false);

        let restored: ScanState = serde_json::from_str(r#"{"phase":"scanning"}"#).unwrap();
        assert_eq!(restored.phase, ScanPhase::Scanning);
        assert!(restored.project.is_none());
    }
}
