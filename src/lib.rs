// Re-export modules
pub mod analysis;
pub mod capture;
pub mod config;
pub mod crawlers;
pub mod fetch;
pub mod filter;
pub mod grammar;
pub mod parsers;
pub mod report;
pub mod results;
pub mod scan;
pub mod store;
pub mod utils;

#[cfg(test)]
pub mod test_support;

// Re-export commonly used types for convenience
pub use config::QaConfig;
pub use results::{Issue, IssueKind, PageResult, ProjectRef, Verdict};
pub use scan::{ScanOrchestrator, ScanPhase, ScanState};

use analysis::PageAnalyzer;
use capture::{CaptureServiceClient, VisualCaptureAdapter};
use crawlers::LinkDiscoverer;
use fetch::{HtmlFetcher, ProxyFetcher};
use grammar::{GrammarChecker, LanguageToolClient};
use report::ReportExporter;
use report::compare::HeadProbe;
use std::sync::Arc;
use store::{MemoryReportStore, ReportStore};

/// Main builder wiring the fetcher, analyzer and store into a scan
pub struct Scanner {
    config: QaConfig,
    store: Arc<dyn ReportStore>,
}

impl Scanner {
    /// Create a new Scanner with the given configuration and an in-memory store
    pub fn new(config: QaConfig) -> Self {
        Self {
            config,
            store: Arc::new(MemoryReportStore::new()),
        }
    }

    /// Load configuration from a file
    pub fn with_config_file(
        self,
        path: impl AsRef<std::path::Path>,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let config = QaConfig::from_file(path)?;
        Ok(Self { config, ..self })
    }

    /// Load configuration from a string
    pub fn with_config_str(self, config_str: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let config = QaConfig::from_json(config_str)?;
        Ok(Self { config, ..self })
    }

    /// Persist scan state and reports in the given store
    pub fn with_store(mut self, store: Arc<dyn ReportStore>) -> Self {
        self.store = store;
        self
    }

    /// Set the number of pages analyzed at once
    pub fn with_concurrency(mut self, concurrent_scans: usize) -> Self {
        self.config.scan.concurrent_scans = concurrent_scans.max(1);
        self
    }

    pub fn config(&self) -> &QaConfig {
        &self.config
    }

    pub fn store(&self) -> Arc<dyn ReportStore> {
        self.store.clone()
    }

    /// Build a fresh orchestrator in the idle phase
    pub fn build(&self) -> Result<ScanOrchestrator, Box<dyn std::error::Error>> {
        let (fetcher, analyzer) = self.components()?;
        Ok(ScanOrchestrator::new(
            Arc::new(LinkDiscoverer::new(fetcher)),
            analyzer,
            self.store.clone(),
            self.config.scan.clone(),
        ))
    }

    /// Build an orchestrator from the state saved in the store
    pub fn restore(&self) -> Result<ScanOrchestrator, Box<dyn std::error::Error>> {
        let (fetcher, analyzer) = self.components()?;
        Ok(ScanOrchestrator::restore(
            Arc::new(LinkDiscoverer::new(fetcher)),
            analyzer,
            self.store.clone(),
            self.config.scan.clone(),
        )?)
    }

    /// Report exporter sharing this scanner's fetch and grammar settings
    pub fn exporter(&self) -> Result<ReportExporter, Box<dyn std::error::Error>> {
        let mut exporter = ReportExporter::new(self.fetcher()?).with_probe(Arc::new(HeadProbe::new()?));
        if let Some(grammar) = self.grammar()? {
            exporter = exporter.with_grammar(grammar);
        }
        Ok(exporter)
    }

    fn fetcher(&self) -> Result<Arc<dyn HtmlFetcher>, Box<dyn std::error::Error>> {
        let fetcher = ProxyFetcher::new(&self.config.fetch, &self.config.scan.user_agent)?;
        Ok(Arc::new(fetcher))
    }

    fn grammar(&self) -> Result<Option<Arc<dyn GrammarChecker>>, Box<dyn std::error::Error>> {
        if !self.config.checks.check_grammar {
            return Ok(None);
        }
        Ok(Some(Arc::new(LanguageToolClient::new(&self.config.grammar)?)))
    }

    fn components(
        &self,
    ) -> Result<(Arc<dyn HtmlFetcher>, Arc<PageAnalyzer>), Box<dyn std::error::Error>> {
        let fetcher = self.fetcher()?;
        let mut analyzer = PageAnalyzer::new(fetcher.clone(), self.config.checks.clone());

        if self.config.checks.check_visual_quality {
            // Override the capture service URL with an environment variable if provided
            let mut with_env = self.config.clone();
            with_env.apply_env();
            let client = CaptureServiceClient::new(&with_env.capture)?;
            analyzer = analyzer.with_capture(VisualCaptureAdapter::new(Arc::new(client)));
        }
        if let Some(grammar) = self.grammar()? {
            analyzer = analyzer.with_grammar(grammar);
        }

        Ok((fetcher, Arc::new(analyzer)))
    }
}
