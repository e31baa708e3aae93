use super::state::{ScanEvent, ScanPhase, ScanState, dedupe_urls};
use crate::analysis::PageAnalyzer;
use crate::config::ScanSettings;
use crate::crawlers::{DiscoveryError, SiteDiscoverer};
use crate::results::{PageResult, ProjectRef};
use crate::store::{ReportStore, StoreError};
use futures::future::join_all;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("project {project:?} has no beta site URL")]
    MissingSeedUrl { project: String },

    #[error("no pages selected for analysis")]
    EmptySelection,

    #[error("cannot {action} while {phase:?}")]
    InvalidTransition {
        phase: ScanPhase,
        action: &'static str,
    },

    #[error("discovery failed: {0}")]
    Discovery(#[from] DiscoveryError),

    #[error("store failed: {0}")]
    Store(#[from] StoreError),
}

/// Shared flag that asks a running scan to stop before its next chunk
#[derive(Debug, Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Drives a scan from project selection through chunked analysis
pub struct ScanOrchestrator {
    discoverer: Arc<dyn SiteDiscoverer>,
    analyzer: Arc<PageAnalyzer>,
    store: Arc<dyn ReportStore>,
    settings: ScanSettings,
    state: ScanState,
    cancel: CancelHandle,
    events: Option<mpsc::UnboundedSender<ScanEvent>>,
}

impl ScanOrchestrator {
    pub fn new(
        discoverer: Arc<dyn SiteDiscoverer>,
        analyzer: Arc<PageAnalyzer>,
        store: Arc<dyn ReportStore>,
        settings: ScanSettings,
    ) -> Self {
        Self {
            discoverer,
            analyzer,
            store,
            settings,
            state: ScanState::default(),
            cancel: CancelHandle::default(),
            events: None,
        }
    }

    /// Rebuild an orchestrator from the state persisted in `store`
    pub fn restore(
        discoverer: Arc<dyn SiteDiscoverer>,
        analyzer: Arc<PageAnalyzer>,
        store: Arc<dyn ReportStore>,
        settings: ScanSettings,
    ) -> Result<Self, ScanError> {
        let mut orchestrator = Self::new(discoverer, analyzer, store, settings);
        if let Some(mut state) = orchestrator.store.load_state()? {
            // Nothing can still be running after a restart
            state.is_running = false;
            if state.phase == ScanPhase::Discovering {
                ::log::warn!("Discarding interrupted discovery");
                state.phase = ScanPhase::Idle;
            }
            ::log::info!(
                "Restored scan in phase {:?} with {}/{} pages analyzed",
                state.phase,
                state.completed(),
                state.selected_urls.len()
            );
            orchestrator.state = state;
        }
        Ok(orchestrator)
    }

    /// Receive progress notifications on the given channel
    pub fn with_events(mut self, events: mpsc::UnboundedSender<ScanEvent>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn state(&self) -> &ScanState {
        &self.state
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Start a scan for a project: discover its pages and pre-select all of them
    pub async fn select_project(&mut self, project: ProjectRef) -> Result<&[String], ScanError> {
        if self.state.is_running {
            return Err(self.invalid("select a project"));
        }
        let Some(seed) = project
            .beta_site_url
            .clone()
            .filter(|url| !url.trim().is_empty())
        else {
            ::log::warn!("Project {} has no beta site URL", project.name);
            return Err(ScanError::MissingSeedUrl {
                project: project.name,
            });
        };

        self.state = ScanState::new(project);
        self.set_phase(ScanPhase::Discovering);

        let discovered = self
            .discoverer
            .discover(
                seed.trim(),
                self.settings.discovery_depth,
                self.settings.max_pages,
            )
            .await;
        let urls = match discovered {
            Ok(urls) => urls,
            Err(e) => {
                ::log::error!("Discovery failed for {}: {}", seed, e);
                self.set_phase(ScanPhase::Idle);
                return Err(e.into());
            }
        };

        ::log::info!("Discovered {} pages from {}", urls.len(), seed);
        self.emit(ScanEvent::DiscoveryFinished { urls: urls.len() });
        self.state.selected_urls = urls.clone();
        self.state.discovered_urls = urls;
        self.set_phase(ScanPhase::AwaitingSelection);
        self.persist_state();

        Ok(&self.state.discovered_urls)
    }

    /// Replace the selection; order is kept and duplicates dropped
    pub fn set_selection(&mut self, urls: Vec<String>) -> Result<(), ScanError> {
        if !self.state.phase.can_begin_analysis() {
            return Err(self.invalid("change the selection"));
        }
        self.state.selected_urls = dedupe_urls(urls);
        self.state.recompute_progress();
        self.persist_state();
        Ok(())
    }

    /// Analyze every selected page from scratch
    pub async fn begin_analysis(&mut self) -> Result<ScanPhase, ScanError> {
        if !self.state.phase.can_begin_analysis() || self.state.project.is_none() {
            return Err(self.invalid("begin analysis"));
        }
        if self.state.selected_urls.is_empty() {
            return Err(ScanError::EmptySelection);
        }

        self.state.results.clear();
        let pending = self.state.selected_urls.clone();
        Ok(self.run(pending).await)
    }

    /// Continue an interrupted or cancelled scan with the pages that have no result yet
    pub async fn resume_analysis(&mut self) -> Result<ScanPhase, ScanError> {
        let resumable = matches!(
            self.state.phase,
            ScanPhase::Scanning | ScanPhase::Cancelled
        );
        if !resumable || self.state.is_running || self.state.project.is_none() {
            return Err(self.invalid("resume analysis"));
        }
        if self.state.selected_urls.is_empty() {
            return Err(ScanError::EmptySelection);
        }

        let pending = self.state.pending_urls();
        ::log::info!("Resuming scan with {} pending pages", pending.len());
        Ok(self.run(pending).await)
    }

    /// Analyze one page again and replace its previous result
    pub async fn rescan_page(&mut self, url: &str) -> Result<PageResult, ScanError> {
        if self.state.is_running {
            return Err(self.invalid("rescan a page"));
        }
        let Some(project) = self.state.project.clone() else {
            return Err(self.invalid("rescan a page"));
        };

        let result = self
            .analyzer
            .analyze(url, project.live_site_url.as_deref())
            .await;
        self.emit(ScanEvent::PageAnalyzed {
            url: result.url.clone(),
            status: result.status(),
        });

        if !self.state.selected_urls.iter().any(|u| u == url) {
            self.state.selected_urls.push(url.to_string());
        }
        self.state.upsert_result(result.clone());
        self.state.recompute_progress();
        self.persist_state();
        self.persist_report();

        Ok(result)
    }

    /// Process `pending` in sequential chunks and settle into a terminal phase
    async fn run(&mut self, pending: Vec<String>) -> ScanPhase {
        let chunk_size = self.settings.concurrent_scans.max(1);
        let total = self.state.selected_urls.len();
        let live_site_url = self
            .state
            .project
            .as_ref()
            .and_then(|p| p.live_site_url.clone());

        // A cancel requested before this point still applies to this run
        self.state.cancel_requested = self.cancel.is_cancelled();
        self.state.is_running = true;
        self.state.recompute_progress();
        self.set_phase(ScanPhase::Scanning);
        self.persist_state();

        let chunks: Vec<&[String]> = pending.chunks(chunk_size).collect();
        let chunk_count = chunks.len();
        let mut cancelled = false;

        for (index, chunk) in chunks.into_iter().enumerate() {
            if self.cancel.is_cancelled() {
                ::log::info!("Scan cancelled before chunk {}/{}", index + 1, chunk_count);
                self.state.cancel_requested = true;
                cancelled = true;
                break;
            }

            ::log::debug!("Analyzing chunk {}/{} ({} pages)", index + 1, chunk_count, chunk.len());
            self.emit(ScanEvent::ChunkStarted {
                index,
                size: chunk.len(),
            });

            let analyzer = &self.analyzer;
            let results = join_all(
                chunk
                    .iter()
                    .map(|url| analyzer.analyze(url, live_site_url.as_deref())),
            )
            .await;

            for result in results {
                self.emit(ScanEvent::PageAnalyzed {
                    url: result.url.clone(),
                    status: result.status(),
                });
                self.state.upsert_result(result);
            }

            self.state.recompute_progress();
            if self.cancel.is_cancelled() {
                self.state.cancel_requested = true;
            }
            self.emit(ScanEvent::Progress {
                completed: self.state.completed(),
                total,
                percent: self.state.progress_percent,
            });
            self.persist_state();

            let is_last = index + 1 == chunk_count;
            if !is_last && !self.state.cancel_requested && self.settings.chunk_delay_ms > 0 {
                tokio::time::sleep(Duration::from_millis(self.settings.chunk_delay_ms)).await;
            }
        }

        // A cancel that arrives during the final chunk has nothing left to skip
        self.state.is_running = false;
        let phase = if cancelled {
            ScanPhase::Cancelled
        } else {
            self.state.cancel_requested = false;
            self.state.progress_percent = 100;
            ScanPhase::Completed
        };
        // The request has been honoured; a later resume starts clean
        self.cancel.reset();
        self.set_phase(phase);
        self.persist_state();
        self.persist_report();

        ::log::info!(
            "Scan {:?}: {}/{} pages analyzed",
            phase,
            self.state.completed(),
            total
        );
        phase
    }

    fn set_phase(&mut self, phase: ScanPhase) {
        self.state.phase = phase;
        self.emit(ScanEvent::PhaseChanged(phase));
    }

    fn emit(&self, event: ScanEvent) {
        if let Some(events) = &self.events {
            // A dropped receiver only means nobody is listening
            let _ = events.send(event);
        }
    }

    fn invalid(&self, action: &'static str) -> ScanError {
        ScanError::InvalidTransition {
            phase: self.state.phase,
            action,
        }
    }

    fn persist_state(&self) {
        if let Err(e) = self.store.save_state(&self.state) {
            ::log::error!("Failed to persist scan state: {}", e);
        }
    }

    fn persist_report(&self) {
        let Some(project) = &self.state.project else {
            return;
        };
        if let Err(e) = self.store.save_report(project, &self.state.results) {
            ::log::error!("Failed to persist report: {}", e);
        }
    }
}
