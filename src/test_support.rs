//! Fixture implementations of the network-facing traits.

use crate::capture::{CaptureError, Device, ScreenshotService};
use crate::fetch::{FetchError, HtmlFetcher};
use crate::grammar::{GrammarChecker, GrammarError, GrammarMatch};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

/// Serves HTML from an in-memory map; unknown URLs fail
#[derive(Default)]
pub struct FixtureFetcher {
    pages: HashMap<String, String>,
    calls: Mutex<Vec<String>>,
}

impl FixtureFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, url: &str, html: &str) -> Self {
        self.pages.insert(url.to_string(), html.to_string());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl HtmlFetcher for FixtureFetcher {
    async fn fetch_html(&self, url: &str) -> Result<String, FetchError> {
        self.calls.lock().unwrap().push(url.to_string());
        self.pages
            .get(url)
            .cloned()
            .ok_or_else(|| FetchError::Other(format!("no fixture for {}", url)))
    }
}

/// Screenshot service that fails for a configurable set of devices
#[derive(Default)]
pub struct FakeScreenshots {
    failing: HashSet<Device>,
    calls: Mutex<Vec<(String, Device)>>,
}

impl FakeScreenshots {
    pub fn failing(devices: &[Device]) -> Self {
        Self {
            failing: devices.iter().copied().collect(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<(String, Device)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ScreenshotService for FakeScreenshots {
    async fn capture_device(&self, url: &str, device: Device) -> Result<String, CaptureError> {
        self.calls.lock().unwrap().push((url.to_string(), device));
        if self.failing.contains(&device) {
            Err(CaptureError::Service {
                device,
                reason: "fixture failure".to_string(),
            })
        } else {
            Ok(format!("data:image/jpeg;base64,{}", device.name()))
        }
    }
}

/// Grammar checker returning a fixed number of matches
pub struct FakeGrammar {
    matches: usize,
    fail: bool,
    texts: Mutex<Vec<String>>,
}

impl FakeGrammar {
    pub fn with_matches(matches: usize) -> Self {
        Self {
            matches,
            fail: false,
            texts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            matches: 0,
            fail: true,
            texts: Mutex::new(Vec::new()),
        }
    }

    pub fn texts(&self) -> Vec<String> {
        self.texts.lock().unwrap().clone()
    }
}

#[async_trait]
impl GrammarChecker for FakeGrammar {
    async fn check(&self, text: &str) -> Result<Vec<GrammarMatch>, GrammarError> {
        self.texts.lock().unwrap().push(text.to_string());
        if self.fail {
            return Err(GrammarError::Service("fixture failure".to_string()));
        }
        Ok((0..self.matches)
            .map(|i| GrammarMatch {
                message: format!("match {}", i),
                ..GrammarMatch::default()
            })
            .collect())
    }
}
