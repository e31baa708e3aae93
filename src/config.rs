use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use thiserror::Error;

/// Environment variable that overrides the screenshot service URL
pub const CAPTURE_URL_ENV: &str = "QA_CAPTURE_URL";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config: {0}")]
    Json(#[from] serde_json::Error),
}

/// Top-level configuration for a QA scan
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QaConfig {
    #[serde(default)]
    pub scan: ScanSettings,

    #[serde(default)]
    pub checks: CheckToggles,

    #[serde(default)]
    pub fetch: FetchSettings,

    #[serde(default)]
    pub capture: CaptureSettings,

    #[serde(default)]
    pub grammar: GrammarSettings,
}

/// Discovery and orchestration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanSettings {
    /// Number of pages analyzed concurrently in one chunk
    #[serde(default = "default_concurrent_scans")]
    pub concurrent_scans: usize,

    /// Maximum number of link hops from the seed URL
    #[serde(default = "default_discovery_depth")]
    pub discovery_depth: usize,

    /// Maximum number of discovered pages
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,

    /// Pause between chunks, in milliseconds
    #[serde(default = "default_chunk_delay_ms")]
    pub chunk_delay_ms: u64,

    /// User agent sent on direct requests
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

/// Which analysis stages run for each page
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckToggles {
    #[serde(default)]
    pub check_grammar: bool,

    #[serde(default = "default_true")]
    pub check_broken_links: bool,

    #[serde(default = "default_true")]
    pub check_images: bool,

    #[serde(default = "default_true")]
    pub check_dummy_content: bool,

    #[serde(default = "default_true")]
    pub check_visual_quality: bool,
}

/// One entry of the proxy chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyEndpoint {
    /// Name used in logs and errors
    pub name: String,

    /// URL template; `{url}` is replaced by the encoded target, `{ts}` by a timestamp
    pub template: String,

    /// Whether the proxy wraps the page in a `{"contents": ...}` envelope
    #[serde(default)]
    pub json_envelope: bool,
}

/// Settings for fetching remote HTML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchSettings {
    /// Proxies tried in order until one returns content
    #[serde(default = "default_proxies")]
    pub proxies: Vec<ProxyEndpoint>,

    /// Per-request timeout in seconds
    #[serde(default = "default_fetch_timeout_secs")]
    pub timeout_secs: u64,

    /// Fetch localhost targets directly instead of through public proxies
    #[serde(default = "default_true")]
    pub direct_localhost: bool,
}

/// Settings for the external screenshot service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureSettings {
    #[serde(default = "default_capture_url")]
    pub service_url: String,

    #[serde(default = "default_capture_timeout_secs")]
    pub timeout_secs: u64,
}

/// Settings for the external grammar service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrammarSettings {
    #[serde(default = "default_grammar_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_grammar_language")]
    pub language: String,
}

fn default_true() -> bool {
    true
}

/// Default value for concurrent_scans
fn default_concurrent_scans() -> usize {
    3
}

/// Default value for discovery_depth
fn default_discovery_depth() -> usize {
    2
}

/// Default value for max_pages
fn default_max_pages() -> usize {
    50
}

fn default_chunk_delay_ms() -> u64 {
    1000
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) QA-Scanner/1.0".to_string()
}

/// Default proxy chain
fn default_proxies() -> Vec<ProxyEndpoint> {
    vec![
        ProxyEndpoint {
            name: "corsproxy".to_string(),
            template: "https://corsproxy.io/?{url}".to_string(),
            json_envelope: false,
        },
        ProxyEndpoint {
            name: "allorigins".to_string(),
            template: "https://api.allorigins.win/get?url={url}&timestamp={ts}".to_string(),
            json_envelope: true,
        },
        ProxyEndpoint {
            name: "codetabs".to_string(),
            template: "https://api.codetabs.com/v1/proxy?quest={url}".to_string(),
            json_envelope: false,
        },
    ]
}

fn default_fetch_timeout_secs() -> u64 {
    30
}

fn default_capture_url() -> String {
    "http://localhost:5000".to_string()
}

fn default_capture_timeout_secs() -> u64 {
    60
}

fn default_grammar_endpoint() -> String {
    "https://api.languagetool.org/v2/check".to_string()
}

fn default_grammar_language() -> String {
    "en-US".to_string()
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            concurrent_scans: default_concurrent_scans(),
            discovery_depth: default_discovery_depth(),
            max_pages: default_max_pages(),
            chunk_delay_ms: default_chunk_delay_ms(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for CheckToggles {
    fn default() -> Self {
        Self {
            check_grammar: false,
            check_broken_links: true,
            check_images: true,
            check_dummy_content: true,
            check_visual_quality: true,
        }
    }
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            proxies: default_proxies(),
            timeout_secs: default_fetch_timeout_secs(),
            direct_localhost: true,
        }
    }
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            service_url: default_capture_url(),
            timeout_secs: default_capture_timeout_secs(),
        }
    }
}

impl Default for GrammarSettings {
    fn default() -> Self {
        Self {
            endpoint: default_grammar_endpoint(),
            language: default_grammar_language(),
        }
    }
}

impl QaConfig {
    /// Load configuration from a file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let mut file = File::open(path)?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;

        Self::from_json(&contents)
    }

    /// Load configuration from a JSON string
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        Ok(config)
    }

    /// Apply overrides taken from the environment
    pub fn apply_env(&mut self) {
        if let Ok(capture_url) = std::env::var(CAPTURE_URL_ENV) {
            if !capture_url.is_empty() {
                ::log::debug!("Using capture service from {}: {}", CAPTURE_URL_ENV, capture_url);
                self.capture.service_url = capture_url;
            }
        }
    }
}
