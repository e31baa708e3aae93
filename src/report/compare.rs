//! Availability comparison between the live and beta sites.

use async_trait::async_trait;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use url::Url;

/// Ceiling for one availability request
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeStatus {
    Pending,
    Pass,
    Fail,
}

/// Outcome of one availability check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Availability {
    pub status: ProbeStatus,
    /// Round-trip time in milliseconds, zero on failure
    pub time_ms: u64,
}

impl Availability {
    pub fn reachable(elapsed: Duration) -> Self {
        Self {
            status: ProbeStatus::Pass,
            time_ms: elapsed.as_millis() as u64,
        }
    }

    pub fn unreachable() -> Self {
        Self {
            status: ProbeStatus::Fail,
            time_ms: 0,
        }
    }
}

/// Checks whether a URL answers at all
#[async_trait]
pub trait StatusProbe: Send + Sync {
    async fn check(&self, url: &str) -> Availability;
}

/// Availability check through a `HEAD` request
pub struct HeadProbe {
    client: reqwest::Client,
}

impl HeadProbe {
    pub fn new() -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(PROBE_TIMEOUT).build()?;
        Ok(Self { client })
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl StatusProbe for HeadProbe {
    async fn check(&self, url: &str) -> Availability {
        let start = Instant::now();
        match self.client.head(url).send().await {
            Ok(response) if response.status().is_client_error() || response.status().is_server_error() => {
                ::log::debug!("{} answered {}", url, response.status());
                Availability::unreachable()
            }
            Ok(_) => Availability::reachable(start.elapsed()),
            Err(e) => {
                ::log::debug!("Availability check failed for {}: {}", url, e);
                Availability::unreachable()
            }
        }
    }
}

/// One path checked on both sites
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UrlComparison {
    pub path: String,
    pub live: String,
    pub beta: String,
    pub live_status: ProbeStatus,
    pub beta_status: ProbeStatus,
    pub live_time: u64,
    pub beta_time: u64,
}

impl UrlComparison {
    /// Pair the same path on both sites, not yet checked
    pub fn pending(live_base: &str, beta_base: &str, path: &str) -> Self {
        let path = path.trim();
        let path = if path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{}", path)
        };
        Self {
            live: format!("{}{}", live_base.trim_end_matches('/'), path),
            beta: format!("{}{}", beta_base.trim_end_matches('/'), path),
            path,
            live_status: ProbeStatus::Pending,
            beta_status: ProbeStatus::Pending,
            live_time: 0,
            beta_time: 0,
        }
    }
}

/// Distinct paths of the analyzed pages, in first-seen order
pub fn page_paths<'a>(urls: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut paths: Vec<String> = Vec::new();
    for url in urls {
        let Ok(parsed) = Url::parse(url) else {
            continue;
        };
        let path = parsed.path().to_string();
        if !paths.contains(&path) {
            paths.push(path);
        }
    }
    paths
}

/// Check every path on both sites concurrently
pub async fn compare_sites(
    probe: &dyn StatusProbe,
    live_base: &str,
    beta_base: &str,
    paths: &[String],
) -> Vec<UrlComparison> {
    let pending: Vec<UrlComparison> = paths
        .iter()
        .map(|path| UrlComparison::pending(live_base, beta_base, path))
        .collect();

    join_all(pending.into_iter().map(|mut item| async move {
        let (live, beta) = futures::join!(probe.check(&item.live), probe.check(&item.beta));
        item.live_status = live.status;
        item.live_time = live.time_ms;
        item.beta_status = beta.status;
        item.beta_time = beta.time_ms;
        item
    }))
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    struct FixedProbe {
        down: HashSet<String>,
    }

    #[async_trait]
    impl StatusProbe for FixedProbe {
        async fn check(&self, url: &str) -> Availability {
            if self.down.contains(url) {
                Availability::unreachable()
            } else {
                Availability::reachable(Duration::from_millis(12))
            }
        }
    }

    #[test]
    fn test_pending_normalizes_slashes() {
        let item = UrlComparison::pending("https://www.example.com/", "https://beta.example.com", "about");
        assert_eq!(item.path, "/about");
        assert_eq!(item.live, "https://www.example.com/about");
        assert_eq!(item.beta, "https://beta.example.com/about");
        assert_eq!(item.live_status, ProbeStatus::Pending);
    }

    #[test]
    fn test_page_paths_dedupes() {
        let paths = page_paths([
            "https://beta.example.com",
            "https://beta.example.com/about",
            "https://beta.example.com/about?x=1",
            "not a url",
        ]);
        assert_eq!(paths, vec!["/", "/about"]);
    }

    #[tokio::test]
    async fn test_compare_sites() {
        let probe = FixedProbe {
            down: ["https://beta.example.com/about".to_string()].into_iter().collect(),
        };
        let paths = vec!["/".to_string(), "/about".to_string()];

        let results = compare_sites(&probe, "https://www.example.com", "https://beta.example.com", &paths).await;
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].beta_status, ProbeStatus::Pass);
        assert_eq!(results[0].beta_time, 12);
        assert_eq!(results[1].live_status, ProbeStatus::Pass);
        assert_eq!(results[1].beta_status, ProbeStatus::Fail);
        assert_eq!(results[1].beta_time, 0);

        let value = serde_json::to_value(&results[1]).unwrap();
        assert_eq!(value["betaStatus"], "fail");
        assert_eq!(value["liveTime"], 12);
    }

    /// Answer every request on the listener with the given status line
    async fn spawn_status_server(status: u16) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                tokio::spawn(async move {
                    let mut buf = [0u8; 1024];
                    let _ = socket.read(&mut buf).await;
                    let response = format!(
                        "HTTP/1.1 {} Fixture\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
                        status
                    );
                    let _ = socket.write_all(response.as_bytes()).await;
                    let _ = socket.shutdown().await;
                });
            }
        });
        format!("http://{}/", addr)
    }

    fn local_probe() -> HeadProbe {
        let client = reqwest::Client::builder()
            .no_proxy()
            .timeout(PROBE_TIMEOUT)
            .build()
            .unwrap();
        HeadProbe::with_client(client)
    }

    #[tokio::test]
    async fn test_head_probe_statuses() {
        let probe = local_probe();

        let ok = spawn_status_server(200).await;
        assert_eq!(probe.check(&ok).await.status, ProbeStatus::Pass);

        let missing = spawn_status_server(404).await;
        assert_eq!(probe.check(&missing).await, Availability::unreachable());
    }
}
