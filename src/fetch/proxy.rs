use crate::config::{FetchSettings, ProxyEndpoint};
use crate::fetch::{FetchError, HtmlFetcher};
use crate::filter::is_localhost;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

/// Bodies at or below this many characters are treated as a proxy failure
const MIN_CONTENT_CHARS: usize = 50;

/// Envelope returned by JSON-wrapping proxies
#[derive(Debug, Deserialize)]
struct Envelope {
    contents: Option<String>,
}

/// Fetches page HTML through a chain of public CORS proxies.
///
/// Proxies are tried in order and the first one returning a non-trivial body
/// wins. Failures of earlier proxies are logged and swallowed; when every
/// proxy fails the last error is returned.
pub struct ProxyFetcher {
    client: reqwest::Client,
    proxies: Vec<ProxyEndpoint>,
    direct_localhost: bool,
}

impl ProxyFetcher {
    /// Create a fetcher with its own HTTP client
    pub fn new(settings: &FetchSettings, user_agent: &str) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .user_agent(user_agent)
            .build()
            .map_err(|source| FetchError::Transport {
                source_name: "client".to_string(),
                source,
            })?;

        Ok(Self::with_client(client, settings))
    }

    /// Create a fetcher around an existing client
    pub fn with_client(client: reqwest::Client, settings: &FetchSettings) -> Self {
        Self {
            client,
            proxies: settings.proxies.clone(),
            direct_localhost: settings.direct_localhost,
        }
    }

    /// Build the request URL for a proxy and target
    pub fn proxy_url(endpoint: &ProxyEndpoint, target: &str) -> String {
        let encoded: String = url::form_urlencoded::byte_serialize(target.as_bytes()).collect();
        endpoint
            .template
            .replace("{url}", &encoded)
            .replace("{ts}", &chrono::Utc::now().timestamp_millis().to_string())
    }

    /// Fetch a target through one proxy
    async fn fetch_via(&self, endpoint: &ProxyEndpoint, target: &str) -> Result<String, FetchError> {
        let request_url = Self::proxy_url(endpoint, target);
        ::log::trace!("Fetching {} via {}", target, endpoint.name);

        let body = self.get_text(&endpoint.name, &request_url).await?;
        let html = if endpoint.json_envelope {
            parse_envelope(&endpoint.name, &body)?
        } else {
            body
        };

        ensure_content(&endpoint.name, html)
    }

    /// Fetch a target without any proxy
    async fn fetch_direct(&self, target: &str) -> Result<String, FetchError> {
        ::log::debug!("Fetching {} directly", target);
        let body = self.get_text("direct", target).await?;
        ensure_content("direct", body)
    }

    async fn get_text(&self, source_name: &str, request_url: &str) -> Result<String, FetchError> {
        let response = self
            .client
            .get(request_url)
            .send()
            .await
            .map_err(|source| FetchError::Transport {
                source_name: source_name.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                source_name: source_name.to_string(),
                status: status.as_u16(),
            });
        }

        response.text().await.map_err(|source| FetchError::Transport {
            source_name: source_name.to_string(),
            source,
        })
    }
}

#[async_trait]
impl HtmlFetcher for ProxyFetcher {
    async fn fetch_html(&self, url: &str) -> Result<String, FetchError> {
        // Public proxies cannot reach a developer machine
        if self.direct_localhost && is_localhost(url) {
            return self.fetch_direct(url).await;
        }

        let mut last_error = None;
        for endpoint in &self.proxies {
            match self.fetch_via(endpoint, url).await {
                Ok(html) => {
                    ::log::debug!("Fetched {} via {} ({} bytes)", url, endpoint.name, html.len());
                    return Ok(html);
                }
                Err(e) => {
                    ::log::warn!("Proxy {} failed for {}: {}", endpoint.name, url, e);
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| FetchError::NoStrategy(url.to_string())))
    }
}

/// Extract the page from a `{"contents": ...}` envelope
fn parse_envelope(source_name: &str, body: &str) -> Result<String, FetchError> {
    let envelope: Envelope =
        serde_json::from_str(body).map_err(|e| FetchError::Other(format!("{}: {}", source_name, e)))?;

    match envelope.contents {
        Some(contents) if !contents.is_empty() => Ok(contents),
        _ => Err(FetchError::NoContent {
            source_name: source_name.to_string(),
        }),
    }
}

fn ensure_content(source_name: &str, html: String) -> Result<String, FetchError> {
    if html.chars().count() > MIN_CONTENT_CHARS {
        Ok(html)
    } else {
        Err(FetchError::NoContent {
            source_name: source_name.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::net::SocketAddr;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    const PAGE: &str = "<html><head><title>Fixture page</title></head><body><p>Hello from the fixture</p></body></html>";

    /// Serve canned responses keyed by request path
    async fn spawn_server(routes: HashMap<&'static str, (u16, String)>) -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let routes = routes.clone();
                tokio::spawn(async move {
                    let mut buf = Vec::new();
                    let mut chunk = [0u8; 1024];
                    loop {
                        let n = socket.read(&mut chunk).await.unwrap_or(0);
                        if n == 0 {
                            break;
                        }
                        buf.extend_from_slice(&chunk[..n]);
                        if buf.windows(4).any(|w| w == b"\r\n\r\n") {
                            break;
                        }
                    }

                    let request = String::from_utf8_lossy(&buf).to_string();
                    let target = request.split_whitespace().nth(1).unwrap_or("/");
                    let path = target.split('?').next().unwrap_or("/");
                    let (status, body) = routes.get(path).cloned().unwrap_or((404, String::new()));

                    let response = format!(
                        "HTTP/1.1 {} Fixture\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                        status,
                        body.len(),
                        body
                    );
                    let _ = socket.write_all(response.as_bytes()).await;
                    let _ = socket.shutdown().await;
                });
            }
        });

        addr
    }

    fn endpoint(addr: SocketAddr, name: &str, json_envelope: bool) -> ProxyEndpoint {
        ProxyEndpoint {
            name: name.to_string(),
            template: format!("http://{}/{}?target={{url}}", addr, name),
            json_envelope,
        }
    }

    fn fetcher(proxies: Vec<ProxyEndpoint>) -> ProxyFetcher {
        let settings = FetchSettings {
            proxies,
            timeout_secs: 5,
            direct_localhost: true,
        };
        let client = reqwest::Client::builder()
            .no_proxy()
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap();
        ProxyFetcher::with_client(client, &settings)
    }

    #[test]
    fn test_proxy_url_encodes_target() {
        let endpoint = ProxyEndpoint {
            name: "a".to_string(),
            template: "https://proxy.test/?{url}".to_string(),
            json_envelope: false,
        };
        let url = ProxyFetcher::proxy_url(&endpoint, "https://example.com/a?b=c");
        assert_eq!(url, "https://proxy.test/?https%3A%2F%2Fexample.com%2Fa%3Fb%3Dc");
    }

    #[test]
    fn test_proxy_url_timestamp() {
        let endpoint = ProxyEndpoint {
            name: "b".to_string(),
            template: "https://proxy.test/get?url={url}&timestamp={ts}".to_string(),
            json_envelope: true,
        };
        let url = ProxyFetcher::proxy_url(&endpoint, "https://example.com");
        assert!(!url.contains("{ts}"));
        assert!(url.contains("&timestamp="));
    }

    #[test]
    fn test_parse_envelope() {
        let body = r#"{"contents": "<html></html>", "status": {"http_code": 200}}"#;
        assert_eq!(parse_envelope("b", body).unwrap(), "<html></html>");

        assert!(matches!(
            parse_envelope("b", r#"{"status": {}}"#),
            Err(FetchError::NoContent { .. })
        ));
        assert!(matches!(
            parse_envelope("b", r#"{"contents": ""}"#),
            Err(FetchError::NoContent { .. })
        ));
        assert!(parse_envelope("b", "not json").is_err());
    }

    #[tokio::test]
    async fn test_falls_back_to_next_proxy() {
        let envelope = serde_json::json!({ "contents": PAGE }).to_string();
        let routes = HashMap::from([
            ("/a", (500, "upstream down".to_string())),
            ("/b", (200, envelope)),
            ("/c", (200, "<html>should not be reached, proxy b already won</html>".to_string())),
        ]);
        let addr = spawn_server(routes).await;

        let fetcher = fetcher(vec![
            endpoint(addr, "a", false),
            endpoint(addr, "b", true),
            endpoint(addr, "c", false),
        ]);
        let html = fetcher.fetch_html("https://example.com/page").await.unwrap();
        assert_eq!(html, PAGE);
    }

    #[tokio::test]
    async fn test_short_body_counts_as_failure() {
        let routes = HashMap::from([
            ("/a", (200, "<html></html>".to_string())),
            ("/c", (200, PAGE.to_string())),
        ]);
        let addr = spawn_server(routes).await;

        let fetcher = fetcher(vec![endpoint(addr, "a", false), endpoint(addr, "c", false)]);
        let html = fetcher.fetch_html("https://example.com/").await.unwrap();
        assert_eq!(html, PAGE);
    }

    #[tokio::test]
    async fn test_all_proxies_fail_returns_last_error() {
        let routes = HashMap::from([
            ("/a", (503, String::new())),
            ("/b", (200, r#"{"contents": null}"#.to_string())),
        ]);
        let addr = spawn_server(routes).await;

        let fetcher = fetcher(vec![
            endpoint(addr, "a", false),
            endpoint(addr, "b", true),
            endpoint(addr, "c", false),
        ]);
        let err = fetcher.fetch_html("https://example.com/").await.unwrap_err();
        match err {
            FetchError::Status { source_name, status } => {
                assert_eq!(source_name, "c");
                assert_eq!(status, 404);
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[tokio::test]
    async fn test_localhost_fetched_directly() {
        let routes = HashMap::from([("/page", (200, PAGE.to_string()))]);
        let addr = spawn_server(routes).await;

        // No proxy configured; the fixture server itself answers on 127.0.0.1
        let fetcher = fetcher(Vec::new());
        let html = fetcher
            .fetch_html(&format!("http://{}/page", addr))
            .await
            .unwrap();
        assert_eq!(html, PAGE);
    }

    #[tokio::test]
    async fn test_no_proxies_configured() {
        let fetcher = fetcher(Vec::new());
        let err = fetcher.fetch_html("https://example.com/").await.unwrap_err();
        assert!(matches!(err, FetchError::NoStrategy(_)));
    }
}
