use paperscan_core::{Error, FetchBackend, FetchRequest, FetchResponse, Result};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub mod acquire;
pub mod dedup;
pub mod extract;
pub mod filter;
pub mod input;
pub mod mentions;
pub mod openalex;
pub mod pipeline;
pub mod report;
pub mod similarity;
pub mod sink;
pub mod textprep;
pub mod validate;

pub use pipeline::Pipeline;

pub const DEFAULT_USER_AGENT: &str = concat!("paperscan-local/", env!("CARGO_PKG_VERSION"));

/// reqwest-backed fetcher. Holds no response data between calls.
#[derive(Debug, Clone)]
pub struct LocalFetcher {
    client: reqwest::Client,
    user_agents: Arc<Vec<String>>,
    next_agent: Arc<AtomicUsize>,
}

impl LocalFetcher {
    /// `user_agents` are rotated round-robin across requests. Blank entries are ignored; an
    /// empty list sends `DEFAULT_USER_AGENT`. A `User-Agent` in the request headers wins.
    pub fn new(user_agents: Vec<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::limited(10))
            // Avoid "hang forever" on DNS/TLS stalls; per-request timeouts still apply on top.
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| Error::Fetch(e.to_string()))?;
        let user_agents: Vec<String> = user_agents
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        Ok(Self {
            client,
            user_agents: Arc::new(user_agents),
            next_agent: Arc::new(AtomicUsize::new(0)),
        })
    }

    fn next_user_agent(&self) -> &str {
        if self.user_agents.is_empty() {
            return DEFAULT_USER_AGENT;
        }
        let i = self.next_agent.fetch_add(1, Ordering::Relaxed);
        &self.user_agents[i % self.user_agents.len()]
    }

    fn apply_headers(
        &self,
        mut rb: reqwest::RequestBuilder,
        headers: &BTreeMap<String, String>,
    ) -> reqwest::RequestBuilder {
        let mut has_agent = false;
        for (k, v) in headers {
            if let (Ok(name), Ok(value)) = (
                reqwest::header::HeaderName::from_bytes(k.as_bytes()),
                reqwest::header::HeaderValue::from_str(v),
            ) {
                has_agent |= name == reqwest::header::USER_AGENT;
                rb = rb.header(name, value);
            }
        }
        if !has_agent {
            rb = rb.header(reqwest::header::USER_AGENT, self.next_user_agent());
        }
        rb
    }
}

fn map_reqwest_error(e: reqwest::Error, timeout_ms: Option<u64>) -> Error {
    match (e.is_timeout(), timeout_ms) {
        (true, Some(ms)) => Error::Timeout(ms),
        _ => Error::Fetch(e.to_string()),
    }
}

#[async_trait::async_trait]
impl FetchBackend for LocalFetcher {
    async fn fetch(&self, req: &FetchRequest) -> Result<FetchResponse> {
        let mut timings_ms = BTreeMap::new();
        let t_req = std::time::Instant::now();
        let url = url::Url::parse(req.url.trim()).map_err(|e| Error::InvalidUrl(e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::InvalidUrl(format!("unsupported scheme: {}", url.scheme())));
        }

        let mut rb = self.client.get(url);
        if let Some(to) = req.timeout() {
            rb = rb.timeout(to);
        }
        rb = self.apply_headers(rb, &req.headers);
        let resp = rb
            .send()
            .await
            .map_err(|e| map_reqwest_error(e, req.timeout_ms))?;
        let final_url = resp.url().to_string();
        let status = resp.status().as_u16();
        let content_type = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        let max_bytes = req.max_bytes.unwrap_or(u64::MAX) as usize;
        let mut truncated = false;
        let mut bytes = Vec::new();
        let mut stream = resp.bytes_stream();
        use futures_util::StreamExt;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| map_reqwest_error(e, req.timeout_ms))?;
            if bytes.len().saturating_add(chunk.len()) > max_bytes {
                let can_take = max_bytes.saturating_sub(bytes.len());
                bytes.extend_from_slice(&chunk[..can_take]);
                truncated = true;
                break;
            }
            bytes.extend_from_slice(&chunk);
        }

        timings_ms.insert("network_fetch".to_string(), t_req.elapsed().as_millis());
        Ok(FetchResponse {
            url: req.url.clone(),
            final_url,
            status,
            content_type,
            bytes,
            truncated,
            timings_ms,
        })
    }
}
