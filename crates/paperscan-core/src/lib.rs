use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

pub mod config;
pub mod host;
pub mod model;

pub use config::{
    FetchConfig, FilterConfig, MatchConfig, PipelineConfig, ScorerKind, ValidationConfig,
};
pub use host::host_of;
pub use model::*;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("fetch failed: {0}")]
    Fetch(String),
    #[error("fetch timed out after {0} ms")]
    Timeout(u64),
    #[error("invalid config: {0}")]
    Config(String),
    #[error("not supported: {0}")]
    NotSupported(String),
    #[error("input error: {0}")]
    Input(String),
    #[error("sink error: {0}")]
    Sink(String),
}

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchRequest {
    pub url: String,
    /// Timeout for the whole request (connect + body).
    pub timeout_ms: Option<u64>,
    /// Hard cap on bytes read from the response body.
    pub max_bytes: Option<u64>,
    /// Extra request headers (best-effort; invalid names/values are dropped).
    pub headers: BTreeMap<String, String>,
}

impl FetchRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            timeout_ms: None,
            max_bytes: None,
            headers: BTreeMap::new(),
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchResponse {
    pub url: String,
    pub final_url: String,
    pub status: u16,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
    pub truncated: bool,
    pub timings_ms: BTreeMap<String, u128>,
}

impl FetchResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Network access for the download orchestrator.
///
/// Implementations return `Ok` for any HTTP response (including 4xx/5xx); the caller decides
/// what counts as a usable download.
#[async_trait::async_trait]
pub trait FetchBackend: Send + Sync {
    async fn fetch(&self, req: &FetchRequest) -> Result<FetchResponse>;
}

/// Normalized string similarity in `[0.0, 1.0]` (1.0 = identical).
pub trait SimilarityScorer: Send + Sync {
    fn name(&self) -> &'static str;
    fn score(&self, a: &str, b: &str) -> f64;
}

/// Quality gate applied to raw mentions before deduplication.
pub trait MentionFilter: Send + Sync {
    /// `chars` is the validated full text, as chars; the mention's offsets index into it.
    fn keep(&self, chars: &[char], mention: &RawMention) -> bool;
}

/// Destination for per-work reports. The only state shared across works.
pub trait RecordSink {
    fn write_report(&mut self, report: &WorkReport) -> Result<()>;

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

impl<S: RecordSink + ?Sized> RecordSink for &mut S {
    fn write_report(&mut self, report: &WorkReport) -> Result<()> {
        (**self).write_report(report)
    }

    fn flush(&mut self) -> Result<()> {
        (**self).flush()
    }
}

/// Collects reports in memory (tests, embedding).
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    pub reports: Vec<WorkReport>,
}

impl RecordSink for MemorySink {
    fn write_report(&mut self, report: &WorkReport) -> Result<()> {
        self.reports.push(report.clone());
        Ok(())
    }
}
