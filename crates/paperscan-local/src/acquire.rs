use paperscan_core::{
    host_of, AttemptOutcome, DownloadAttempt, Error, FetchBackend, FetchConfig, FetchRequest,
    Result, ValidationConfig, Work, WorkOutcome, WorkStatus,
};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::validate::{TextValidator, Validation};

/// What one work's URL walk produced. `text` is set only when `outcome.status` is `Success`.
#[derive(Debug, Clone)]
pub struct Acquisition {
    pub attempts: Vec<DownloadAttempt>,
    pub outcome: WorkOutcome,
    pub text: Option<String>,
}

/// Walks a work's candidate URLs in order and stops at the first readable document in the
/// required language.
#[derive(Clone)]
pub struct Acquirer {
    fetcher: Arc<dyn FetchBackend>,
    validator: TextValidator,
    cfg: FetchConfig,
}

impl std::fmt::Debug for Acquirer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Acquirer")
            .field("validator", &self.validator)
            .field("cfg", &self.cfg)
            .finish_non_exhaustive()
    }
}

/// Result of a single URL, before it is turned into an attempt record.
struct Step {
    outcome: AttemptOutcome,
    detail: Option<String>,
    text: Option<String>,
}

impl Step {
    fn failed(outcome: AttemptOutcome, detail: impl Into<String>) -> Self {
        Self {
            outcome,
            detail: Some(detail.into()),
            text: None,
        }
    }
}

impl Acquirer {
    pub fn new(
        fetcher: Arc<dyn FetchBackend>,
        fetch: FetchConfig,
        validation: &ValidationConfig,
    ) -> Result<Self> {
        fetch.validate()?;
        Ok(Self {
            fetcher,
            validator: TextValidator::new(validation)?,
            cfg: fetch,
        })
    }

    /// Candidate URLs after `max_urls_per_work`.
    pub fn candidates<'a>(&self, work: &'a Work) -> &'a [String] {
        match self.cfg.max_urls_per_work {
            Some(cap) if cap < work.urls.len() => &work.urls[..cap],
            _ => &work.urls,
        }
    }

    pub async fn acquire(&self, work: &Work) -> Acquisition {
        let urls = self.candidates(work);
        let mut attempts = Vec::with_capacity(urls.len());
        let mut text = None;

        for (i, url) in urls.iter().enumerate() {
            let t0 = Instant::now();
            let host = host_of(url);
            let step = self.attempt(url).await;
            let attempt = DownloadAttempt {
                work_id: work.id.clone(),
                url: url.clone(),
                host,
                outcome: step.outcome,
                attempt_index: i + 1,
                detail: step.detail,
                elapsed_ms: t0.elapsed().as_millis() as u64,
            };
            tracing::debug!(
                work_id = %work.id,
                attempt = attempt.attempt_index,
                host = attempt.host.as_deref().unwrap_or("-"),
                outcome = attempt.outcome.as_str(),
                detail = attempt.detail.as_deref().unwrap_or(""),
                "attempt"
            );
            attempts.push(attempt);
            if step.text.is_some() {
                text = step.text;
                break;
            }
        }

        let status = if urls.is_empty() {
            WorkStatus::NoUrls
        } else if text.is_some() {
            WorkStatus::Success
        } else {
            WorkStatus::Exhausted
        };
        let outcome = WorkOutcome {
            work_id: work.id.clone(),
            urls_available: urls.len(),
            urls_attempted: attempts.len(),
            status,
        };
        Acquisition {
            attempts,
            outcome,
            text,
        }
    }

    async fn attempt(&self, url: &str) -> Step {
        let req = FetchRequest {
            url: url.to_string(),
            timeout_ms: Some(self.cfg.timeout_ms),
            max_bytes: Some(self.cfg.max_bytes),
            headers: Default::default(),
        };
        let limit = Duration::from_millis(self.cfg.timeout_ms);
        let resp = match tokio::time::timeout(limit, self.fetcher.fetch(&req)).await {
            Err(_) => {
                return Step::failed(
                    AttemptOutcome::DownloadFailed,
                    Error::Timeout(self.cfg.timeout_ms).to_string(),
                )
            }
            Ok(Err(e)) => return Step::failed(AttemptOutcome::DownloadFailed, e.to_string()),
            Ok(Ok(r)) => r,
        };
        if !resp.is_success() {
            return Step::failed(
                AttemptOutcome::DownloadFailed,
                format!("http_status: {}", resp.status),
            );
        }
        if resp.truncated {
            return Step::failed(
                AttemptOutcome::OpenFailed,
                format!("body_exceeds_max_bytes: {}", self.cfg.max_bytes),
            );
        }

        let validator = self.validator.clone();
        let content_type = resp.content_type;
        let bytes = resp.bytes;
        validate_blocking(url, move || validator.validate(bytes, content_type.as_deref())).await
    }
}

/// Runs `validate` on the blocking pool. A panic inside it is an unreadable document.
async fn validate_blocking<F>(url: &str, validate: F) -> Step
where
    F: FnOnce() -> Validation + Send + 'static,
{
    let validation = match tokio::task::spawn_blocking(validate).await {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(url, error = %e, "validation task failed");
            return Step::failed(AttemptOutcome::OpenFailed, format!("validation_task: {e}"));
        }
    };
    let outcome = validation.outcome();
    let detail = validation.detail();
    let text = match validation {
        Validation::Success { text, .. } => Some(text),
        _ => None,
    };
    Step {
        outcome,
        detail,
        text,
    }
}
