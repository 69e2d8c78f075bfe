use paperscan_core::{
    FetchBackend, MentionFilter, MentionStats, PipelineConfig, RecordSink, Result, Work,
    WorkReport,
};
use std::sync::Arc;
use tracing::Instrument;

use crate::acquire::Acquirer;
use crate::dedup::dedup_with_counts;
use crate::filter::ContextFilter;
use crate::mentions::MentionMatcher;
use crate::report::{Summary, SummaryBuilder, DEFAULT_TOP_HOSTS};
use crate::similarity::scorer_for;
use crate::LocalFetcher;

/// Acquire, match, filter, dedup: one work at a time, one report per work.
#[derive(Clone)]
pub struct Pipeline {
    acquirer: Acquirer,
    matcher: Arc<MentionMatcher>,
    filter: Arc<dyn MentionFilter>,
    top_hosts: usize,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("acquirer", &self.acquirer)
            .field("matcher", &self.matcher)
            .finish_non_exhaustive()
    }
}

impl Pipeline {
    /// Fails on any configuration error, before a single work is touched.
    pub fn new(cfg: &PipelineConfig, fetcher: Arc<dyn FetchBackend>) -> Result<Self> {
        cfg.validate()?;
        let scorer = scorer_for(cfg.matching.scorer);
        Ok(Self {
            acquirer: Acquirer::new(fetcher, cfg.fetch.clone(), &cfg.validation)?,
            matcher: Arc::new(MentionMatcher::new(&cfg.matching, scorer)?),
            filter: Arc::new(ContextFilter::new(cfg.filter.clone())),
            top_hosts: DEFAULT_TOP_HOSTS,
        })
    }

    /// `new` with the reqwest fetcher, using the configured user agents.
    pub fn local(cfg: &PipelineConfig) -> Result<Self> {
        cfg.validate()?;
        let fetcher = LocalFetcher::new(cfg.fetch.user_agents.clone())?;
        Self::new(cfg, Arc::new(fetcher))
    }

    pub fn with_filter(mut self, filter: Arc<dyn MentionFilter>) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_top_hosts(mut self, n: usize) -> Self {
        self.top_hosts = n;
        self
    }

    pub async fn process_work(&self, work: &Work) -> WorkReport {
        let span = tracing::info_span!("work", work_id = %work.id);
        self.process_inner(work).instrument(span).await
    }

    async fn process_inner(&self, work: &Work) -> WorkReport {
        let acq = self.acquirer.acquire(work).await;
        let mut mention_stats = MentionStats::default();
        let mut mentions = Vec::new();

        if let Some(text) = acq.text {
            let chars: Vec<char> = text.chars().collect();
            drop(text);
            let raw = self.matcher.find_chars(&work.id, &chars);
            let found = raw.len();
            let kept: Vec<_> = raw
                .into_iter()
                .filter(|m| self.filter.keep(&chars, m))
                .collect();
            drop(chars);
            mention_stats.filtered_out = found - kept.len();
            let (deduped, before, after) = dedup_with_counts(kept);
            mention_stats.raw = before;
            mention_stats.kept = after;
            mentions = deduped;
        }

        tracing::info!(
            status = acq.outcome.status.as_str(),
            attempted = acq.outcome.urls_attempted,
            available = acq.outcome.urls_available,
            mentions = mentions.len(),
            filtered_out = mention_stats.filtered_out,
            "work done"
        );
        WorkReport {
            attempts: acq.attempts,
            outcome: acq.outcome,
            mentions,
            mention_stats,
        }
    }

    /// Processes works in order, appending each report to `sink` before starting the next.
    pub async fn run<I, S>(&self, works: I, sink: &mut S) -> Result<Summary>
    where
        I: IntoIterator<Item = Work>,
        S: RecordSink + ?Sized,
    {
        let mut summary = SummaryBuilder::new(self.top_hosts);
        for work in works {
            let report = self.process_work(&work).await;
            sink.write_report(&report)?;
            summary.add_report(&report);
        }
        sink.flush()?;
        Ok(summary.finish())
    }
}
