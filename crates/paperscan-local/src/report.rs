use paperscan_core::{
    AttemptOutcome, DownloadAttempt, MatchMethod, MentionStats, MethodCounts, WorkOutcome,
    WorkReport, WorkStatus,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Host label used for attempts whose URL had no parsable host.
pub const NO_HOST: &str = "(none)";

pub const DEFAULT_TOP_HOSTS: usize = 10;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HostFailures {
    pub host: String,
    pub failures: usize,
}

/// Mention counts before and after dedup for one method (or `"all"`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RedundancyRow {
    pub level: String,
    pub all: usize,
    pub deduplicated: usize,
    pub percentage_lost: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MentionSummary {
    pub raw: MethodCounts,
    pub filtered_out: usize,
    pub kept: MethodCounts,
    pub redundancy: Vec<RedundancyRow>,
}

/// Run-level digest: download success, where downloads fail, and how much dedup removed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Summary {
    pub works: usize,
    pub works_by_status: BTreeMap<String, usize>,
    /// Successful works over all works.
    pub success_rate_pct: f64,
    /// Successful works over works that had at least one URL.
    pub success_rate_with_urls_pct: f64,
    pub attempts: usize,
    pub attempts_by_outcome: BTreeMap<String, usize>,
    pub top_failing_hosts: Vec<HostFailures>,
    pub mentions: MentionSummary,
}

fn pct(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 * 100.0 / den as f64
    }
}

fn redundancy_row(level: &str, all: usize, deduplicated: usize) -> RedundancyRow {
    RedundancyRow {
        level: level.to_string(),
        all,
        deduplicated,
        percentage_lost: if all == 0 {
            0.0
        } else {
            (1.0 - deduplicated as f64 / all as f64) * 100.0
        },
    }
}

/// Accumulates records one at a time; works for a live run and for re-reading artifacts.
#[derive(Debug, Clone)]
pub struct SummaryBuilder {
    top_hosts: usize,
    works: usize,
    by_status: BTreeMap<WorkStatus, usize>,
    attempts: usize,
    by_outcome: BTreeMap<AttemptOutcome, usize>,
    host_failures: BTreeMap<String, usize>,
    raw: MethodCounts,
    filtered_out: usize,
    kept: MethodCounts,
}

impl Default for SummaryBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_TOP_HOSTS)
    }
}

impl SummaryBuilder {
    pub fn new(top_hosts: usize) -> Self {
        Self {
            top_hosts,
            works: 0,
            by_status: BTreeMap::new(),
            attempts: 0,
            by_outcome: BTreeMap::new(),
            host_failures: BTreeMap::new(),
            raw: MethodCounts::default(),
            filtered_out: 0,
            kept: MethodCounts::default(),
        }
    }

    pub fn add_attempt(&mut self, attempt: &DownloadAttempt) {
        self.attempts += 1;
        *self.by_outcome.entry(attempt.outcome).or_default() += 1;
        if !attempt.outcome.is_success() {
            let host = attempt.host.as_deref().unwrap_or(NO_HOST).to_string();
            *self.host_failures.entry(host).or_default() += 1;
        }
    }

    pub fn add_outcome(&mut self, outcome: &WorkOutcome, stats: &MentionStats) {
        self.works += 1;
        *self.by_status.entry(outcome.status).or_default() += 1;
        self.raw.merge(&stats.raw);
        self.filtered_out += stats.filtered_out;
        self.kept.merge(&stats.kept);
    }

    pub fn add_report(&mut self, report: &WorkReport) {
        for a in &report.attempts {
            self.add_attempt(a);
        }
        self.add_outcome(&report.outcome, &report.mention_stats);
    }

    pub fn finish(self) -> Summary {
        let status = |s: WorkStatus| self.by_status.get(&s).copied().unwrap_or(0);
        let successes = status(WorkStatus::Success);
        let with_urls = self.works - status(WorkStatus::NoUrls);

        let works_by_status = [WorkStatus::Success, WorkStatus::NoUrls, WorkStatus::Exhausted]
            .into_iter()
            .map(|s| (s.as_str().to_string(), status(s)))
            .collect();
        let attempts_by_outcome = AttemptOutcome::ALL
            .into_iter()
            .map(|o| (o.as_str().to_string(), self.by_outcome.get(&o).copied().unwrap_or(0)))
            .collect();

        let mut hosts: Vec<HostFailures> = self
            .host_failures
            .iter()
            .map(|(host, &failures)| HostFailures {
                host: host.clone(),
                failures,
            })
            .collect();
        hosts.sort_by(|a, b| b.failures.cmp(&a.failures).then_with(|| a.host.cmp(&b.host)));
        hosts.truncate(self.top_hosts);

        let mut redundancy = vec![redundancy_row("all", self.raw.total(), self.kept.total())];
        redundancy.extend(
            MatchMethod::ALL
                .into_iter()
                .map(|m| redundancy_row(m.as_str(), self.raw.get(m), self.kept.get(m))),
        );

        Summary {
            works: self.works,
            works_by_status,
            success_rate_pct: pct(successes, self.works),
            success_rate_with_urls_pct: pct(successes, with_urls),
            attempts: self.attempts,
            attempts_by_outcome,
            top_failing_hosts: hosts,
            mentions: MentionSummary {
                raw: self.raw,
                filtered_out: self.filtered_out,
                kept: self.kept,
                redundancy,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attempt(host: Option<&str>, outcome: AttemptOutcome) -> DownloadAttempt {
        DownloadAttempt {
            work_id: "W".to_string(),
            url: "u".to_string(),
            host: host.map(str::to_string),
            outcome,
            attempt_index: 1,
            detail: None,
            elapsed_ms: 0,
        }
    }

    fn outcome(status: WorkStatus) -> WorkOutcome {
        WorkOutcome {
            work_id: "W".to_string(),
            urls_available: 1,
            urls_attempted: 1,
            status,
        }
    }

    #[test]
    fn empty_summary_has_zero_rates() {
        let s = SummaryBuilder::default().finish();
        assert_eq!(s.works, 0);
        assert_eq!(s.success_rate_pct, 0.0);
        assert_eq!(s.attempts_by_outcome.len(), 4);
        assert_eq!(s.works_by_status["NoURLs"], 0);
        assert!(s.top_failing_hosts.is_empty());
        assert_eq!(s.mentions.redundancy[0].percentage_lost, 0.0);
    }

    #[test]
    fn rates_and_host_ranking() {
        let mut b = SummaryBuilder::new(2);
        for a in [
            attempt(Some("b.org"), AttemptOutcome::DownloadFailed),
            attempt(Some("a.org"), AttemptOutcome::OpenFailed),
            attempt(None, AttemptOutcome::DownloadFailed),
            attempt(None, AttemptOutcome::DownloadFailed),
            attempt(Some("a.org"), AttemptOutcome::WrongLanguage),
            attempt(Some("b.org"), AttemptOutcome::Success),
        ] {
            b.add_attempt(&a);
        }
        let none = MentionStats::default();
        b.add_outcome(&outcome(WorkStatus::Success), &none);
        b.add_outcome(&outcome(WorkStatus::Exhausted), &none);
        b.add_outcome(&outcome(WorkStatus::Exhausted), &none);
        b.add_outcome(&outcome(WorkStatus::NoUrls), &none);
        let s = b.finish();

        assert_eq!(s.works, 4);
        assert_eq!(s.success_rate_pct, 25.0);
        assert!((s.success_rate_with_urls_pct - 100.0 / 3.0).abs() < 1e-9);
        assert_eq!(s.attempts, 6);
        assert_eq!(s.attempts_by_outcome["DownloadFailed"], 3);
        assert_eq!(
            s.top_failing_hosts,
            vec![
                HostFailures {
                    host: NO_HOST.to_string(),
                    failures: 2
                },
                HostFailures {
                    host: "a.org".to_string(),
                    failures: 2
                },
            ]
        );
    }

    #[test]
    fn redundancy_reports_percentage_lost_per_method() {
        let mut b = SummaryBuilder::default();
        let stats = MentionStats {
            raw: MethodCounts {
                exact: 4,
                fuzzy_strong: 2,
                fuzzy_weak: 4,
            },
            filtered_out: 3,
            kept: MethodCounts {
                exact: 4,
                fuzzy_strong: 1,
                fuzzy_weak: 0,
            },
        };
        b.add_outcome(&outcome(WorkStatus::Success), &stats);
        let s = b.finish();
        let rows: Vec<(&str, f64)> = s
            .mentions
            .redundancy
            .iter()
            .map(|r| (r.level.as_str(), r.percentage_lost))
            .collect();
        assert_eq!(
            rows,
            vec![
                ("all", 50.0),
                ("Exact", 0.0),
                ("FuzzyStrong", 50.0),
                ("FuzzyWeak", 100.0)
            ]
        );
        assert_eq!(s.mentions.filtered_out, 3);
    }
}
