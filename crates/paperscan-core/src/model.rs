use serde::{Deserialize, Serialize};

/// One academic paper and its bibliographic metadata.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Work {
    pub id: String,
    /// Candidate full-text URLs, in the order they should be tried.
    #[serde(default)]
    pub urls: Vec<String>,
    #[serde(default)]
    pub publication_year: Option<i32>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default)]
    pub first_author: Option<String>,
    #[serde(default)]
    pub first_author_country: Option<String>,
    #[serde(default)]
    pub additional_authors: Vec<String>,
}

impl Work {
    pub fn new(id: impl Into<String>, urls: Vec<String>) -> Self {
        Self {
            id: id.into(),
            urls,
            publication_year: None,
            title: None,
            topic: None,
            first_author: None,
            first_author_country: None,
            additional_authors: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AttemptOutcome {
    DownloadFailed,
    OpenFailed,
    WrongLanguage,
    Success,
}

impl AttemptOutcome {
    pub const ALL: [AttemptOutcome; 4] = [
        AttemptOutcome::DownloadFailed,
        AttemptOutcome::OpenFailed,
        AttemptOutcome::WrongLanguage,
        AttemptOutcome::Success,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AttemptOutcome::DownloadFailed => "DownloadFailed",
            AttemptOutcome::OpenFailed => "OpenFailed",
            AttemptOutcome::WrongLanguage => "WrongLanguage",
            AttemptOutcome::Success => "Success",
        }
    }

    pub fn is_success(self) -> bool {
        self == AttemptOutcome::Success
    }
}

/// One row per URL actually tried.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DownloadAttempt {
    pub work_id: String,
    pub url: String,
    pub host: Option<String>,
    pub outcome: AttemptOutcome,
    /// 1-based position within the work's URL list.
    pub attempt_index: usize,
    #[serde(default)]
    pub detail: Option<String>,
    #[serde(default)]
    pub elapsed_ms: u64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum WorkStatus {
    Success,
    #[serde(rename = "NoURLs")]
    NoUrls,
    Exhausted,
}

impl WorkStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            WorkStatus::Success => "Success",
            WorkStatus::NoUrls => "NoURLs",
            WorkStatus::Exhausted => "Exhausted",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WorkOutcome {
    pub work_id: String,
    pub urls_available: usize,
    pub urls_attempted: usize,
    pub status: WorkStatus,
}

/// Mention-identification strength tiers.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum MatchMethod {
    Exact,
    FuzzyStrong,
    FuzzyWeak,
}

impl MatchMethod {
    pub const ALL: [MatchMethod; 3] = [
        MatchMethod::Exact,
        MatchMethod::FuzzyStrong,
        MatchMethod::FuzzyWeak,
    ];

    /// Higher is stronger.
    pub fn priority(self) -> u8 {
        match self {
            MatchMethod::Exact => 3,
            MatchMethod::FuzzyStrong => 2,
            MatchMethod::FuzzyWeak => 1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MatchMethod::Exact => "Exact",
            MatchMethod::FuzzyStrong => "FuzzyStrong",
            MatchMethod::FuzzyWeak => "FuzzyWeak",
        }
    }
}

/// A located occurrence before filtering and deduplication.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RawMention {
    pub work_id: String,
    pub term: String,
    pub method: MatchMethod,
    /// Character offset (not byte) of the matched span start.
    pub start: usize,
    /// Character offset (exclusive) of the matched span end.
    pub end: usize,
    pub score: f64,
    pub context: String,
}

/// A retained mention after deduplication.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Mention {
    pub work_id: String,
    pub method: MatchMethod,
    pub context: String,
    pub term: String,
    pub start: usize,
    pub end: usize,
    pub score: f64,
}

impl From<RawMention> for Mention {
    fn from(m: RawMention) -> Self {
        Self {
            work_id: m.work_id,
            method: m.method,
            context: m.context,
            term: m.term,
            start: m.start,
            end: m.end,
            score: m.score,
        }
    }
}

impl From<Mention> for RawMention {
    fn from(m: Mention) -> Self {
        Self {
            work_id: m.work_id,
            term: m.term,
            method: m.method,
            start: m.start,
            end: m.end,
            score: m.score,
            context: m.context,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct MethodCounts {
    pub exact: usize,
    pub fuzzy_strong: usize,
    pub fuzzy_weak: usize,
}

impl MethodCounts {
    pub fn add(&mut self, method: MatchMethod) {
        *self.slot(method) += 1;
    }

    pub fn get(&self, method: MatchMethod) -> usize {
        match method {
            MatchMethod::Exact => self.exact,
            MatchMethod::FuzzyStrong => self.fuzzy_strong,
            MatchMethod::FuzzyWeak => self.fuzzy_weak,
        }
    }

    pub fn total(&self) -> usize {
        self.exact + self.fuzzy_strong + self.fuzzy_weak
    }

    pub fn merge(&mut self, other: &MethodCounts) {
        self.exact += other.exact;
        self.fuzzy_strong += other.fuzzy_strong;
        self.fuzzy_weak += other.fuzzy_weak;
    }

    fn slot(&mut self, method: MatchMethod) -> &mut usize {
        match method {
            MatchMethod::Exact => &mut self.exact,
            MatchMethod::FuzzyStrong => &mut self.fuzzy_strong,
            MatchMethod::FuzzyWeak => &mut self.fuzzy_weak,
        }
    }
}

impl<'a> FromIterator<&'a MatchMethod> for MethodCounts {
    fn from_iter<I: IntoIterator<Item = &'a MatchMethod>>(iter: I) -> Self {
        let mut out = MethodCounts::default();
        for m in iter {
            out.add(*m);
        }
        out
    }
}

/// How many mentions survived each stage, by method.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct MentionStats {
    /// Raw mentions that passed the quality filter (input to dedup).
    pub raw: MethodCounts,
    /// Raw mentions dropped by the quality filter.
    pub filtered_out: usize,
    /// Mentions retained after dedup.
    pub kept: MethodCounts,
}

/// Everything the pipeline emits for one work.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkReport {
    pub attempts: Vec<DownloadAttempt>,
    pub outcome: WorkOutcome,
    pub mentions: Vec<Mention>,
    pub mention_stats: MentionStats,
}
