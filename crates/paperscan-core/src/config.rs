//! Pipeline configuration.
//!
//! Everything a component needs is passed in explicitly; nothing here reads the environment.
//! `PipelineConfig::validate` is the single gate for fatal configuration errors and must be
//! called before any work is processed.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Fuzzy thresholds on the normalized `[0, 1]` scale (87.5 / 80 on a 0..100 scale).
pub const DEFAULT_STRONG_THRESHOLD: f64 = 0.875;
pub const DEFAULT_WEAK_THRESHOLD: f64 = 0.80;
pub const DEFAULT_FETCH_TIMEOUT_MS: u64 = 60_000;
pub const DEFAULT_MAX_BYTES: u64 = 50_000_000;
/// ISO 639-3.
pub const DEFAULT_LANGUAGE: &str = "eng";
pub const DEFAULT_LANGUAGE_SAMPLE_CHARS: usize = 20_000;
pub const DEFAULT_CONTEXT_CHARS: usize = 200;
pub const DEFAULT_MIN_CONTEXT_WORDS: usize = 4;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ScorerKind {
    #[default]
    Levenshtein,
    JaroWinkler,
}

impl std::str::FromStr for ScorerKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "levenshtein" => Ok(ScorerKind::Levenshtein),
            "jaro-winkler" | "jaro_winkler" | "jarowinkler" => Ok(ScorerKind::JaroWinkler),
            other => Err(Error::Config(format!("unknown scorer: {other}"))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MatchConfig {
    pub topics: Vec<String>,
    pub strong_threshold: f64,
    pub weak_threshold: f64,
    /// Characters of context kept on each side of a matched span.
    pub context_chars: usize,
    pub scorer: ScorerKind,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            topics: Vec::new(),
            strong_threshold: DEFAULT_STRONG_THRESHOLD,
            weak_threshold: DEFAULT_WEAK_THRESHOLD,
            context_chars: DEFAULT_CONTEXT_CHARS,
            scorer: ScorerKind::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct FetchConfig {
    pub timeout_ms: u64,
    pub max_bytes: u64,
    /// If set, only the first N candidate URLs of a work are considered.
    pub max_urls_per_work: Option<usize>,
    /// Rotated across requests. Empty means the fetcher's built-in default.
    pub user_agents: Vec<String>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_FETCH_TIMEOUT_MS,
            max_bytes: DEFAULT_MAX_BYTES,
            max_urls_per_work: None,
            user_agents: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ValidationConfig {
    pub required_language: String,
    /// Bulk detection runs on at most this many leading characters.
    pub language_sample_chars: usize,
    /// Fall back to `pdftotext` when the in-process PDF extractor fails.
    pub pdf_shellout: bool,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            required_language: DEFAULT_LANGUAGE.to_string(),
            language_sample_chars: DEFAULT_LANGUAGE_SAMPLE_CHARS,
            pdf_shellout: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct FilterConfig {
    pub drop_url_embedded: bool,
    pub drop_email_embedded: bool,
    /// 0 disables the sentence-completeness check.
    pub min_context_words: usize,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            drop_url_embedded: true,
            drop_email_embedded: true,
            min_context_words: DEFAULT_MIN_CONTEXT_WORDS,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PipelineConfig {
    pub matching: MatchConfig,
    pub fetch: FetchConfig,
    pub validation: ValidationConfig,
    pub filter: FilterConfig,
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<()> {
        self.matching.validate()?;
        self.fetch.validate()?;
        self.validation.validate()?;
        Ok(())
    }
}

impl MatchConfig {
    pub fn validate(&self) -> Result<()> {
        if self.topics.is_empty() {
            return Err(Error::Config("at least one topic term is required".into()));
        }
        if self.topics.iter().any(|t| t.trim().is_empty()) {
            return Err(Error::Config("topic terms must not be blank".into()));
        }
        for (name, v) in [
            ("strong_threshold", self.strong_threshold),
            ("weak_threshold", self.weak_threshold),
        ] {
            if !v.is_finite() || !(0.0..=1.0).contains(&v) {
                return Err(Error::Config(format!("{name} must be within [0, 1], got {v}")));
            }
        }
        if self.strong_threshold < self.weak_threshold {
            return Err(Error::Config(format!(
                "strong_threshold ({}) must be >= weak_threshold ({})",
                self.strong_threshold, self.weak_threshold
            )));
        }
        Ok(())
    }
}

impl FetchConfig {
    pub fn validate(&self) -> Result<()> {
        if self.timeout_ms == 0 {
            return Err(Error::Config("fetch timeout must be > 0 ms".into()));
        }
        if self.max_bytes == 0 {
            return Err(Error::Config("max_bytes must be > 0".into()));
        }
        if self.max_urls_per_work == Some(0) {
            return Err(Error::Config("max_urls_per_work must be > 0 when set".into()));
        }
        Ok(())
    }
}

impl ValidationConfig {
    pub fn validate(&self) -> Result<()> {
        let code = self.required_language.trim();
        if code.len() != 3 || !code.chars().all(|c| c.is_ascii_lowercase()) {
            return Err(Error::Config(format!(
                "required_language must be an ISO 639-3 code like \"eng\", got {:?}",
                self.required_language
            )));
        }
        if self.language_sample_chars == 0 {
            return Err(Error::Config("language_sample_chars must be > 0".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_topics(topics: &[&str]) -> PipelineConfig {
        let mut c = PipelineConfig::default();
        c.matching.topics = topics.iter().map(|s| s.to_string()).collect();
        c
    }

    #[test]
    fn default_with_topic_is_valid() {
        with_topics(&["census data"]).validate().unwrap();
    }

    #[test]
    fn missing_or_blank_topic_is_rejected() {
        let err = PipelineConfig::default().validate().unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        let err = with_topics(&["ok", "  "]).validate().unwrap_err();
        assert!(err.to_string().contains("blank"), "{err}");
    }

    #[test]
    fn strong_below_weak_is_rejected() {
        let mut c = with_topics(&["topic"]);
        c.matching.strong_threshold = 0.7;
        c.matching.weak_threshold = 0.9;
        let err = c.validate().unwrap_err();
        assert!(err.to_string().contains("strong_threshold"), "{err}");
    }

    #[test]
    fn equal_thresholds_are_allowed() {
        let mut c = with_topics(&["topic"]);
        c.matching.strong_threshold = 0.8;
        c.matching.weak_threshold = 0.8;
        c.validate().unwrap();
    }

    #[test]
    fn thresholds_outside_unit_range_are_rejected() {
        let mut c = with_topics(&["topic"]);
        c.matching.strong_threshold = 87.5;
        assert!(c.validate().is_err());
        c.matching.strong_threshold = f64::NAN;
        assert!(c.validate().is_err());
    }

    #[test]
    fn zero_timeout_and_bad_language_are_rejected() {
        let mut c = with_topics(&["topic"]);
        c.fetch.timeout_ms = 0;
        assert!(c.validate().is_err());

        let mut c = with_topics(&["topic"]);
        c.validation.required_language = "en".into();
        assert!(c.validate().is_err());
    }

    #[test]
    fn config_json_fills_missing_sections_with_defaults() {
        let c: PipelineConfig =
            serde_json::from_str(r#"{"matching":{"topics":["census"],"scorer":"jaro-winkler"}}"#)
                .unwrap();
        assert_eq!(c.matching.topics, vec!["census".to_string()]);
        assert_eq!(c.matching.scorer, ScorerKind::JaroWinkler);
        assert_eq!(c.matching.strong_threshold, DEFAULT_STRONG_THRESHOLD);
        assert_eq!(c.validation.required_language, "eng");
        assert!(c.filter.drop_url_embedded);
    }

    #[test]
    fn scorer_kind_parses_common_spellings() {
        assert_eq!(
            "Jaro_Winkler".parse::<ScorerKind>().unwrap(),
            ScorerKind::JaroWinkler
        );
        assert_eq!(
            "levenshtein".parse::<ScorerKind>().unwrap(),
            ScorerKind::Levenshtein
        );
        assert!("cosine".parse::<ScorerKind>().is_err());
    }
}
