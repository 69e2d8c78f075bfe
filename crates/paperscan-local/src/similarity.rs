use paperscan_core::{ScorerKind, SimilarityScorer};
use std::sync::Arc;

/// `1 - levenshtein / max_len`, on chars.
#[derive(Debug, Clone, Copy, Default)]
pub struct LevenshteinScorer;

impl SimilarityScorer for LevenshteinScorer {
    fn name(&self) -> &'static str {
        "levenshtein"
    }

    fn score(&self, a: &str, b: &str) -> f64 {
        strsim::normalized_levenshtein(a, b)
    }
}

/// Jaro-Winkler: rewards shared prefixes, lenient on suffix variation ("survey" vs "surveys").
#[derive(Debug, Clone, Copy, Default)]
pub struct JaroWinklerScorer;

impl SimilarityScorer for JaroWinklerScorer {
    fn name(&self) -> &'static str {
        "jaro-winkler"
    }

    fn score(&self, a: &str, b: &str) -> f64 {
        strsim::jaro_winkler(a, b)
    }
}

pub fn scorer_for(kind: ScorerKind) -> Arc<dyn SimilarityScorer> {
    match kind {
        ScorerKind::Levenshtein => Arc::new(LevenshteinScorer),
        ScorerKind::JaroWinkler => Arc::new(JaroWinklerScorer),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_strings_score_one() {
        for s in [scorer_for(ScorerKind::Levenshtein), scorer_for(ScorerKind::JaroWinkler)] {
            assert_eq!(s.score("census data", "census data"), 1.0, "{}", s.name());
        }
    }

    #[test]
    fn levenshtein_scores_plural_suffix() {
        let s = LevenshteinScorer.score("topics", "topic");
        assert!((s - (1.0 - 1.0 / 6.0)).abs() < 1e-9, "s={s}");
    }

    #[test]
    fn jaro_winkler_is_more_lenient_on_shared_prefix() {
        let lev = LevenshteinScorer.score("census datasets", "census data");
        let jw = JaroWinklerScorer.score("census datasets", "census data");
        assert!(jw > lev, "jw={jw} lev={lev}");
    }

    #[test]
    fn unrelated_words_score_low() {
        assert!(LevenshteinScorer.score("page", "topic") < 0.5);
    }
}
