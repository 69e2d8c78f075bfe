//! Exact and fuzzy topic-term matching over validated text.
//!
//! All offsets are char offsets into the text the matcher was given. The matcher is a pure
//! function of (text, config, scorer): it keeps no state between calls.

use paperscan_core::{MatchConfig, MatchMethod, RawMention, Result, SimilarityScorer};
use std::sync::Arc;

use crate::textprep::{collapse_ws, fold_char};

#[derive(Debug, Clone)]
struct Term {
    original: String,
    /// Case-folded chars, one per source char.
    folded: Vec<char>,
    /// Case-folded, whitespace-collapsed; what fuzzy windows are scored against.
    key: String,
    token_count: usize,
}

impl Term {
    fn new(raw: &str) -> Self {
        let original = raw.trim().to_string();
        let chars: Vec<char> = original.chars().collect();
        let folded: Vec<char> = chars.iter().map(|c| fold_char(*c)).collect();
        let key = collapse_ws(&folded.iter().collect::<String>());
        // Same tokenizer as the text, so "COVID-19" spans two tokens on both sides.
        let token_count = word_spans(&chars).len().max(1);
        Self {
            original,
            folded,
            key,
            token_count,
        }
    }
}

/// Map a similarity score onto a fuzzy tier. The strong side is inclusive.
pub fn classify_score(score: f64, strong: f64, weak: f64) -> Option<MatchMethod> {
    if score.is_nan() {
        None
    } else if score >= strong {
        Some(MatchMethod::FuzzyStrong)
    } else if score >= weak {
        Some(MatchMethod::FuzzyWeak)
    } else {
        None
    }
}

pub struct MentionMatcher {
    terms: Vec<Term>,
    strong: f64,
    weak: f64,
    context_chars: usize,
    scorer: Arc<dyn SimilarityScorer>,
}

impl std::fmt::Debug for MentionMatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MentionMatcher")
            .field("terms", &self.terms.iter().map(|t| &t.original).collect::<Vec<_>>())
            .field("strong", &self.strong)
            .field("weak", &self.weak)
            .field("context_chars", &self.context_chars)
            .field("scorer", &self.scorer.name())
            .finish()
    }
}

impl MentionMatcher {
    pub fn new(cfg: &MatchConfig, scorer: Arc<dyn SimilarityScorer>) -> Result<Self> {
        cfg.validate()?;
        Ok(Self {
            terms: cfg.topics.iter().map(|t| Term::new(t)).collect(),
            strong: cfg.strong_threshold,
            weak: cfg.weak_threshold,
            context_chars: cfg.context_chars,
            scorer,
        })
    }

    /// All exact and fuzzy occurrences, sorted by span. Overlaps across methods are expected.
    pub fn find(&self, work_id: &str, text: &str) -> Vec<RawMention> {
        let chars: Vec<char> = text.chars().collect();
        self.find_chars(work_id, &chars)
    }

    /// `find` over text already split into chars.
    ///
    /// Overlapping hits of one term share one context, taken around the union of their spans.
    pub fn find_chars(&self, work_id: &str, chars: &[char]) -> Vec<RawMention> {
        if chars.iter().all(|c| c.is_whitespace()) {
            return Vec::new();
        }
        let folded: Vec<char> = chars.iter().map(|c| fold_char(*c)).collect();
        let tokens = word_spans(chars);

        let mut out = Vec::new();
        for term in &self.terms {
            let mut hits: Vec<(usize, usize, f64, MatchMethod)> = exact_spans(&folded, &term.folded)
                .into_iter()
                .map(|(start, end)| (start, end, 1.0, MatchMethod::Exact))
                .collect();
            hits.extend(self.fuzzy_spans(&folded, &tokens, term));
            let regions = overlap_regions(hits.iter().map(|h| (h.0, h.1)).collect());
            for (start, end, score, method) in hits {
                let i = regions.partition_point(|r| r.1 <= start);
                let (rs, re) = regions.get(i).copied().unwrap_or((start, end));
                out.push(RawMention {
                    work_id: work_id.to_string(),
                    term: term.original.clone(),
                    method,
                    start,
                    end,
                    score,
                    context: context_window(chars, rs, re, self.context_chars),
                });
            }
        }
        out.sort_by(|a, b| {
            a.start
                .cmp(&b.start)
                .then_with(|| a.end.cmp(&b.end))
                .then_with(|| b.method.priority().cmp(&a.method.priority()))
                .then_with(|| a.term.cmp(&b.term))
        });
        out
    }

    fn fuzzy_spans(
        &self,
        folded: &[char],
        tokens: &[(usize, usize)],
        term: &Term,
    ) -> Vec<(usize, usize, f64, MatchMethod)> {
        let k = term.token_count;
        if tokens.len() < k {
            return Vec::new();
        }
        let mut out = Vec::new();
        for w in tokens.windows(k) {
            let start = w[0].0;
            let end = w[k - 1].1;
            let window = collapse_ws(&folded[start..end].iter().collect::<String>());
            let score = self.scorer.score(&window, &term.key).clamp(0.0, 1.0);
            if let Some(method) = classify_score(score, self.strong, self.weak) {
                out.push((start, end, score, method));
            }
        }
        out
    }
}

/// Non-overlapping occurrences of `needle` in `hay` (both already case-folded).
fn exact_spans(hay: &[char], needle: &[char]) -> Vec<(usize, usize)> {
    let m = needle.len();
    let mut out = Vec::new();
    if m == 0 || hay.len() < m {
        return out;
    }
    let mut i = 0usize;
    while i + m <= hay.len() {
        if hay[i..i + m] == *needle {
            out.push((i, i + m));
            i += m;
        } else {
            i += 1;
        }
    }
    out
}

/// Sorted, disjoint unions of spans that overlap (touching spans stay apart).
fn overlap_regions(mut spans: Vec<(usize, usize)>) -> Vec<(usize, usize)> {
    spans.sort_unstable();
    let mut out: Vec<(usize, usize)> = Vec::with_capacity(spans.len());
    for (s, e) in spans {
        match out.last_mut() {
            Some(last) if s < last.1 => last.1 = last.1.max(e),
            _ => out.push((s, e)),
        }
    }
    out
}

/// Char spans of alphanumeric runs.
fn word_spans(chars: &[char]) -> Vec<(usize, usize)> {
    let mut out = Vec::new();
    let mut start: Option<usize> = None;
    for (i, c) in chars.iter().enumerate() {
        match (c.is_alphanumeric(), start) {
            (true, None) => start = Some(i),
            (false, Some(s)) => {
                out.push((s, i));
                start = None;
            }
            _ => {}
        }
    }
    if let Some(s) = start {
        out.push((s, chars.len()));
    }
    out
}

/// `radius` chars on each side of `[start, end)`, clipped to the text, with words cut at the
/// window edges dropped and whitespace collapsed.
pub fn context_window(chars: &[char], start: usize, end: usize, radius: usize) -> String {
    let n = chars.len();
    let start = start.min(n);
    let end = end.clamp(start, n);
    let mut s = start.saturating_sub(radius);
    let mut e = end.saturating_add(radius).min(n);
    if s > 0 && chars[s - 1].is_alphanumeric() {
        while s < start && chars[s].is_alphanumeric() {
            s += 1;
        }
    }
    if e < n && chars[e].is_alphanumeric() {
        while e > end && chars[e - 1].is_alphanumeric() {
            e -= 1;
        }
    }
    collapse_ws(&chars[s..e].iter().collect::<String>())
}
