use paperscan_core::{FilterConfig, MentionFilter, RawMention};
use regex::Regex;
use std::sync::LazyLock;

static URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:[a-z][a-z0-9+.\-]*://\S+|www\.\S+|[a-z0-9\-]+(?:\.[a-z0-9\-]+)*\.[a-z]{2,}/\S*)$")
        .unwrap()
});
static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9.\-]+\.[A-Za-z]{2,}$").unwrap());

/// Keeps everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAll;

impl MentionFilter for AcceptAll {
    fn keep(&self, _chars: &[char], _mention: &RawMention) -> bool {
        true
    }
}

/// Drops occurrences embedded in URLs/email addresses and contexts too short to be a sentence.
#[derive(Debug, Clone, Default)]
pub struct ContextFilter {
    cfg: FilterConfig,
}

impl ContextFilter {
    pub fn new(cfg: FilterConfig) -> Self {
        Self { cfg }
    }
}

impl MentionFilter for ContextFilter {
    fn keep(&self, chars: &[char], mention: &RawMention) -> bool {
        if self.cfg.min_context_words > 0
            && mention.context.split_whitespace().count() < self.cfg.min_context_words
        {
            return false;
        }
        if !self.cfg.drop_url_embedded && !self.cfg.drop_email_embedded {
            return true;
        }
        let token = enclosing_token(chars, mention.start, mention.end);
        if self.cfg.drop_url_embedded && is_url_like(&token) {
            return false;
        }
        if self.cfg.drop_email_embedded && is_email_like(&token) {
            return false;
        }
        true
    }
}

/// Whitespace-delimited token(s) covering the char span `[start, end)`, with wrapping
/// punctuation stripped. Only the token itself is scanned.
pub fn enclosing_token(chars: &[char], start: usize, end: usize) -> String {
    let n = chars.len();
    let mut s = start.min(n);
    let mut e = end.clamp(s, n);
    while s > 0 && !chars[s - 1].is_whitespace() {
        s -= 1;
    }
    while e < n && !chars[e].is_whitespace() {
        e += 1;
    }
    let token = &chars[s..e];
    let lead = token.iter().take_while(|c| is_wrapping(**c)).count();
    let trail = token[lead..].iter().rev().take_while(|c| is_wrapping(**c)).count();
    token[lead..token.len() - trail].iter().collect()
}

fn is_wrapping(c: char) -> bool {
    matches!(
        c,
        '(' | ')' | '[' | ']' | '<' | '>' | '{' | '}' | '"' | '\'' | ',' | ';' | ':' | '.'
    )
}

pub fn is_url_like(token: &str) -> bool {
    URL_RE.is_match(token)
}

pub fn is_email_like(token: &str) -> bool {
    EMAIL_RE.is_match(token)
}
