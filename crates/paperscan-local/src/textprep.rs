//! Minimal, deterministic text normalization helpers.
//!
//! Two distinct policies live here:
//! - `clean_extracted_text`: display-preserving cleanup of extractor output (what the matcher sees);
//! - `scrub`: lossy key normalization (what dedup compares).

/// Case fold one char to one char, so char offsets stay aligned with the source text.
pub fn fold_char(ch: char) -> char {
    ch.to_lowercase().next().unwrap_or(ch)
}

/// Lossy key used for identity comparisons.
///
/// - lowercase
/// - anything non-alphanumeric is a separator (collapsed to single spaces)
pub fn scrub(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut last_space = true;
    for ch in s.chars() {
        if ch.is_alphanumeric() {
            for lc in ch.to_lowercase() {
                out.push(lc);
            }
            last_space = false;
        } else if !last_space {
            out.push(' ');
            last_space = true;
        }
    }
    out.trim_end().to_string()
}

pub fn collapse_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn has_any_text(s: &str) -> bool {
    s.chars().any(|c| c.is_alphanumeric())
}

/// Cleanup for text coming out of PDF/HTML extraction.
///
/// - CRLF/CR become LF; other control chars become spaces
/// - words hyphenated across a line break are rejoined ("measure-\nment" -> "measurement")
/// - runs of spaces/tabs collapse; lines are trimmed
/// - runs of blank lines collapse to one
pub fn clean_extracted_text(raw: &str) -> String {
    let normalized = raw.replace("\r\n", "\n").replace('\r', "\n");
    let lines: Vec<String> = normalized
        .split('\n')
        .map(|line| {
            let no_ctrl: String = line
                .chars()
                .map(|c| if c.is_control() { ' ' } else { c })
                .collect();
            collapse_ws(&no_ctrl)
        })
        .collect();

    let mut out = String::with_capacity(normalized.len());
    let mut blank_run = 0usize;
    let mut join_next = false;
    for line in &lines {
        if line.is_empty() {
            if join_next {
                continue;
            }
            blank_run += 1;
            if blank_run == 1 && !out.is_empty() {
                out.push('\n');
            }
            continue;
        }
        if join_next {
            join_next = false;
            if line.chars().next().is_some_and(|c| c.is_lowercase()) {
                // Drop the trailing hyphen and glue the halves.
                out.pop();
            } else {
                out.push('\n');
            }
        } else if !out.is_empty() {
            out.push('\n');
        }
        blank_run = 0;
        out.push_str(line);
        if ends_with_word_hyphen(line) {
            join_next = true;
        }
    }
    out.trim().to_string()
}

fn ends_with_word_hyphen(line: &str) -> bool {
    let mut it = line.chars().rev();
    matches!((it.next(), it.next()), (Some('-'), Some(c)) if c.is_alphabetic())
}
