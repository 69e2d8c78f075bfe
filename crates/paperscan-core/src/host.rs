/// Placeholder written by metadata exports for works without a full-text location.
pub const NO_URL_SENTINEL: &str = "none";

/// Host component of `url`, lowercased.
///
/// Returns `None` for blank input, the `"none"` sentinel, anything `url` cannot parse, and URLs
/// without a host (`mailto:`, `data:`). Never panics.
pub fn host_of(url: &str) -> Option<String> {
    let s = url.trim();
    if s.is_empty() || s.eq_ignore_ascii_case(NO_URL_SENTINEL) {
        return None;
    }
    let u = url::Url::parse(s).ok()?;
    let host = u.host_str()?.trim_end_matches('.').to_ascii_lowercase();
    if host.is_empty() {
        None
    } else {
        Some(host)
    }
}
