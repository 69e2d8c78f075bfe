use serde::Serialize;
use std::io::Cursor;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::process::Command;

use crate::textprep::has_any_text;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentFormat {
    Pdf,
    Html,
    PlainText,
    Image,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedText {
    pub engine: &'static str,
    pub format: DocumentFormat,
    pub text: String,
}

/// Best-effort sniff for PDF bytes (magic header).
///
/// Some servers prepend a few bytes of junk; PDF readers accept the header anywhere in the
/// first KiB, so we do too.
pub fn bytes_look_like_pdf(bytes: &[u8]) -> bool {
    let head = &bytes[..bytes.len().min(1024)];
    head.windows(5).any(|w| w == b"%PDF-")
}

/// Best-effort guess for whether bytes are HTML-ish.
pub fn bytes_look_like_html(bytes: &[u8]) -> bool {
    let mut i = 0usize;
    while i < bytes.len() && bytes[i].is_ascii_whitespace() {
        i += 1;
    }
    if i >= bytes.len() {
        return false;
    }
    let rest = &bytes[i..bytes.len().min(i + 16)];
    let lc = rest.to_ascii_lowercase();
    lc.starts_with(b"<!doctype html")
        || lc.starts_with(b"<html")
        || lc.starts_with(b"<head")
        || lc.starts_with(b"<body")
}

/// Best-effort sniff for common image formats.
pub fn bytes_look_like_image(bytes: &[u8]) -> bool {
    bytes.starts_with(b"\x89PNG\r\n\x1a\n")
        || bytes.starts_with(b"\xff\xd8\xff")
        || bytes.starts_with(b"GIF87a")
        || bytes.starts_with(b"GIF89a")
        || (bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP")
}

fn content_type_lc_prefix(ct: Option<&str>) -> String {
    ct.unwrap_or("")
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase()
}

/// Decide how to open a body: magic bytes win over the declared content type, since
/// repositories routinely serve PDFs as `application/octet-stream` (and HTML landing pages as
/// `application/pdf`).
pub fn detect_format(bytes: &[u8], content_type: Option<&str>) -> DocumentFormat {
    let ct = content_type_lc_prefix(content_type);
    if bytes_look_like_pdf(bytes) {
        return DocumentFormat::Pdf;
    }
    if bytes_look_like_image(bytes) || ct.starts_with("image/") {
        return DocumentFormat::Image;
    }
    if bytes_look_like_html(bytes) || ct == "text/html" || ct == "application/xhtml+xml" {
        return DocumentFormat::Html;
    }
    if ct == "application/pdf" {
        return DocumentFormat::Pdf;
    }
    if ct.starts_with("text/") {
        return DocumentFormat::PlainText;
    }
    if (ct.is_empty() || ct == "application/octet-stream")
        && !bytes.contains(&0)
        && std::str::from_utf8(bytes).is_ok()
    {
        return DocumentFormat::PlainText;
    }
    DocumentFormat::Unknown
}

/// Extract text from a PDF body held in memory.
///
/// `pdf-extract` panics on some malformed inputs (and can exhaust memory on hostile ones); a
/// panic here is reported as an ordinary extraction error.
pub fn pdf_to_text(bytes: &[u8]) -> Result<String, String> {
    guard_pdf_extractor(|| pdf_extract::extract_text_from_mem(bytes))
}

fn guard_pdf_extractor<E, F>(extract: F) -> Result<String, String>
where
    E: std::fmt::Display,
    F: FnOnce() -> Result<String, E>,
{
    match catch_unwind(AssertUnwindSafe(extract)) {
        Ok(Ok(text)) => Ok(text),
        Ok(Err(e)) => Err(format!("pdf_extract_failed: {e}")),
        Err(_) => {
            tracing::warn!("pdf extractor panicked; treating document as unreadable");
            Err("pdf_extract_panicked".to_string())
        }
    }
}

/// `pdftotext` fallback. The temp file lives only for the duration of this call.
fn pdf_to_text_shellout(bytes: &[u8]) -> Result<String, &'static str> {
    let mut tmp = tempfile::Builder::new()
        .prefix("paperscan-")
        .suffix(".pdf")
        .tempfile()
        .map_err(|_| "pdf_shellout_tempfile_failed")?;
    use std::io::Write;
    tmp.write_all(bytes)
        .map_err(|_| "pdf_shellout_tempfile_write_failed")?;
    let path = tmp.path().to_string_lossy().to_string();

    let out = Command::new("pdftotext")
        .args(["-enc", "UTF-8", "-nopgbrk", &path, "-"])
        .output();
    match out {
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err("pdf_shellout_tool_not_found"),
        Err(_) => Err("pdf_shellout_spawn_failed"),
        Ok(o) if !o.status.success() => Err("pdf_shellout_nonzero_exit"),
        Ok(o) => {
            let s = String::from_utf8_lossy(&o.stdout).to_string();
            if has_any_text(&s) {
                Ok(s)
            } else {
                Err("pdf_shellout_empty_output")
            }
        }
    }
}

pub fn html_to_text(html: &str, width: usize) -> String {
    html2text::from_read(Cursor::new(html.as_bytes()), width).unwrap_or_else(|_| html.to_string())
}

/// Open a body in the given format and pull out its raw text.
///
/// Errors are short reason codes suitable for an attempt's `detail` column.
pub fn extract_text(
    bytes: &[u8],
    format: DocumentFormat,
    pdf_shellout: bool,
) -> Result<ExtractedText, String> {
    match format {
        DocumentFormat::Pdf => match pdf_to_text(bytes) {
            Ok(text) if has_any_text(&text) => Ok(ExtractedText {
                engine: "pdf-extract",
                format,
                text,
            }),
            first => {
                let first_reason = match first {
                    Ok(_) => "pdf_no_text_layer".to_string(),
                    Err(e) => e,
                };
                if !pdf_shellout {
                    return Err(first_reason);
                }
                pdf_to_text_shellout(bytes)
                    .map(|text| ExtractedText {
                        engine: "pdftotext",
                        format,
                        text,
                    })
                    .map_err(|code| format!("{first_reason}; {code}"))
            }
        },
        DocumentFormat::Html => {
            let html = String::from_utf8_lossy(bytes);
            Ok(ExtractedText {
                engine: "html2text",
                format,
                text: html_to_text(&html, 10_000),
            })
        }
        DocumentFormat::PlainText => match std::str::from_utf8(bytes) {
            Ok(s) => Ok(ExtractedText {
                engine: "utf8",
                format,
                text: s.to_string(),
            }),
            Err(e) => Err(format!("invalid_utf8: {e}")),
        },
        DocumentFormat::Image => Err("unsupported_format: image".to_string()),
        DocumentFormat::Unknown => Err("unsupported_format: unknown binary".to_string()),
    }
}
