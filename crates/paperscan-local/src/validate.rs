use paperscan_core::{AttemptOutcome, Error, Result, ValidationConfig};

use crate::extract::{detect_format, extract_text, DocumentFormat};
use crate::textprep::{clean_extracted_text, has_any_text};

/// Result of opening one downloaded body.
#[derive(Debug, Clone, PartialEq)]
pub enum Validation {
    OpenFailed {
        reason: String,
    },
    WrongLanguage {
        /// ISO 639-3 code, `None` when detection could not decide.
        detected: Option<String>,
    },
    Success {
        text: String,
        format: DocumentFormat,
        engine: &'static str,
        language: String,
    },
}

impl Validation {
    pub fn outcome(&self) -> AttemptOutcome {
        match self {
            Validation::OpenFailed { .. } => AttemptOutcome::OpenFailed,
            Validation::WrongLanguage { .. } => AttemptOutcome::WrongLanguage,
            Validation::Success { .. } => AttemptOutcome::Success,
        }
    }

    pub fn detail(&self) -> Option<String> {
        match self {
            Validation::OpenFailed { reason } => Some(reason.clone()),
            Validation::WrongLanguage { detected } => Some(format!(
                "detected language: {}",
                detected.as_deref().unwrap_or("undetermined")
            )),
            Validation::Success { engine, .. } => Some(format!("engine: {engine}")),
        }
    }
}

/// Opens a body, extracts and cleans its text, and checks the language.
#[derive(Debug, Clone)]
pub struct TextValidator {
    required: whatlang::Lang,
    sample_chars: usize,
    pdf_shellout: bool,
}

impl TextValidator {
    pub fn new(cfg: &ValidationConfig) -> Result<Self> {
        cfg.validate()?;
        let code = cfg.required_language.trim();
        let required = whatlang::Lang::from_code(code).ok_or_else(|| {
            Error::Config(format!("language detection does not support {code:?}"))
        })?;
        Ok(Self {
            required,
            sample_chars: cfg.language_sample_chars,
            pdf_shellout: cfg.pdf_shellout,
        })
    }

    pub fn required_language(&self) -> &'static str {
        self.required.code()
    }

    /// Takes ownership of the body; it is dropped before this returns, on every path.
    pub fn validate(&self, bytes: Vec<u8>, content_type: Option<&str>) -> Validation {
        if bytes.is_empty() {
            return Validation::OpenFailed {
                reason: "empty_payload".to_string(),
            };
        }
        let format = detect_format(&bytes, content_type);
        let extracted = extract_text(&bytes, format, self.pdf_shellout);
        drop(bytes);

        let extracted = match extracted {
            Ok(x) => x,
            Err(reason) => return Validation::OpenFailed { reason },
        };
        let text = clean_extracted_text(&extracted.text);
        if !has_any_text(&text) {
            return Validation::OpenFailed {
                reason: "no_extractable_text".to_string(),
            };
        }

        match self.detect_language(&text) {
            Some(lang) if lang == self.required => Validation::Success {
                text,
                format: extracted.format,
                engine: extracted.engine,
                language: lang.code().to_string(),
            },
            other => Validation::WrongLanguage {
                detected: other.map(|l| l.code().to_string()),
            },
        }
    }

    /// Bulk detection over a bounded prefix of the text.
    pub fn detect_language(&self, text: &str) -> Option<whatlang::Lang> {
        let end = text
            .char_indices()
            .nth(self.sample_chars)
            .map(|(i, _)| i)
            .unwrap_or(text.len());
        whatlang::detect(&text[..end]).map(|info| info.lang())
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::{ENGLISH, FRENCH};
    use super::*;

    fn validator() -> TextValidator {
        TextValidator::new(&ValidationConfig::default()).unwrap()
    }

    #[test]
    fn english_plain_text_validates() {
        let v = validator().validate(ENGLISH.as_bytes().to_vec(), Some("text/plain"));
        match v {
            Validation::Success {
                text,
                format,
                language,
                ..
            } => {
                assert_eq!(format, DocumentFormat::PlainText);
                assert_eq!(language, "eng");
                assert!(text.contains("census data"));
            }
            other => panic!("expected success, got {other:?}"),
        }
    }

    #[test]
    fn french_text_is_wrong_language() {
        let v = validator().validate(FRENCH.as_bytes().to_vec(), Some("text/plain"));
        assert_eq!(v.outcome(), AttemptOutcome::WrongLanguage);
        assert_eq!(
            v,
            Validation::WrongLanguage {
                detected: Some("fra".to_string())
            }
        );
    }

    #[test]
    fn required_language_is_configurable() {
        let cfg = ValidationConfig {
            required_language: "fra".to_string(),
            ..ValidationConfig::default()
        };
        let v = TextValidator::new(&cfg).unwrap();
        assert_eq!(v.required_language(), "fra");
        let got = v.validate(FRENCH.as_bytes().to_vec(), None);
        assert_eq!(got.outcome(), AttemptOutcome::Success);
    }

    #[test]
    fn empty_corrupt_and_textless_bodies_fail_to_open() {
        let v = validator();
        assert_eq!(
            v.validate(Vec::new(), Some("application/pdf")),
            Validation::OpenFailed {
                reason: "empty_payload".to_string()
            }
        );
        let corrupt = v.validate(b"%PDF-1.4\n garbage".to_vec(), Some("application/pdf"));
        assert_eq!(corrupt.outcome(), AttemptOutcome::OpenFailed);
        let blank = v.validate(b" \n\t . ".to_vec(), Some("text/plain"));
        assert_eq!(
            blank,
            Validation::OpenFailed {
                reason: "no_extractable_text".to_string()
            }
        );
    }

    #[test]
    fn html_landing_page_is_opened_as_html() {
        let html = format!("<!doctype html><html><body><p>{ENGLISH}</p></body></html>");
        let v = validator().validate(html.into_bytes(), Some("application/pdf"));
        match v {
            Validation::Success { format, .. } => assert_eq!(format, DocumentFormat::Html),
            other => panic!("expected success, got {other:?}"),
        }
    }

    #[test]
    fn unknown_language_code_is_a_config_error() {
        let cfg = ValidationConfig {
            required_language: "zzz".to_string(),
            ..ValidationConfig::default()
        };
        assert!(matches!(TextValidator::new(&cfg), Err(Error::Config(_))));
    }

    #[test]
    fn detail_strings_are_informative() {
        let wl = Validation::WrongLanguage { detected: None };
        assert_eq!(wl.detail().as_deref(), Some("detected language: undetermined"));
    }
}
