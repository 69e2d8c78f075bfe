use paperscan_core::{Error, Result, Work};
use std::collections::BTreeSet;
use std::path::Path;
use std::str::FromStr;

use crate::openalex::works_from_openalex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WorksFormat {
    /// Picked from the content: an object with `results` is OpenAlex, an array is JSON, anything
    /// else is JSON Lines.
    #[default]
    Auto,
    Json,
    Jsonl,
    OpenAlex,
}

impl FromStr for WorksFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "json" => Ok(Self::Json),
            "jsonl" | "ndjson" => Ok(Self::Jsonl),
            "openalex" => Ok(Self::OpenAlex),
            other => Err(Error::Config(format!(
                "unknown works format {other:?} (expected auto, json, jsonl, openalex)"
            ))),
        }
    }
}

fn detect(raw: &str) -> WorksFormat {
    let head = raw.trim_start();
    if head.starts_with('[') {
        return WorksFormat::Json;
    }
    if head.starts_with('{') {
        if let Ok(v) = serde_json::from_str::<serde_json::Value>(raw) {
            if v.get("results").is_some() {
                return WorksFormat::OpenAlex;
            }
        }
    }
    WorksFormat::Jsonl
}

/// Parse works from a string. Duplicate work ids are rejected.
pub fn parse_works(raw: &str, format: WorksFormat) -> Result<Vec<Work>> {
    let format = match format {
        WorksFormat::Auto => detect(raw),
        f => f,
    };
    let works: Vec<Work> = match format {
        WorksFormat::Json => serde_json::from_str(raw)
            .map_err(|e| Error::Input(format!("works json: {e}")))?,
        WorksFormat::Jsonl | WorksFormat::Auto => {
            let mut out = Vec::new();
            for (i, line) in raw.lines().enumerate() {
                if line.trim().is_empty() {
                    continue;
                }
                let w = serde_json::from_str(line)
                    .map_err(|e| Error::Input(format!("works jsonl line {}: {e}", i + 1)))?;
                out.push(w);
            }
            out
        }
        WorksFormat::OpenAlex => {
            let v: serde_json::Value = serde_json::from_str(raw)
                .map_err(|e| Error::Input(format!("openalex json: {e}")))?;
            works_from_openalex(&v)?
        }
    };

    let mut seen = BTreeSet::new();
    for w in &works {
        if w.id.trim().is_empty() {
            return Err(Error::Input("work with empty id".to_string()));
        }
        if !seen.insert(w.id.as_str()) {
            return Err(Error::Input(format!("duplicate work id {:?}", w.id)));
        }
    }
    Ok(works)
}

pub fn load_works(path: impl AsRef<Path>, format: WorksFormat) -> Result<Vec<Work>> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path)
        .map_err(|e| Error::Input(format!("{}: {e}", path.display())))?;
    parse_works(&raw, format)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auto_detects_each_format() {
        let arr = r#"[{"id":"W1","urls":["https://a/1"]},{"id":"W2"}]"#;
        let works = parse_works(arr, WorksFormat::Auto).unwrap();
        assert_eq!(works.len(), 2);
        assert!(works[1].urls.is_empty());

        let lines = "{\"id\":\"W1\",\"urls\":[]}\n\n{\"id\":\"W2\",\"publication_year\":2020}\n";
        let works = parse_works(lines, WorksFormat::Auto).unwrap();
        assert_eq!(works[1].publication_year, Some(2020));

        let oa = r#"{"results":[{"id":"https://openalex.org/W7","locations":[{"pdf_url":"https://x/y.pdf"}]}]}"#;
        let works = parse_works(oa, WorksFormat::Auto).unwrap();
        assert_eq!(works[0].id, "W7");
        assert_eq!(works[0].urls, vec!["https://x/y.pdf"]);
    }

    #[test]
    fn single_object_is_one_jsonl_record() {
        let works = parse_works(r#"{"id":"W1"}"#, WorksFormat::Auto).unwrap();
        assert_eq!(works.len(), 1);
    }

    #[test]
    fn duplicate_and_blank_ids_are_rejected() {
        let err = parse_works(r#"[{"id":"W1"},{"id":"W1"}]"#, WorksFormat::Json).unwrap_err();
        assert!(err.to_string().contains("duplicate"));
        assert!(parse_works(r#"[{"id":" "}]"#, WorksFormat::Json).is_err());
    }

    #[test]
    fn bad_line_is_reported_with_its_number() {
        let err = parse_works("{\"id\":\"W1\"}\n{oops\n", WorksFormat::Jsonl).unwrap_err();
        assert!(err.to_string().contains("line 2"), "err={err}");
    }

    #[test]
    fn format_names_parse() {
        assert_eq!("NDJSON".parse::<WorksFormat>().unwrap(), WorksFormat::Jsonl);
        assert_eq!("openalex".parse::<WorksFormat>().unwrap(), WorksFormat::OpenAlex);
        assert!("csv".parse::<WorksFormat>().is_err());
    }

    #[test]
    fn load_works_reads_files() {
        let tmp = tempfile::tempdir().unwrap();
        let p = tmp.path().join("works.json");
        std::fs::write(&p, r#"[{"id":"W1","urls":["None"]}]"#).unwrap();
        let works = load_works(&p, WorksFormat::Auto).unwrap();
        assert_eq!(works[0].urls, vec!["None"]);
        assert!(matches!(
            load_works(tmp.path().join("missing.json"), WorksFormat::Auto),
            Err(Error::Input(_))
        ));
    }
}
