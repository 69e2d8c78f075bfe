//! OpenAlex `/works` response pages converted into `Work` records.
//!
//! Only the fields the pipeline needs are read; everything OpenAlex may omit or null is optional.

use paperscan_core::{Error, Result, Work};
use serde::Deserialize;

const ID_PREFIX: &str = "https://openalex.org/";

#[derive(Debug, Deserialize)]
struct Page {
    #[serde(default)]
    results: Option<Vec<OaWork>>,
}

#[derive(Debug, Deserialize)]
struct OaWork {
    id: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    publication_year: Option<i32>,
    #[serde(default)]
    authorships: Option<Vec<Authorship>>,
    #[serde(default)]
    locations: Option<Vec<Location>>,
    #[serde(default)]
    primary_topic: Option<Topic>,
}

#[derive(Debug, Deserialize)]
struct Authorship {
    #[serde(default)]
    author_position: Option<String>,
    #[serde(default)]
    author: Option<Author>,
    #[serde(default)]
    countries: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct Author {
    #[serde(default)]
    display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Location {
    #[serde(default)]
    pdf_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Topic {
    #[serde(default)]
    display_name: Option<String>,
}

fn non_blank(s: Option<String>) -> Option<String> {
    s.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

/// `https://openalex.org/W123` -> `W123`.
pub fn short_id(id: &str) -> &str {
    let id = id.trim();
    id.strip_prefix(ID_PREFIX).unwrap_or(id)
}

impl OaWork {
    fn into_work(self) -> Option<Work> {
        let id = non_blank(self.id)?;
        let urls: Vec<String> = self
            .locations
            .unwrap_or_default()
            .into_iter()
            .filter_map(|l| non_blank(l.pdf_url))
            .collect();
        let mut work = Work::new(short_id(&id), urls);
        work.title = non_blank(self.title).or_else(|| non_blank(self.display_name));
        work.publication_year = self.publication_year;
        work.topic = self.primary_topic.and_then(|t| non_blank(t.display_name));

        let mut authorships = self.authorships.unwrap_or_default();
        let first = authorships
            .iter()
            .position(|a| a.author_position.as_deref() == Some("first"))
            .or(if authorships.is_empty() { None } else { Some(0) });
        if let Some(i) = first {
            let a = authorships.remove(i);
            work.first_author = a.author.and_then(|x| non_blank(x.display_name));
            work.first_author_country = a
                .countries
                .unwrap_or_default()
                .into_iter()
                .find_map(|c| non_blank(Some(c)));
        }
        work.additional_authors = authorships
            .into_iter()
            .filter_map(|a| a.author.and_then(|x| non_blank(x.display_name)))
            .collect();
        Some(work)
    }
}

/// Works from one response page. Results without an id are skipped.
pub fn works_from_openalex(page: &serde_json::Value) -> Result<Vec<Work>> {
    let page: Page = serde_json::from_value(page.clone())
        .map_err(|e| Error::Input(format!("not an OpenAlex works page: {e}")))?;
    let results = page
        .results
        .ok_or_else(|| Error::Input("OpenAlex page has no `results`".to_string()))?;
    Ok(results.into_iter().filter_map(OaWork::into_work).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn converts_a_page() {
        let page = json!({
            "meta": {"count": 2},
            "results": [
                {
                    "id": "https://openalex.org/W100",
                    "title": "Rural broadband and census data",
                    "publication_year": 2021,
                    "primary_topic": {"display_name": "Rural Development"},
                    "authorships": [
                        {"author_position": "middle", "author": {"display_name": "B. Second"}, "countries": []},
                        {"author_position": "first", "author": {"display_name": "A. First"}, "countries": ["US", "CA"]},
                        {"author_position": "last", "author": {"display_name": "C. Last"}, "countries": null}
                    ],
                    "locations": [
                        {"pdf_url": "https://repo.example.edu/a.pdf"},
                        {"pdf_url": null},
                        {"landing_page_url": "https://example.org/"},
                        {"pdf_url": "  "},
                        {"pdf_url": "https://mirror.example.org/a.pdf"}
                    ]
                },
                {
                    "id": "W200",
                    "display_name": "No title field",
                    "authorships": null,
                    "locations": null
                }
            ]
        });
        let works = works_from_openalex(&page).unwrap();
        assert_eq!(works.len(), 2);

        let w = &works[0];
        assert_eq!(w.id, "W100");
        assert_eq!(
            w.urls,
            vec!["https://repo.example.edu/a.pdf", "https://mirror.example.org/a.pdf"]
        );
        assert_eq!(w.publication_year, Some(2021));
        assert_eq!(w.topic.as_deref(), Some("Rural Development"));
        assert_eq!(w.first_author.as_deref(), Some("A. First"));
        assert_eq!(w.first_author_country.as_deref(), Some("US"));
        assert_eq!(w.additional_authors, vec!["B. Second", "C. Last"]);

        let w = &works[1];
        assert_eq!(w.id, "W200");
        assert_eq!(w.title.as_deref(), Some("No title field"));
        assert!(w.urls.is_empty());
        assert!(w.first_author.is_none());
    }

    #[test]
    fn first_listed_author_is_used_without_positions() {
        let page = json!({"results": [{
            "id": "W1",
            "authorships": [
                {"author": {"display_name": "X"}},
                {"author": {"display_name": "Y"}}
            ]
        }]});
        let w = &works_from_openalex(&page).unwrap()[0];
        assert_eq!(w.first_author.as_deref(), Some("X"));
        assert_eq!(w.additional_authors, vec!["Y"]);
    }

    #[test]
    fn results_without_ids_are_skipped() {
        let page = json!({"results": [{"title": "orphan"}, {"id": ""}, {"id": "W9"}]});
        let works = works_from_openalex(&page).unwrap();
        assert_eq!(works.len(), 1);
        assert_eq!(works[0].id, "W9");
    }

    #[test]
    fn non_pages_are_input_errors() {
        assert!(matches!(works_from_openalex(&json!({"meta": {}})), Err(Error::Input(_))));
        assert!(matches!(works_from_openalex(&json!([1, 2])), Err(Error::Input(_))));
    }
}
