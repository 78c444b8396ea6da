//! Reference documents returned by the retrieval step.

use serde::{Deserialize, Deserializer, Serialize};

/// Where a reference document can be found.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// An uploaded file in the knowledge base.
    File,
    /// A web page.
    #[serde(alias = "webpage", alias = "web_page")]
    Web,
    /// A publication from an indexed catalogue.
    #[serde(alias = "indexed_publication")]
    Publication,
    /// A kind this client does not know; the locator is kept.
    #[serde(other)]
    Unknown,
}

/// A typed link to one copy of a document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SourceLocator {
    #[serde(rename = "type")]
    pub kind: SourceKind,
    pub url: String,
}

/// A reference record delivered by a `docs` event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    /// Retrieval relevance score.
    #[serde(default)]
    pub score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(
        default,
        deserialize_with = "year_from_number_or_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub year: Option<String>,
    pub title: String,
    #[serde(default)]
    pub sources: Vec<SourceLocator>,
    /// Whether the finished answer cites this document. Derived locally,
    /// never read from the wire.
    #[serde(skip_deserializing)]
    pub is_referenced: bool,
}

impl Document {
    pub fn new(title: impl Into<String>, score: f64) -> Self {
        Self {
            score,
            author: None,
            year: None,
            title: title.into(),
            sources: Vec::new(),
            is_referenced: false,
        }
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    pub fn with_year(mut self, year: impl Into<String>) -> Self {
        self.year = Some(year.into());
        self
    }

    pub fn with_source(mut self, kind: SourceKind, url: impl Into<String>) -> Self {
        self.sources.push(SourceLocator {
            kind,
            url: url.into(),
        });
        self
    }

    /// Short "Author (Year)" attribution, if any part is known.
    pub fn attribution(&self) -> Option<String> {
        match (&self.author, &self.year) {
            (Some(author), Some(year)) => Some(format!("{author} ({year})")),
            (Some(author), None) => Some(author.clone()),
            (None, Some(year)) => Some(format!("({year})")),
            (None, None) => None,
        }
    }
}

/// Servers send the year either as a number or as a string.
fn year_from_number_or_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Year {
        Number(i64),
        Text(String),
    }

    Ok(match Option::<Year>::deserialize(deserializer)? {
        Some(Year::Number(n)) => Some(n.to_string()),
        Some(Year::Text(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_full_document() {
        let json = r#"{
            "score": 0.87,
            "author": "Lovelace",
            "year": 1843,
            "title": "Notes on the Analytical Engine",
            "sources": [
                {"type": "file", "url": "/files/notes.pdf"},
                {"type": "web", "url": "https://example.org/notes"},
                {"type": "publication", "url": "https://doi.org/10.0/notes"}
            ]
        }"#;
        let doc: Document = serde_json::from_str(json).unwrap();
        assert_eq!(doc.score, 0.87);
        assert_eq!(doc.author.as_deref(), Some("Lovelace"));
        assert_eq!(doc.year.as_deref(), Some("1843"));
        assert_eq!(doc.sources.len(), 3);
        assert_eq!(doc.sources[1].kind, SourceKind::Web);
        assert_eq!(doc.sources[2].kind, SourceKind::Publication);
        assert!(!doc.is_referenced);
    }

    #[test]
    fn parse_minimal_document() {
        let doc: Document = serde_json::from_str(r#"{"title": "Untitled"}"#).unwrap();
        assert_eq!(doc.score, 0.0);
        assert_eq!(doc.author, None);
        assert_eq!(doc.year, None);
        assert!(doc.sources.is_empty());
    }

    #[test]
    fn year_accepts_string() {
        let doc: Document = serde_json::from_str(r#"{"title": "t", "year": "2019"}"#).unwrap();
        assert_eq!(doc.year.as_deref(), Some("2019"));

        let doc: Document = serde_json::from_str(r#"{"title": "t", "year": null}"#).unwrap();
        assert_eq!(doc.year, None);
    }

    #[test]
    fn wire_flag_is_ignored() {
        let doc: Document =
            serde_json::from_str(r#"{"title": "t", "is_referenced": true}"#).unwrap();
        assert!(!doc.is_referenced);
    }

    #[test]
    fn source_kind_aliases() {
        let loc: SourceLocator =
            serde_json::from_str(r#"{"type": "web_page", "url": "u"}"#).unwrap();
        assert_eq!(loc.kind, SourceKind::Web);
        let loc: SourceLocator =
            serde_json::from_str(r#"{"type": "indexed_publication", "url": "u"}"#).unwrap();
        assert_eq!(loc.kind, SourceKind::Publication);
        let loc: SourceLocator = serde_json::from_str(r#"{"type": "fax", "url": "u"}"#).unwrap();
        assert_eq!(loc.kind, SourceKind::Unknown);
    }

    #[test]
    fn unknown_source_kind_keeps_document_list() {
        let json = r#"[
            {"title": "a", "sources": [{"type": "dataset", "url": "s3://bucket/a"}]},
            {"title": "b", "sources": [{"type": "web", "url": "https://b.example"}]}
        ]"#;
        let docs: Vec<Document> = serde_json::from_str(json).unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].sources[0].kind, SourceKind::Unknown);
        assert_eq!(docs[0].sources[0].url, "s3://bucket/a");
        assert_eq!(docs[1].sources[0].kind, SourceKind::Web);
    }

    #[test]
    fn attribution_formats() {
        let doc = Document::new("t", 1.0);
        assert_eq!(doc.attribution(), None);
        let doc = doc.with_author("Noether");
        assert_eq!(doc.attribution().as_deref(), Some("Noether"));
        let doc = doc.with_year("1921");
        assert_eq!(doc.attribution().as_deref(), Some("Noether (1921)"));
        assert_eq!(
            Document::new("t", 1.0).with_year("1921").attribution().as_deref(),
            Some("(1921)")
        );
    }
}
