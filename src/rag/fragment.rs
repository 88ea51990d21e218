use serde::{Deserialize, Serialize};

/// Descriptive fields carried alongside a fragment. Never used for ranking.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FragmentMetadata {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Category tag, e.g. `tutorial` or `api_reference`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
}

/// An embedded unit of source text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fragment {
    pub id: String,
    pub content: String,
    pub embedding: Vec<f32>,
    pub metadata: FragmentMetadata,
}

impl Fragment {
    pub fn new(
        id: impl Into<String>,
        content: impl Into<String>,
        embedding: Vec<f32>,
        metadata: FragmentMetadata,
    ) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            embedding,
            metadata,
        }
    }
}

/// A fragment paired with its similarity to one query.
#[derive(Debug, Clone, Copy)]
pub struct ScoredFragment<'a> {
    pub fragment: &'a Fragment,
    pub score: f32,
}

/// Seed corpus entry before embedding.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "RawDocument")]
pub struct SeedDocument {
    pub content: String,
    pub metadata: FragmentMetadata,
}

impl SeedDocument {
    pub fn new(content: impl Into<String>, metadata: FragmentMetadata) -> Self {
        Self {
            content: content.into(),
            metadata,
        }
    }
}

/// On-disk corpus format: `{ "title", "url", "type", "content" }`.
#[derive(Deserialize)]
struct RawDocument {
    title: String,
    #[serde(default)]
    url: Option<String>,
    #[serde(default, rename = "type")]
    kind: Option<String>,
    content: String,
}

impl From<RawDocument> for SeedDocument {
    fn from(raw: RawDocument) -> Self {
        SeedDocument {
            content: raw.content,
            metadata: FragmentMetadata {
                title: raw.title,
                url: raw.url,
                section: raw.kind,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn seed_document_reads_raw_corpus_format() {
        let doc: SeedDocument = serde_json::from_value(json!({
            "title": "Cache API",
            "url": "https://developers.cloudflare.com/workers/runtime-apis/cache/",
            "type": "api_reference",
            "content": "The Cache API provides a global cache object for Workers."
        }))
        .unwrap();

        assert_eq!(doc.metadata.title, "Cache API");
        assert_eq!(doc.metadata.section.as_deref(), Some("api_reference"));
        assert!(doc.content.starts_with("The Cache API"));
    }

    #[test]
    fn optional_metadata_may_be_absent() {
        let doc: SeedDocument = serde_json::from_value(json!({
            "title": "Notes",
            "content": "plain text"
        }))
        .unwrap();

        assert!(doc.metadata.url.is_none());
        assert!(doc.metadata.section.is_none());
    }
}
