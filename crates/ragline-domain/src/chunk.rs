//! Evidence chunks and metadata filters

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Chunk metadata. Ordered so prompts and serialised output are stable.
pub type Metadata = BTreeMap<String, String>;

/// A retrieved span of a source document
///
/// Owned by the retriever until it is handed to the context assembler;
/// treated as immutable from then on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceChunk {
    /// Unique chunk identifier within the index
    pub chunk_id: String,

    /// The document this chunk was cut from
    pub source_document_id: String,

    /// Chunk text
    pub text: String,

    /// Similarity between the query embedding and this chunk
    pub embedding_score: f32,

    /// 1-based position in the retriever's output
    pub rank: usize,

    /// Free-form metadata (source file, page, section, ...)
    #[serde(default)]
    pub metadata: Metadata,

    /// Last modification of the source document (Unix seconds)
    ///
    /// Used as the recency tie-break; `None` sorts as oldest.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_updated_at: Option<u64>,
}

impl EvidenceChunk {
    /// Create a chunk with empty metadata and rank 0 (unranked)
    pub fn new(
        chunk_id: impl Into<String>,
        source_document_id: impl Into<String>,
        text: impl Into<String>,
        embedding_score: f32,
    ) -> Self {
        Self {
            chunk_id: chunk_id.into(),
            source_document_id: source_document_id.into(),
            text: text.into(),
            embedding_score,
            rank: 0,
            metadata: Metadata::new(),
            document_updated_at: None,
        }
    }

    /// Set the document recency timestamp
    pub fn with_updated_at(mut self, updated_at: u64) -> Self {
        self.document_updated_at = Some(updated_at);
        self
    }

    /// Add a metadata entry
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// Conjunctive metadata pre-filter
///
/// Maps a metadata key to the set of values allowed for it. A chunk passes
/// when, for every key, it carries that key with one of the allowed values.
/// An empty filter admits everything.
///
/// # Examples
///
/// ```
/// use ragline_domain::{Metadata, MetadataFilter};
///
/// let filter = MetadataFilter::new()
///     .allow("lang", ["en", "de"])
///     .allow("kind", ["manual"]);
///
/// let mut meta = Metadata::new();
/// meta.insert("lang".into(), "en".into());
/// meta.insert("kind".into(), "manual".into());
/// assert!(filter.matches(&meta));
///
/// meta.insert("kind".into(), "blog".into());
/// assert!(!filter.matches(&meta));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetadataFilter(BTreeMap<String, BTreeSet<String>>);

impl MetadataFilter {
    /// Empty filter (matches everything)
    pub fn new() -> Self {
        Self::default()
    }

    /// Allow the given values for `key`, extending any values already allowed
    pub fn allow<I, V>(mut self, key: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        self.0
            .entry(key.into())
            .or_default()
            .extend(values.into_iter().map(Into::into));
        self
    }

    /// Whether the filter has no constraints
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of constrained keys
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterate over (key, allowed values)
    pub fn iter(&self) -> impl Iterator<Item = (&String, &BTreeSet<String>)> {
        self.0.iter()
    }

    /// Check a metadata map against every constraint
    pub fn matches(&self, metadata: &Metadata) -> bool {
        self.0.iter().all(|(key, allowed)| {
            metadata
                .get(key)
                .map(|value| allowed.contains(value))
                .unwrap_or(false)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(pairs: &[(&str, &str)]) -> Metadata {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_empty_filter_matches_everything() {
        let filter = MetadataFilter::new();
        assert!(filter.is_empty());
        assert!(filter.matches(&Metadata::new()));
        assert!(filter.matches(&meta(&[("a", "b")])));
    }

    #[test]
    fn test_missing_key_fails() {
        let filter = MetadataFilter::new().allow("lang", ["en"]);
        assert!(!filter.matches(&meta(&[("kind", "manual")])));
    }

    #[test]
    fn test_filter_is_conjunctive() {
        let filter = MetadataFilter::new()
            .allow("lang", ["en"])
            .allow("kind", ["manual", "faq"]);

        assert!(filter.matches(&meta(&[("lang", "en"), ("kind", "faq")])));
        assert!(!filter.matches(&meta(&[("lang", "fr"), ("kind", "faq")])));
        assert!(!filter.matches(&meta(&[("lang", "en")])));
    }

    #[test]
    fn test_allow_extends_values() {
        let filter = MetadataFilter::new()
            .allow("lang", ["en"])
            .allow("lang", ["de"]);
        assert_eq!(filter.len(), 1);
        assert!(filter.matches(&meta(&[("lang", "de")])));
    }

    #[test]
    fn test_filter_deserializes_from_map() {
        let filter: MetadataFilter =
            serde_json::from_str(r#"{"lang": ["en", "de"]}"#).unwrap();
        assert!(filter.matches(&meta(&[("lang", "de")])));
    }

    #[test]
    fn test_chunk_builder() {
        let chunk = EvidenceChunk::new("c1", "doc1", "text", 0.5)
            .with_updated_at(100)
            .with_metadata("page", "3");
        assert_eq!(chunk.rank, 0);
        assert_eq!(chunk.document_updated_at, Some(100));
        assert_eq!(chunk.metadata.get("page").map(String::as_str), Some("3"));
    }
}
