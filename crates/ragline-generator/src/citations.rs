//! Citation markers
//!
//! Chunks are tagged in the prompt as `[source:<chunk_id>]` and the model is
//! asked to repeat the marker after each statement. Validation is a pure
//! set intersection with the assembled context.

use ragline_domain::AssembledContext;
use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

static CITATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[source:\s*([^\]]*[^\]\s])\s*\]").expect("citation marker regex is valid")
});

/// Marker text for a chunk id
pub fn marker(chunk_id: &str) -> String {
    format!("[source:{}]", chunk_id)
}

/// Chunk ids referenced in `text`, in first-appearance order, without repeats
///
/// # Examples
///
/// ```
/// use ragline_generator::extract_citations;
///
/// let ids = extract_citations("A [source:c2]. B [source:c1] and [source:c2].");
/// assert_eq!(ids, vec!["c2", "c1"]);
/// ```
pub fn extract_citations(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    CITATION_RE
        .captures_iter(text)
        .filter_map(|cap| cap.get(1).map(|m| m.as_str().to_string()))
        .filter(|id| seen.insert(id.clone()))
        .collect()
}

/// Split cited ids into those present in `context` and those that are not
///
/// Order of the first list follows `cited`.
pub fn validate_citations(
    cited: Vec<String>,
    context: &AssembledContext,
) -> (Vec<String>, Vec<String>) {
    cited.into_iter().partition(|id| context.contains(id))
}
