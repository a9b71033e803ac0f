//! Near-duplicate detection

use ragline_domain::EvidenceChunk;
use std::cmp::Ordering;
use std::collections::HashSet;

fn word_set(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}

fn dice(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    let shared = a.intersection(b).count();
    (2 * shared) as f64 / (a.len() + b.len()) as f64
}

/// Sørensen–Dice coefficient over lowercased word sets
///
/// 1.0 for identical vocabularies, 0.0 for disjoint ones. Two texts with no
/// words at all count as identical.
///
/// # Examples
///
/// ```
/// use ragline_assembler::text_similarity;
///
/// assert_eq!(text_similarity("The cat sat", "the CAT sat."), 1.0);
/// assert_eq!(text_similarity("red fish", "blue bird"), 0.0);
/// ```
pub fn text_similarity(a: &str, b: &str) -> f64 {
    dice(&word_set(a), &word_set(b))
}

/// Remove duplicate chunks, returning survivors and the number removed
///
/// A chunk is a duplicate when a chunk already kept has the same chunk id,
/// or comes from the same document with text similarity at or above
/// `threshold`. Chunks are considered from the highest score down (earlier
/// input position wins ties), so the best-scoring instance survives.
/// Survivors keep their input order.
pub fn deduplicate(chunks: &[EvidenceChunk], threshold: f64) -> (Vec<EvidenceChunk>, usize) {
    let words: Vec<HashSet<String>> = chunks.iter().map(|c| word_set(&c.text)).collect();

    let mut order: Vec<usize> = (0..chunks.len()).collect();
    order.sort_by(|&a, &b| {
        match chunks[b].embedding_score.total_cmp(&chunks[a].embedding_score) {
            Ordering::Equal => a.cmp(&b),
            other => other,
        }
    });

    let mut kept: Vec<usize> = Vec::with_capacity(chunks.len());
    for candidate in order {
        let chunk = &chunks[candidate];
        let duplicate = kept.iter().any(|&k| {
            let keeper = &chunks[k];
            keeper.chunk_id == chunk.chunk_id
                || (keeper.source_document_id == chunk.source_document_id
                    && dice(&words[k], &words[candidate]) >= threshold)
        });
        if !duplicate {
            kept.push(candidate);
        }
    }

    let removed = chunks.len() - kept.len();
    kept.sort_unstable();
    (kept.into_iter().map(|i| chunks[i].clone()).collect(), removed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn twenty_words() -> Vec<String> {
        (0..20).map(|i| format!("word{}", i)).collect()
    }

    #[test]
    fn test_ninety_five_percent_overlap_is_duplicate() {
        let words = twenty_words();
        let mut variant = words.clone();
        variant[19] = "different".to_string();

        let a = words.join(" ");
        let b = variant.join(" ");
        assert!((text_similarity(&a, &b) - 0.95).abs() < 1e-9);

        let chunks = vec![
            EvidenceChunk::new("low", "doc", b, 0.7),
            EvidenceChunk::new("high", "doc", a, 0.9),
        ];
        let (kept, removed) = deduplicate(&chunks, 0.9);
        assert_eq!(removed, 1);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].chunk_id, "high");
    }

    #[test]
    fn test_similar_text_in_other_document_is_kept() {
        let text = twenty_words().join(" ");
        let chunks = vec![
            EvidenceChunk::new("a", "doc1", text.clone(), 0.9),
            EvidenceChunk::new("b", "doc2", text, 0.8),
        ];
        let (kept, removed) = deduplicate(&chunks, 0.9);
        assert_eq!(removed, 0);
        assert_eq!(kept.len(), 2);
    }

    #[test]
    fn test_same_chunk_id_is_always_duplicate() {
        let chunks = vec![
            EvidenceChunk::new("a", "doc1", "alpha", 0.5),
            EvidenceChunk::new("a", "doc2", "completely different", 0.6),
        ];
        let (kept, removed) = deduplicate(&chunks, 1.0);
        assert_eq!(removed, 1);
        assert_eq!(kept[0].text, "completely different");
    }

    #[test]
    fn test_survivors_keep_input_order() {
        let chunks = vec![
            EvidenceChunk::new("a", "d1", "first text", 0.2),
            EvidenceChunk::new("b", "d2", "second text", 0.9),
            EvidenceChunk::new("c", "d3", "third text", 0.5),
        ];
        let (kept, _) = deduplicate(&chunks, 0.9);
        let ids: Vec<_> = kept.iter().map(|c| c.chunk_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_score_tie_keeps_earlier_chunk() {
        let chunks = vec![
            EvidenceChunk::new("first", "d", "same words here", 0.5),
            EvidenceChunk::new("second", "d", "same words here", 0.5),
        ];
        let (kept, _) = deduplicate(&chunks, 0.9);
        assert_eq!(kept[0].chunk_id, "first");
    }

    #[test]
    fn test_empty_texts_are_identical() {
        assert_eq!(text_similarity("", "..."), 1.0);
        assert_eq!(text_similarity("", "word"), 0.0);
    }
}
