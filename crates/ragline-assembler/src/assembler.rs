//! Context assembly

use crate::dedup::deduplicate;
use crate::tokens::{CharRatioCounter, TokenCounter, WordCounter};
use crate::{AssemblerConfig, TokenizerKind};
use ragline_domain::{AssembledContext, EvidenceChunk};
use tracing::debug;

/// Counters describing one assembly run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AssemblyStats {
    /// Chunks handed in
    pub candidates: usize,
    /// Chunks removed as duplicates
    pub duplicates_removed: usize,
    /// Chunks left out because the budget was reached
    pub dropped_by_budget: usize,
}

/// Builds bounded prompt context from ranked evidence
pub struct ContextAssembler {
    config: AssemblerConfig,
    counter: Box<dyn TokenCounter>,
}

impl ContextAssembler {
    /// Create an assembler using the configured tokenizer
    pub fn new(config: AssemblerConfig) -> Self {
        let counter: Box<dyn TokenCounter> = match config.tokenizer {
            TokenizerKind::CharRatio => Box::new(CharRatioCounter::new(config.chars_per_token)),
            TokenizerKind::Words => Box::new(WordCounter),
        };
        Self { config, counter }
    }

    /// Create an assembler with a custom token counter
    pub fn with_counter(config: AssemblerConfig, counter: Box<dyn TokenCounter>) -> Self {
        Self { config, counter }
    }

    /// Get the configuration
    pub fn config(&self) -> &AssemblerConfig {
        &self.config
    }

    /// Token cost of a text under this assembler's counter
    pub fn count_tokens(&self, text: &str) -> usize {
        self.counter.count(text)
    }

    /// Assemble `chunks` within `token_budget`
    ///
    /// # Examples
    ///
    /// ```
    /// use ragline_assembler::{AssemblerConfig, ContextAssembler};
    /// use ragline_domain::EvidenceChunk;
    ///
    /// let assembler = ContextAssembler::new(AssemblerConfig::default());
    /// let chunks = vec![
    ///     EvidenceChunk::new("a", "d1", "twelve chars", 0.9), // 3 tokens
    ///     EvidenceChunk::new("b", "d2", "another twelve", 0.8), // 4 tokens
    /// ];
    ///
    /// let ctx = assembler.assemble(&chunks, 5);
    /// assert_eq!(ctx.chunk_ids(), vec!["a"]);
    /// assert_eq!(ctx.total_token_count, 3);
    /// assert!(ctx.truncated);
    /// ```
    pub fn assemble(&self, chunks: &[EvidenceChunk], token_budget: usize) -> AssembledContext {
        self.assemble_with_stats(chunks, token_budget).0
    }

    /// Assemble within the configured budget
    pub fn assemble_configured(&self, chunks: &[EvidenceChunk]) -> (AssembledContext, AssemblyStats) {
        self.assemble_with_stats(chunks, self.config.token_budget)
    }

    /// Assemble and report what was removed
    pub fn assemble_with_stats(
        &self,
        chunks: &[EvidenceChunk],
        token_budget: usize,
    ) -> (AssembledContext, AssemblyStats) {
        let (unique, duplicates_removed) = deduplicate(chunks, self.config.dedup_threshold);

        let mut included = Vec::with_capacity(unique.len());
        let mut total = 0usize;
        let mut dropped_by_budget = 0usize;

        for (position, chunk) in unique.iter().enumerate() {
            let cost = self.counter.count(&chunk.text);
            if total + cost > token_budget {
                dropped_by_budget = unique.len() - position;
                break;
            }
            total += cost;
            included.push(chunk.clone());
        }

        let stats = AssemblyStats {
            candidates: chunks.len(),
            duplicates_removed,
            dropped_by_budget,
        };
        debug!(
            candidates = stats.candidates,
            included = included.len(),
            duplicates_removed,
            dropped_by_budget,
            tokens = total,
            budget = token_budget,
            "Context assembled"
        );

        (
            AssembledContext {
                chunks: included,
                total_token_count: total,
                truncated: dropped_by_budget > 0,
            },
            stats,
        )
    }
}

impl Default for ContextAssembler {
    fn default() -> Self {
        Self::new(AssemblerConfig::default())
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn chunks_strategy() -> impl Strategy<Value = Vec<EvidenceChunk>> {
        prop::collection::vec(("[a-e ]{0,40}", 0u8..3, 0u8..10), 0..15).prop_map(|specs| {
            specs
                .into_iter()
                .enumerate()
                .map(|(i, (text, doc, score))| {
                    EvidenceChunk::new(format!("c{}", i), format!("d{}", doc), text, score as f32 / 10.0)
                })
                .collect()
        })
    }

    proptest! {
        /// Total token count never exceeds the budget
        #[test]
        fn test_budget_never_exceeded(chunks in chunks_strategy(), budget in 0usize..60) {
            let assembler = ContextAssembler::default();
            let ctx = assembler.assemble(&chunks, budget);
            prop_assert!(ctx.total_token_count <= budget);

            let recount: usize = ctx.chunks.iter().map(|c| assembler.count_tokens(&c.text)).sum();
            prop_assert_eq!(recount, ctx.total_token_count);
        }

        /// Same input, same context
        #[test]
        fn test_assembly_is_deterministic(chunks in chunks_strategy(), budget in 0usize..60) {
            let assembler = ContextAssembler::default();
            prop_assert_eq!(assembler.assemble(&chunks, budget), assembler.assemble(&chunks, budget));
        }

        /// Included chunks are a subsequence of the input
        #[test]
        fn test_relative_order_preserved(chunks in chunks_strategy(), budget in 0usize..60) {
            let ctx = ContextAssembler::default().assemble(&chunks, budget);
            let positions: Vec<usize> = ctx
                .chunks
                .iter()
                .map(|c| chunks.iter().position(|o| o.chunk_id == c.chunk_id).unwrap_or(usize::MAX))
                .collect();
            prop_assert!(positions.windows(2).all(|w| w[0] < w[1]));
        }
    }
}
