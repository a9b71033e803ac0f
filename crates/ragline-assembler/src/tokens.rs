//! Token cost estimation

/// Estimates how many provider tokens a text costs
pub trait TokenCounter: Send + Sync {
    /// Token cost of `text`
    fn count(&self, text: &str) -> usize;
}

/// Characters divided by a fixed ratio, rounded up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CharRatioCounter {
    chars_per_token: usize,
}

impl CharRatioCounter {
    /// Create a counter; a ratio of 0 is treated as 1
    pub fn new(chars_per_token: usize) -> Self {
        Self {
            chars_per_token: chars_per_token.max(1),
        }
    }
}

impl Default for CharRatioCounter {
    fn default() -> Self {
        Self::new(4)
    }
}

impl TokenCounter for CharRatioCounter {
    fn count(&self, text: &str) -> usize {
        text.chars().count().div_ceil(self.chars_per_token)
    }
}

/// Whitespace-separated words
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WordCounter;

impl TokenCounter for WordCounter {
    fn count(&self, text: &str) -> usize {
        text.split_whitespace().count()
    }
}
