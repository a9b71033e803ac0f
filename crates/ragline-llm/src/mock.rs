//! Scripted provider for tests
//!
//! `MockProvider` never touches the network. Responses are chosen by prompt
//! substring, failures can be queued ahead of time, and both the time to
//! first output and the gap between fragments are configurable so timeout,
//! retry and cancellation paths can be exercised under paused tokio time.

use crate::{FragmentStream, GenerationProvider, LlmError};
use async_trait::async_trait;
use futures::stream;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

#[derive(Debug, Default)]
struct Script {
    responses: Vec<(String, String)>,
    failures: VecDeque<LlmError>,
    prompts: Vec<String>,
}

/// Mock LLM provider for deterministic testing
///
/// Clones share the script and counters.
///
/// # Examples
///
/// ```
/// use ragline_llm::{GenerationProvider, LlmError, MockProvider};
///
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// let provider = MockProvider::new("fallback")
///     .with_response("capital of France", "Paris [source:c1]");
/// provider.push_failure(LlmError::RateLimitExceeded);
///
/// assert!(provider.complete("capital of France?").await.is_err());
/// assert_eq!(provider.complete("capital of France?").await.unwrap(), "Paris [source:c1]");
/// assert_eq!(provider.complete("anything").await.unwrap(), "fallback");
/// assert_eq!(provider.call_count(), 3);
/// # });
/// ```
#[derive(Debug, Clone)]
pub struct MockProvider {
    model: String,
    default_response: String,
    delay: Duration,
    fragment_delay: Duration,
    fail_stream_after: Option<(usize, LlmError)>,
    script: Arc<Mutex<Script>>,
    call_count: Arc<AtomicUsize>,
    fragments_emitted: Arc<AtomicUsize>,
}

impl MockProvider {
    /// Create a provider with a fixed response for all prompts
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            model: "mock".to_string(),
            default_response: response.into(),
            delay: Duration::ZERO,
            fragment_delay: Duration::ZERO,
            fail_stream_after: None,
            script: Arc::new(Mutex::new(Script::default())),
            call_count: Arc::new(AtomicUsize::new(0)),
            fragments_emitted: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Respond with `response` to any prompt containing `pattern`
    ///
    /// Patterns are checked in the order they were added.
    pub fn with_response(self, pattern: impl Into<String>, response: impl Into<String>) -> Self {
        self.script()
            .responses
            .push((pattern.into(), response.into()));
        self
    }

    /// Wait this long before the response (or the first fragment)
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Wait this long between streamed fragments
    pub fn with_fragment_delay(mut self, delay: Duration) -> Self {
        self.fragment_delay = delay;
        self
    }

    /// Make every stream fail with `error` after `fragments` fragments
    pub fn with_stream_failure_after(mut self, fragments: usize, error: LlmError) -> Self {
        self.fail_stream_after = Some((fragments, error));
        self
    }

    /// Report a different model name
    pub fn with_model_name(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Fail the next call with `error`
    ///
    /// Queued failures are consumed one per call, before any delay.
    pub fn push_failure(&self, error: LlmError) {
        self.script().failures.push_back(error);
    }

    /// Number of `complete`/`complete_stream` calls so far
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Number of fragments handed out across all streams
    pub fn fragments_emitted(&self) -> usize {
        self.fragments_emitted.load(Ordering::SeqCst)
    }

    /// Every prompt received, oldest first
    pub fn prompts(&self) -> Vec<String> {
        self.script().prompts.clone()
    }

    /// The most recent prompt, if any
    pub fn last_prompt(&self) -> Option<String> {
        self.script().prompts.last().cloned()
    }

    fn script(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Record the call and resolve it to a response or a queued failure
    fn begin_call(&self, prompt: &str) -> Result<String, LlmError> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        let mut script = self.script();
        script.prompts.push(prompt.to_string());
        if let Some(error) = script.failures.pop_front() {
            return Err(error);
        }
        Ok(script
            .responses
            .iter()
            .find(|(pattern, _)| prompt.contains(pattern.as_str()))
            .map(|(_, response)| response.clone())
            .unwrap_or_else(|| self.default_response.clone()))
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new("Default mock response")
    }
}

/// Split text into word fragments that concatenate back to the original
fn fragments_of(text: &str) -> VecDeque<String> {
    text.split_inclusive(' ').map(str::to_string).collect()
}

struct MockStream {
    pending: VecDeque<String>,
    produced: usize,
    delay: Duration,
    fragment_delay: Duration,
    fail_after: Option<(usize, LlmError)>,
    emitted: Arc<AtomicUsize>,
}

#[async_trait]
impl GenerationProvider for MockProvider {
    async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        let response = self.begin_call(prompt)?;
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Ok(response)
    }

    async fn complete_stream(&self, prompt: &str) -> Result<FragmentStream, LlmError> {
        let response = self.begin_call(prompt)?;
        let state = MockStream {
            pending: fragments_of(&response),
            produced: 0,
            delay: self.delay,
            fragment_delay: self.fragment_delay,
            fail_after: self.fail_stream_after.clone(),
            emitted: Arc::clone(&self.fragments_emitted),
        };

        let fragments = stream::unfold(state, |mut state| async move {
            if let Some((after, error)) = &state.fail_after {
                if state.produced == *after {
                    let error = error.clone();
                    state.fail_after = None;
                    state.pending.clear();
                    return Some((Err(error), state));
                }
            }
            let fragment = state.pending.pop_front()?;
            let wait = if state.produced == 0 {
                state.delay
            } else {
                state.fragment_delay
            };
            if !wait.is_zero() {
                tokio::time::sleep(wait).await;
            }
            state.produced += 1;
            state.emitted.fetch_add(1, Ordering::SeqCst);
            Some((Ok(fragment), state))
        });

        Ok(Box::pin(fragments))
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
