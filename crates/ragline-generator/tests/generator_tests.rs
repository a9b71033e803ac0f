//! Streaming and end-to-end generation tests

use futures::StreamExt;
use ragline_domain::{AssembledContext, EvidenceChunk, FinishReason, Query};
use ragline_generator::{
    GenerationCoordinator, GeneratorConfig, GeneratorError, StreamEvent, DEFAULT_DECLINE_MESSAGE,
};
use ragline_llm::{LlmError, MockProvider};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

fn context() -> AssembledContext {
    AssembledContext {
        chunks: vec![
            EvidenceChunk::new("c1", "geo", "Paris is the capital of France.", 0.9),
            EvidenceChunk::new("c2", "geo", "France is in Europe.", 0.7),
        ],
        total_token_count: 14,
        truncated: false,
    }
}

fn coordinator(provider: &MockProvider) -> GenerationCoordinator {
    coordinator_with(provider, GeneratorConfig::default())
}

fn coordinator_with(provider: &MockProvider, config: GeneratorConfig) -> GenerationCoordinator {
    GenerationCoordinator::new(config, Arc::new(provider.clone()))
}

/// Split a drained stream into fragments and the terminal item
fn split_events(
    events: Vec<Result<StreamEvent, GeneratorError>>,
) -> (Vec<(usize, String)>, Option<Result<StreamEvent, GeneratorError>>) {
    let mut fragments = Vec::new();
    let mut last = None;
    for event in events {
        match event {
            Ok(StreamEvent::Fragment(f)) => fragments.push((f.index, f.text)),
            other => last = Some(other),
        }
    }
    (fragments, last)
}

#[tokio::test]
async fn test_stream_fragments_are_contiguous_and_match_answer() {
    let provider = MockProvider::new("Paris is the capital [source:c1] of France [source:c2].");
    let stream = coordinator(&provider).generate_stream(
        Query::new("What is the capital of France?"),
        context(),
        CancellationToken::new(),
    );

    let events: Vec<_> = stream.collect().await;
    let (fragments, last) = split_events(events);

    assert!(fragments.len() > 1);
    for (expected, (index, _)) in fragments.iter().enumerate() {
        assert_eq!(*index, expected);
    }

    let joined: String = fragments.iter().map(|(_, text)| text.as_str()).collect();
    match last {
        Some(Ok(StreamEvent::Finished(answer))) => {
            assert_eq!(answer.text(), joined);
            assert_eq!(answer.citations(), ["c1".to_string(), "c2".to_string()]);
            assert_eq!(answer.finish_reason(), FinishReason::Complete);
        }
        other => panic!("expected Finished, got {:?}", other),
    }
    assert_eq!(provider.call_count(), 1);
}

#[tokio::test]
async fn test_stream_and_blocking_agree() {
    let provider = MockProvider::new("Paris [source:c1] and Rome [source:c7]");
    let coordinator = coordinator(&provider);
    let query = Query::new("q");

    let blocking = coordinator
        .generate(&query, &context(), &CancellationToken::new())
        .await
        .unwrap();
    let streamed = coordinator
        .generate_stream(query, context(), CancellationToken::new())
        .into_answer()
        .await
        .unwrap();

    assert_eq!(blocking.text(), streamed.text());
    assert_eq!(blocking.citations(), streamed.citations());
    assert_eq!(streamed.citations(), ["c1".to_string()]);
}

#[tokio::test]
async fn test_stream_declines_on_empty_context() {
    let provider = MockProvider::new("unused");
    let events: Vec<_> = coordinator(&provider)
        .generate_stream(Query::new("Where is Atlantis?"), AssembledContext::empty(), CancellationToken::new())
        .collect()
        .await;
    let (fragments, last) = split_events(events);

    assert_eq!(fragments, vec![(0, DEFAULT_DECLINE_MESSAGE.to_string())]);
    assert!(matches!(last, Some(Ok(StreamEvent::Finished(_)))));
    assert_eq!(provider.call_count(), 0);
}

#[tokio::test]
async fn test_stream_truncates_at_answer_limit() {
    let provider = MockProvider::new("alpha beta gamma");
    let config = GeneratorConfig {
        max_answer_chars: Some(7),
        ..GeneratorConfig::default()
    };
    let answer = coordinator_with(&provider, config)
        .generate_stream(Query::new("q"), context(), CancellationToken::new())
        .into_answer()
        .await
        .unwrap();

    assert_eq!(answer.text(), "alpha b");
    assert_eq!(answer.finish_reason(), FinishReason::Truncated);
}

#[tokio::test]
async fn test_mid_stream_failure_is_not_retried() {
    let provider = MockProvider::new("one two three four")
        .with_stream_failure_after(2, LlmError::Communication("reset".into()));
    let events: Vec<_> = coordinator(&provider)
        .generate_stream(Query::new("q"), context(), CancellationToken::new())
        .collect()
        .await;
    let (fragments, last) = split_events(events);

    assert_eq!(fragments.len(), 2);
    assert!(matches!(
        last,
        Some(Err(GeneratorError::Unavailable { attempts: 1, .. }))
    ));
    assert_eq!(provider.call_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_mid_stream_failure_reaches_slow_consumer() {
    let provider = MockProvider::new("one two three four five six seven eight")
        .with_stream_failure_after(5, LlmError::Communication("reset".into()));
    let config = GeneratorConfig {
        stream_buffer: 1,
        ..GeneratorConfig::default()
    };
    let mut stream = coordinator_with(&provider, config).generate_stream(
        Query::new("q"),
        context(),
        CancellationToken::new(),
    );

    let mut events = Vec::new();
    loop {
        tokio::time::sleep(Duration::from_millis(10)).await;
        match stream.next_event().await {
            Some(event) => events.push(event),
            None => break,
        }
    }
    let (fragments, last) = split_events(events);

    assert_eq!(fragments.len(), 5);
    match last {
        Some(Err(error)) => assert_eq!(error.kind().as_str(), "generation_unavailable"),
        other => panic!("expected a terminal error, got {:?}", other.map(|e| e.is_ok())),
    }
}

#[tokio::test(start_paused = true)]
async fn test_failure_before_first_fragment_is_retried() {
    let provider = MockProvider::new("one two")
        .with_stream_failure_after(0, LlmError::Communication("refused".into()));
    let err = coordinator(&provider)
        .generate_stream(Query::new("q"), context(), CancellationToken::new())
        .into_answer()
        .await
        .unwrap_err();

    assert!(matches!(err, GeneratorError::Unavailable { attempts: 3, .. }));
    assert_eq!(provider.call_count(), 3);
    assert_eq!(provider.fragments_emitted(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_stream_recovers_after_rate_limit() {
    let provider = MockProvider::new("Paris [source:c1]");
    provider.push_failure(LlmError::RateLimitExceeded);

    let answer = coordinator(&provider)
        .generate_stream(Query::new("q"), context(), CancellationToken::new())
        .into_answer()
        .await
        .unwrap();

    assert_eq!(answer.text(), "Paris [source:c1]");
    assert_eq!(provider.call_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_stream_timeout() {
    let provider = MockProvider::new("slow").with_delay(Duration::from_secs(60));
    let config = GeneratorConfig {
        timeout_ms: 1_000,
        ..GeneratorConfig::default()
    };
    let err = coordinator_with(&provider, config)
        .generate_stream(Query::new("q"), context(), CancellationToken::new())
        .into_answer()
        .await
        .unwrap_err();

    assert_eq!(err, GeneratorError::Timeout { timeout_ms: 1_000 });
    assert_eq!(provider.call_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_stops_provider_output() {
    let provider = MockProvider::new("a b c d e f g h i j")
        .with_fragment_delay(Duration::from_millis(100));
    let cancel = CancellationToken::new();
    let mut stream =
        coordinator(&provider).generate_stream(Query::new("q"), context(), cancel.clone());

    let first = stream.next_event().await;
    assert!(matches!(first, Some(Ok(StreamEvent::Fragment(ref f))) if f.index == 0));
    cancel.cancel();

    while let Some(event) = stream.next_event().await {
        if let Err(e) = event {
            assert_eq!(e, GeneratorError::Cancelled);
        }
    }
    let emitted = provider.fragments_emitted();
    tokio::time::sleep(Duration::from_secs(5)).await;

    assert_eq!(provider.fragments_emitted(), emitted);
    assert!(emitted < 10);
}

#[tokio::test(start_paused = true)]
async fn test_dropping_stream_stops_provider_output() {
    let provider = MockProvider::new("a b c d e f g h i j")
        .with_fragment_delay(Duration::from_millis(100));
    let caller_token = CancellationToken::new();
    let mut stream =
        coordinator(&provider).generate_stream(Query::new("q"), context(), caller_token.clone());

    assert!(stream.next_event().await.is_some());
    drop(stream);

    tokio::time::sleep(Duration::from_millis(50)).await;
    let emitted = provider.fragments_emitted();
    tokio::time::sleep(Duration::from_secs(5)).await;

    assert_eq!(provider.fragments_emitted(), emitted);
    assert!(emitted < 10);
    assert!(!caller_token.is_cancelled());
}
