//! Streamed answers

use crate::GeneratorError;
use futures::Stream;
use ragline_domain::{Answer, AnswerFragment};
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tokio_util::sync::DropGuard;

/// One item of a streamed answer
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// Next piece of answer text
    Fragment(AnswerFragment),
    /// Generation finished; always the last event of a successful stream
    Finished(Answer),
}

/// A finite, non-restartable stream of answer fragments
///
/// Yields fragments in generation order, then either
/// `Ok(StreamEvent::Finished)` or one `Err`. Dropping the stream cancels the
/// producer, which stops reading provider output.
pub struct AnswerStream {
    receiver: mpsc::Receiver<Result<StreamEvent, GeneratorError>>,
    _cancel_on_drop: DropGuard,
}

impl AnswerStream {
    pub(crate) fn new(
        receiver: mpsc::Receiver<Result<StreamEvent, GeneratorError>>,
        guard: DropGuard,
    ) -> Self {
        Self {
            receiver,
            _cancel_on_drop: guard,
        }
    }

    /// Get the next event
    pub async fn next_event(&mut self) -> Option<Result<StreamEvent, GeneratorError>> {
        self.receiver.recv().await
    }

    /// Drain the stream, returning the finished answer
    pub async fn into_answer(mut self) -> Result<Answer, GeneratorError> {
        while let Some(event) = self.next_event().await {
            if let StreamEvent::Finished(answer) = event? {
                return Ok(answer);
            }
        }
        Err(GeneratorError::Cancelled)
    }
}

impl Stream for AnswerStream {
    type Item = Result<StreamEvent, GeneratorError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.receiver.poll_recv(cx)
    }
}
