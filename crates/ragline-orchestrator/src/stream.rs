//! Streamed query results

use crate::api::{QueryEvent, QueryResponse};
use crate::QueryFailure;
use futures::Stream;
use ragline_domain::QueryId;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tokio_util::sync::DropGuard;

/// Events of one streamed query
///
/// Yields `Fragment` events in order and ends with exactly one `Completed`
/// or `Failed` event. Dropping the stream cancels the query.
pub struct QueryStream {
    query_id: QueryId,
    receiver: mpsc::Receiver<QueryEvent>,
    _cancel_on_drop: DropGuard,
}

impl QueryStream {
    pub(crate) fn new(
        query_id: QueryId,
        receiver: mpsc::Receiver<QueryEvent>,
        guard: DropGuard,
    ) -> Self {
        Self {
            query_id,
            receiver,
            _cancel_on_drop: guard,
        }
    }

    /// Identifier shared with trace and evaluation records
    pub fn query_id(&self) -> QueryId {
        self.query_id
    }

    /// Get the next event
    pub async fn next_event(&mut self) -> Option<QueryEvent> {
        self.receiver.recv().await
    }

    /// Drain the stream into the final response
    ///
    /// # Errors
    ///
    /// The failure carried by a `Failed` event, or a cancellation if the
    /// stream ends without a terminal event.
    pub async fn into_response(mut self) -> Result<QueryResponse, QueryFailure> {
        while let Some(event) = self.next_event().await {
            match event {
                QueryEvent::Fragment { .. } => {}
                QueryEvent::Completed { response } => return Ok(response),
                QueryEvent::Failed {
                    error,
                    partial_answer,
                } => return Err(QueryFailure::from_response(error, partial_answer)),
            }
        }
        Err(QueryFailure::cancelled())
    }
}

impl Stream for QueryStream {
    type Item = QueryEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.receiver.poll_recv(cx)
    }
}
