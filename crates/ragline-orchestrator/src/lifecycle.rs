//! Per-query state machine with trace emission

use ragline_domain::time::now_millis;
use ragline_domain::{AttributeValue, ErrorKind, QueryId, QueryState, TraceRecord};
use ragline_trace::TraceSink;
use std::sync::Arc;

/// Attributes for one trace record
pub(crate) type Attributes = Vec<(&'static str, AttributeValue)>;

/// Tracks the state of one query and emits a record per stage
///
/// A stage's record is emitted when the stage is left; terminal stages are
/// recorded on entry.
pub(crate) struct Lifecycle {
    query_id: QueryId,
    sink: Arc<dyn TraceSink>,
    state: QueryState,
    entered_at: u64,
}

impl Lifecycle {
    /// Enter `Received`
    pub(crate) fn start(query_id: QueryId, sink: Arc<dyn TraceSink>) -> Self {
        Self {
            query_id,
            sink,
            state: QueryState::Received,
            entered_at: now_millis(),
        }
    }

    #[cfg(test)]
    pub(crate) fn state(&self) -> QueryState {
        self.state
    }

    /// Leave the current stage for `next`, recording `attributes` on the
    /// stage being left
    pub(crate) fn advance(&mut self, next: QueryState, attributes: Attributes) {
        if !self.state.can_transition_to(next) {
            tracing::error!(
                query_id = %self.query_id,
                from = %self.state,
                to = %next,
                "Illegal state transition ignored"
            );
            return;
        }
        let now = now_millis();
        self.emit(self.state, self.entered_at, now, attributes);
        tracing::debug!(query_id = %self.query_id, from = %self.state, to = %next, "State transition");
        self.state = next;
        self.entered_at = now;
    }

    /// Leave the current stage for `Completed`
    pub(crate) fn complete(&mut self, stage_attributes: Attributes, outcome: Attributes) {
        self.advance(QueryState::Completed, stage_attributes);
        if self.state == QueryState::Completed {
            self.emit(QueryState::Completed, self.entered_at, self.entered_at, outcome);
        }
    }

    /// Leave the current stage for `Failed`
    pub(crate) fn fail(&mut self, stage_attributes: Attributes, kind: ErrorKind) {
        self.advance(QueryState::Failed, stage_attributes);
        if self.state == QueryState::Failed {
            self.emit(
                QueryState::Failed,
                self.entered_at,
                self.entered_at,
                vec![("error_kind", kind.as_str().into())],
            );
        }
    }

    fn emit(&self, stage: QueryState, started_at: u64, ended_at: u64, attributes: Attributes) {
        let record = attributes.into_iter().fold(
            TraceRecord::new(self.query_id, stage, started_at, ended_at),
            |record, (key, value)| record.with_attribute(key, value),
        );
        self.sink.emit(record);
    }
}
