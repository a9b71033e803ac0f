//! Ragline Trace Emitter
//!
//! Collects one [`TraceRecord`] per pipeline stage without ever slowing the
//! live request path down.
//!
//! # Architecture
//!
//! - [`TraceSink`]: synchronous, non-blocking, fire-and-forget `emit`
//! - [`ChannelTraceSink`]: buffers records in a bounded channel; when the
//!   buffer is full the record is dropped and counted
//! - [`TraceWorker`]: drains the channel on a background task, forwards
//!   records to [`TraceExporter`]s and keeps [`TraceMetrics`]
//! - [`MemoryTraceSink`] / [`NoopTraceSink`]: for tests and embedding
//!
//! # Examples
//!
//! ```
//! use ragline_domain::{QueryId, QueryState, TraceRecord};
//! use ragline_trace::{MemoryTraceSink, TraceSink};
//!
//! let sink = MemoryTraceSink::new();
//! let id = QueryId::new();
//! sink.emit(TraceRecord::new(id, QueryState::Received, 10, 10));
//! sink.emit(TraceRecord::new(id, QueryState::Retrieving, 10, 42).with_attribute("attempts", 1u32));
//!
//! assert_eq!(sink.stages_for(id), vec![QueryState::Received, QueryState::Retrieving]);
//! ```

#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod exporter;
pub mod metrics;
pub mod sink;
pub mod worker;

pub use config::TraceConfig;
pub use error::TraceError;
pub use exporter::{JsonlExporter, LogExporter, TraceExporter};
pub use metrics::TraceMetrics;
pub use sink::{ChannelTraceSink, MemoryTraceSink, NoopTraceSink, TraceSink};
pub use worker::TraceWorker;

pub use ragline_domain::TraceRecord;
