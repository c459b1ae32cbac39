//! Telemetry — structured log records and trace spans, shipped to an OTLP
//! collector over HTTP.
//!
//! # Correlation model
//!
//! ```text
//! NoteCorrelator ── SpanData::begin ──┐
//!                                     ├─ SpanContext (trace_id + span_id)
//!         LogRecord ── with_context ──┘        │
//!                                               ▼
//!            TelemetrySink (emit_log / export_span)
//!                        │
//!                 OtlpHttpSink ── POST /v1/logs, /v1/traces
//! ```
//!
//! The trace/span id pair is the join key between the two streams: it is
//! generated once when a span opens and appears identically in every log
//! record emitted during that span and in the exported span itself.

pub mod emitter;
pub mod record;

pub use emitter::{NoopSink, OtlpHttpSink, TelemetrySink};
pub use record::{
    AttrValue, LogRecord, Severity, SpanContext, SpanData, SpanStatus, ZERO_SPAN_ID, ZERO_TRACE_ID,
};
