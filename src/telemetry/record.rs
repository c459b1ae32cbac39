//! Telemetry record types — log records, spans, and their shared identifiers.
//!
//! Logs and spans are correlated through a [`SpanContext`]: the trace/span id
//! pair is generated once when a span opens and carried verbatim on every log
//! record emitted inside that span's lifetime.  Records are plain values;
//! wire encoding lives in [`crate::telemetry::emitter`].

use uuid::Uuid;

/// Placeholder trace id for log records emitted outside any span.
pub const ZERO_TRACE_ID: &str = "00000000000000000000000000000000";

/// Placeholder span id for log records emitted outside any span.
pub const ZERO_SPAN_ID: &str = "0000000000000000";

/// Current wall-clock time as nanoseconds since the Unix epoch.
pub fn unix_nanos_now() -> i64 {
    chrono::Utc::now().timestamp_nanos_opt().unwrap_or(0)
}

// ---------------------------------------------------------------------------
// SpanContext
// ---------------------------------------------------------------------------

/// The trace/span identifier pair that joins the log stream to the trace
/// stream.
///
/// `trace_id` is 32 lowercase hex characters (globally unique per trace),
/// `span_id` is 16 (unique within the trace).  Both are generated when a span
/// opens and stay stable until it closes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpanContext {
    pub trace_id: String,
    pub span_id: String,
}

impl SpanContext {
    /// Generate a fresh context from two random UUIDs.
    pub fn generate() -> Self {
        let trace_id = Uuid::new_v4().simple().to_string();
        let span_id = Uuid::new_v4().simple().to_string()[..16].to_string();
        Self { trace_id, span_id }
    }
}

// ---------------------------------------------------------------------------
// Severity / AttrValue
// ---------------------------------------------------------------------------

/// Log severity, rendered as OTLP `severityText`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warn,
    Error,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "INFO",
            Severity::Warn => "WARN",
            Severity::Error => "ERROR",
        }
    }
}

/// Attribute value for log records and spans.
///
/// Maps onto the OTLP `AnyValue` variants the collector accepts
/// (`stringValue` / `intValue` / `doubleValue`).
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    Str(String),
    Int(i64),
    Double(f64),
}

impl AttrValue {
    /// OTLP JSON encoding of this value.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            AttrValue::Str(s) => serde_json::json!({ "stringValue": s }),
            AttrValue::Int(i) => serde_json::json!({ "intValue": i }),
            AttrValue::Double(d) => serde_json::json!({ "doubleValue": d }),
        }
    }
}

// ---------------------------------------------------------------------------
// LogRecord
// ---------------------------------------------------------------------------

/// One structured log record bound for the collector.
///
/// `context` is `None` for records emitted outside any span (batch audio
/// logs); the emitter substitutes the all-zero placeholder ids on the wire.
#[derive(Debug, Clone)]
pub struct LogRecord {
    pub severity: Severity,
    pub message: String,
    pub context: Option<SpanContext>,
    pub attributes: Vec<(String, AttrValue)>,
}

impl LogRecord {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Info,
            message: message.into(),
            context: None,
            attributes: Vec::new(),
        }
    }

    pub fn with_context(mut self, context: SpanContext) -> Self {
        self.context = Some(context);
        self
    }

    pub fn with_attr(mut self, key: impl Into<String>, value: AttrValue) -> Self {
        self.attributes.push((key.into(), value));
        self
    }
}

// ---------------------------------------------------------------------------
// SpanData
// ---------------------------------------------------------------------------

/// Span end status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpanStatus {
    /// Default — the span has not been explicitly closed.
    Unset,
    /// Closed normally.
    Ok,
}

impl SpanStatus {
    /// OTLP status code (`STATUS_CODE_UNSET` = 0, `STATUS_CODE_OK` = 1).
    pub fn code(&self) -> u8 {
        match self {
            SpanStatus::Unset => 0,
            SpanStatus::Ok => 1,
        }
    }
}

/// An explicit open/close span value.
///
/// Created with [`SpanData::begin`] (which generates the [`SpanContext`] and
/// stamps the start time) and closed with [`SpanData::end_ok`].  Ownership is
/// the lifecycle: whoever holds the value owns the open span and is
/// responsible for ending and exporting it.
#[derive(Debug, Clone)]
pub struct SpanData {
    pub name: String,
    pub context: SpanContext,
    pub start_unix_nano: i64,
    pub end_unix_nano: Option<i64>,
    pub attributes: Vec<(String, AttrValue)>,
    pub status: SpanStatus,
}

impl SpanData {
    /// Open a span: generate identifiers and record the start timestamp.
    pub fn begin(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            context: SpanContext::generate(),
            start_unix_nano: unix_nanos_now(),
            end_unix_nano: None,
            attributes: Vec::new(),
            status: SpanStatus::Unset,
        }
    }

    pub fn set_attribute(&mut self, key: impl Into<String>, value: AttrValue) {
        self.attributes.push((key.into(), value));
    }

    /// Close the span with OK status, stamping the end timestamp.
    pub fn end_ok(&mut self) {
        self.end_unix_nano = Some(unix_nanos_now());
        self.status = SpanStatus::Ok;
    }

    pub fn attribute(&self, key: &str) -> Option<&AttrValue> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
