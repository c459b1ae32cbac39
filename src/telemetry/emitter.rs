//! `TelemetrySink` trait and the OTLP/HTTP implementation.
//!
//! Delivery is fire-and-forget: the capture and correlation paths hand a
//! record to the sink and move on.  `OtlpHttpSink` serialises the record to
//! the collector's JSON shape and POSTs it on a detached tokio task; delivery
//! failures are logged locally and never surface to the caller, since
//! telemetry must not compromise the recording itself.

use tokio::runtime::Handle;

use crate::config::TelemetryConfig;
use crate::telemetry::record::{LogRecord, SpanData, ZERO_SPAN_ID, ZERO_TRACE_ID};

// ---------------------------------------------------------------------------
// TelemetrySink trait
// ---------------------------------------------------------------------------

/// Accepts log records and finished spans for delivery to a collector.
///
/// Implementors must be `Send + Sync` so one sink can be shared between the
/// encoder thread and the correlator (`Arc<dyn TelemetrySink>`).  Neither
/// method returns a `Result`: failures are an implementation concern.
pub trait TelemetrySink: Send + Sync {
    /// Ship one log record.
    fn emit_log(&self, record: LogRecord);

    /// Ship one closed span.
    fn export_span(&self, span: SpanData);
}

/// Sink that discards everything.  Used when telemetry is disabled in config.
pub struct NoopSink;

impl TelemetrySink for NoopSink {
    fn emit_log(&self, _record: LogRecord) {}
    fn export_span(&self, _span: SpanData) {}
}

// ---------------------------------------------------------------------------
// OTLP JSON payloads
// ---------------------------------------------------------------------------

/// Collector-shaped JSON for one log record (`/v1/logs`).
///
/// Shape: a resource descriptor carrying `service.name`, one scope, one log
/// record with nanosecond timestamp, severity text, body, trace/span ids
/// (all-zero placeholders when the record has no span context) and key/value
/// attributes.
pub(crate) fn logs_payload(
    service_name: &str,
    scope_name: &str,
    record: &LogRecord,
) -> serde_json::Value {
    let (trace_id, span_id) = match &record.context {
        Some(ctx) => (ctx.trace_id.as_str(), ctx.span_id.as_str()),
        None => (ZERO_TRACE_ID, ZERO_SPAN_ID),
    };

    let attributes: Vec<serde_json::Value> = record
        .attributes
        .iter()
        .map(|(key, value)| serde_json::json!({ "key": key, "value": value.to_json() }))
        .collect();

    serde_json::json!({
        "resource": {
            "attributes": [
                { "key": "service.name", "value": { "stringValue": service_name } }
            ]
        },
        "scopeLogs": [
            {
                "scope": { "name": scope_name },
                "logRecords": [
                    {
                        "timeUnixNano": crate::telemetry::record::unix_nanos_now(),
                        "severityText": record.severity.as_str(),
                        "body": { "stringValue": record.message },
                        "traceId": trace_id,
                        "spanId": span_id,
                        "attributes": attributes,
                    }
                ],
            }
        ],
    })
}

/// Collector-shaped JSON for one finished span (`/v1/traces`), batched trace
/// export shape.
pub(crate) fn traces_payload(
    service_name: &str,
    scope_name: &str,
    span: &SpanData,
) -> serde_json::Value {
    let attributes: Vec<serde_json::Value> = span
        .attributes
        .iter()
        .map(|(key, value)| serde_json::json!({ "key": key, "value": value.to_json() }))
        .collect();

    serde_json::json!({
        "resourceSpans": [
            {
                "resource": {
                    "attributes": [
                        { "key": "service.name", "value": { "stringValue": service_name } }
                    ]
                },
                "scopeSpans": [
                    {
                        "scope": { "name": scope_name },
                        "spans": [
                            {
                                "traceId": span.context.trace_id,
                                "spanId": span.context.span_id,
                                "name": span.name,
                                "kind": 1, // SPAN_KIND_INTERNAL
                                "startTimeUnixNano": span.start_unix_nano,
                                "endTimeUnixNano": span.end_unix_nano.unwrap_or(span.start_unix_nano),
                                "attributes": attributes,
                                "status": { "code": span.status.code() },
                            }
                        ],
                    }
                ],
            }
        ],
    })
}

// ---------------------------------------------------------------------------
// OtlpHttpSink
// ---------------------------------------------------------------------------

/// Ships records to an OTLP collector over HTTP/JSON.
///
/// Requests run on detached tasks spawned onto the tokio runtime whose
/// [`Handle`] is supplied at construction, so `emit_log` / `export_span`
/// return immediately even from blocking threads.
pub struct OtlpHttpSink {
    client: reqwest::Client,
    handle: Handle,
    logs_url: String,
    traces_url: String,
    service_name: String,
    scope_name: String,
}

impl OtlpHttpSink {
    /// Build a sink from the telemetry section of the application config.
    pub fn new(handle: Handle, config: &TelemetryConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        let endpoint = config.endpoint.trim_end_matches('/');

        Self {
            client,
            handle,
            logs_url: format!("{endpoint}/v1/logs"),
            traces_url: format!("{endpoint}/v1/traces"),
            service_name: config.service_name.clone(),
            scope_name: config.scope_name.clone(),
        }
    }

    /// POST `body` to `url` on a detached task.  A transport error or a
    /// non-success status is logged and otherwise swallowed.
    fn post(&self, url: String, body: serde_json::Value, what: &'static str) {
        let client = self.client.clone();
        self.handle.spawn(async move {
            match client.post(&url).json(&body).send().await {
                Ok(response) if !response.status().is_success() => {
                    log::error!(
                        "collector rejected {what}: HTTP {} from {url}",
                        response.status()
                    );
                }
                Ok(_) => {}
                Err(e) => {
                    log::error!("failed to deliver {what} to {url}: {e}");
                }
            }
        });
    }
}

impl TelemetrySink for OtlpHttpSink {
    fn emit_log(&self, record: LogRecord) {
        let body = logs_payload(&self.service_name, &self.scope_name, &record);
        self.post(self.logs_url.clone(), body, "log record");
    }

    fn export_span(&self, span: SpanData) {
        let body = traces_payload(&self.service_name, &self.scope_name, &span);
        self.post(self.traces_url.clone(), body, "span");
    }
}

// ---------------------------------------------------------------------------
// Test support
// ---------------------------------------------------------------------------

/// In-memory sink for assertions in unit tests.
#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Mutex;

    use super::TelemetrySink;
    use crate::telemetry::record::{LogRecord, SpanData};

    #[derive(Default)]
    pub struct RecordingSink {
        pub logs: Mutex<Vec<LogRecord>>,
        pub spans: Mutex<Vec<SpanData>>,
    }

    impl RecordingSink {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn logs(&self) -> Vec<LogRecord> {
            self.logs.lock().unwrap().clone()
        }

        pub fn spans(&self) -> Vec<SpanData> {
            self.spans.lock().unwrap().clone()
        }
    }

    impl TelemetrySink for RecordingSink {
        fn emit_log(&self, record: LogRecord) {
            self.logs.lock().unwrap().push(record);
        }

        fn export_span(&self, span: SpanData) {
            self.spans.lock().unwrap().push(span);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::record::{AttrValue, LogRecord, SpanContext, SpanData};

    #[test]
    fn logs_payload_carries_service_scope_and_body() {
        let record = LogRecord::info("Note On received for note 60")
            .with_attr("note", AttrValue::Int(60));
        let body = logs_payload("midi_audio_processor", "midi_audio_logs", &record);

        assert_eq!(
            body["resource"]["attributes"][0]["value"]["stringValue"],
            "midi_audio_processor"
        );
        assert_eq!(body["scopeLogs"][0]["scope"]["name"], "midi_audio_logs");

        let log = &body["scopeLogs"][0]["logRecords"][0];
        assert_eq!(log["severityText"], "INFO");
        assert_eq!(log["body"]["stringValue"], "Note On received for note 60");
        assert_eq!(log["attributes"][0]["key"], "note");
        assert_eq!(log["attributes"][0]["value"]["intValue"], 60);
        assert!(log["timeUnixNano"].as_i64().unwrap() > 0);
    }

    #[test]
    fn logs_payload_uses_zero_ids_without_context() {
        let record = LogRecord::info("Audio chunk batch for stream x");
        let body = logs_payload("svc", "scope", &record);
        let log = &body["scopeLogs"][0]["logRecords"][0];
        assert_eq!(log["traceId"], ZERO_TRACE_ID);
        assert_eq!(log["spanId"], ZERO_SPAN_ID);
    }

    #[test]
    fn logs_payload_propagates_span_context() {
        let ctx = SpanContext::generate();
        let record = LogRecord::info("m").with_context(ctx.clone());
        let body = logs_payload("svc", "scope", &record);
        let log = &body["scopeLogs"][0]["logRecords"][0];
        assert_eq!(log["traceId"], ctx.trace_id.as_str());
        assert_eq!(log["spanId"], ctx.span_id.as_str());
    }

    #[test]
    fn traces_payload_has_batch_shape_and_ok_status() {
        let mut span = SpanData::begin("note_60");
        span.set_attribute("velocity_on", AttrValue::Int(100));
        span.end_ok();

        let body = traces_payload("svc", "scope", &span);
        let exported = &body["resourceSpans"][0]["scopeSpans"][0]["spans"][0];
        assert_eq!(exported["name"], "note_60");
        assert_eq!(exported["traceId"], span.context.trace_id.as_str());
        assert_eq!(exported["spanId"], span.context.span_id.as_str());
        assert_eq!(exported["status"]["code"], 1);
        assert!(
            exported["endTimeUnixNano"].as_i64().unwrap()
                >= exported["startTimeUnixNano"].as_i64().unwrap()
        );
    }
}
