//! Note correlator — maps performance events onto tracing span lifecycles.
//!
//! # State machine (per note identifier)
//!
//! ```text
//!            start (vel > 0)
//!   Idle ──────────────────────▶ Active          (span opened)
//!     ▲                            │
//!     │   end, or start (vel 0)    │  start (vel > 0)
//!     └────────────────────────────┤      │
//!          (span closed, duration) │      ▼
//!                                  │   warning: overlapping note-on,
//!                                  │   event discarded, entry untouched
//!   end with no entry: warning, no state change
//! ```
//!
//! Events must be processed strictly in arrival order; `&mut self` on
//! [`NoteCorrelator::process_event`] enforces the single-writer discipline
//! the registry needs.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use crate::midi::{NoteEvent, NoteEventKind};
use crate::telemetry::{AttrValue, LogRecord, SpanData, TelemetrySink};

// ---------------------------------------------------------------------------
// Dynamics buckets
// ---------------------------------------------------------------------------

/// Coarse dynamics label derived from note-on velocity.
pub fn velocity_to_dynamics(velocity: u8) -> &'static str {
    if velocity < 40 {
        "pp"
    } else if velocity < 70 {
        "mf"
    } else if velocity < 100 {
        "f"
    } else {
        "ff"
    }
}

// ---------------------------------------------------------------------------
// NoteCorrelator
// ---------------------------------------------------------------------------

/// Registry entry for a currently-sounding note: the open span and the
/// wall-clock start used for the duration attribute.
struct ActiveNote {
    span: SpanData,
    started: Instant,
}

/// Correlates note start/end events into spans, logs, and anomaly warnings.
///
/// At most one [`ActiveNote`] exists per note identifier; an entry lives for
/// exactly one start/end pair.  Anomalies (overlapping starts, orphaned
/// ends) are logged and discarded — they never crash the pipeline or disturb
/// existing entries.
pub struct NoteCorrelator {
    active: HashMap<u8, ActiveNote>,
    telemetry: Arc<dyn TelemetrySink>,
}

impl NoteCorrelator {
    pub fn new(telemetry: Arc<dyn TelemetrySink>) -> Self {
        Self {
            active: HashMap::new(),
            telemetry,
        }
    }

    /// Number of notes currently sounding (entries in the registry).
    pub fn active_notes(&self) -> usize {
        self.active.len()
    }

    /// Process one event, in arrival order.
    pub fn process_event(&mut self, event: NoteEvent) {
        match event.kind {
            NoteEventKind::Start { velocity } if velocity > 0 => {
                self.note_on(event.note, velocity, &event.stream_id);
            }
            // A start with velocity 0 is an end by MIDI convention; kept as
            // documented behavior rather than rejected.
            NoteEventKind::Start { .. } | NoteEventKind::End => {
                self.note_off(event.note, &event.stream_id);
            }
        }
    }

    fn note_on(&mut self, note: u8, velocity: u8, stream_id: &str) {
        if self.active.contains_key(&note) {
            log::warn!("Overlapping note_on for note {note}, ignored (stream {stream_id})");
            return;
        }

        let dynamics = velocity_to_dynamics(velocity);

        let mut span = SpanData::begin(format!("note_{note}"));
        span.set_attribute("stream_id", AttrValue::Str(stream_id.to_string()));
        span.set_attribute("note", AttrValue::Int(i64::from(note)));
        span.set_attribute("velocity_on", AttrValue::Int(i64::from(velocity)));
        span.set_attribute("dynamics", AttrValue::Str(dynamics.to_string()));

        let context = span.context.clone();
        log::info!(
            "Note On - note: {note}, velocity: {velocity}, dynamics: {dynamics} \
             [trace {} span {}]",
            context.trace_id,
            context.span_id
        );
        self.telemetry.emit_log(
            LogRecord::info(format!("Note On received for note {note}"))
                .with_context(context)
                .with_attr("note", AttrValue::Int(i64::from(note)))
                .with_attr("velocity", AttrValue::Int(i64::from(velocity))),
        );

        self.active.insert(
            note,
            ActiveNote {
                span,
                started: Instant::now(),
            },
        );
    }

    fn note_off(&mut self, note: u8, stream_id: &str) {
        let Some(entry) = self.active.remove(&note) else {
            log::warn!(
                "Note Off without a corresponding Note On for note {note} (stream {stream_id})"
            );
            return;
        };

        let elapsed = entry.started.elapsed().as_secs_f64();

        let mut span = entry.span;
        span.set_attribute("elapsed_time", AttrValue::Double(elapsed));
        span.end_ok();

        let context = span.context.clone();
        log::info!(
            "Note Off - note: {note}, elapsed: {elapsed:.3}s [trace {} span {}]",
            context.trace_id,
            context.span_id
        );
        self.telemetry.emit_log(
            LogRecord::info(format!("Note Off processed for note {note}"))
                .with_context(context)
                .with_attr("elapsed_time", AttrValue::Double(elapsed)),
        );
        self.telemetry.export_span(span);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::emitter::testing::RecordingSink;
    use std::thread;
    use std::time::Duration;

    fn correlator() -> (NoteCorrelator, Arc<RecordingSink>) {
        let sink = Arc::new(RecordingSink::new());
        (NoteCorrelator::new(sink.clone()), sink)
    }

    #[test]
    fn dynamics_bucket_thresholds() {
        assert_eq!(velocity_to_dynamics(39), "pp");
        assert_eq!(velocity_to_dynamics(40), "mf");
        assert_eq!(velocity_to_dynamics(69), "mf");
        assert_eq!(velocity_to_dynamics(70), "f");
        assert_eq!(velocity_to_dynamics(99), "f");
        assert_eq!(velocity_to_dynamics(100), "ff");
    }

    #[test]
    fn start_then_end_opens_and_closes_one_span() {
        let (mut correlator, sink) = correlator();

        correlator.process_event(NoteEvent::start(60, 100, "s"));
        assert_eq!(correlator.active_notes(), 1);

        thread::sleep(Duration::from_millis(10));
        correlator.process_event(NoteEvent::end(60, "s"));
        assert_eq!(correlator.active_notes(), 0);

        let spans = sink.spans();
        assert_eq!(spans.len(), 1);
        let span = &spans[0];
        assert_eq!(span.name, "note_60");
        assert_eq!(span.status, crate::telemetry::SpanStatus::Ok);
        assert!(span.end_unix_nano.is_some());

        // Duration attribute reflects the time between the two events.
        let elapsed = match span.attribute("elapsed_time") {
            Some(AttrValue::Double(d)) => *d,
            other => panic!("missing elapsed_time: {other:?}"),
        };
        assert!(elapsed >= 0.01, "elapsed {elapsed}");
        assert!(elapsed < 5.0, "elapsed {elapsed}");

        // Span attributes from the start event are intact.
        assert_eq!(span.attribute("velocity_on"), Some(&AttrValue::Int(100)));
        assert_eq!(
            span.attribute("dynamics"),
            Some(&AttrValue::Str("ff".into()))
        );

        // Both log records carry the span's ids — the correlation join key.
        let logs = sink.logs();
        assert_eq!(logs.len(), 2);
        for record in &logs {
            let ctx = record.context.as_ref().expect("span context on log");
            assert_eq!(ctx, &span.context);
        }
    }

    #[test]
    fn overlapping_start_is_ignored_and_entry_untouched() {
        let (mut correlator, sink) = correlator();

        correlator.process_event(NoteEvent::start(60, 100, "s"));
        let original_ctx = sink.logs()[0].context.clone().expect("context");

        // Second start for the same note: warning only, no new span/entry.
        correlator.process_event(NoteEvent::start(60, 50, "s"));
        assert_eq!(correlator.active_notes(), 1);
        assert_eq!(sink.logs().len(), 1);
        assert!(sink.spans().is_empty());

        correlator.process_event(NoteEvent::end(60, "s"));
        let spans = sink.spans();
        assert_eq!(spans.len(), 1);

        // The closed span is the original one: same ids, original velocity.
        assert_eq!(spans[0].context, original_ctx);
        assert_eq!(
            spans[0].attribute("velocity_on"),
            Some(&AttrValue::Int(100))
        );
    }

    #[test]
    fn orphan_end_creates_no_entry_and_no_telemetry() {
        let (mut correlator, sink) = correlator();

        correlator.process_event(NoteEvent::end(60, "s"));
        assert_eq!(correlator.active_notes(), 0);
        assert!(sink.logs().is_empty());
        assert!(sink.spans().is_empty());
    }

    #[test]
    fn velocity_zero_start_is_treated_as_end() {
        let (mut correlator, sink) = correlator();

        correlator.process_event(NoteEvent::start(60, 100, "s"));
        correlator.process_event(NoteEvent::start(60, 0, "s"));

        assert_eq!(correlator.active_notes(), 0);
        assert_eq!(sink.spans().len(), 1);
    }

    #[test]
    fn velocity_zero_start_with_no_entry_is_an_orphan() {
        let (mut correlator, sink) = correlator();

        correlator.process_event(NoteEvent::start(60, 0, "s"));
        assert_eq!(correlator.active_notes(), 0);
        assert!(sink.spans().is_empty());
    }

    #[test]
    fn independent_notes_do_not_interfere() {
        let (mut correlator, sink) = correlator();

        correlator.process_event(NoteEvent::start(60, 80, "s"));
        correlator.process_event(NoteEvent::start(64, 90, "s"));
        assert_eq!(correlator.active_notes(), 2);

        correlator.process_event(NoteEvent::end(60, "s"));
        assert_eq!(correlator.active_notes(), 1);

        correlator.process_event(NoteEvent::end(64, "s"));
        assert_eq!(correlator.active_notes(), 0);

        let spans = sink.spans();
        assert_eq!(spans.len(), 2);
        assert_eq!(spans[0].name, "note_60");
        assert_eq!(spans[1].name, "note_64");
        assert_ne!(spans[0].context.trace_id, spans[1].context.trace_id);
    }

    #[test]
    fn note_can_sound_again_after_ending() {
        let (mut correlator, sink) = correlator();

        correlator.process_event(NoteEvent::start(60, 80, "s"));
        correlator.process_event(NoteEvent::end(60, "s"));
        correlator.process_event(NoteEvent::start(60, 90, "s"));
        correlator.process_event(NoteEvent::end(60, "s"));

        let spans = sink.spans();
        assert_eq!(spans.len(), 2);
        // Each sounding gets a fresh identity.
        assert_ne!(spans[0].context.span_id, spans[1].context.span_id);
    }
}
