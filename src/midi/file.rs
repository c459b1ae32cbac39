//! MIDI file replay via midly.
//!
//! Parses a Standard MIDI File into a tick-ordered timeline of note events
//! and tempo changes, then replays it in real time: tempo-aware sleeps
//! between ticks, one correlator callback per note event, cooperative stop
//! checks between items.  Tracks are merged and sorted so a multi-track file
//! replays as one event stream.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use midly::{MetaMessage, MidiMessage, Smf, TrackEventKind};

use crate::midi::event::NoteEvent;
use crate::midi::MidiSourceError;

/// Microseconds per beat at the MIDI default of 120 BPM.
const DEFAULT_US_PER_BEAT: u64 = 500_000;

/// Fallback pulses-per-quarter-note for SMPTE-timed files.
const DEFAULT_PPQ: u16 = 480;

// ---------------------------------------------------------------------------
// Timeline
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub(crate) enum ReplayItem {
    /// Tempo change: microseconds per beat.
    Tempo(u64),
    Event(NoteEvent),
}

#[derive(Debug)]
pub(crate) struct TimedItem {
    pub tick: u64,
    pub item: ReplayItem,
}

/// Tick-ordered replay timeline extracted from one SMF.
#[derive(Debug)]
pub(crate) struct Timeline {
    pub ppq: u16,
    pub items: Vec<TimedItem>,
}

/// Parse SMF bytes into a merged, tick-sorted timeline.
///
/// Only note-on/note-off and tempo meta events survive; everything else in
/// the file is irrelevant to correlation.  A note-on with velocity 0 is kept
/// as a start event — the correlator owns that convention.
pub(crate) fn parse_timeline(bytes: &[u8], stream_id: &str) -> Result<Timeline, MidiSourceError> {
    let smf = Smf::parse(bytes).map_err(|e| MidiSourceError::Parse(e.to_string()))?;

    let ppq = match smf.header.timing {
        midly::Timing::Metrical(t) => t.as_int(),
        midly::Timing::Timecode(..) => DEFAULT_PPQ,
    };

    let mut items = Vec::new();
    for track in &smf.tracks {
        let mut tick = 0u64;
        for event in track {
            tick += u64::from(event.delta.as_int());

            match event.kind {
                TrackEventKind::Midi { message, .. } => {
                    let note_event = match message {
                        MidiMessage::NoteOn { key, vel } => {
                            Some(NoteEvent::start(key.as_int(), vel.as_int(), stream_id))
                        }
                        MidiMessage::NoteOff { key, .. } => {
                            Some(NoteEvent::end(key.as_int(), stream_id))
                        }
                        _ => None,
                    };
                    if let Some(ev) = note_event {
                        items.push(TimedItem {
                            tick,
                            item: ReplayItem::Event(ev),
                        });
                    }
                }
                TrackEventKind::Meta(MetaMessage::Tempo(us_per_beat)) => {
                    items.push(TimedItem {
                        tick,
                        item: ReplayItem::Tempo(u64::from(us_per_beat.as_int())),
                    });
                }
                _ => {}
            }
        }
    }

    // Merge tracks by tick; tempo changes apply before events at the same
    // tick.  Sorting is stable, so same-tick events keep file order.
    items.sort_by_key(|t| (t.tick, matches!(t.item, ReplayItem::Event(_)) as u8));

    Ok(Timeline { ppq, items })
}

// ---------------------------------------------------------------------------
// Replay
// ---------------------------------------------------------------------------

/// Replay a parsed timeline, invoking `on_event` per note event.
///
/// Sleeps the tempo-scaled gap between ticks and checks `stop` before every
/// item, so a cancellation cuts the replay short within one inter-event gap.
pub(crate) fn replay(timeline: &Timeline, stop: &AtomicBool, mut on_event: impl FnMut(NoteEvent)) {
    let mut us_per_beat = DEFAULT_US_PER_BEAT;
    let mut last_tick = 0u64;

    for timed in &timeline.items {
        if stop.load(Ordering::SeqCst) {
            log::info!("MIDI replay interrupted by stop signal");
            return;
        }

        let delta_ticks = timed.tick - last_tick;
        if delta_ticks > 0 {
            let sleep_us = delta_ticks * us_per_beat / u64::from(timeline.ppq);
            thread::sleep(Duration::from_micros(sleep_us));
        }
        last_tick = timed.tick;

        match &timed.item {
            ReplayItem::Tempo(us) => us_per_beat = *us,
            ReplayItem::Event(event) => on_event(event.clone()),
        }
    }
}

/// Replay a MIDI file from disk in real time.
///
/// # Errors
///
/// Fails when the file cannot be read or is not a parseable SMF; a malformed
/// file is a source error, not a pipeline fault.
pub fn replay_file(
    path: &Path,
    stream_id: &str,
    stop: &AtomicBool,
    on_event: impl FnMut(NoteEvent),
) -> Result<(), MidiSourceError> {
    let bytes = std::fs::read(path)?;
    let timeline = parse_timeline(&bytes, stream_id)?;
    log::info!(
        "Replaying {} ({} timeline items, {} PPQ)",
        path.display(),
        timeline.items.len(),
        timeline.ppq
    );
    replay(&timeline, stop, on_event);
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
