//! Live MIDI input via ALSA/CoreMIDI/WinMM (through midir).
//!
//! Connects to the first available input port and forwards parsed
//! [`NoteEvent`]s over an mpsc channel to the correlator's thread.  The
//! midir callback runs on its own thread; parsing stays minimal there and
//! all state lives with the receiver.

use std::sync::mpsc;

use midir::{MidiInput, MidiInputConnection};

use crate::midi::event::NoteEvent;
use crate::midi::MidiSourceError;

const CLIENT_NAME: &str = "miditrace";

/// RAII guard for the live connection.  Dropping it closes the port.
pub struct LiveMidiSource {
    _connection: MidiInputConnection<()>,
    /// Name of the connected port, for logging/diagnostics.
    pub port_name: String,
}

/// Connect to the first available MIDI input port.
///
/// All discovered ports are logged so the operator can see what was chosen.
/// Status bytes other than note-on/note-off are ignored at this boundary;
/// the correlator only ever sees note events.
///
/// # Errors
///
/// Returns [`MidiSourceError::NoPorts`] when no device is connected, or
/// [`MidiSourceError::Connect`] when the port refuses the connection.
pub fn connect(
    stream_id: &str,
    tx: mpsc::Sender<NoteEvent>,
) -> Result<LiveMidiSource, MidiSourceError> {
    let input = MidiInput::new(CLIENT_NAME).map_err(|e| MidiSourceError::Init(e.to_string()))?;

    let ports = input.ports();
    if ports.is_empty() {
        return Err(MidiSourceError::NoPorts);
    }

    log::info!("Available MIDI input ports:");
    for (i, port) in ports.iter().enumerate() {
        let name = input.port_name(port).unwrap_or_else(|_| "<unknown>".into());
        log::info!("  {i}: {name}");
    }

    let port = &ports[0];
    let port_name = input.port_name(port).unwrap_or_else(|_| "<unknown>".into());
    log::info!("Using MIDI input port: {port_name}");

    let stream_id = stream_id.to_string();
    let connection = input
        .connect(
            port,
            "miditrace-in",
            move |_timestamp, bytes, _| {
                if let Some(event) = parse_note_event(bytes, &stream_id) {
                    // Receiver gone means the run is shutting down.
                    let _ = tx.send(event);
                }
            },
            (),
        )
        .map_err(|e| MidiSourceError::Connect(e.to_string()))?;

    Ok(LiveMidiSource {
        _connection: connection,
        port_name,
    })
}

/// Parse raw MIDI status bytes into a [`NoteEvent`].
///
/// Only note-on (0x9n) and note-off (0x8n) are of interest.  A note-on with
/// velocity 0 is delivered as a start event with velocity 0 — the correlator
/// owns that end-of-note convention.
pub(crate) fn parse_note_event(bytes: &[u8], stream_id: &str) -> Option<NoteEvent> {
    if bytes.len() < 3 {
        return None;
    }

    match bytes[0] & 0xF0 {
        0x90 => Some(NoteEvent::start(bytes[1], bytes[2], stream_id)),
        0x80 => Some(NoteEvent::end(bytes[1], stream_id)),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::midi::event::NoteEventKind;

    #[test]
    fn parses_note_on() {
        let event = parse_note_event(&[0x90, 60, 100], "s").expect("event");
        assert_eq!(event.note, 60);
        assert_eq!(event.kind, NoteEventKind::Start { velocity: 100 });
        assert_eq!(event.stream_id, "s");
    }

    #[test]
    fn note_on_velocity_zero_stays_a_start_event() {
        let event = parse_note_event(&[0x91, 60, 0], "s").expect("event");
        assert_eq!(event.kind, NoteEventKind::Start { velocity: 0 });
    }

    #[test]
    fn parses_note_off_on_any_channel() {
        let event = parse_note_event(&[0x8F, 72, 64], "s").expect("event");
        assert_eq!(event.note, 72);
        assert_eq!(event.kind, NoteEventKind::End);
    }

    #[test]
    fn ignores_other_messages() {
        assert!(parse_note_event(&[0xB0, 7, 100], "s").is_none()); // CC
        assert!(parse_note_event(&[0xF8], "s").is_none()); // clock
        assert!(parse_note_event(&[], "s").is_none());
        assert!(parse_note_event(&[0x90, 60], "s").is_none()); // truncated
    }
}
