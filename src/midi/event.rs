//! Performance event type consumed by the note correlator.

/// What happened to a note.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteEventKind {
    /// Key pressed.  A start with `velocity == 0` is treated as an end by
    /// the correlator (standard MIDI convention, deliberately preserved
    /// there rather than normalized away in the sources).
    Start { velocity: u8 },
    /// Key released.
    End,
}

/// One performance event, in time order.
///
/// Ephemeral: consumed by the correlator and not retained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteEvent {
    pub kind: NoteEventKind,
    /// Integer pitch (0–127).
    pub note: u8,
    /// Identifier of the producing capture stream.
    pub stream_id: String,
}

impl NoteEvent {
    pub fn start(note: u8, velocity: u8, stream_id: &str) -> Self {
        Self {
            kind: NoteEventKind::Start { velocity },
            note,
            stream_id: stream_id.to_string(),
        }
    }

    pub fn end(note: u8, stream_id: &str) -> Self {
        Self {
            kind: NoteEventKind::End,
            note,
            stream_id: stream_id.to_string(),
        }
    }
}
