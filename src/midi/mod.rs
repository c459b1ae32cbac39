//! MIDI event sources — live hardware input and file replay.
//!
//! Both sources produce the same [`NoteEvent`] stream and stay agnostic of
//! what consumes it; the correlator never knows whether a performance was
//! live or replayed.  Neither source normalizes velocity-0 note-ons; that
//! convention belongs to the correlator.

use thiserror::Error;

pub mod event;
pub mod file;
pub mod live;

pub use event::{NoteEvent, NoteEventKind};
pub use file::replay_file;
pub use live::{connect, LiveMidiSource};

/// Errors from the MIDI source boundary.
///
/// Source failures are fatal for the run (there is no performance to
/// correlate without events), but they do not imply audio loss — the
/// pipeline still drains and finalizes the sink on the way out.
#[derive(Debug, Error)]
pub enum MidiSourceError {
    #[error("no MIDI input ports available; connect a MIDI device")]
    NoPorts,

    #[error("failed to initialize MIDI input: {0}")]
    Init(String),

    #[error("failed to connect to MIDI input port: {0}")]
    Connect(String),

    #[error("failed to read MIDI file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse MIDI file: {0}")]
    Parse(String),
}
