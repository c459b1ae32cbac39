//! miditrace — records a musical performance (MIDI note events + microphone
//! audio) and emits correlated telemetry so an operator can reconstruct,
//! after the fact, which audio samples correspond to which note, how long
//! each note sounded, and which events were anomalous.
//!
//! # Architecture
//!
//! ```text
//! MIDI source (live port / file replay)      cpal microphone callback
//!        │  NoteEvent, in order                     │  AudioChunk
//!        ▼                                          ▼
//!  NoteCorrelator                              ChunkQueue (FIFO + sentinel)
//!   spans + logs                                    │
//!        │                                          ▼
//!        │                               WAV sink + 10-chunk batch logs
//!        └──────────────┬───────────────────────────┘
//!                       ▼
//!              TelemetrySink (OTLP JSON over HTTP)
//! ```
//!
//! A shared stop flag (ctrl-c, or end of file replay) winds everything down:
//! capture closes the queue, the encoder drains to the sentinel and
//! finalizes the sink, and the finished artifact is handed to an
//! [`publish::ArtifactPublisher`].

pub mod audio;
pub mod config;
pub mod correlate;
pub mod midi;
pub mod pipeline;
pub mod publish;
pub mod telemetry;
