//! Pipeline orchestration — session identity plus the capture/encode thread
//! pair.
//!
//! # Architecture
//!
//! ```text
//! CaptureSession (stream id, sink path)
//!        │
//!        ▼
//! RecordingPipeline::start
//!        ├─ "audio-capture" thread → run_capture → ChunkSender
//!        └─ "audio-encode"  thread → encode_chunks → WAV + batch logs
//!
//! stop flag set (ctrl-c / end of MIDI replay)
//!        │
//!        ▼
//! RecordingPipeline::finish — joins capture, drains encoder, returns
//! EncodeSummary
//! ```
//!
//! The note correlator is *not* part of this pair: it runs on the event
//! source's thread (see `main.rs`) and only shares the telemetry sink.

pub mod runner;
pub mod session;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use runner::{PipelineError, RecordingPipeline};
pub use session::CaptureSession;
