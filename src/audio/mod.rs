//! Audio pipeline — microphone capture → chunk queue → WAV sink + batch logs.
//!
//! # Pipeline
//!
//! ```text
//! Microphone → cpal callback → AudioChunk → ChunkSender (enqueue)
//!                                              │  FIFO, close = sentinel
//!                                              ▼
//!                                  ChunkReceiver (dequeue, blocking)
//!                                              │
//!                               hound WAV sink + 10-chunk batch logs
//! ```
//!
//! The capture producer and the encode consumer run on separate threads; the
//! queue's close protocol is the only shutdown coordination they need.  See
//! [`crate::pipeline`] for the orchestration.

pub mod capture;
pub mod encoder;
pub mod queue;

pub use capture::{run_capture, AudioCapture, AudioChunk, CaptureError, StreamHandle};
pub use encoder::{encode_chunks, EncodeError, EncodeSummary, BATCH_SIZE};
pub use queue::{chunk_channel, ChunkReceiver, ChunkSender};
