//! Recording pipeline — capture producer and encode consumer, joined at
//! shutdown.
//!
//! ```text
//! run_capture (thread)  ── ChunkSender ──▶  encode_chunks (thread)
//!       ▲                                         │
//!       │ polls stop flag                         ▼
//!   Arc<AtomicBool>                        WAV sink + batch logs
//! ```
//!
//! The driver sets the stop flag (ctrl-c in live mode, end of replay in file
//! mode) and calls [`RecordingPipeline::finish`], which joins capture first —
//! guaranteeing the sentinel has been pushed — and then the encoder, which
//! drains everything enqueued before the signal.  No chunk is lost on the
//! shutdown path.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use thiserror::Error;

use crate::audio::{chunk_channel, encode_chunks, run_capture};
use crate::audio::{CaptureError, EncodeError, EncodeSummary};
use crate::config::AppConfig;
use crate::pipeline::CaptureSession;
use crate::telemetry::TelemetrySink;

// ---------------------------------------------------------------------------
// PipelineError
// ---------------------------------------------------------------------------

/// Fatal pipeline failures (error taxonomy class 1 — data-loss risk).
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Capture(#[from] CaptureError),

    #[error(transparent)]
    Encode(#[from] EncodeError),

    #[error("pipeline worker thread panicked")]
    WorkerPanic,
}

// ---------------------------------------------------------------------------
// RecordingPipeline
// ---------------------------------------------------------------------------

/// Handle to the two running pipeline threads.
pub struct RecordingPipeline {
    capture: JoinHandle<Result<(), CaptureError>>,
    encode: JoinHandle<Result<EncodeSummary, EncodeError>>,
    stop: Arc<AtomicBool>,
}

impl RecordingPipeline {
    /// Spawn the capture producer and the encode consumer.
    ///
    /// Both threads share `stop`; setting it winds the pipeline down without
    /// data loss.  The telemetry sink is shared with the caller (the
    /// correlator uses the same one).
    pub fn start(
        config: &AppConfig,
        session: CaptureSession,
        telemetry: Arc<dyn TelemetrySink>,
        stop: Arc<AtomicBool>,
    ) -> Self {
        let (tx, rx) = chunk_channel();

        let audio = config.audio.clone();
        let capture_stop = stop.clone();
        let capture = thread::spawn(move || run_capture(&audio, tx, capture_stop));

        let encode = thread::spawn(move || encode_chunks(rx, &session, telemetry.as_ref()));

        Self {
            capture,
            encode,
            stop,
        }
    }

    /// Join both threads and propagate the first fatal error.
    ///
    /// Sets the stop flag itself so callers cannot deadlock by forgetting
    /// to.  Capture is joined first (it owns the queue close), then the
    /// encoder, which by then has drained to the sentinel.
    pub fn finish(self) -> Result<EncodeSummary, PipelineError> {
        self.stop.store(true, Ordering::SeqCst);

        let capture_result = self
            .capture
            .join()
            .map_err(|_| PipelineError::WorkerPanic)?;
        let encode_result = self.encode.join().map_err(|_| PipelineError::WorkerPanic)?;

        // Sink errors first: audio loss outranks a device teardown error.
        let summary = encode_result?;
        capture_result?;
        Ok(summary)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::AudioChunk;
    use crate::config::AudioConfig;
    use crate::telemetry::emitter::testing::RecordingSink;
    use std::time::Duration;
    use tempfile::tempdir;

    /// Shutdown contract, exercised with a simulated capture producer (real
    /// audio hardware is not available in tests): every chunk enqueued
    /// before the stop signal reaches the sink, and the consumer terminates.
    #[test]
    fn stop_signal_terminates_both_sides_without_loss() {
        let dir = tempdir().expect("temp dir");
        let session = CaptureSession::with_stream_id(
            &format!("{}/", dir.path().display()),
            "shutdown-test",
            &AudioConfig::default(),
        );
        let sink = Arc::new(RecordingSink::new());
        let stop = Arc::new(AtomicBool::new(false));

        let (tx, rx) = chunk_channel();

        let producer_stop = stop.clone();
        let producer = thread::spawn(move || {
            let mut produced = 0usize;
            while !producer_stop.load(Ordering::SeqCst) {
                tx.enqueue(AudioChunk::from_samples(vec![1; 32], 1));
                produced += 1;
                thread::sleep(Duration::from_millis(1));
            }
            tx.close();
            produced
        });

        let encode_session = session.clone();
        let encode_sink = sink.clone();
        let consumer =
            thread::spawn(move || encode_chunks(rx, &encode_session, encode_sink.as_ref()));

        thread::sleep(Duration::from_millis(50));
        stop.store(true, Ordering::SeqCst);

        let produced = producer.join().expect("producer");
        let summary = consumer.join().expect("consumer").expect("encode");

        assert_eq!(summary.chunks, produced);
        assert!(summary.path.exists());
    }
}
