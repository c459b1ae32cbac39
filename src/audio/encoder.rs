//! WAV sink writer and telemetry batcher — the single consumer of the chunk
//! queue.
//!
//! Every dequeued chunk is written to the WAV sink in arrival order and
//! accounted for in exactly one batch log record: a full batch every
//! [`BATCH_SIZE`] chunks, plus one final partial batch at shutdown when the
//! accumulator is non-empty.  A sink failure is fatal (audio would be lost);
//! telemetry delivery is fire-and-forget and can never stop the encoder.

use std::path::PathBuf;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use hound::{WavSpec, WavWriter};
use thiserror::Error;

use crate::audio::queue::ChunkReceiver;
use crate::pipeline::CaptureSession;
use crate::telemetry::{AttrValue, LogRecord, TelemetrySink};

/// Chunks per batch log record.
pub const BATCH_SIZE: usize = 10;

/// Maximum bytes of the joined base64 payload included in a batch record.
/// The full audio never goes to the collector, only this excerpt.
const BATCH_EXCERPT_BYTES: usize = 50;

// ---------------------------------------------------------------------------
// EncodeError
// ---------------------------------------------------------------------------

/// Sink failures.  All fatal to the session: a chunk that cannot be written
/// is unrecoverable data loss.
#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("audio sink failure: {0}")]
    Sink(#[from] hound::Error),
}

// ---------------------------------------------------------------------------
// EncodeSummary
// ---------------------------------------------------------------------------

/// Totals reported back to the pipeline when the queue closes.
#[derive(Debug)]
pub struct EncodeSummary {
    /// Chunks written to the sink (equals the sum of batch-record counts).
    pub chunks: usize,
    /// Batch log records emitted, including the final partial one.
    pub batches: usize,
    /// Path of the finalized WAV file.
    pub path: PathBuf,
}

// ---------------------------------------------------------------------------
// Encode loop
// ---------------------------------------------------------------------------

/// Drain the chunk queue into the session's WAV sink until the sentinel.
///
/// Blocking; runs on its own thread.  Returns once the producer has closed
/// the queue and the sink is finalized.
pub fn encode_chunks(
    mut rx: ChunkReceiver,
    session: &CaptureSession,
    telemetry: &dyn TelemetrySink,
) -> Result<EncodeSummary, EncodeError> {
    let path = session.sink_path();
    let spec = WavSpec {
        channels: session.channels,
        sample_rate: session.sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = WavWriter::create(&path, spec)?;

    let mut chunk_counter = 0usize;
    let mut encoded_accumulator: Vec<String> = Vec::new();
    let mut total_chunks = 0usize;
    let mut batches = 0usize;

    while let Some(chunk) = rx.dequeue() {
        for sample in &chunk.samples {
            writer.write_sample(*sample)?;
        }

        encoded_accumulator.push(BASE64.encode(chunk.to_le_bytes()));
        chunk_counter += 1;
        total_chunks += 1;

        if chunk_counter >= BATCH_SIZE {
            emit_batch(
                telemetry,
                &session.stream_id,
                chunk_counter,
                &encoded_accumulator,
                false,
            );
            log::info!(
                "Batch log sent: {chunk_counter} chunks for stream {}",
                session.stream_id
            );
            chunk_counter = 0;
            encoded_accumulator.clear();
            batches += 1;
        }
    }

    // Flush remaining chunks — skipped entirely when the last batch came out
    // exactly full.
    if !encoded_accumulator.is_empty() {
        emit_batch(
            telemetry,
            &session.stream_id,
            chunk_counter,
            &encoded_accumulator,
            true,
        );
        log::info!(
            "Final batch log sent: {chunk_counter} chunks for stream {}",
            session.stream_id
        );
        batches += 1;
    }

    writer.finalize()?;
    log::info!("Audio saved to {}", path.display());

    Ok(EncodeSummary {
        chunks: total_chunks,
        batches,
        path,
    })
}

/// Emit one batch log record: stream id, chunk count, bounded payload
/// excerpt.
fn emit_batch(
    telemetry: &dyn TelemetrySink,
    stream_id: &str,
    chunk_count: usize,
    encoded_chunks: &[String],
    is_final: bool,
) {
    let mut combined = encoded_chunks.concat();
    combined.truncate(BATCH_EXCERPT_BYTES);

    let message = if is_final {
        format!("Final audio chunk batch for stream {stream_id}")
    } else {
        format!("Audio chunk batch for stream {stream_id}")
    };

    telemetry.emit_log(
        LogRecord::info(message)
            .with_attr("stream_id", AttrValue::Str(stream_id.to_string()))
            .with_attr("chunk_count", AttrValue::Int(chunk_count as i64))
            .with_attr("encoded_audio_batch", AttrValue::Str(combined)),
    );
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
