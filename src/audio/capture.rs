//! Microphone capture via `cpal`.
//!
//! [`AudioCapture`] wraps the cpal host/device/stream lifecycle.  Call
//! [`AudioCapture::start`] to begin streaming [`AudioChunk`]s into a
//! [`ChunkSender`].  The returned [`StreamHandle`] is a RAII guard — dropping
//! it stops the underlying cpal stream and releases the device.
//!
//! [`run_capture`] is the producer loop used by the pipeline: it holds the
//! stream open, polls the shared stop flag, and guarantees the queue is
//! closed on every exit path so the encoder always terminates.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use thiserror::Error;

use crate::audio::queue::ChunkSender;
use crate::config::AudioConfig;

/// How often the producer loop re-checks the stop flag.
const STOP_POLL_INTERVAL: Duration = Duration::from_millis(100);

// ---------------------------------------------------------------------------
// AudioChunk
// ---------------------------------------------------------------------------

/// A single buffer of raw audio as delivered by the cpal callback.
///
/// Samples are interleaved 16-bit PCM.  Chunks are immutable after creation;
/// queue order is device delivery order and is preserved all the way to the
/// WAV sink.
#[derive(Debug, Clone)]
pub struct AudioChunk {
    /// Interleaved PCM samples.
    pub samples: Vec<i16>,
    /// Number of frames (samples per channel) in this chunk.
    pub frames: u32,
}

impl AudioChunk {
    /// Wrap a copied callback buffer.
    pub fn from_samples(samples: Vec<i16>, channels: u16) -> Self {
        let frames = (samples.len() / channels.max(1) as usize) as u32;
        Self { samples, frames }
    }

    /// Little-endian byte view of the samples, as written to the sink and
    /// base64-encoded for the batch telemetry extract.
    pub fn to_le_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.samples.len() * 2);
        for sample in &self.samples {
            bytes.extend_from_slice(&sample.to_le_bytes());
        }
        bytes
    }
}

// ---------------------------------------------------------------------------
// StreamHandle
// ---------------------------------------------------------------------------

/// RAII guard that keeps the cpal stream alive.
///
/// Dropping this value calls `cpal::Stream::drop` which pauses/stops the
/// underlying hardware stream.
pub struct StreamHandle {
    _stream: cpal::Stream,
}

// ---------------------------------------------------------------------------
// CaptureError
// ---------------------------------------------------------------------------

/// Errors that can occur while setting up or running the audio capture.
///
/// All of these imply the device itself is unusable, which is fatal for the
/// recording session (audio data would otherwise be silently lost).
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("no input device found on the default audio host")]
    NoDevice,

    #[error("failed to build input stream: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[error("failed to start audio stream: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),
}

// ---------------------------------------------------------------------------
// AudioCapture
// ---------------------------------------------------------------------------

/// Microphone capture device wrapper built on top of `cpal`.
///
/// The stream is opened with the exact sample rate / channel count from
/// [`AudioConfig`] and 16-bit samples, matching the WAV sink format — no
/// resampling or remixing happens downstream.
pub struct AudioCapture {
    device: cpal::Device,
    config: cpal::StreamConfig,
    channels: u16,
}

impl AudioCapture {
    /// Create a new [`AudioCapture`] using the system default input device.
    ///
    /// # Errors
    ///
    /// Returns [`CaptureError::NoDevice`] when no input device is available.
    pub fn new(audio: &AudioConfig) -> Result<Self, CaptureError> {
        let host = cpal::default_host();
        let device = host.default_input_device().ok_or(CaptureError::NoDevice)?;

        let config = cpal::StreamConfig {
            channels: audio.channels,
            sample_rate: cpal::SampleRate(audio.sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        Ok(Self {
            device,
            config,
            channels: audio.channels,
        })
    }

    /// Start recording and push [`AudioChunk`]s into `tx`.
    ///
    /// The cpal callback runs on a dedicated audio thread; each time the
    /// hardware delivers a buffer the samples are copied (the device reuses
    /// its buffer) and enqueued.  A device status error is logged as a
    /// warning and capture continues — dropped-sample reports must not halt
    /// the recording.
    ///
    /// # Errors
    ///
    /// Returns [`CaptureError::BuildStream`] or [`CaptureError::PlayStream`]
    /// if the platform rejects the stream configuration.
    pub fn start(&self, tx: ChunkSender) -> Result<StreamHandle, CaptureError> {
        let channels = self.channels;

        let stream = self.device.build_input_stream(
            &self.config,
            move |data: &[i16], _: &cpal::InputCallbackInfo| {
                tx.enqueue(AudioChunk::from_samples(data.to_vec(), channels));
            },
            |err: cpal::StreamError| {
                log::warn!("audio stream status: {err}");
            },
            None, // no timeout
        )?;

        stream.play()?;
        Ok(StreamHandle { _stream: stream })
    }
}

// ---------------------------------------------------------------------------
// Producer loop
// ---------------------------------------------------------------------------

/// Capture audio until `stop` is set, then close the queue.
///
/// The sender is closed on *every* exit path — including device acquisition
/// failure — so the encoder's dequeue loop always observes the sentinel and
/// terminates.  Chunks enqueued before the stop signal are never lost; they
/// sit in the queue ahead of the sentinel.
pub fn run_capture(
    audio: &AudioConfig,
    tx: ChunkSender,
    stop: Arc<AtomicBool>,
) -> Result<(), CaptureError> {
    let result = capture_until_stopped(audio, &tx, &stop);
    tx.close();
    result
}

fn capture_until_stopped(
    audio: &AudioConfig,
    tx: &ChunkSender,
    stop: &AtomicBool,
) -> Result<(), CaptureError> {
    let capture = AudioCapture::new(audio)?;
    let _handle = capture.start(tx.clone())?;

    log::info!(
        "Recording audio at {} Hz, {} channel(s)...",
        audio.sample_rate,
        audio.channels
    );

    while !stop.load(Ordering::SeqCst) {
        thread::sleep(STOP_POLL_INTERVAL);
    }

    // _handle drops here, stopping the stream and releasing the device.
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    /// `AudioChunk` must be `Send` so it can cross thread boundaries.
    #[test]
    fn audio_chunk_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<AudioChunk>();
    }

    #[test]
    fn frame_count_accounts_for_channels() {
        let mono = AudioChunk::from_samples(vec![0; 512], 1);
        assert_eq!(mono.frames, 512);

        let stereo = AudioChunk::from_samples(vec![0; 512], 2);
        assert_eq!(stereo.frames, 256);
    }

    #[test]
    fn le_bytes_match_sample_encoding() {
        let chunk = AudioChunk::from_samples(vec![0x0102, -1], 1);
        assert_eq!(chunk.to_le_bytes(), vec![0x02, 0x01, 0xFF, 0xFF]);
    }
}
