//! Capture session identity — one recording run.

use std::path::PathBuf;

use crate::config::AudioConfig;

/// Process-wide state for one recording run.
///
/// The stream identifier is generated once at pipeline start and stays
/// stable for the session's lifetime; it tags every batch log record, every
/// note span, and the sink file name, which is how an operator ties the
/// telemetry back to the audio artifact.
#[derive(Debug, Clone)]
pub struct CaptureSession {
    /// Stable identifier for this run, e.g. `capture-20260829-153012`.
    pub stream_id: String,
    /// Output path prefix the sink file name is appended to.
    pub output_prefix: String,
    /// Sink/capture sample rate in Hz.
    pub sample_rate: u32,
    /// Sink/capture channel count.
    pub channels: u16,
}

impl CaptureSession {
    /// Create a session with a timestamped stream identifier.
    pub fn new(output_prefix: &str, audio: &AudioConfig) -> Self {
        let stream_id = chrono::Local::now()
            .format("capture-%Y%m%d-%H%M%S")
            .to_string();
        Self::with_stream_id(output_prefix, &stream_id, audio)
    }

    /// Create a session with an explicit stream identifier (useful for
    /// tests).
    pub fn with_stream_id(output_prefix: &str, stream_id: &str, audio: &AudioConfig) -> Self {
        Self {
            stream_id: stream_id.to_string(),
            output_prefix: output_prefix.to_string(),
            sample_rate: audio.sample_rate,
            channels: audio.channels,
        }
    }

    /// Deterministic sink path: `{output_prefix}{stream_id}.wav`.
    pub fn sink_path(&self) -> PathBuf {
        PathBuf::from(format!("{}{}.wav", self.output_prefix, self.stream_id))
    }
}
