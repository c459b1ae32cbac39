//! Application entry point — miditrace.
//!
//! # Startup sequence
//!
//! 1. Initialise logging and parse CLI arguments.
//! 2. Load [`AppConfig`] from disk (returns default on first run).
//! 3. Create [`tokio`] runtime (telemetry delivery + ctrl-c watcher).
//! 4. Create the [`CaptureSession`] and the telemetry sink.
//! 5. Start the recording pipeline (capture + encode threads).
//! 6. Run the selected MIDI event source on the main thread, feeding the
//!    note correlator one event at a time.
//! 7. On stop (ctrl-c, or end of file replay): join the pipeline, hand the
//!    finished WAV to the artifact publisher, drain telemetry.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, ValueEnum};

use miditrace::config::AppConfig;
use miditrace::correlate::NoteCorrelator;
use miditrace::midi;
use miditrace::pipeline::{CaptureSession, RecordingPipeline};
use miditrace::publish::{ArtifactPublisher, NoopPublisher};
use miditrace::telemetry::{NoopSink, OtlpHttpSink, TelemetrySink};

// ---------------------------------------------------------------------------
// CLI
// ---------------------------------------------------------------------------

/// Where the note events come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// Read events from the first connected MIDI input port.
    Live,
    /// Replay events from a Standard MIDI File in real time.
    File,
}

/// Record a MIDI performance with correlated audio and telemetry.
#[derive(Debug, Parser)]
#[command(name = "miditrace", version)]
struct Args {
    /// Mode of operation.
    #[arg(long, value_enum)]
    mode: Mode,

    /// Output path prefix for the recorded audio; the stream id and `.wav`
    /// are appended.
    #[arg(long)]
    output_file: String,

    /// Input MIDI file to replay (required in file mode).
    #[arg(long, required_if_eq("mode", "file"))]
    input_file: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// main
// ---------------------------------------------------------------------------

fn main() -> anyhow::Result<()> {
    // 1. Logging + CLI
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    // 2. Configuration
    let config = AppConfig::load().unwrap_or_else(|e| {
        log::warn!("Failed to load config ({e}); using defaults");
        AppConfig::default()
    });

    // 3. Tokio runtime — detached telemetry POSTs and the ctrl-c watcher.
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .context("failed to build tokio runtime")?;

    // 4. Session + telemetry sink
    let session = CaptureSession::new(&args.output_file, &config.audio);
    log::info!("Starting capture session {}", session.stream_id);

    let telemetry: Arc<dyn TelemetrySink> = if config.telemetry.enabled {
        Arc::new(OtlpHttpSink::new(
            runtime.handle().clone(),
            &config.telemetry,
        ))
    } else {
        log::info!("Telemetry export disabled by config");
        Arc::new(NoopSink)
    };

    // 5. Stop signal + recording pipeline
    let stop = Arc::new(AtomicBool::new(false));
    {
        let stop = stop.clone();
        runtime.spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                log::info!("Ctrl-C received, stopping...");
                stop.store(true, Ordering::SeqCst);
            }
        });
    }

    let pipeline =
        RecordingPipeline::start(&config, session.clone(), telemetry.clone(), stop.clone());

    // 6. Event source → correlator, on this thread (single-writer).
    let mut correlator = NoteCorrelator::new(telemetry.clone());
    let source_result: anyhow::Result<()> = match args.mode {
        Mode::Live => run_live(&session, &mut correlator, &stop).map_err(Into::into),
        Mode::File => {
            // clap's required_if_eq guarantees the path is present.
            let result = match args.input_file.as_deref() {
                Some(input) => midi::replay_file(input, &session.stream_id, &stop, |event| {
                    correlator.process_event(event)
                })
                .map_err(Into::into),
                None => Err(anyhow::anyhow!("--input-file is required in file mode")),
            };
            // Replay finished (or failed): the audio side stops too.
            stop.store(true, Ordering::SeqCst);
            result
        }
    };

    if correlator.active_notes() > 0 {
        log::warn!(
            "{} note(s) still active at shutdown; their spans were never closed",
            correlator.active_notes()
        );
    }

    // 7. Shutdown — join the pipeline even when the source failed, so the
    // audio captured so far is flushed and the sink finalized.
    let summary = pipeline.finish()?;
    log::info!(
        "Session {} complete: {} chunks written in {} batch(es)",
        session.stream_id,
        summary.chunks,
        summary.batches
    );
    source_result?;

    let publisher = NoopPublisher;
    match runtime.block_on(publisher.publish(&summary.path)) {
        Ok(Some(link)) => log::info!("Artifact published: {link}"),
        Ok(None) => {}
        Err(e) => log::warn!("Artifact publishing failed: {e}"),
    }

    // Give in-flight telemetry POSTs a moment to land before exiting.
    runtime.shutdown_timeout(Duration::from_secs(2));
    Ok(())
}

/// Live mode: connect to the first MIDI port and pump events into the
/// correlator until the stop flag is set.
fn run_live(
    session: &CaptureSession,
    correlator: &mut NoteCorrelator,
    stop: &AtomicBool,
) -> Result<(), midi::MidiSourceError> {
    let (event_tx, event_rx) = mpsc::channel();
    let source = midi::connect(&session.stream_id, event_tx)?;
    log::info!(
        "Listening for MIDI input on {} (Ctrl-C to stop)...",
        source.port_name
    );

    while !stop.load(Ordering::SeqCst) {
        match event_rx.recv_timeout(Duration::from_millis(100)) {
            Ok(event) => correlator.process_event(event),
            Err(mpsc::RecvTimeoutError::Timeout) => continue,
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        }
    }
    Ok(())
}
