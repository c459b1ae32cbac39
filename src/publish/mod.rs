//! Artifact publisher boundary.
//!
//! Once a capture is finalized, the pipeline hands the WAV path to an
//! [`ArtifactPublisher`], which may transcode it to a shareable container
//! and upload it somewhere, returning a link.  Transcoding and upload
//! mechanics are collaborator concerns behind this trait; the crate ships
//! only [`NoopPublisher`].

use std::path::Path;

use async_trait::async_trait;
use thiserror::Error;

/// Errors a publisher implementation may surface.
///
/// Publication failures never affect the recording — the WAV is already on
/// disk by the time a publisher runs.
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("transcode failed: {0}")]
    Transcode(String),

    #[error("upload failed: {0}")]
    Upload(String),
}

/// Async seam for publishing a finished audio artifact.
///
/// Implementors must be `Send + Sync` so they can be shared as
/// `Arc<dyn ArtifactPublisher>`.  Returns `Ok(Some(link))` with a shareable
/// URL, or `Ok(None)` when publishing is intentionally skipped.
#[async_trait]
pub trait ArtifactPublisher: Send + Sync {
    async fn publish(&self, wav_path: &Path) -> Result<Option<String>, PublishError>;
}

/// Default publisher: logs where the artifact lives and publishes nothing.
pub struct NoopPublisher;

#[async_trait]
impl ArtifactPublisher for NoopPublisher {
    async fn publish(&self, wav_path: &Path) -> Result<Option<String>, PublishError> {
        log::info!(
            "Artifact ready at {}; no publisher configured",
            wav_path.display()
        );
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn noop_publisher_returns_no_link() {
        let publisher = NoopPublisher;
        let result = publisher.publish(Path::new("/tmp/x.wav")).await;
        assert!(matches!(result, Ok(None)));
    }

    /// Verify that `NoopPublisher` is object-safe (usable as
    /// `dyn ArtifactPublisher`).
    #[test]
    fn publisher_is_object_safe() {
        let publisher: Box<dyn ArtifactPublisher> = Box::new(NoopPublisher);
        drop(publisher);
    }
}
