//! Snapshot burst capture and report dispatch.
//!
//! When an alert fires, a fixed-size burst of frames is captured at a fixed
//! cadence, JPEG-encoded, and dispatched to the reporting collaborator; the
//! owning loop is signaled to unlock only when the cycle completes. An
//! unavailable video surface skips the capture step but never the unlock —
//! the lock must not outlive its cycle — and the skip is journaled as an
//! unreported alert.

use std::sync::Arc;
use std::time::Duration;

use image::RgbImage;
use tokio::runtime::Handle;
use tokio::sync::mpsc;

use crate::detector::FrameSource;
use crate::report::{CheatReportPayload, Reporter, SubjectIdentity};
use crate::store::AlertStore;

/// Capture cadence: frame 0 immediately, frame k at k·interval, dispatch
/// and unlock after the full `snap_count · snap_interval` budget.
#[derive(Debug, Clone, Copy)]
pub struct BurstSettings {
    pub snap_count: u32,
    pub snap_interval: Duration,
}

impl Default for BurstSettings {
    fn default() -> Self {
        Self {
            snap_count: 3,
            snap_interval: Duration::from_millis(200),
        }
    }
}

/// Fire-and-forget capture/report pipeline.
///
/// Clone-safe handle; [`SnapshotPipeline::trigger`] spawns one cycle on the
/// daemon runtime and returns immediately. Completion is signaled through
/// the unlock channel regardless of capture or dispatch outcome.
#[derive(Clone)]
pub struct SnapshotPipeline {
    frames: Arc<dyn FrameSource>,
    reporter: Arc<dyn Reporter>,
    store: AlertStore,
    subject: SubjectIdentity,
    destination: String,
    settings: BurstSettings,
    unlock: mpsc::UnboundedSender<()>,
    runtime: Handle,
}

impl SnapshotPipeline {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        frames: Arc<dyn FrameSource>,
        reporter: Arc<dyn Reporter>,
        store: AlertStore,
        subject: SubjectIdentity,
        destination: String,
        settings: BurstSettings,
        unlock: mpsc::UnboundedSender<()>,
        runtime: Handle,
    ) -> Self {
        Self {
            frames,
            reporter,
            store,
            subject,
            destination,
            settings,
            unlock,
            runtime,
        }
    }

    /// Start one capture/report cycle. Returns immediately.
    pub fn trigger(&self, probability: f64) {
        let pipeline = self.clone();
        self.runtime.spawn(async move {
            pipeline.run(probability).await;
        });
    }

    async fn run(self, probability: f64) {
        let start = tokio::time::Instant::now();
        let budget = self.settings.snap_interval * self.settings.snap_count;

        let images = self.capture_burst().await;

        // The unlock cadence is independent of capture health: wait out the
        // full budget even when capture produced nothing.
        tokio::time::sleep_until(start + budget).await;

        let reported = if images.is_empty() {
            tracing::warn!(probability, "no frames captured — alert not dispatched");
            false
        } else {
            self.dispatch(probability, &images).await
        };

        if let Err(error) = self
            .store
            .insert(&self.subject, probability, images.len(), reported)
            .await
        {
            tracing::error!(%error, "failed to journal alert");
        }

        // Sole unlock path; must run no matter what happened above.
        let _ = self.unlock.send(());
    }

    /// Capture frames at the configured cadence. A frame that cannot be
    /// grabbed or encoded is skipped without breaking the cadence.
    async fn capture_burst(&self) -> Vec<Vec<u8>> {
        let mut images = Vec::with_capacity(self.settings.snap_count as usize);
        for snap in 0..self.settings.snap_count {
            if snap > 0 {
                tokio::time::sleep(self.settings.snap_interval).await;
            }
            let Some(frame) = self.frames.current_frame() else {
                tracing::warn!(snap, "video surface unavailable — frame skipped");
                continue;
            };
            match encode_jpeg(&frame) {
                Ok(bytes) => images.push(bytes),
                Err(error) => tracing::warn!(snap, %error, "frame encoding failed"),
            }
        }
        images
    }

    async fn dispatch(&self, probability: f64, images: &[Vec<u8>]) -> bool {
        let payload = CheatReportPayload::assemble(&self.subject, probability, images);
        let reporter = Arc::clone(&self.reporter);
        let destination = self.destination.clone();

        let outcome =
            tokio::task::spawn_blocking(move || reporter.dispatch(&destination, &payload)).await;

        match outcome {
            Ok(Ok(())) => {
                tracing::info!(probability, images = images.len(), "cheat report dispatched");
                true
            }
            Ok(Err(error)) => {
                tracing::error!(%error, "report dispatch failed");
                false
            }
            Err(error) => {
                tracing::error!(%error, "report task failed");
                false
            }
        }
    }
}

fn encode_jpeg(frame: &RgbImage) -> Result<Vec<u8>, image::ImageError> {
    let mut buffer = std::io::Cursor::new(Vec::new());
    frame.write_to(&mut buffer, image::ImageFormat::Jpeg)?;
    Ok(buffer.into_inner())
}
