use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tokio::runtime::Handle;
use tracing_subscriber::EnvFilter;

use invigil_core::decision::DecisionMachine;
use invigil_core::degree::DegreeCalculator;
use invigild::config::Config;
use invigild::detector::{NullVisualizer, PoseOptions, Visualizer};
use invigild::engine::{self, FaceLoop};
use invigild::replay::{ReplayFaceTracker, ReplayFrameSource, ReplayPoseDetector};
use invigild::report::{HttpReporter, SubjectIdentity};
use invigild::snapshot::{BurstSettings, SnapshotPipeline};
use invigild::store::AlertStore;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    tracing::info!("invigild starting");

    let config = Config::from_env();
    let store = AlertStore::open(&config.db_path)
        .await
        .context("failed to open alert journal")?;

    // Detector wiring. Replay streams are the built-in development source;
    // live model adapters implement the detector traits and plug in here.
    let (Some(pose_path), Some(tracker_path)) = (&config.pose_stream, &config.tracker_stream)
    else {
        bail!("no detector source configured; set INVIGIL_POSE_STREAM and INVIGIL_TRACKER_STREAM");
    };
    let pose = ReplayPoseDetector::open(pose_path, config.replay_frame_interval)
        .with_context(|| format!("failed to open pose stream {}", pose_path.display()))?;
    let tracker = ReplayFaceTracker::open(tracker_path, config.replay_frame_interval)
        .with_context(|| format!("failed to open tracker stream {}", tracker_path.display()))?;

    tracing::info!(
        pose = %pose_path.display(),
        tracker = %tracker_path.display(),
        "replay detector sources opened"
    );

    let visualizer: Arc<dyn Visualizer> = Arc::new(NullVisualizer);
    let options = PoseOptions {
        flip_horizontal: config.flip_horizontal,
        min_pose_confidence: config.min_pose_confidence,
    };

    let (latest_tx, latest_rx) = engine::latest_pose_channel();
    let (unlock_tx, unlock_rx) = tokio::sync::mpsc::unbounded_channel();

    let pipeline = SnapshotPipeline::new(
        Arc::new(ReplayFrameSource::new(640, 480)),
        Arc::new(HttpReporter),
        store,
        SubjectIdentity {
            id: config.subject_id.clone(),
            name: config.subject_name.clone(),
        },
        config.report_url.clone(),
        BurstSettings {
            snap_count: config.snap_count,
            snap_interval: config.snap_interval,
        },
        unlock_tx,
        Handle::current(),
    );

    let _pose_handle =
        engine::spawn_pose_loop(Box::new(pose), options, latest_tx, visualizer.clone());
    let face_loop = FaceLoop::new(
        latest_rx,
        DegreeCalculator::new(config.sensitivity),
        DecisionMachine::new(),
        pipeline,
        unlock_rx,
        visualizer,
    );
    let face_handle = engine::spawn_face_loop(face_loop, Box::new(tracker));

    tracing::info!("invigild ready");

    let drained = tokio::task::spawn_blocking(move || face_handle.join());
    tokio::select! {
        _ = tokio::signal::ctrl_c() => tracing::info!("interrupt received"),
        _ = drained => tracing::info!("detector streams drained"),
    }

    tracing::info!("invigild shutting down");
    Ok(())
}
