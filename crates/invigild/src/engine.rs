//! Frame loops: one per detector, fused in the face loop.
//!
//! Each loop runs on its own dedicated OS thread and re-arms only after its
//! blocking inference call returns, so a loop's rate is bounded by its own
//! inference latency. The pose loop publishes the latest canonical face
//! through a single-slot watch channel; the face loop reads whichever
//! complete snapshot is current. The two loops are not frame-synchronized —
//! an accepted approximation, head pose changes slowly relative to frame
//! rate.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use invigil_core::decision::DecisionMachine;
use invigil_core::degree::DegreeCalculator;
use invigil_core::geometry::cross_validate;
use invigil_core::schema::{canonicalize, SourceKind};
use invigil_core::{FacePosition, Point2D};
use tokio::sync::{mpsc, watch};

use crate::detector::{DetectorError, FaceTracker, PoseDetector, PoseOptions, Visualizer};
use crate::snapshot::SnapshotPipeline;

/// Pause after a recoverable detector error before retrying.
const ERROR_BACKOFF: Duration = Duration::from_millis(50);

/// Create the single-slot hand-off for the latest canonical pose face.
pub fn latest_pose_channel() -> (
    watch::Sender<Option<FacePosition>>,
    watch::Receiver<Option<FacePosition>>,
) {
    watch::channel(None)
}

/// Spawn the pose loop on a dedicated thread.
///
/// A new snapshot is published only on a confident detection; stale values
/// persist across no-detection frames so the face loop always sees the most
/// recent complete face. Exits when the stream ends or every reader is
/// gone.
pub fn spawn_pose_loop(
    mut detector: Box<dyn PoseDetector>,
    options: PoseOptions,
    latest: watch::Sender<Option<FacePosition>>,
    visualizer: Arc<dyn Visualizer>,
) -> thread::JoinHandle<()> {
    thread::Builder::new()
        .name("invigil-pose".into())
        .spawn(move || {
            tracing::info!("pose loop started");
            loop {
                if latest.is_closed() {
                    break;
                }

                let detections = match detector.estimate(&options) {
                    Ok(detections) => detections,
                    Err(DetectorError::StreamEnded) => {
                        tracing::info!("pose stream ended");
                        break;
                    }
                    Err(error) => {
                        tracing::warn!(%error, "pose inference failed");
                        thread::sleep(ERROR_BACKOFF);
                        continue;
                    }
                };

                for detection in &detections {
                    if detection.score < options.min_pose_confidence {
                        continue;
                    }
                    let points: Vec<Point2D> = detection
                        .keypoints
                        .iter()
                        .take(5)
                        .map(|k| k.position)
                        .collect();
                    if let Some(face) = canonicalize(&points, SourceKind::Pose) {
                        visualizer.pose_face(&face);
                        latest.send_replace(Some(face));
                    }
                }
            }
            tracing::info!("pose loop exiting");
        })
        .expect("failed to spawn pose thread")
}

/// The face loop: cross-validation, scoring, and alert triggering.
///
/// Owns the degree calculator and the decision machine — the sole mutators
/// of the sustain counter and the lockout flag.
pub struct FaceLoop {
    pose_rx: watch::Receiver<Option<FacePosition>>,
    degree: DegreeCalculator,
    decision: DecisionMachine,
    pipeline: SnapshotPipeline,
    unlock_rx: mpsc::UnboundedReceiver<()>,
    visualizer: Arc<dyn Visualizer>,
}

impl FaceLoop {
    pub fn new(
        pose_rx: watch::Receiver<Option<FacePosition>>,
        degree: DegreeCalculator,
        decision: DecisionMachine,
        pipeline: SnapshotPipeline,
        unlock_rx: mpsc::UnboundedReceiver<()>,
        visualizer: Arc<dyn Visualizer>,
    ) -> Self {
        Self {
            pose_rx,
            degree,
            decision,
            pipeline,
            unlock_rx,
            visualizer,
        }
    }

    /// Process one tracker frame.
    fn step(&mut self, raw: Option<Vec<Point2D>>) {
        // Unlocks queued by completed capture cycles take effect before
        // this frame is scored.
        while self.unlock_rx.try_recv().is_ok() {
            self.decision.unlock();
            tracing::info!("capture cycle complete — accepting new alerts");
        }

        let Some(pose_face) = *self.pose_rx.borrow() else {
            return; // no pose evidence yet
        };

        let tracker_face = raw.and_then(|points| canonicalize(&points, SourceKind::Tracker));

        // Tracker absent means the fine-grained signal is untrusted, not
        // that the frame is skipped: head turn still scores.
        let (distances, agrees) = match &tracker_face {
            Some(tracker) => match cross_validate(&pose_face, tracker) {
                Ok((distances, agrees)) => (Some(distances), agrees),
                Err(error) => {
                    tracing::debug!(%error, "frame skipped");
                    return;
                }
            },
            None => (None, false),
        };

        let degree = match self.degree.compute(&pose_face, tracker_face.as_ref(), agrees) {
            Ok(degree) => degree,
            Err(error) => {
                tracing::debug!(%error, "frame skipped");
                return;
            }
        };

        if let Some(tracker) = &tracker_face {
            self.visualizer.tracker_face(tracker);
        }
        self.visualizer.relativity(&degree.relativity);

        let decision = self.decision.decide(&degree, agrees);
        tracing::trace!(
            probability = decision.probability,
            agrees,
            head_turn = degree.head_turn_degree,
            pupil_turn = ?degree.pupil_turn_degree,
            sustain = self.degree.sustain_frames(),
            max_disagreement = distances.as_ref().map(|d| d.max()),
            "frame scored"
        );

        if decision.fires {
            tracing::warn!(
                probability = decision.probability,
                "cheat alert fired — locking until capture completes"
            );
            self.pipeline.trigger(decision.probability);
        }
    }

    /// Run to stream end, consuming the tracker.
    pub fn run(mut self, mut tracker: Box<dyn FaceTracker>) {
        tracing::info!("face loop started");
        loop {
            match tracker.current_position() {
                Ok(raw) => self.step(raw),
                Err(DetectorError::StreamEnded) => {
                    tracing::info!("tracker stream ended");
                    break;
                }
                Err(error) => {
                    tracing::warn!(%error, "tracker read failed");
                    thread::sleep(ERROR_BACKOFF);
                }
            }
        }
        tracing::info!("face loop exiting");
    }
}

/// Spawn the face loop on a dedicated thread.
pub fn spawn_face_loop(
    face_loop: FaceLoop,
    tracker: Box<dyn FaceTracker>,
) -> thread::JoinHandle<()> {
    thread::Builder::new()
        .name("invigil-face".into())
        .spawn(move || face_loop.run(tracker))
        .expect("failed to spawn face thread")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detector::{FrameSource, Keypoint, NullVisualizer, PoseDetection};
    use crate::report::{CheatReportPayload, ReportError, Reporter, SubjectIdentity};
    use crate::snapshot::{BurstSettings, SnapshotPipeline};
    use crate::store::AlertStore;
    use image::RgbImage;
    use std::path::Path;
    use std::sync::Mutex;
    use tokio::runtime::Handle;

    struct StillFrames;

    impl FrameSource for StillFrames {
        fn current_frame(&self) -> Option<RgbImage> {
            Some(RgbImage::from_pixel(8, 8, image::Rgb([0, 0, 0])))
        }
    }

    #[derive(Default)]
    struct CountingReporter {
        payloads: Mutex<Vec<CheatReportPayload>>,
    }

    impl CountingReporter {
        fn count(&self) -> usize {
            self.payloads.lock().unwrap().len()
        }
    }

    impl Reporter for CountingReporter {
        fn dispatch(
            &self,
            _destination: &str,
            payload: &CheatReportPayload,
        ) -> Result<(), ReportError> {
            self.payloads.lock().unwrap().push(payload.clone());
            Ok(())
        }
    }

    /// Pose face with a strongly turned head: right ear far from the right
    /// eye, left side compact.
    fn turned_pose_face() -> FacePosition {
        FacePosition {
            nose: Point2D::new(0.0, 0.0),
            left_eye: Point2D::new(-1.0, -1.0),
            right_eye: Point2D::new(1.0, -1.0),
            left_ear: Point2D::new(-3.0, 0.0),
            right_ear: Point2D::new(7.0, 0.0),
        }
    }

    /// Raw tracker sequence whose canonical nose lands far from the pose
    /// nose — a mis-fit the cross-validator rejects.
    fn misfit_tracker_points() -> Vec<Point2D> {
        let mut points = vec![Point2D::new(0.0, 0.0); 71];
        points[62] = Point2D::new(2.0, 0.0); // nose
        points[27] = Point2D::new(1.0, -1.0); // right eye
        points[32] = Point2D::new(-1.0, -1.0); // left eye
        points[1] = Point2D::new(7.0, 0.0); // right ear
        points[13] = Point2D::new(-3.0, 0.0); // left ear
        points
    }

    async fn face_loop_with(
        pose_face: Option<FacePosition>,
    ) -> (FaceLoop, Arc<CountingReporter>, AlertStore) {
        let (latest_tx, latest_rx) = latest_pose_channel();
        // The last published value stays readable after the sender is gone
        latest_tx.send_replace(pose_face);

        let (unlock_tx, unlock_rx) = mpsc::unbounded_channel();
        let reporter = Arc::new(CountingReporter::default());
        let store = AlertStore::open(Path::new(":memory:")).await.unwrap();
        let pipeline = SnapshotPipeline::new(
            Arc::new(StillFrames),
            reporter.clone(),
            store.clone(),
            SubjectIdentity {
                id: "s-9".to_string(),
                name: "Rin".to_string(),
            },
            "http://127.0.0.1:1/unused".to_string(),
            BurstSettings {
                snap_count: 2,
                snap_interval: Duration::from_millis(5),
            },
            unlock_tx,
            Handle::current(),
        );
        let face_loop = FaceLoop::new(
            latest_rx,
            DegreeCalculator::default(),
            DecisionMachine::new(),
            pipeline,
            unlock_rx,
            Arc::new(NullVisualizer),
        );
        (face_loop, reporter, store)
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_sustained_evidence_fires_once_per_cycle() {
        let (mut face_loop, reporter, store) = face_loop_with(Some(turned_pose_face())).await;

        // Evidence stays hot for several frames: only one alert may fire
        for _ in 0..5 {
            face_loop.step(Some(misfit_tracker_points()));
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(reporter.count(), 1);

        // The completed cycle queued an unlock; the next hot frame re-fires
        face_loop.step(Some(misfit_tracker_points()));
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(reporter.count(), 2);

        let records = store.recent(10).await.unwrap();
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.reported));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_no_pose_evidence_means_no_alert() {
        let (mut face_loop, reporter, _store) = face_loop_with(None).await;

        for _ in 0..5 {
            face_loop.step(Some(misfit_tracker_points()));
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(reporter.count(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_absent_tracker_still_scores_head_turn() {
        let (mut face_loop, reporter, _store) = face_loop_with(Some(turned_pose_face())).await;

        // No tracker face at all: head-turn evidence alone fires
        face_loop.step(None);
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(reporter.count(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_degenerate_pose_is_skipped() {
        let mut degenerate = turned_pose_face();
        degenerate.right_ear = degenerate.left_ear;
        let (mut face_loop, reporter, _store) = face_loop_with(Some(degenerate)).await;

        face_loop.step(Some(misfit_tracker_points()));
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(reporter.count(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_pose_loop_publishes_confident_detection() {
        struct OneShotPose {
            served: bool,
        }

        impl crate::detector::PoseDetector for OneShotPose {
            fn estimate(
                &mut self,
                _options: &PoseOptions,
            ) -> Result<Vec<PoseDetection>, DetectorError> {
                if self.served {
                    return Err(DetectorError::StreamEnded);
                }
                self.served = true;
                let face = turned_pose_face();
                let keypoints = [
                    face.nose,
                    face.left_eye,
                    face.right_eye,
                    face.left_ear,
                    face.right_ear,
                ]
                .into_iter()
                .map(|position| Keypoint { position })
                .collect();
                Ok(vec![
                    PoseDetection {
                        score: 0.01,
                        keypoints: vec![], // discarded: below confidence
                    },
                    PoseDetection {
                        score: 0.9,
                        keypoints,
                    },
                ])
            }
        }

        let (latest_tx, latest_rx) = latest_pose_channel();
        let options = PoseOptions {
            flip_horizontal: false,
            min_pose_confidence: 0.05,
        };
        let handle = spawn_pose_loop(
            Box::new(OneShotPose { served: false }),
            options,
            latest_tx,
            Arc::new(NullVisualizer),
        );
        handle.join().unwrap();

        assert_eq!(*latest_rx.borrow(), Some(turned_pose_face()));
    }
}
