//! External collaborator boundary: detectors, the live video surface, and
//! the display sink.
//!
//! The daemon never loads or runs a detection model itself. Each concern is
//! a trait implemented by the integration — or by [`crate::replay`] during
//! development. Inference calls block the calling thread; each detector is
//! driven from its own dedicated loop thread.

use image::RgbImage;
use invigil_core::{FacePosition, Point2D, RelativePosition};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DetectorError {
    /// The underlying source has no more frames; the owning loop stops.
    #[error("detector stream ended")]
    StreamEnded,
    /// One inference call failed; the frame is skipped.
    #[error("inference failed: {0}")]
    Inference(String),
}

/// Options forwarded to the pose estimator on every inference call.
#[derive(Debug, Clone, Copy)]
pub struct PoseOptions {
    /// Flip keypoint x coordinates for mirrored (webcam) input.
    pub flip_horizontal: bool,
    /// Detections scoring below this are discarded by the engine.
    pub min_pose_confidence: f64,
}

/// One keypoint of a pose detection.
#[derive(Debug, Clone, Copy)]
pub struct Keypoint {
    pub position: Point2D,
}

/// One detected person, scored.
#[derive(Debug, Clone)]
pub struct PoseDetection {
    pub score: f64,
    pub keypoints: Vec<Keypoint>,
}

/// General body-pose estimator: coarse but robust. The engine consumes only
/// the first five keypoints of each confident detection.
pub trait PoseDetector: Send {
    fn estimate(&mut self, options: &PoseOptions) -> Result<Vec<PoseDetection>, DetectorError>;
}

/// Dedicated face-alignment tracker: fine-grained but fragile under
/// occlusion and rotation. `Ok(None)` means no face this frame.
pub trait FaceTracker: Send {
    fn current_position(&mut self) -> Result<Option<Vec<Point2D>>, DetectorError>;
}

/// The live video surface that alert snapshots are captured from.
///
/// `None` means the surface is unavailable; the capture step is skipped but
/// the alert cycle still runs to completion.
pub trait FrameSource: Send + Sync {
    fn current_frame(&self) -> Option<RgbImage>;
}

/// Read-only consumer of engine geometry for on-screen display. No feedback
/// into the engine; every method defaults to a no-op.
pub trait Visualizer: Send + Sync {
    fn pose_face(&self, _face: &FacePosition) {}
    fn tracker_face(&self, _face: &FacePosition) {}
    fn relativity(&self, _relative: &RelativePosition) {}
}

/// Discards everything.
pub struct NullVisualizer;

impl Visualizer for NullVisualizer {}
