//! Scale-invariant face geometry and cross-source validation.
//!
//! All positional features are expressed relative to the nose and divided
//! by the inter-ear distance, which makes them comparable across face sizes
//! and distances to the camera. Cross-validation measures how much the two
//! detector sources disagree per landmark in those normalized units; the
//! fine-grained tracker signal is trusted only while the disagreement stays
//! under tolerance.

use thiserror::Error;

use crate::types::{DistanceVector, FacePosition, Landmark, Point2D, RelativePosition};

/// Maximum per-landmark normalized disagreement for the two sources to be
/// considered in agreement.
pub const AGREEMENT_TOLERANCE: f64 = 0.1;

#[derive(Error, Debug)]
pub enum GeometryError {
    /// The inter-ear reference distance is zero or not finite. The frame
    /// carries no usable geometric signal; callers skip it.
    #[error("degenerate face geometry: inter-ear width is {width}")]
    DegenerateWidth { width: f64 },
}

/// Standard 2D Euclidean distance, no rounding.
pub fn distance(a: Point2D, b: Point2D) -> f64 {
    let dx = a.x - b.x;
    let dy = a.y - b.y;
    (dx * dx + dy * dy).sqrt()
}

/// Inter-ear distance — the scale reference for every relative measure.
pub fn face_width(face: &FacePosition) -> Result<f64, GeometryError> {
    let width = distance(face.left_ear, face.right_ear);
    if width == 0.0 || !width.is_finite() {
        return Err(GeometryError::DegenerateWidth { width });
    }
    Ok(width)
}

/// Derive scale-invariant relative positions from a canonical face.
pub fn normalize(face: &FacePosition) -> Result<RelativePosition, GeometryError> {
    let width = face_width(face)?;
    let relative = |landmark: Landmark| {
        landmark.side_sign() * distance(face.point(landmark), face.nose) / width
    };

    Ok(RelativePosition {
        nose: 0.0,
        left_eye: relative(Landmark::LeftEye),
        right_eye: relative(Landmark::RightEye),
        left_ear: relative(Landmark::LeftEar),
        right_ear: relative(Landmark::RightEar),
    })
}

/// Measure per-landmark disagreement between the two sources.
///
/// The pose face provides the scale reference. Tracker landmarks are
/// measured against the pose nose rather than their own — the two detector
/// frames are independently scaled, so a self-relative tracker position
/// would not be comparable. Returns the disagreement vector and whether
/// every landmark is within [`AGREEMENT_TOLERANCE`]; the flag gates whether
/// pupil evidence is trusted this frame.
pub fn cross_validate(
    pose: &FacePosition,
    tracker: &FacePosition,
) -> Result<(DistanceVector, bool), GeometryError> {
    let width = face_width(pose)?;
    let pose_relative = normalize(pose)?;

    let disagreement = |landmark: Landmark| {
        let tracker_relative =
            landmark.side_sign() * distance(tracker.point(landmark), pose.nose) / width;
        (tracker_relative - pose_relative.value(landmark)).abs()
    };

    let distances = DistanceVector {
        nose: distance(tracker.nose, pose.nose) / width,
        left_eye: disagreement(Landmark::LeftEye),
        right_eye: disagreement(Landmark::RightEye),
        left_ear: disagreement(Landmark::LeftEar),
        right_ear: disagreement(Landmark::RightEar),
    };

    let agrees = Landmark::ALL
        .iter()
        .all(|&l| distances.value(l) < AGREEMENT_TOLERANCE);

    Ok((distances, agrees))
}
