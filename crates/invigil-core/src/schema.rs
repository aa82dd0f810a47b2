//! Schema-to-semantic landmark mapping for the two detector sources.
//!
//! Each detector reports landmarks as a flat ordered sequence with its own
//! indexing scheme. The tables below pin each scheme to the shared
//! five-point model so the rest of the engine never touches a raw index.
//! The two schemes use mirrored left/right conventions; the swap in the
//! tracker table is deliberate and must be preserved as-is.

use crate::types::{FacePosition, Landmark, Point2D};

/// Detector source whose raw output is being canonicalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// General body-pose estimator: coarse but robust, the first five
    /// keypoints are the face.
    Pose,
    /// Dedicated face-alignment tracker: fine-grained but fragile under
    /// occlusion and rotation.
    Tracker,
}

/// Sequence index of each semantic landmark in a pose-estimator keypoint
/// list.
const POSE_INDICES: [(Landmark, usize); 5] = [
    (Landmark::Nose, 0),
    (Landmark::LeftEye, 1),
    (Landmark::RightEye, 2),
    (Landmark::LeftEar, 3),
    (Landmark::RightEar, 4),
];

/// Sequence index of each semantic landmark in a face-alignment tracker
/// point list. Left and right are swapped relative to the pose table — the
/// tracker's convention mirrors the pose estimator's.
const TRACKER_INDICES: [(Landmark, usize); 5] = [
    (Landmark::Nose, 62),
    (Landmark::RightEye, 27),
    (Landmark::LeftEye, 32),
    (Landmark::RightEar, 1),
    (Landmark::LeftEar, 13),
];

fn index_table(kind: SourceKind) -> &'static [(Landmark, usize); 5] {
    match kind {
        SourceKind::Pose => &POSE_INDICES,
        SourceKind::Tracker => &TRACKER_INDICES,
    }
}

/// Map one detector's raw landmark sequence into the canonical five-point
/// model.
///
/// Returns `None` when the sequence is empty or too short for the source's
/// schema — the detector found no usable face this frame. A returned face
/// is always fully populated.
pub fn canonicalize(raw: &[Point2D], kind: SourceKind) -> Option<FacePosition> {
    let table = index_table(kind);
    let lookup = |landmark: Landmark| -> Option<Point2D> {
        let &(_, index) = table.iter().find(|(l, _)| *l == landmark)?;
        raw.get(index).copied()
    };

    Some(FacePosition {
        nose: lookup(Landmark::Nose)?,
        left_eye: lookup(Landmark::LeftEye)?,
        right_eye: lookup(Landmark::RightEye)?,
        left_ear: lookup(Landmark::LeftEar)?,
        right_ear: lookup(Landmark::RightEar)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Raw sequence where point i is (i, 10·i) — makes index mix-ups visible.
    fn indexed_points(len: usize) -> Vec<Point2D> {
        (0..len)
            .map(|i| Point2D::new(i as f64, 10.0 * i as f64))
            .collect()
    }

    #[test]
    fn test_tables_cover_every_landmark_once() {
        for table in [&POSE_INDICES, &TRACKER_INDICES] {
            for landmark in Landmark::ALL {
                let hits = table.iter().filter(|(l, _)| *l == landmark).count();
                assert_eq!(hits, 1, "{landmark:?} mapped {hits} times");
            }
        }
    }

    #[test]
    fn test_pose_mapping_is_positional() {
        let face = canonicalize(&indexed_points(5), SourceKind::Pose).unwrap();
        assert_eq!(face.nose, Point2D::new(0.0, 0.0));
        assert_eq!(face.left_eye, Point2D::new(1.0, 10.0));
        assert_eq!(face.right_eye, Point2D::new(2.0, 20.0));
        assert_eq!(face.left_ear, Point2D::new(3.0, 30.0));
        assert_eq!(face.right_ear, Point2D::new(4.0, 40.0));
    }

    #[test]
    fn test_tracker_mapping_uses_mirrored_indices() {
        let face = canonicalize(&indexed_points(71), SourceKind::Tracker).unwrap();
        assert_eq!(face.nose, Point2D::new(62.0, 620.0));
        // Mirrored convention: right eye comes from index 27, left from 32
        assert_eq!(face.right_eye, Point2D::new(27.0, 270.0));
        assert_eq!(face.left_eye, Point2D::new(32.0, 320.0));
        assert_eq!(face.right_ear, Point2D::new(1.0, 10.0));
        assert_eq!(face.left_ear, Point2D::new(13.0, 130.0));
    }

    #[test]
    fn test_empty_sequence_is_absent() {
        assert!(canonicalize(&[], SourceKind::Pose).is_none());
        assert!(canonicalize(&[], SourceKind::Tracker).is_none());
    }

    #[test]
    fn test_short_sequence_is_absent() {
        // Tracker schema reaches index 62; 40 points cannot populate it
        assert!(canonicalize(&indexed_points(40), SourceKind::Tracker).is_none());
        assert!(canonicalize(&indexed_points(4), SourceKind::Pose).is_none());
    }
}
