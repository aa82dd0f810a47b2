use serde::{Deserialize, Serialize};

/// A single image-plane coordinate. Immutable value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point2D {
    pub x: f64,
    pub y: f64,
}

impl Point2D {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl From<[f64; 2]> for Point2D {
    fn from(p: [f64; 2]) -> Self {
        Self { x: p[0], y: p[1] }
    }
}

/// The five semantic landmarks shared by both detector sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Landmark {
    Nose,
    LeftEye,
    RightEye,
    LeftEar,
    RightEar,
}

impl Landmark {
    pub const ALL: [Landmark; 5] = [
        Landmark::Nose,
        Landmark::LeftEye,
        Landmark::RightEye,
        Landmark::LeftEar,
        Landmark::RightEar,
    ];

    /// Sign applied when normalizing: left-side landmarks are negated so a
    /// relative position carries which side of the face it sits on.
    pub fn side_sign(self) -> f64 {
        match self {
            Landmark::Nose => 0.0,
            Landmark::LeftEye | Landmark::LeftEar => -1.0,
            Landmark::RightEye | Landmark::RightEar => 1.0,
        }
    }
}

/// Canonical five-landmark face position, common to both detector sources
/// after schema mapping.
///
/// Always fully populated — a frame with no usable detection is represented
/// as `Option<FacePosition>` at the call site, never as a partial value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FacePosition {
    pub nose: Point2D,
    pub left_eye: Point2D,
    pub right_eye: Point2D,
    pub left_ear: Point2D,
    pub right_ear: Point2D,
}

impl FacePosition {
    pub fn point(&self, landmark: Landmark) -> Point2D {
        match landmark {
            Landmark::Nose => self.nose,
            Landmark::LeftEye => self.left_eye,
            Landmark::RightEye => self.right_eye,
            Landmark::LeftEar => self.left_ear,
            Landmark::RightEar => self.right_ear,
        }
    }
}

/// Scale-invariant landmark positions: each landmark's distance from the
/// nose divided by the inter-ear width, left side negated.
///
/// `nose` is always 0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RelativePosition {
    pub nose: f64,
    pub left_eye: f64,
    pub right_eye: f64,
    pub left_ear: f64,
    pub right_ear: f64,
}

impl RelativePosition {
    pub fn value(&self, landmark: Landmark) -> f64 {
        match landmark {
            Landmark::Nose => self.nose,
            Landmark::LeftEye => self.left_eye,
            Landmark::RightEye => self.right_eye,
            Landmark::LeftEar => self.left_ear,
            Landmark::RightEar => self.right_ear,
        }
    }
}

/// Per-landmark disagreement between the two canonicalized sources, scaled
/// by the pose face width. All entries are non-negative.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DistanceVector {
    pub nose: f64,
    pub left_eye: f64,
    pub right_eye: f64,
    pub left_ear: f64,
    pub right_ear: f64,
}

impl DistanceVector {
    pub fn value(&self, landmark: Landmark) -> f64 {
        match landmark {
            Landmark::Nose => self.nose,
            Landmark::LeftEye => self.left_eye,
            Landmark::RightEye => self.right_eye,
            Landmark::LeftEar => self.left_ear,
            Landmark::RightEar => self.right_ear,
        }
    }

    /// Largest single-landmark disagreement.
    pub fn max(&self) -> f64 {
        Landmark::ALL
            .iter()
            .map(|&l| self.value(l))
            .fold(0.0, f64::max)
    }
}

/// Geometric evidence extracted from one face-loop frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CheatDegree {
    /// Eye-to-ear asymmetry beyond the head baseline. Positive means the
    /// head is turned away from center.
    pub head_turn_degree: f64,
    pub right_head_turn: f64,
    pub left_head_turn: f64,
    /// Tracker/pose eye disagreement beyond the pupil baseline, amplified
    /// while sustained. Present only on frames where the sources agree.
    pub pupil_turn_degree: Option<f64>,
    pub relativity: RelativePosition,
}
