//! Cheat-degree calculation: head-turn and pupil-turn signals.
//!
//! Head turn is the asymmetry between left and right eye-to-ear distances
//! beyond a fixed baseline — a proxy for yaw rotation that needs only the
//! coarse pose landmarks. Pupil turn is the disagreement between the
//! tracker's and the pose estimator's eye positions beyond a baseline — a
//! proxy for gaze deviation independent of head rotation, trusted only on
//! frames where the two sources agree. Sustained pupil deviation across
//! consecutive agreeing frames is weighted more heavily than a
//! single-frame blip.

use crate::geometry::{distance, face_width, normalize, GeometryError};
use crate::types::{CheatDegree, FacePosition};

/// Left/right eye-to-ear asymmetry tolerated before head turn registers as
/// positive.
const HEAD_BASELINE: f64 = 0.15;
/// Tracker/pose eye disagreement tolerated before pupil turn registers as
/// positive. Scaled by the configured sensitivity.
const PUPIL_BASELINE: f64 = 0.03;
/// Per-sustained-frame multiplier applied to above-baseline pupil deviation.
const SUSTAIN_GAIN: f64 = 0.1;

/// Turns canonicalized face geometry into scalar cheat-degree signals.
///
/// The calculator is the sole owner of the pupil sustain counter, so one
/// instance belongs to exactly one face loop.
#[derive(Debug, Clone)]
pub struct DegreeCalculator {
    sensitivity: f64,
    sustain_frames: u32,
}

impl Default for DegreeCalculator {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl DegreeCalculator {
    pub fn new(sensitivity: f64) -> Self {
        Self {
            sensitivity,
            sustain_frames: 0,
        }
    }

    /// Consecutive agreeing frames with above-baseline pupil deviation.
    pub fn sustain_frames(&self) -> u32 {
        self.sustain_frames
    }

    /// Compute the degree signals for one frame.
    ///
    /// The pupil branch runs only when `agrees` holds and a tracker face is
    /// present; on other frames `pupil_turn_degree` is absent and the
    /// sustain counter is left untouched — a distrusted frame is evidence
    /// of nothing, so it neither extends nor breaks a streak.
    pub fn compute(
        &mut self,
        pose: &FacePosition,
        tracker: Option<&FacePosition>,
        agrees: bool,
    ) -> Result<CheatDegree, GeometryError> {
        let width = face_width(pose)?;

        let left_head_turn = distance(pose.left_eye, pose.left_ear) / width;
        let right_head_turn = distance(pose.right_eye, pose.right_ear) / width;
        let head_turn_degree = (left_head_turn - right_head_turn).abs() - HEAD_BASELINE;

        let pupil_turn_degree = match tracker {
            Some(tracker) if agrees => {
                let baseline = PUPIL_BASELINE * self.sensitivity;
                let left_pupil_turn = distance(tracker.left_eye, pose.left_eye) / width;
                let right_pupil_turn = distance(tracker.right_eye, pose.right_eye) / width;
                let mut degree = (right_pupil_turn - baseline).max(left_pupil_turn - baseline);

                if degree > 0.0 {
                    self.sustain_frames += 1;
                    degree *= f64::from(self.sustain_frames) * SUSTAIN_GAIN;
                } else {
                    self.sustain_frames = 0;
                }
                Some(degree)
            }
            _ => None,
        };

        Ok(CheatDegree {
            head_turn_degree,
            right_head_turn,
            left_head_turn,
            pupil_turn_degree,
            relativity: normalize(pose)?,
        })
    }
}
