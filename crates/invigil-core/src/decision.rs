//! Alert decision: bounded probability scoring and one-shot firing.
//!
//! Degrees are rescaled into logit space, combined (weighted when both
//! signals are trustworthy), and squashed through a sigmoid into (0, 1).
//! The machine fires at most one alert per cheating episode: firing locks
//! it, and only the completion of the capture/report cycle unlocks it.

use crate::types::CheatDegree;

/// Rescale applied to both degrees before scoring: `degree * SCALE - SHIFT`.
const DEGREE_SCALE: f64 = 20.0;
const DEGREE_SHIFT: f64 = 2.0;
/// Contribution weights when both signals are trustworthy.
const HEAD_WEIGHT: f64 = 0.9;
const PUPIL_WEIGHT: f64 = 0.7;
/// Probability above which an alert fires.
pub const FIRE_THRESHOLD: f64 = 0.8;

/// Logistic squash into (0, 1); `sigmoid(0) == 0.5`.
pub fn sigmoid(v: f64) -> f64 {
    1.0 / (1.0 + (-v).exp())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MachineState {
    /// Accepting new evidence; an alert may fire.
    Idle,
    /// An alert/capture/report cycle is in flight. Evidence is still scored
    /// for observability but cannot fire a second alert.
    Locked,
}

/// Outcome of scoring one frame.
#[derive(Debug, Clone, Copy)]
pub struct Decision {
    pub fires: bool,
    pub probability: f64,
}

/// One-shot alert state machine.
///
/// The machine is the sole owner of the lockout flag; the snapshot/report
/// pipeline signals completion back to the owning loop, which calls
/// [`DecisionMachine::unlock`]. There is no timeout-based auto-unlock.
#[derive(Debug)]
pub struct DecisionMachine {
    state: MachineState,
}

impl Default for DecisionMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl DecisionMachine {
    pub fn new() -> Self {
        Self {
            state: MachineState::Idle,
        }
    }

    pub fn state(&self) -> MachineState {
        self.state
    }

    /// Score one frame and fire at most once per episode.
    ///
    /// When the sources disagree the pupil signal is untrusted and the
    /// probability rests on head turn alone, unweighted.
    pub fn decide(&mut self, degree: &CheatDegree, agrees: bool) -> Decision {
        let scaled_head = degree.head_turn_degree * DEGREE_SCALE - DEGREE_SHIFT;

        let evidence = if agrees {
            let scaled_pupil = degree
                .pupil_turn_degree
                .map_or(0.0, |p| p * DEGREE_SCALE - DEGREE_SHIFT);
            scaled_head * HEAD_WEIGHT + scaled_pupil * PUPIL_WEIGHT
        } else {
            scaled_head
        };

        let probability = sigmoid(evidence);
        let fires = self.state == MachineState::Idle && probability > FIRE_THRESHOLD;
        if fires {
            self.state = MachineState::Locked;
        }

        Decision { fires, probability }
    }

    /// Return to [`MachineState::Idle`]. Called only when a capture/report
    /// cycle completes — the sole unlock path.
    pub fn unlock(&mut self) {
        self.state = MachineState::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::degree::DegreeCalculator;
    use crate::geometry::cross_validate;
    use crate::types::{FacePosition, Point2D, RelativePosition};

    fn flat_relativity() -> RelativePosition {
        RelativePosition {
            nose: 0.0,
            left_eye: -0.2,
            right_eye: 0.2,
            left_ear: -0.5,
            right_ear: 0.5,
        }
    }

    fn degree_with(head: f64, pupil: Option<f64>) -> CheatDegree {
        CheatDegree {
            head_turn_degree: head,
            right_head_turn: 0.0,
            left_head_turn: 0.0,
            pupil_turn_degree: pupil,
            relativity: flat_relativity(),
        }
    }

    fn symmetric_face() -> FacePosition {
        FacePosition {
            nose: Point2D::new(0.0, 0.0),
            left_eye: Point2D::new(-1.0, -1.0),
            right_eye: Point2D::new(1.0, -1.0),
            left_ear: Point2D::new(-3.0, 0.0),
            right_ear: Point2D::new(3.0, 0.0),
        }
    }

    #[test]
    fn test_sigmoid_midpoint() {
        assert!((sigmoid(0.0) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_sigmoid_is_monotonic_and_bounded() {
        let mut previous = 0.0;
        for i in -100..=100 {
            let v = sigmoid(f64::from(i) * 0.25);
            assert!(v > 0.0 && v < 1.0);
            assert!(v > previous);
            previous = v;
        }
    }

    #[test]
    fn test_fires_exactly_once_while_evidence_persists() {
        let mut machine = DecisionMachine::new();
        // Strong head turn, disagreeing tracker: scores well above threshold
        let degree = degree_with(0.4, None);

        let mut fired = 0;
        for _ in 0..10 {
            let decision = machine.decide(&degree, false);
            assert!(decision.probability > FIRE_THRESHOLD);
            if decision.fires {
                fired += 1;
            }
        }
        assert_eq!(fired, 1);
        assert_eq!(machine.state(), MachineState::Locked);
    }

    #[test]
    fn test_unlock_is_the_sole_rearm_path() {
        let mut machine = DecisionMachine::new();
        let degree = degree_with(0.4, None);

        assert!(machine.decide(&degree, false).fires);
        assert!(!machine.decide(&degree, false).fires);

        machine.unlock();
        assert_eq!(machine.state(), MachineState::Idle);
        assert!(machine.decide(&degree, false).fires);
    }

    #[test]
    fn test_probability_still_computed_while_locked() {
        let mut machine = DecisionMachine::new();
        machine.decide(&degree_with(0.4, None), false);
        assert_eq!(machine.state(), MachineState::Locked);

        let decision = machine.decide(&degree_with(-0.15, None), false);
        assert!(!decision.fires);
        assert!(decision.probability < 0.01);
    }

    #[test]
    fn test_absent_pupil_contributes_nothing() {
        let mut a = DecisionMachine::new();
        let mut b = DecisionMachine::new();
        // Absent pupil degree and a pupil degree scoring to exactly zero
        // contribution produce the same probability
        let without = a.decide(&degree_with(0.1, None), true);
        let with_neutral = b
            .decide(&degree_with(0.1, Some(DEGREE_SHIFT / DEGREE_SCALE)), true)
            .probability;
        assert!((without.probability - with_neutral).abs() < 1e-12);
    }

    #[test]
    fn test_centered_symmetric_face_does_not_alert() {
        let pose = symmetric_face();
        let tracker = pose;

        let (_, agrees) = cross_validate(&pose, &tracker).unwrap();
        assert!(agrees);

        let degree = DegreeCalculator::default()
            .compute(&pose, Some(&tracker), agrees)
            .unwrap();
        assert!(degree.head_turn_degree < 0.0);

        let decision = DecisionMachine::new().decide(&degree, agrees);
        assert!(decision.probability < FIRE_THRESHOLD);
        assert!(!decision.fires);
    }

    #[test]
    fn test_turned_head_with_disagreeing_tracker_alerts() {
        let mut pose = symmetric_face();
        // Right ear far from the right eye, left side unchanged
        pose.right_ear = Point2D::new(7.0, 0.0);

        // Tracker mis-fit: nose displaced by more than the tolerance
        let mut tracker = pose;
        tracker.nose = Point2D::new(2.0, 0.0);

        let (_, agrees) = cross_validate(&pose, &tracker).unwrap();
        assert!(!agrees);

        let degree = DegreeCalculator::default()
            .compute(&pose, Some(&tracker), agrees)
            .unwrap();
        assert!(degree.head_turn_degree > 0.0);
        assert!(degree.pupil_turn_degree.is_none());

        let mut machine = DecisionMachine::new();
        let decision = machine.decide(&degree, agrees);
        assert!(decision.probability > FIRE_THRESHOLD);
        assert!(decision.fires);
        assert_eq!(machine.state(), MachineState::Locked);
    }
}
