//! `invigil simulate` — run recorded landmark streams through the engine.
//!
//! Reads both streams frame-by-frame on the calling thread, scores each
//! face frame, and prints the outcome. Alerts trigger no capture — there is
//! no video surface in an offline run — so the lockout is modeled as a
//! fixed number of locked face frames.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use invigil_core::decision::DecisionMachine;
use invigil_core::degree::DegreeCalculator;
use invigil_core::geometry::cross_validate;
use invigil_core::schema::{canonicalize, SourceKind};
use invigil_core::{CheatDegree, FacePosition, Point2D};
use invigild::detector::{DetectorError, FaceTracker, PoseDetector, PoseOptions};
use invigild::replay::{ReplayFaceTracker, ReplayPoseDetector};
use serde::Serialize;

/// One scored frame, as emitted in `--json` mode.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FrameScore<'a> {
    frame: u64,
    probability: f64,
    agrees: bool,
    fires: bool,
    max_disagreement: Option<f64>,
    degree: &'a CheatDegree,
}

pub fn run(
    pose_path: &Path,
    tracker_path: &Path,
    sensitivity: f64,
    min_pose_confidence: f64,
    lockout_frames: u32,
    json: bool,
) -> Result<()> {
    let options = PoseOptions {
        flip_horizontal: false,
        min_pose_confidence,
    };
    let mut pose = ReplayPoseDetector::open(pose_path, Duration::ZERO)
        .with_context(|| format!("failed to open pose stream {}", pose_path.display()))?;
    let mut tracker = ReplayFaceTracker::open(tracker_path, Duration::ZERO)
        .with_context(|| format!("failed to open tracker stream {}", tracker_path.display()))?;

    let mut degree_calc = DegreeCalculator::new(sensitivity);
    let mut decision = DecisionMachine::new();
    let mut latest_pose: Option<FacePosition> = None;
    let mut locked_remaining = 0u32;

    let mut frame = 0u64;
    let mut fired = 0u32;

    loop {
        // Advance the pose stream in lockstep with the face stream; an
        // exhausted pose stream keeps serving its last face
        match pose.estimate(&options) {
            Ok(detections) => {
                for detection in detections
                    .iter()
                    .filter(|d| d.score >= min_pose_confidence)
                {
                    let points: Vec<Point2D> = detection
                        .keypoints
                        .iter()
                        .take(5)
                        .map(|k| k.position)
                        .collect();
                    if let Some(face) = canonicalize(&points, SourceKind::Pose) {
                        latest_pose = Some(face);
                    }
                }
            }
            Err(DetectorError::StreamEnded) => {}
            Err(error) => eprintln!("pose error: {error}"),
        }

        let raw = match tracker.current_position() {
            Ok(raw) => raw,
            Err(DetectorError::StreamEnded) => break,
            Err(error) => {
                eprintln!("tracker error: {error}");
                continue;
            }
        };
        frame += 1;

        let Some(pose_face) = latest_pose else {
            eprintln!("frame {frame:>5}  no pose evidence");
            continue;
        };

        let tracker_face = raw.and_then(|points| canonicalize(&points, SourceKind::Tracker));
        let (agrees, disagreement) = match &tracker_face {
            Some(tracker_face) => match cross_validate(&pose_face, tracker_face) {
                Ok((distances, agrees)) => (agrees, Some(distances.max())),
                Err(error) => {
                    eprintln!("frame {frame:>5}  {error}");
                    continue;
                }
            },
            None => (false, None),
        };

        let degree = match degree_calc.compute(&pose_face, tracker_face.as_ref(), agrees) {
            Ok(degree) => degree,
            Err(error) => {
                eprintln!("frame {frame:>5}  {error}");
                continue;
            }
        };

        if locked_remaining > 0 {
            locked_remaining -= 1;
            if locked_remaining == 0 {
                decision.unlock();
            }
        }

        let outcome = decision.decide(&degree, agrees);
        if outcome.fires {
            fired += 1;
            locked_remaining = lockout_frames;
        }

        if json {
            let score = FrameScore {
                frame,
                probability: outcome.probability,
                agrees,
                fires: outcome.fires,
                max_disagreement: disagreement,
                degree: &degree,
            };
            println!("{}", serde_json::to_string(&score)?);
        } else {
            println!(
                "frame {frame:>5}  p={:.3}  head={:+.3}  pupil={}  agrees={agrees}  disagreement={}{}",
                outcome.probability,
                degree.head_turn_degree,
                degree
                    .pupil_turn_degree
                    .map_or("  --  ".to_string(), |p| format!("{p:+.3}")),
                disagreement.map_or("--".to_string(), |d| format!("{d:.3}")),
                if outcome.fires { "  ALERT" } else { "" },
            );
        }
    }

    if !json {
        println!();
        println!("{frame} face frame(s) scored, {fired} alert(s)");
    }
    Ok(())
}
