//! Replay detector sources for development and testing.
//!
//! Play back recorded landmark streams from JSONL files — one frame per
//! line — with a fixed per-frame delay standing in for inference latency.
//! Pose lines hold an array of detections
//! (`[{"score": …, "keypoints": [[x, y], …]}]`); tracker lines hold an
//! array of `[x, y]` points or `null` for a frame with no face. An
//! exhausted stream ends the owning loop.

use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::Path;
use std::thread;
use std::time::Duration;

use image::RgbImage;
use invigil_core::Point2D;
use serde::Deserialize;

use crate::detector::{
    DetectorError, FaceTracker, FrameSource, Keypoint, PoseDetection, PoseDetector, PoseOptions,
};

#[derive(Deserialize)]
struct RecordedDetection {
    score: f64,
    keypoints: Vec<[f64; 2]>,
}

/// Next non-blank line, or `None` at end of stream.
fn next_line(lines: &mut Lines<BufReader<File>>) -> Result<Option<String>, DetectorError> {
    loop {
        match lines.next() {
            None => return Ok(None),
            Some(Err(error)) => return Err(DetectorError::Inference(error.to_string())),
            Some(Ok(line)) if line.trim().is_empty() => continue,
            Some(Ok(line)) => return Ok(Some(line)),
        }
    }
}

/// Pose stream replay.
pub struct ReplayPoseDetector {
    lines: Lines<BufReader<File>>,
    frame_interval: Duration,
}

impl ReplayPoseDetector {
    pub fn open(path: &Path, frame_interval: Duration) -> std::io::Result<Self> {
        Ok(Self {
            lines: BufReader::new(File::open(path)?).lines(),
            frame_interval,
        })
    }
}

impl PoseDetector for ReplayPoseDetector {
    fn estimate(&mut self, _options: &PoseOptions) -> Result<Vec<PoseDetection>, DetectorError> {
        thread::sleep(self.frame_interval);
        let Some(line) = next_line(&mut self.lines)? else {
            return Err(DetectorError::StreamEnded);
        };
        let recorded: Vec<RecordedDetection> = serde_json::from_str(&line)
            .map_err(|error| DetectorError::Inference(format!("malformed pose frame: {error}")))?;
        Ok(recorded
            .into_iter()
            .map(|detection| PoseDetection {
                score: detection.score,
                keypoints: detection
                    .keypoints
                    .into_iter()
                    .map(|position| Keypoint {
                        position: Point2D::from(position),
                    })
                    .collect(),
            })
            .collect())
    }
}

/// Tracker stream replay.
pub struct ReplayFaceTracker {
    lines: Lines<BufReader<File>>,
    frame_interval: Duration,
}

impl ReplayFaceTracker {
    pub fn open(path: &Path, frame_interval: Duration) -> std::io::Result<Self> {
        Ok(Self {
            lines: BufReader::new(File::open(path)?).lines(),
            frame_interval,
        })
    }
}

impl FaceTracker for ReplayFaceTracker {
    fn current_position(&mut self) -> Result<Option<Vec<Point2D>>, DetectorError> {
        thread::sleep(self.frame_interval);
        let Some(line) = next_line(&mut self.lines)? else {
            return Err(DetectorError::StreamEnded);
        };
        let recorded: Option<Vec<[f64; 2]>> = serde_json::from_str(&line).map_err(|error| {
            DetectorError::Inference(format!("malformed tracker frame: {error}"))
        })?;
        Ok(recorded.map(|points| points.into_iter().map(Point2D::from).collect()))
    }
}

/// Flat synthetic frame standing in for the live video surface.
pub struct ReplayFrameSource {
    width: u32,
    height: u32,
}

impl ReplayFrameSource {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl FrameSource for ReplayFrameSource {
    fn current_frame(&self) -> Option<RgbImage> {
        Some(RgbImage::from_pixel(
            self.width,
            self.height,
            image::Rgb([96, 96, 96]),
        ))
    }
}
