use std::path::PathBuf;
use std::time::Duration;

/// Daemon configuration, loaded from environment variables.
pub struct Config {
    /// Path to the SQLite alert journal.
    pub db_path: PathBuf,
    /// Reporting collaborator endpoint.
    pub report_url: String,
    /// Identity of the monitored subject, carried verbatim into reports.
    pub subject_id: String,
    pub subject_name: String,
    /// Pose detections scoring below this are discarded.
    pub min_pose_confidence: f64,
    /// Flip pose keypoints horizontally for mirrored (webcam) input.
    pub flip_horizontal: bool,
    /// Pupil baseline multiplier; higher values tolerate more deviation
    /// before gaze evidence accumulates.
    pub sensitivity: f64,
    /// Number of frames captured per alert.
    pub snap_count: u32,
    /// Delay between captured frames.
    pub snap_interval: Duration,
    /// Recorded pose landmark stream for replay mode (development).
    pub pose_stream: Option<PathBuf>,
    /// Recorded tracker landmark stream for replay mode (development).
    pub tracker_stream: Option<PathBuf>,
    /// Simulated per-frame inference latency in replay mode.
    pub replay_frame_interval: Duration,
}

impl Config {
    /// Load configuration from `INVIGIL_*` environment variables with defaults.
    pub fn from_env() -> Self {
        let data_dir = std::env::var("XDG_DATA_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
                PathBuf::from(home).join(".local/share")
            })
            .join("invigil");

        let db_path = std::env::var("INVIGIL_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_dir.join("alerts.db"));

        Self {
            db_path,
            report_url: std::env::var("INVIGIL_REPORT_URL")
                .unwrap_or_else(|_| "http://127.0.0.1:8080/cheat-log".to_string()),
            subject_id: std::env::var("INVIGIL_SUBJECT_ID")
                .unwrap_or_else(|_| "unknown".to_string()),
            subject_name: std::env::var("INVIGIL_SUBJECT_NAME")
                .unwrap_or_else(|_| "unknown".to_string()),
            min_pose_confidence: env_f64("INVIGIL_MIN_POSE_CONFIDENCE", 0.05),
            flip_horizontal: std::env::var("INVIGIL_FLIP_HORIZONTAL")
                .map(|v| v != "0")
                .unwrap_or(false),
            sensitivity: env_f64("INVIGIL_SENSITIVITY", 1.0),
            snap_count: env_u32("INVIGIL_SNAP_COUNT", 3),
            snap_interval: Duration::from_millis(env_u64("INVIGIL_SNAP_INTERVAL_MS", 200)),
            pose_stream: std::env::var("INVIGIL_POSE_STREAM").map(PathBuf::from).ok(),
            tracker_stream: std::env::var("INVIGIL_TRACKER_STREAM")
                .map(PathBuf::from)
                .ok(),
            replay_frame_interval: Duration::from_millis(env_u64("INVIGIL_REPLAY_FRAME_MS", 33)),
        }
    }
}

fn env_f64(key: &str, default: f64) -> f64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_u32(key: &str, default: u32) -> u32 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
