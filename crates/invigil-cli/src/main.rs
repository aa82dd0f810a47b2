//! invigil — operator CLI for the invigil proctoring engine.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod events;
mod simulate;

#[derive(Parser)]
#[command(
    name = "invigil",
    about = "Replay recorded sessions and inspect journaled alerts",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run recorded landmark streams through the scoring engine
    Simulate {
        /// Pose landmark stream (JSONL)
        #[arg(long)]
        pose: PathBuf,
        /// Tracker landmark stream (JSONL)
        #[arg(long)]
        tracker: PathBuf,
        /// Pupil baseline multiplier
        #[arg(long, default_value_t = 1.0)]
        sensitivity: f64,
        /// Pose detections scoring below this are discarded
        #[arg(long, default_value_t = 0.05)]
        min_pose_confidence: f64,
        /// Face frames the machine stays locked after an alert, standing in
        /// for the daemon's capture budget
        #[arg(long, default_value_t = 3)]
        lockout_frames: u32,
        /// Emit one JSON object per scored frame instead of the table
        #[arg(long)]
        json: bool,
    },
    /// List recent journaled alerts
    Events {
        /// Journal path (defaults to the daemon's)
        #[arg(long)]
        db: Option<PathBuf>,
        #[arg(long, default_value_t = 20)]
        limit: u32,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Simulate {
            pose,
            tracker,
            sensitivity,
            min_pose_confidence,
            lockout_frames,
            json,
        } => simulate::run(
            &pose,
            &tracker,
            sensitivity,
            min_pose_confidence,
            lockout_frames,
            json,
        ),
        Command::Events { db, limit } => events::run(db, limit).await,
    }
}
