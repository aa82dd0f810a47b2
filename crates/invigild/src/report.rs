//! Report payload schema and the reporting collaborator boundary.

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("report transport failed: {0}")]
    Transport(#[from] ureq::Error),
    #[error("report dispatch failed: {0}")]
    Failed(String),
}

/// Identity of the monitored subject, sourced from ambient session
/// configuration outside the engine's scope.
#[derive(Debug, Clone)]
pub struct SubjectIdentity {
    pub id: String,
    pub name: String,
}

/// The unit handed to the reporting collaborator.
///
/// Serialized camelCase per the wire schema; images are hex-encoded JPEG.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheatReportPayload {
    pub subject_id: String,
    pub subject_name: String,
    pub timestamp: DateTime<Utc>,
    pub cheat_probability: f64,
    pub cheat_images: Vec<String>,
}

impl CheatReportPayload {
    pub fn assemble(subject: &SubjectIdentity, probability: f64, images: &[Vec<u8>]) -> Self {
        Self {
            subject_id: subject.id.clone(),
            subject_name: subject.name.clone(),
            timestamp: Utc::now(),
            cheat_probability: probability,
            cheat_images: images.iter().map(hex::encode).collect(),
        }
    }
}

/// External reporting collaborator.
///
/// Dispatch is synchronous; the snapshot pipeline runs it on the blocking
/// pool. Destination and subject identity come from configuration.
pub trait Reporter: Send + Sync {
    fn dispatch(&self, destination: &str, payload: &CheatReportPayload) -> Result<(), ReportError>;
}

/// Default reporter: JSON POST to the configured destination.
pub struct HttpReporter;

impl Reporter for HttpReporter {
    fn dispatch(&self, destination: &str, payload: &CheatReportPayload) -> Result<(), ReportError> {
        ureq::post(destination).send_json(payload)?;
        Ok(())
    }
}
