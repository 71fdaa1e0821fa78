//! Jobs and their lifecycle.
//!
//! A job moves through
//! `Received -> Resolved -> Fetched -> Transcoded -> Transcribed -> Notified`.
//! Any stage failure short-circuits to `Failed`, which is reported through the
//! same single notification as a success.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use uuid::Uuid;

pub mod queue;
pub mod runner;
pub mod staging;

pub use crate::transcribe::ApiKey;
pub use queue::{JobQueue, QueueError, WorkerPool};
pub use runner::JobRunner;
pub use staging::{StagedFile, StagedKind, StagingArea};

/// One accepted transcription request
#[derive(Debug, Clone)]
pub struct Job {
    /// Internal id used for log correlation
    pub id: Uuid,

    /// Google Drive share link as supplied by the caller
    pub source_reference: String,

    /// Webhook that receives the outcome
    pub callback_url: String,

    /// Caller's correlation id, echoed back unmodified
    pub row_id: Value,

    /// Speech-to-text credential, used for this job only
    pub api_key: ApiKey,
}

impl Job {
    pub fn new(
        source_reference: impl Into<String>,
        callback_url: impl Into<String>,
        row_id: Value,
        api_key: ApiKey,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            source_reference: source_reference.into(),
            callback_url: callback_url.into(),
            row_id,
            api_key,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Received,
    Resolved,
    Fetched,
    Transcoded,
    Transcribed,
    Notified,
    Failed,
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobState::Received => write!(f, "received"),
            JobState::Resolved => write!(f, "resolved"),
            JobState::Fetched => write!(f, "fetched"),
            JobState::Transcoded => write!(f, "transcoded"),
            JobState::Transcribed => write!(f, "transcribed"),
            JobState::Notified => write!(f, "notified"),
            JobState::Failed => write!(f, "failed"),
        }
    }
}

/// Final result of a job, delivered to the callback as JSON
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status")]
pub enum Outcome {
    #[serde(rename = "success")]
    Success {
        row_id: Value,
        transcript: String,
        file_id: String,
    },
    #[serde(rename = "error")]
    Failure { row_id: Value, error: String },
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success { .. })
    }

    /// Wire value of the `status` tag
    pub fn status(&self) -> &'static str {
        match self {
            Outcome::Success { .. } => "success",
            Outcome::Failure { .. } => "error",
        }
    }

    pub fn row_id(&self) -> &Value {
        match self {
            Outcome::Success { row_id, .. } | Outcome::Failure { row_id, .. } => row_id,
        }
    }
}
