//! vidscribe - background transcription of Google Drive videos
//!
//! This library accepts transcription jobs over HTTP, runs each one through a
//! resolve -> download -> transcode -> transcribe pipeline on a bounded worker
//! pool, and reports the transcript (or the failure) to a caller-supplied
//! webhook.

pub mod cli;
pub mod config;
pub mod fetch;
pub mod job;
pub mod notify;
pub mod server;
pub mod source;
pub mod transcode;
pub mod transcribe;
pub mod utils;

pub use cli::{Cli, Commands};
pub use config::Config;
pub use job::{ApiKey, Job, JobQueue, JobRunner, Outcome, WorkerPool};
pub use source::{SourceId, SourceResolver};

/// Result type used throughout the library
pub type Result<T> = anyhow::Result<T>;

/// Failures of the individual pipeline stages.
///
/// Every variant ends up as the `error` string of a failure callback; none of
/// them is ever returned to the HTTP caller.
#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    #[error("{0}")]
    Resolution(String),

    #[error("Download failed: {0}")]
    Fetch(String),

    #[error("Audio extraction failed: {0}")]
    Transcode(String),

    #[error("Transcription failed: {0}")]
    Transcription(String),
}
