use futures_util::FutureExt;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::Instrument;

use super::staging::{StagedKind, StagingArea};
use super::{Job, JobState, Outcome};
use crate::config::Config;
use crate::fetch::{Fetch, HttpFetcher};
use crate::notify::{Notify, WebhookNotifier};
use crate::source::{SourceId, SourceResolver};
use crate::transcode::{transcoder_from_config, Transcode};
use crate::transcribe::{Transcribe, WhisperTranscriber};
use crate::PipelineError;

/// Drives one job through every stage and reports the outcome exactly once
pub struct JobRunner {
    resolver: SourceResolver,
    fetcher: Arc<dyn Fetch>,
    transcoder: Arc<dyn Transcode>,
    transcriber: Arc<dyn Transcribe>,
    notifier: Arc<dyn Notify>,
    staging_root: PathBuf,
}

impl JobRunner {
    pub fn new(
        resolver: SourceResolver,
        fetcher: Arc<dyn Fetch>,
        transcoder: Arc<dyn Transcode>,
        transcriber: Arc<dyn Transcribe>,
        notifier: Arc<dyn Notify>,
        staging_root: PathBuf,
    ) -> Self {
        Self {
            resolver,
            fetcher,
            transcoder,
            transcriber,
            notifier,
            staging_root,
        }
    }

    /// Build the production pipeline from configuration
    pub fn from_config(config: &Config) -> crate::Result<Self> {
        let fetcher = HttpFetcher::new(config.fetch_timeout())?;

        Ok(Self::new(
            SourceResolver::new(config.source.export_url.clone()),
            Arc::new(fetcher),
            transcoder_from_config(&config.transcode),
            Arc::new(WhisperTranscriber::new(&config.transcription)),
            Arc::new(WebhookNotifier::new(config.notify_timeout())),
            config.staging_root(),
        ))
    }

    /// Run a job to completion.
    ///
    /// Always sends one notification and removes every staged file before
    /// returning, whichever stage failed.
    pub async fn run(&self, job: Job) -> Outcome {
        let span = tracing::info_span!("job", job_id = %job.id, row_id = %job.row_id);
        self.run_to_completion(job).instrument(span).await
    }

    async fn run_to_completion(&self, job: Job) -> Outcome {
        tracing::info!("Processing job");
        let mut state = JobState::Received;

        let (result, staging) = match StagingArea::create(&self.staging_root) {
            Ok(mut staging) => {
                let result = AssertUnwindSafe(self.execute(&job, &mut staging, &mut state))
                    .catch_unwind()
                    .await
                    .unwrap_or_else(|_| {
                        Err(StageFailure::Panic(
                            "internal error while processing job".to_string(),
                        ))
                    });
                (result, Some(staging))
            }
            Err(e) => (
                Err(StageFailure::Stage(PipelineError::Fetch(format!(
                    "could not create staging directory: {}",
                    e
                )))),
                None,
            ),
        };

        let outcome = match result {
            Ok((source_id, transcript)) => Outcome::Success {
                row_id: job.row_id.clone(),
                transcript,
                file_id: source_id.into_string(),
            },
            Err(failure) => {
                tracing::error!(after = %state, error = %failure, "Error processing video");
                state = JobState::Failed;
                Outcome::Failure {
                    row_id: job.row_id.clone(),
                    error: failure.to_string(),
                }
            }
        };

        self.notifier.notify(&job.callback_url, &outcome).await;
        tracing::debug!(from = %state, to = %JobState::Notified, "Job state transition");

        if let Some(staging) = staging {
            staging.cleanup();
        }

        outcome
    }

    async fn execute(
        &self,
        job: &Job,
        staging: &mut StagingArea,
        state: &mut JobState,
    ) -> Result<(SourceId, String), StageFailure> {
        let source_id = self.resolver.resolve(&job.source_reference)?;
        advance(state, JobState::Resolved);

        let download_url = self.resolver.build_fetch_url(&source_id);
        let raw_path = staging.raw_path(&source_id);
        // Registered up front so a partial download is removed too.
        staging.register(raw_path.clone(), StagedKind::Raw);

        tracing::info!(file_id = %source_id, "Downloading file");
        let raw_path = self.fetcher.fetch(&download_url, &raw_path).await?;
        advance(state, JobState::Fetched);

        tracing::info!(file_id = %source_id, "Extracting audio");
        let audio_path = self.transcoder.transcode(&raw_path).await?;
        if audio_path != raw_path {
            staging.register(audio_path.clone(), StagedKind::Audio);
        }
        advance(state, JobState::Transcoded);

        tracing::info!(file_id = %source_id, "Transcribing file");
        let transcript = self.transcriber.transcribe(&audio_path, &job.api_key).await?;
        advance(state, JobState::Transcribed);

        Ok((source_id, transcript))
    }
}

fn advance(state: &mut JobState, next: JobState) {
    tracing::debug!(from = %state, to = %next, "Job state transition");
    *state = next;
}

#[derive(Debug, thiserror::Error)]
enum StageFailure {
    #[error(transparent)]
    Stage(#[from] PipelineError),

    #[error("{0}")]
    Panic(String),
}
