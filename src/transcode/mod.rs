//! Audio extraction.
//!
//! The ffmpeg strategy normalises whatever was downloaded into a small mp3.
//! Transcoding is an optimisation rather than a requirement, so two failure
//! modes fall back to submitting the downloaded file unchanged:
//!
//! * ffmpeg is not installed
//! * ffmpeg fails on a file that already carries an audio extension
//!
//! Anything else that ffmpeg rejects is a hard `PipelineError::Transcode`.

use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;

use crate::config::TranscodeConfig;
use crate::PipelineError;

/// Extensions the transcription service accepts without conversion
pub const PASSTHROUGH_EXTENSIONS: &[&str] = &["mp3", "wav", "m4a", "flac"];

/// Converts a staged media file into audio the transcriber accepts
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transcode: Send + Sync {
    /// Returns the path of the audio to transcribe, which may be `input` itself
    async fn transcode(&self, input: &Path) -> Result<PathBuf, PipelineError>;
}

/// Pick the transcoding strategy for this configuration
pub fn transcoder_from_config(config: &TranscodeConfig) -> Arc<dyn Transcode> {
    if config.enabled {
        Arc::new(FfmpegTranscoder::new(config))
    } else {
        tracing::info!("Transcoding disabled, downloaded files are submitted as-is");
        Arc::new(PassthroughTranscoder)
    }
}

/// Extracts the audio track with ffmpeg
pub struct FfmpegTranscoder {
    ffmpeg_path: String,
    bitrate: String,
    sample_rate: u32,
    timeout: Duration,
}

impl FfmpegTranscoder {
    pub fn new(config: &TranscodeConfig) -> Self {
        Self {
            ffmpeg_path: config.ffmpeg_path.clone(),
            bitrate: config.bitrate.clone(),
            sample_rate: config.sample_rate,
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    fn command(&self, input: &Path, output: &Path) -> Command {
        let sample_rate = self.sample_rate.to_string();
        let mut command = Command::new(&self.ffmpeg_path);
        command
            .arg("-hide_banner")
            .arg("-i")
            .arg(input)
            .args([
                "-vn", // No video
                "-acodec", "mp3",
                "-ab", self.bitrate.as_str(),
                "-ar", sample_rate.as_str(),
                "-y", // Overwrite output file
            ])
            .arg(output)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        command
    }
}

#[async_trait]
impl Transcode for FfmpegTranscoder {
    async fn transcode(&self, input: &Path) -> Result<PathBuf, PipelineError> {
        let output_path = audio_output_path(input);
        tracing::debug!("Converting {} to MP3", input.display());

        let run = tokio::time::timeout(self.timeout, self.command(input, &output_path).output()).await;

        let output = match run {
            Err(_) => {
                discard_partial_output(&output_path).await;
                return Err(PipelineError::Transcode(format!(
                    "{} timed out after {}s",
                    self.ffmpeg_path,
                    self.timeout.as_secs()
                )));
            }
            Ok(Err(e)) if e.kind() == ErrorKind::NotFound => {
                tracing::warn!(
                    ffmpeg = %self.ffmpeg_path,
                    "ffmpeg not found, submitting downloaded file as audio"
                );
                return Ok(input.to_path_buf());
            }
            Ok(Err(e)) => {
                return Err(PipelineError::Transcode(format!(
                    "could not run {}: {}",
                    self.ffmpeg_path, e
                )));
            }
            Ok(Ok(output)) => output,
        };

        if output.status.success() {
            return Ok(output_path);
        }

        discard_partial_output(&output_path).await;

        if is_passthrough_audio(input) {
            tracing::warn!(
                status = %output.status,
                input = %input.display(),
                "ffmpeg failed on an audio file, submitting it unchanged"
            );
            return Ok(input.to_path_buf());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        let diagnostic = stderr.trim();
        Err(PipelineError::Transcode(if diagnostic.is_empty() {
            format!("{} exited with {}", self.ffmpeg_path, output.status)
        } else {
            diagnostic.to_string()
        }))
    }
}

/// Submits files unchanged
pub struct PassthroughTranscoder;

#[async_trait]
impl Transcode for PassthroughTranscoder {
    async fn transcode(&self, input: &Path) -> Result<PathBuf, PipelineError> {
        Ok(input.to_path_buf())
    }
}

/// Sibling path the ffmpeg output is written to
pub fn audio_output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("input");
    input.with_file_name(format!("{}_audio.mp3", stem))
}

/// True when the extension says the file is already acceptable audio
pub fn is_passthrough_audio(path: &Path) -> bool {
    crate::utils::extension_lowercase(path)
        .map(|ext| PASSTHROUGH_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false)
}

async fn discard_partial_output(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        if e.kind() != ErrorKind::NotFound {
            tracing::debug!(error = %e, path = %path.display(), "Could not remove partial ffmpeg output");
        }
    }
}
