use async_trait::async_trait;
use reqwest::multipart;
use serde::Deserialize;
use std::path::Path;

use super::{ApiKey, Transcribe};
use crate::config::TranscriptionConfig;
use crate::utils::format_file_size;
use crate::PipelineError;

/// OpenAI Whisper `audio/transcriptions` client
pub struct WhisperTranscriber {
    client: reqwest::Client,
    base_url: String,
    model: String,
    max_file_size: u64,
}

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    text: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

impl WhisperTranscriber {
    pub fn new(config: &TranscriptionConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            max_file_size: config.max_file_size_bytes,
        }
    }

    async fn check_size(&self, audio: &Path) -> Result<u64, PipelineError> {
        let size = tokio::fs::metadata(audio)
            .await
            .map_err(|e| {
                PipelineError::Transcription(format!("cannot read {}: {}", audio.display(), e))
            })?
            .len();

        if size >= self.max_file_size {
            return Err(PipelineError::Transcription(format!(
                "Audio file is {}, which exceeds the {} limit of the transcription service",
                format_file_size(size),
                format_file_size(self.max_file_size)
            )));
        }

        Ok(size)
    }
}

#[async_trait]
impl Transcribe for WhisperTranscriber {
    async fn transcribe(&self, audio: &Path, api_key: &ApiKey) -> Result<String, PipelineError> {
        let size = self.check_size(audio).await?;

        let data = tokio::fs::read(audio).await.map_err(|e| {
            PipelineError::Transcription(format!("cannot read {}: {}", audio.display(), e))
        })?;

        let file_name = audio
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("audio.mp3")
            .to_string();

        let file_part = multipart::Part::bytes(data)
            .file_name(file_name)
            .mime_str(mime_type(audio))
            .map_err(|e| PipelineError::Transcription(format!("mime: {}", e)))?;

        let form = multipart::Form::new()
            .text("model", self.model.clone())
            .text("response_format", "json")
            .part("file", file_part);

        tracing::debug!(model = %self.model, bytes = size, "Sending audio to Whisper API");

        let response = self
            .client
            .post(format!("{}/audio/transcriptions", self.base_url))
            .bearer_auth(api_key.expose())
            .multipart(form)
            .send()
            .await
            .map_err(|e| PipelineError::Transcription(format!("request: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            let message = serde_json::from_str::<ApiErrorResponse>(&body)
                .map(|parsed| parsed.error.message)
                .unwrap_or(body);
            return Err(PipelineError::Transcription(format!(
                "status {}: {}",
                status, message
            )));
        }

        let parsed: TranscriptionResponse = response
            .json()
            .await
            .map_err(|e| PipelineError::Transcription(format!("body: {}", e)))?;

        tracing::info!(chars = parsed.text.len(), "Whisper transcription completed");

        Ok(parsed.text)
    }
}

fn mime_type(path: &Path) -> &'static str {
    match crate::utils::extension_lowercase(path).as_deref() {
        Some("mp3") => "audio/mpeg",
        Some("m4a") => "audio/mp4",
        Some("wav") => "audio/wav",
        Some("flac") => "audio/flac",
        Some("mp4") => "video/mp4",
        _ => "application/octet-stream",
    }
}
