use async_trait::async_trait;
use std::fmt;
use std::path::Path;

use crate::PipelineError;

pub mod whisper;

pub use whisper::WhisperTranscriber;

/// Per-job credential for the speech-to-text service.
///
/// Formatting never reveals the key; it is only readable through
/// [`ApiKey::expose`] at the point of the outgoing request.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

impl fmt::Display for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("***")
    }
}

/// Turns an audio file into text
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transcribe: Send + Sync {
    async fn transcribe(&self, audio: &Path, api_key: &ApiKey) -> Result<String, PipelineError>;
}
