use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::Client;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;

use crate::PipelineError;

/// Retrieves a remote file into a local staging path
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Fetch: Send + Sync {
    /// Download `url` into `destination`, replacing any existing file
    async fn fetch(&self, url: &str, destination: &Path) -> Result<PathBuf, PipelineError>;
}

/// Streaming HTTP downloader
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Create a fetcher whose downloads are abandoned after `timeout`
    pub fn new(timeout: Duration) -> Result<Self, PipelineError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("vidscribe/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| PipelineError::Fetch(format!("could not build HTTP client: {}", e)))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Fetch for HttpFetcher {
    async fn fetch(&self, url: &str, destination: &Path) -> Result<PathBuf, PipelineError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| PipelineError::Fetch(describe_request_error(&e)))?;

        if !response.status().is_success() {
            return Err(PipelineError::Fetch(format!("HTTP {}", response.status())));
        }

        let mut file = tokio::fs::File::create(destination).await.map_err(|e| {
            PipelineError::Fetch(format!("cannot create {}: {}", destination.display(), e))
        })?;

        let mut downloaded = 0u64;
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| PipelineError::Fetch(describe_request_error(&e)))?;
            file.write_all(&chunk)
                .await
                .map_err(|e| PipelineError::Fetch(format!("write failed: {}", e)))?;
            downloaded += chunk.len() as u64;
        }

        file.flush()
            .await
            .map_err(|e| PipelineError::Fetch(format!("write failed: {}", e)))?;

        tracing::debug!(
            bytes = downloaded,
            size = %crate::utils::format_file_size(downloaded),
            path = %destination.display(),
            "Download complete"
        );

        Ok(destination.to_path_buf())
    }
}

fn describe_request_error(error: &reqwest::Error) -> String {
    if error.is_timeout() {
        format!("request timed out: {}", error)
    } else {
        error.to_string()
    }
}
