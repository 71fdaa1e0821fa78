use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use crate::job::Outcome;

/// Delivers a job's outcome to the caller's webhook
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Notify: Send + Sync {
    /// Best-effort delivery; failures are logged, never returned
    async fn notify(&self, endpoint: &str, outcome: &Outcome);
}

#[derive(Debug, thiserror::Error)]
enum NotificationError {
    #[error("request: {0}")]
    Request(#[from] reqwest::Error),

    #[error("callback returned HTTP {0}")]
    Status(reqwest::StatusCode),
}

/// Posts outcomes as JSON, once, without retrying
pub struct WebhookNotifier {
    client: Client,
}

impl WebhookNotifier {
    pub fn new(timeout: Duration) -> Self {
        // Client::builder only fails when the TLS backend cannot initialise.
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self { client }
    }

    async fn deliver(&self, endpoint: &str, outcome: &Outcome) -> Result<reqwest::StatusCode, NotificationError> {
        let response = self.client.post(endpoint).json(outcome).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(NotificationError::Status(status));
        }
        Ok(status)
    }
}

#[async_trait]
impl Notify for WebhookNotifier {
    async fn notify(&self, endpoint: &str, outcome: &Outcome) {
        match self.deliver(endpoint, outcome).await {
            Ok(status) => {
                tracing::info!(
                    status = status.as_u16(),
                    outcome = outcome.status(),
                    row_id = %outcome.row_id(),
                    "Webhook sent successfully"
                );
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    endpoint = %endpoint,
                    row_id = %outcome.row_id(),
                    "Webhook delivery failed"
                );
            }
        }
    }
}
