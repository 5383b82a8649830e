//! Webhook notifier.
//!
//! Forwards an update payload, unchanged, to the configured webhook. Like the store
//! adapter it fails soft: callers get `true` for a 2xx answer and `false` otherwise.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tracing::{error, info, warn};

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Webhook responded with status {0}")]
    Status(u16),

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

#[async_trait]
pub trait Notifier: Send + Sync + 'static {
    async fn notify(&self, payload: &Value) -> bool;
}

pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), url)
    }

    pub fn with_client(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self { client, url: url.into() }
    }

    async fn send(&self, payload: &Value) -> Result<(), NotifyError> {
        let response = self.client.post(&self.url).json(payload).send().await?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(NotifyError::Status(status.as_u16()))
        }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, payload: &Value) -> bool {
        let id_op = payload.get("idOp").cloned().unwrap_or(Value::Null);
        match self.send(payload).await {
            Ok(()) => {
                info!("Webhook notified (idOp={})", id_op);
                true
            }
            Err(NotifyError::Status(status)) => {
                warn!("Webhook rejected notification (idOp={}): status {}", id_op, status);
                false
            }
            Err(e) => {
                error!("Webhook notification failed (idOp={}): {}", id_op, e);
                false
            }
        }
    }
}
