use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Provider answer to a send request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageReceipt {
    /// True when the provider queued or sent the message.
    pub accepted: bool,
    pub message_id: Option<String>,
    pub provider_status: Option<String>,
}

impl MessageReceipt {
    pub fn accepted(message_id: impl Into<String>) -> Self {
        Self {
            accepted: true,
            message_id: Some(message_id.into()),
            provider_status: Some("queued".to_string()),
        }
    }

    pub fn rejected(provider_status: impl Into<String>) -> Self {
        Self {
            accepted: false,
            message_id: None,
            provider_status: Some(provider_status.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MessagingError {
    #[error("messaging transport failed: {0}")]
    Transport(String),
}

/// Outbound SMS capability. Implementations may fail or hang; callers bound them.
#[async_trait]
pub trait Messenger: Send + Sync {
    async fn send(&self, to: &str, body: &str) -> Result<MessageReceipt, MessagingError>;
}

/// Messenger that logs instead of sending; every message is accepted.
#[derive(Debug, Default)]
pub struct DryRunMessenger {
    sequence: AtomicU64,
}

#[async_trait]
impl Messenger for DryRunMessenger {
    async fn send(&self, to: &str, body: &str) -> Result<MessageReceipt, MessagingError> {
        let id = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
        info!(%to, chars = body.chars().count(), "dry-run message accepted");
        Ok(MessageReceipt::accepted(format!("dry-{id:06}")))
    }
}
