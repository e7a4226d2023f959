use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use super::messaging::{MessageReceipt, MessagingError, Messenger};
use crate::config::MessagingConfig;

/// SMS delivery through a Twilio-compatible `Messages.json` endpoint.
///
/// Any 2xx answer counts as accepted; the provider's `sid` becomes the message id.
#[derive(Debug, Clone)]
pub struct TwilioMessenger {
    client: Client,
    endpoint: String,
    account_sid: String,
    auth_token: String,
    from_number: String,
}

#[derive(Debug, Deserialize)]
struct TwilioMessage {
    sid: Option<String>,
    status: Option<String>,
}

impl TwilioMessenger {
    pub fn new(config: &MessagingConfig) -> Self {
        let base = config.base_url.trim_end_matches('/');
        Self {
            client: Client::new(),
            endpoint: format!(
                "{base}/2010-04-01/Accounts/{}/Messages.json",
                config.account_sid
            ),
            account_sid: config.account_sid.clone(),
            auth_token: config.auth_token.clone(),
            from_number: config.from_number.clone(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

/// Builds the receipt for a 2xx answer. The message was handed off even when the
/// body does not decode, so that case is noted in `provider_status` only.
fn accepted_receipt(status: u16, body: &str) -> MessageReceipt {
    match serde_json::from_str::<TwilioMessage>(body) {
        Ok(message) => {
            debug!(sid = ?message.sid, "sms provider accepted message");
            MessageReceipt {
                accepted: true,
                message_id: message.sid,
                provider_status: message.status.or_else(|| Some(status.to_string())),
            }
        }
        Err(err) => {
            warn!(status, error = %err, "sms provider accepted message with an undecodable body");
            MessageReceipt {
                accepted: true,
                message_id: None,
                provider_status: Some(format!("http {status}; undecodable body: {err}")),
            }
        }
    }
}

#[async_trait]
impl Messenger for TwilioMessenger {
    async fn send(&self, to: &str, body: &str) -> Result<MessageReceipt, MessagingError> {
        let response = self
            .client
            .post(&self.endpoint)
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&[("From", self.from_number.as_str()), ("To", to), ("Body", body)])
            .send()
            .await
            .map_err(|err| MessagingError::Transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            warn!(%to, status = status.as_u16(), "sms provider rejected message");
            return Ok(MessageReceipt::rejected(format!(
                "http {}: {}",
                status.as_u16(),
                detail.trim()
            )));
        }

        let body = match response.text().await {
            Ok(body) => body,
            Err(err) => {
                warn!(%to, error = %err, "sms provider accepted message but body was unreadable");
                String::new()
            }
        };
        Ok(accepted_receipt(status.as_u16(), &body))
    }
}
