use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::clock::Clock;
use super::messaging::Messenger;

pub const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(10);

/// One ranked recipient of an outreach episode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutreachTarget {
    /// 1-based position in the ranking.
    pub rank: usize,
    pub candidate_id: String,
    pub name: String,
    /// Destination address, a phone number for SMS.
    pub channel: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptOutcome {
    Success,
    Failed,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutreachAttempt {
    pub rank: usize,
    pub candidate_id: String,
    pub channel: String,
    pub outcome: AttemptOutcome,
    pub detail: Option<String>,
    pub provider_message_id: Option<String>,
    pub attempted_at: DateTime<Utc>,
}

impl OutreachAttempt {
    pub fn succeeded(&self) -> bool {
        self.outcome == AttemptOutcome::Success
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum EpisodeState {
    Pending,
    Attempting { rank: usize },
    Succeeded { rank: usize },
    ExhaustedFailed,
}

/// Result of a sequential failover run. `attempts` is append-only and ordered by rank.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutreachEpisode {
    pub state: EpisodeState,
    pub attempts: Vec<OutreachAttempt>,
}

impl OutreachEpisode {
    fn new() -> Self {
        Self {
            state: EpisodeState::Pending,
            attempts: Vec::new(),
        }
    }

    /// The attempt that reached a candidate, if any.
    pub fn contacted(&self) -> Option<&OutreachAttempt> {
        match self.state {
            EpisodeState::Succeeded { rank } => {
                self.attempts.iter().find(|attempt| attempt.rank == rank)
            }
            _ => None,
        }
    }
}

/// Send one message with a deadline and classify the result. Never fails.
pub(crate) async fn deliver(
    messenger: &dyn Messenger,
    timeout: Duration,
    target: &OutreachTarget,
    body: &str,
    attempted_at: DateTime<Utc>,
) -> OutreachAttempt {
    let (outcome, detail, provider_message_id) =
        match tokio::time::timeout(timeout, messenger.send(&target.channel, body)).await {
            Ok(Ok(receipt)) if receipt.accepted => {
                (AttemptOutcome::Success, receipt.provider_status, receipt.message_id)
            }
            Ok(Ok(receipt)) => (
                AttemptOutcome::Failed,
                Some(
                    receipt
                        .provider_status
                        .unwrap_or_else(|| "message not accepted".to_string()),
                ),
                receipt.message_id,
            ),
            Ok(Err(err)) => (AttemptOutcome::Error, Some(err.to_string()), None),
            Err(_) => (
                AttemptOutcome::Error,
                Some(format!("timed out after {}s", timeout.as_secs_f64())),
                None,
            ),
        };

    OutreachAttempt {
        rank: target.rank,
        candidate_id: target.candidate_id.clone(),
        channel: target.channel.clone(),
        outcome,
        detail,
        provider_message_id,
        attempted_at,
    }
}

/// Contacts ranked candidates one at a time until the first accepted message.
pub struct FailoverController {
    messenger: Arc<dyn Messenger>,
    clock: Arc<dyn Clock>,
    attempt_timeout: Duration,
}

impl FailoverController {
    pub fn new(messenger: Arc<dyn Messenger>, clock: Arc<dyn Clock>, attempt_timeout: Duration) -> Self {
        Self {
            messenger,
            clock,
            attempt_timeout,
        }
    }

    pub async fn run<F>(&self, targets: &[OutreachTarget], mut body_for: F) -> OutreachEpisode
    where
        F: FnMut(&OutreachTarget) -> String,
    {
        let mut episode = OutreachEpisode::new();

        for target in targets {
            episode.state = EpisodeState::Attempting { rank: target.rank };
            let body = body_for(target);
            let attempt = deliver(
                self.messenger.as_ref(),
                self.attempt_timeout,
                target,
                &body,
                self.clock.now(),
            )
            .await;
            let succeeded = attempt.succeeded();

            if succeeded {
                info!(rank = target.rank, candidate = %target.candidate_id, "candidate contacted");
            } else {
                warn!(
                    rank = target.rank,
                    candidate = %target.candidate_id,
                    outcome = ?attempt.outcome,
                    detail = attempt.detail.as_deref().unwrap_or_default(),
                    "outreach attempt did not succeed, moving to next candidate"
                );
            }
            episode.attempts.push(attempt);

            if succeeded {
                episode.state = EpisodeState::Succeeded { rank: target.rank };
                return episode;
            }
        }

        episode.state = EpisodeState::ExhaustedFailed;
        episode
    }
}
