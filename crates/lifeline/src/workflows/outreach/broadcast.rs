use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tracing::{debug, error};

use super::clock::Clock;
use super::failover::{deliver, AttemptOutcome, OutreachAttempt, OutreachTarget};
use super::messaging::Messenger;

pub const DEFAULT_BROADCAST_CONCURRENCY: usize = 5;

/// Fans one message out to every recipient through a bounded pool of tasks.
#[derive(Clone)]
pub struct BroadcastDispatcher {
    messenger: Arc<dyn Messenger>,
    clock: Arc<dyn Clock>,
    permits: Arc<Semaphore>,
    attempt_timeout: Duration,
}

impl BroadcastDispatcher {
    pub fn new(
        messenger: Arc<dyn Messenger>,
        clock: Arc<dyn Clock>,
        max_concurrency: usize,
        attempt_timeout: Duration,
    ) -> Self {
        Self {
            messenger,
            clock,
            permits: Arc::new(Semaphore::new(max_concurrency.max(1))),
            attempt_timeout,
        }
    }

    /// Returns exactly one attempt per recipient, in recipient order.
    pub async fn dispatch(&self, recipients: Vec<OutreachTarget>, body: &str) -> Vec<OutreachAttempt> {
        let body: Arc<str> = Arc::from(body);
        let handles = recipients
            .into_iter()
            .map(|target| {
                let messenger = Arc::clone(&self.messenger);
                let clock = Arc::clone(&self.clock);
                let permits = Arc::clone(&self.permits);
                let body = Arc::clone(&body);
                let timeout = self.attempt_timeout;
                let fallback = target.clone();
                let handle = tokio::spawn(async move {
                    // Held until the send finishes; the semaphore is never closed.
                    let _permit = permits.acquire_owned().await.ok();
                    deliver(messenger.as_ref(), timeout, &target, &body, clock.now()).await
                });
                (fallback, handle)
            })
            .collect::<Vec<_>>();

        let mut attempts = Vec::with_capacity(handles.len());
        for (target, handle) in handles {
            let attempt = match handle.await {
                Ok(attempt) => attempt,
                Err(err) => {
                    error!(candidate = %target.candidate_id, error = %err, "broadcast task failed");
                    OutreachAttempt {
                        rank: target.rank,
                        candidate_id: target.candidate_id,
                        channel: target.channel,
                        outcome: AttemptOutcome::Error,
                        detail: Some(format!("delivery task failed: {err}")),
                        provider_message_id: None,
                        attempted_at: self.clock.now(),
                    }
                }
            };
            attempts.push(attempt);
        }

        debug!(
            recipients = attempts.len(),
            delivered = attempts.iter().filter(|attempt| attempt.succeeded()).count(),
            "broadcast joined"
        );
        attempts
    }
}
