use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::clock::Clock;
use super::cooldown::OutreachCooldown;
use super::failover::{FailoverController, OutreachAttempt, OutreachTarget};
use super::messaging::Messenger;
use super::templates::{donation_request, DEFAULT_URGENCY, MAX_URGENCY};
use crate::workflows::matching::{BloodRequest, MatchingEngine, MatchingError, DEFAULT_TOP_N};
use crate::workflows::registry::domain::{BloodGroup, Coordinates, DonorId};
use crate::workflows::validation::ValidationError;

#[derive(Debug, Clone, PartialEq)]
pub struct OutreachSettings {
    pub top_n: usize,
    pub attempt_timeout: Duration,
    pub cooldown: chrono::Duration,
}

impl Default for OutreachSettings {
    fn default() -> Self {
        Self {
            top_n: DEFAULT_TOP_N,
            attempt_timeout: super::failover::DEFAULT_ATTEMPT_TIMEOUT,
            cooldown: chrono::Duration::minutes(super::cooldown::DEFAULT_COOLDOWN_MINUTES),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutreachRequest {
    pub blood_group: BloodGroup,
    pub location: Coordinates,
    pub urgency_level: u8,
    pub note: Option<String>,
}

impl OutreachRequest {
    pub fn new(blood_group: BloodGroup, location: Coordinates) -> Self {
        Self {
            blood_group,
            location,
            urgency_level: DEFAULT_URGENCY,
            note: None,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if !(1..=MAX_URGENCY).contains(&self.urgency_level) {
            return Err(ValidationError::InvalidValue {
                field: "urgency_level",
                reason: format!("{} is outside 1-{MAX_URGENCY}", self.urgency_level),
            });
        }
        Ok(())
    }
}

/// How an outreach episode ended, with the attempt log where one exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OutreachOutcome {
    Contacted {
        donor_id: DonorId,
        donor_name: String,
        rank: usize,
        attempts: Vec<OutreachAttempt>,
    },
    Exhausted {
        attempts: Vec<OutreachAttempt>,
    },
    NoEligibleDonors {
        message: String,
    },
    Throttled {
        retry_after_secs: i64,
    },
}

impl OutreachOutcome {
    pub fn attempts(&self) -> &[OutreachAttempt] {
        match self {
            Self::Contacted { attempts, .. } | Self::Exhausted { attempts } => attempts,
            Self::NoEligibleDonors { .. } | Self::Throttled { .. } => &[],
        }
    }

    pub fn is_contacted(&self) -> bool {
        matches!(self, Self::Contacted { .. })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum OutreachError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Matching(#[from] MatchingError),
}

/// Ranks donors for a blood request and works down the list until one accepts.
pub struct OutreachService {
    engine: Arc<MatchingEngine>,
    failover: FailoverController,
    cooldown: OutreachCooldown<BloodGroup>,
    clock: Arc<dyn Clock>,
    top_n: usize,
}

impl OutreachService {
    pub fn new(
        engine: Arc<MatchingEngine>,
        messenger: Arc<dyn Messenger>,
        clock: Arc<dyn Clock>,
        settings: OutreachSettings,
    ) -> Self {
        Self {
            engine,
            failover: FailoverController::new(messenger, Arc::clone(&clock), settings.attempt_timeout),
            cooldown: OutreachCooldown::new(settings.cooldown),
            clock,
            top_n: settings.top_n,
        }
    }

    pub async fn initiate(&self, request: OutreachRequest) -> Result<OutreachOutcome, OutreachError> {
        request.validate()?;

        let now = self.clock.now();
        if let Err(remaining) = self.cooldown.try_acquire(&request.blood_group, now) {
            warn!(
                blood_group = %request.blood_group,
                retry_after_secs = remaining.num_seconds(),
                "outreach suppressed by cooldown"
            );
            return Ok(OutreachOutcome::Throttled {
                retry_after_secs: remaining.num_seconds(),
            });
        }

        // A ranking failure contacted nobody, so it must not hold the group's window.
        let ranked = match self.engine.blood_donors(&BloodRequest {
            blood_group: request.blood_group,
            location: request.location,
            request_date: now.date_naive(),
            top_n: self.top_n,
        }) {
            Ok(ranked) => ranked,
            Err(err) => {
                self.cooldown.release(&request.blood_group, now);
                return Err(err.into());
            }
        };

        if ranked.is_empty() {
            info!(blood_group = %request.blood_group, "no eligible donors for outreach");
            return Ok(OutreachOutcome::NoEligibleDonors {
                message: format!("No eligible {} blood donors found.", request.blood_group),
            });
        }

        let targets = ranked
            .iter()
            .enumerate()
            .map(|(index, candidate)| OutreachTarget {
                rank: index + 1,
                candidate_id: candidate.donor.donor_id.0.clone(),
                name: candidate.donor.name.clone(),
                channel: candidate.donor.contact_number.clone(),
            })
            .collect::<Vec<_>>();

        let episode = self
            .failover
            .run(&targets, |target| {
                donation_request(
                    request.blood_group,
                    &DonorId(target.candidate_id.clone()),
                    request.urgency_level,
                    request.note.as_deref(),
                )
            })
            .await;

        let contacted = episode
            .contacted()
            .and_then(|attempt| targets.iter().find(|target| target.rank == attempt.rank));

        Ok(match contacted {
            Some(target) => OutreachOutcome::Contacted {
                donor_id: DonorId(target.candidate_id.clone()),
                donor_name: target.name.clone(),
                rank: target.rank,
                attempts: episode.attempts,
            },
            None => {
                warn!(
                    blood_group = %request.blood_group,
                    attempts = episode.attempts.len(),
                    "all ranked donors failed"
                );
                OutreachOutcome::Exhausted {
                    attempts: episode.attempts,
                }
            }
        })
    }
}
