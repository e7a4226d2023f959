use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::domain::{DonorId, DonorRecord};
use super::repository::{DonorRepository, RepositoryError};
use crate::workflows::outreach::clock::Clock;
use crate::workflows::validation::ValidationError;

/// Confirmation that a donor completed a donation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DonationConfirmation {
    pub donor_id: DonorId,
    pub volume: u32,
    /// Caller-supplied key for the physical donation; repeats are applied once.
    #[serde(default)]
    pub confirmation_id: Option<String>,
}

impl DonationConfirmation {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.donor_id.0.trim().is_empty() {
            return Err(ValidationError::MissingField("donor_id"));
        }
        if self.volume == 0 {
            return Err(ValidationError::InvalidValue {
                field: "volume",
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConfirmationOutcome {
    Recorded(DonorRecord),
    AlreadyApplied(DonorRecord),
    NotFound(DonorId),
}

#[derive(Debug, thiserror::Error)]
pub enum ConfirmationError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Confirmation keys remembered for duplicate suppression. The oldest are
/// forgotten first once the limit is reached.
pub const APPLIED_KEY_CAPACITY: usize = 10_000;

type AppliedKey = (DonorId, String);

#[derive(Debug)]
struct AppliedKeys {
    capacity: usize,
    seen: HashSet<AppliedKey>,
    order: VecDeque<AppliedKey>,
}

impl AppliedKeys {
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            seen: HashSet::new(),
            order: VecDeque::new(),
        }
    }

    fn contains(&self, key: &AppliedKey) -> bool {
        self.seen.contains(key)
    }

    fn insert(&mut self, key: AppliedKey) {
        if self.capacity == 0 || self.seen.contains(&key) {
            return;
        }
        while self.order.len() >= self.capacity {
            match self.order.pop_front() {
                Some(oldest) => {
                    self.seen.remove(&oldest);
                }
                None => break,
            }
        }
        self.seen.insert(key.clone());
        self.order.push_back(key);
    }
}

/// Applies confirmed donations with a read-modify-write serialized per donor.
///
/// Per-donor locks live only while a confirmation for that donor is in flight.
pub struct DonationRecorder {
    repository: Arc<dyn DonorRepository>,
    clock: Arc<dyn Clock>,
    locks: Mutex<HashMap<DonorId, Arc<Mutex<()>>>>,
    applied: Mutex<AppliedKeys>,
}

impl DonationRecorder {
    pub fn new(repository: Arc<dyn DonorRepository>, clock: Arc<dyn Clock>) -> Self {
        Self {
            repository,
            clock,
            locks: Mutex::new(HashMap::new()),
            applied: Mutex::new(AppliedKeys::new(APPLIED_KEY_CAPACITY)),
        }
    }

    /// Overrides how many confirmation keys are remembered.
    pub fn with_applied_capacity(mut self, capacity: usize) -> Self {
        self.applied = Mutex::new(AppliedKeys::new(capacity));
        self
    }

    fn donor_lock(&self, id: &DonorId) -> Result<Arc<Mutex<()>>, RepositoryError> {
        let mut table = self
            .locks
            .lock()
            .map_err(|_| RepositoryError::Unavailable("lock table poisoned".to_string()))?;
        Ok(table.entry(id.clone()).or_default().clone())
    }

    /// Drops the table entry for `id` once no other confirmation holds it.
    fn release_lock(&self, id: &DonorId, lock: Arc<Mutex<()>>) {
        drop(lock);
        let mut table = self
            .locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if table
            .get(id)
            .is_some_and(|entry| Arc::strong_count(entry) == 1)
        {
            table.remove(id);
        }
    }

    #[cfg(test)]
    pub(crate) fn tracked_locks(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn confirm(
        &self,
        confirmation: DonationConfirmation,
    ) -> Result<ConfirmationOutcome, ConfirmationError> {
        confirmation.validate()?;
        let DonationConfirmation {
            donor_id,
            volume,
            confirmation_id,
        } = confirmation;

        let lock = self.donor_lock(&donor_id)?;
        let outcome = match lock.lock() {
            Ok(_held) => self.apply(donor_id.clone(), volume, confirmation_id),
            Err(_) => Err(RepositoryError::Unavailable("donor lock poisoned".to_string()).into()),
        };
        self.release_lock(&donor_id, lock);
        outcome
    }

    fn apply(
        &self,
        donor_id: DonorId,
        volume: u32,
        confirmation_id: Option<String>,
    ) -> Result<ConfirmationOutcome, ConfirmationError> {
        let Some(mut record) = self.repository.fetch(&donor_id)? else {
            warn!(%donor_id, "donation confirmation for unknown donor");
            return Ok(ConfirmationOutcome::NotFound(donor_id));
        };

        let key = confirmation_id.map(|id| (donor_id.clone(), id));
        if let Some(key) = &key {
            let applied = self
                .applied
                .lock()
                .map_err(|_| RepositoryError::Unavailable("ledger poisoned".to_string()))?;
            if applied.contains(key) {
                info!(%donor_id, confirmation = %key.1, "duplicate donation confirmation ignored");
                return Ok(ConfirmationOutcome::AlreadyApplied(record));
            }
        }

        let donated_on = self.clock.now().date_naive();
        record.record_donation(volume, donated_on);
        self.repository.update(record.clone())?;

        if let Some(key) = key {
            if let Ok(mut applied) = self.applied.lock() {
                applied.insert(key);
            }
        }

        info!(
            %donor_id,
            donations = record.donation_count,
            volume = record.volume_donated,
            "donation recorded"
        );
        Ok(ConfirmationOutcome::Recorded(record))
    }
}
