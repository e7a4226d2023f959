use std::sync::{Arc, RwLock};

use super::domain::{DonorId, DonorRecord, Hospital, OrganOfferRecord};
use super::repository::{DonorRepository, HospitalDirectory, OrganOfferRepository, RepositoryError};

fn poisoned<E>(_: E) -> RepositoryError {
    RepositoryError::Unavailable("store lock poisoned".to_string())
}

/// Vector-backed donor store that keeps insertion order.
#[derive(Debug, Default, Clone)]
pub struct InMemoryDonorRepository {
    records: Arc<RwLock<Vec<DonorRecord>>>,
}

impl InMemoryDonorRepository {
    pub fn new(records: Vec<DonorRecord>) -> Self {
        Self {
            records: Arc::new(RwLock::new(records)),
        }
    }
}

impl DonorRepository for InMemoryDonorRepository {
    fn all(&self) -> Result<Vec<DonorRecord>, RepositoryError> {
        Ok(self.records.read().map_err(poisoned)?.clone())
    }

    fn fetch(&self, id: &DonorId) -> Result<Option<DonorRecord>, RepositoryError> {
        let guard = self.records.read().map_err(poisoned)?;
        Ok(guard.iter().find(|record| &record.donor_id == id).cloned())
    }

    fn update(&self, record: DonorRecord) -> Result<(), RepositoryError> {
        let mut guard = self.records.write().map_err(poisoned)?;
        match guard
            .iter_mut()
            .find(|existing| existing.donor_id == record.donor_id)
        {
            Some(slot) => {
                *slot = record;
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct InMemoryOrganOfferRepository {
    offers: Arc<RwLock<Vec<OrganOfferRecord>>>,
}

impl InMemoryOrganOfferRepository {
    pub fn new(offers: Vec<OrganOfferRecord>) -> Self {
        Self {
            offers: Arc::new(RwLock::new(offers)),
        }
    }

    /// Swap the offer pool, as a dataset refresh would.
    pub fn replace(&self, offers: Vec<OrganOfferRecord>) -> Result<(), RepositoryError> {
        *self.offers.write().map_err(poisoned)? = offers;
        Ok(())
    }
}

impl OrganOfferRepository for InMemoryOrganOfferRepository {
    fn all(&self) -> Result<Vec<OrganOfferRecord>, RepositoryError> {
        Ok(self.offers.read().map_err(poisoned)?.clone())
    }
}

#[derive(Debug, Default, Clone)]
pub struct StaticHospitalDirectory {
    hospitals: Vec<Hospital>,
}

impl StaticHospitalDirectory {
    pub fn new(hospitals: Vec<Hospital>) -> Self {
        Self { hospitals }
    }
}

impl HospitalDirectory for StaticHospitalDirectory {
    fn hospitals(&self) -> Result<Vec<Hospital>, RepositoryError> {
        Ok(self.hospitals.clone())
    }
}
