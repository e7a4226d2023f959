use super::domain::{DonorId, DonorRecord, Hospital, OrganOfferRecord};

/// Storage abstraction for the blood donor pool.
///
/// `all` must preserve a stable order so that ranking ties resolve deterministically.
pub trait DonorRepository: Send + Sync {
    fn all(&self) -> Result<Vec<DonorRecord>, RepositoryError>;
    fn fetch(&self, id: &DonorId) -> Result<Option<DonorRecord>, RepositoryError>;
    fn update(&self, record: DonorRecord) -> Result<(), RepositoryError>;
}

/// Read-only source of organ offers; refreshed out of band.
pub trait OrganOfferRepository: Send + Sync {
    fn all(&self) -> Result<Vec<OrganOfferRecord>, RepositoryError>;
}

/// Hospitals the emergency workflow may alert.
pub trait HospitalDirectory: Send + Sync {
    fn hospitals(&self) -> Result<Vec<Hospital>, RepositoryError>;
}

/// Error enumeration for dataset store failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record not found")]
    NotFound,
    #[error("dataset unavailable: {0}")]
    Unavailable(String),
    #[error("dataset row {row} is malformed: {reason}")]
    Malformed { row: usize, reason: String },
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Csv(#[from] csv::Error),
}
