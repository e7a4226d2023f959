//! Donor and organ records: typed domain, dataset stores and the donation recorder.

pub mod csv_store;
pub mod domain;
pub mod memory;
pub mod recorder;
pub mod repository;
pub mod router;

#[cfg(test)]
mod tests;

pub use csv_store::{CsvDonorRepository, CsvHospitalDirectory, CsvOrganOfferRepository};
pub use domain::{
    BloodGroup, Coordinates, DonorCategory, DonorId, DonorRecord, Hospital, OrganOfferRecord,
    OrganType, UnknownBloodGroup,
};
pub use memory::{InMemoryDonorRepository, InMemoryOrganOfferRepository, StaticHospitalDirectory};
pub use recorder::{ConfirmationError, ConfirmationOutcome, DonationConfirmation, DonationRecorder};
pub use repository::{DonorRepository, HospitalDirectory, OrganOfferRepository, RepositoryError};
pub use router::registry_router;
