//! Emergency SOS: validated fan-out to personal contacts, the nearest hospital and
//! an autonomous donor search, with results kept for status lookups.

pub mod domain;
pub mod ledger;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use domain::{EmergencyContact, EmergencyNeed, SosRequest, UserLocation, MAX_EMERGENCY_CONTACTS};
pub use ledger::{SosLedger, SOS_LEDGER_CAPACITY};
pub use router::emergency_router;
pub use service::{AutonomousSearch, ContactAlerts, HospitalAlert, SosError, SosReport, SosService, SosStatus};
