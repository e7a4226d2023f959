use std::sync::Arc;
use std::time::Duration;

use crate::workflows::emergency::{EmergencyContact, SosRequest, SosService, UserLocation};
use crate::workflows::fixtures::{donor, engine, hospital, ScriptedMessenger};
use crate::workflows::outreach::ManualClock;
use crate::workflows::registry::domain::{BloodGroup, Hospital};
use crate::workflows::registry::memory::StaticHospitalDirectory;
use crate::workflows::registry::repository::{HospitalDirectory, RepositoryError};

pub(super) fn hospitals() -> Vec<Hospital> {
    vec![
        hospital("Far General", 0.5, "+912211111111"),
        hospital("Near Clinic", 0.02, "+912222222222"),
    ]
}

pub(super) fn build_service(
    messenger: Arc<ScriptedMessenger>,
    directory: Arc<dyn HospitalDirectory>,
    clock: Arc<ManualClock>,
) -> SosService {
    SosService::new(
        engine(
            vec![
                donor("101", BloodGroup::ONegative, 0.01),
                donor("102", BloodGroup::ONegative, 0.04),
            ],
            Vec::new(),
        ),
        directory,
        messenger,
        clock,
        5,
        Duration::from_millis(200),
    )
}

pub(super) fn directory() -> Arc<dyn HospitalDirectory> {
    Arc::new(StaticHospitalDirectory::new(hospitals()))
}

pub(super) struct UnavailableDirectory;

impl HospitalDirectory for UnavailableDirectory {
    fn hospitals(&self) -> Result<Vec<Hospital>, RepositoryError> {
        Err(RepositoryError::Unavailable("directory offline".to_string()))
    }
}

pub(super) fn blood_sos(group: &str, contacts: &[&str]) -> SosRequest {
    SosRequest {
        user_id: Some("u-7".to_string()),
        user_name: Some("Asha".to_string()),
        emergency_type: Some("blood".to_string()),
        blood_group: Some(group.to_string()),
        organ_type: None,
        user_location: Some(UserLocation {
            latitude: 19.0760,
            longitude: 72.8777,
            address: Some("Dadar East".to_string()),
        }),
        emergency_contacts: contacts
            .iter()
            .map(|phone| EmergencyContact {
                name: None,
                phone_number: (*phone).to_string(),
            })
            .collect(),
    }
}
