use serde::{Deserialize, Serialize};

use crate::workflows::registry::domain::{BloodGroup, Coordinates, OrganType};
use crate::workflows::validation::{parse_blood_group, require, ValidationError};

pub const MAX_EMERGENCY_CONTACTS: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmergencyContact {
    #[serde(default)]
    pub name: Option<String>,
    pub phone_number: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserLocation {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub address: Option<String>,
}

/// Raw SOS submission as received from a client.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SosRequest {
    pub user_id: Option<String>,
    #[serde(default)]
    pub user_name: Option<String>,
    pub emergency_type: Option<String>,
    #[serde(default)]
    pub blood_group: Option<String>,
    #[serde(default)]
    pub organ_type: Option<String>,
    pub user_location: Option<UserLocation>,
    #[serde(default)]
    pub emergency_contacts: Vec<EmergencyContact>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "emergency_type", rename_all = "snake_case")]
pub enum EmergencyNeed {
    Blood { blood_group: BloodGroup },
    Organ { organ_type: OrganType },
}

impl EmergencyNeed {
    pub fn describe(&self) -> String {
        match self {
            Self::Blood { blood_group } => format!("{blood_group} blood"),
            Self::Organ { organ_type } => format!("a {organ_type} transplant"),
        }
    }
}

/// SOS request that passed validation; nothing is sent before this exists.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedSos {
    pub user_id: String,
    pub user_name: String,
    pub need: EmergencyNeed,
    pub location: Coordinates,
    pub address: Option<String>,
    pub contacts: Vec<EmergencyContact>,
}

impl SosRequest {
    pub fn validate(self) -> Result<ValidatedSos, ValidationError> {
        let user_id = require("user_id", self.user_id.as_deref())?.to_string();

        let need = match require("emergency_type", self.emergency_type.as_deref())?
            .to_ascii_lowercase()
            .as_str()
        {
            "blood" => EmergencyNeed::Blood {
                blood_group: parse_blood_group(self.blood_group.as_deref())?,
            },
            "organ" => EmergencyNeed::Organ {
                organ_type: OrganType::from(require("organ_type", self.organ_type.as_deref())?),
            },
            other => {
                return Err(ValidationError::InvalidValue {
                    field: "emergency_type",
                    reason: format!("'{other}' must be 'blood' or 'organ'"),
                })
            }
        };

        let location = self
            .user_location
            .ok_or(ValidationError::MissingField("user_location"))?;
        if !location.latitude.is_finite() || !location.longitude.is_finite() {
            return Err(ValidationError::InvalidValue {
                field: "user_location",
                reason: "coordinates must be finite numbers".to_string(),
            });
        }

        if self.emergency_contacts.is_empty() {
            return Err(ValidationError::MissingField("emergency_contacts"));
        }
        if self.emergency_contacts.len() > MAX_EMERGENCY_CONTACTS {
            return Err(ValidationError::TooManyContacts {
                max: MAX_EMERGENCY_CONTACTS,
                received: self.emergency_contacts.len(),
            });
        }
        if self
            .emergency_contacts
            .iter()
            .any(|contact| contact.phone_number.trim().is_empty())
        {
            return Err(ValidationError::InvalidValue {
                field: "emergency_contacts",
                reason: "every contact needs a phone_number".to_string(),
            });
        }

        Ok(ValidatedSos {
            user_id,
            user_name: self
                .user_name
                .filter(|name| !name.trim().is_empty())
                .unwrap_or_else(|| "Someone".to_string()),
            need,
            location: Coordinates::new(location.latitude, location.longitude),
            address: location.address,
            contacts: self.emergency_contacts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contact(phone: &str) -> EmergencyContact {
        EmergencyContact {
            name: None,
            phone_number: phone.to_string(),
        }
    }

    fn blood_request(contacts: usize) -> SosRequest {
        SosRequest {
            user_id: Some("u-42".to_string()),
            user_name: None,
            emergency_type: Some("blood".to_string()),
            blood_group: Some("O-".to_string()),
            organ_type: None,
            user_location: Some(UserLocation {
                latitude: 19.07,
                longitude: 72.87,
                address: Some("Dadar".to_string()),
            }),
            emergency_contacts: (0..contacts).map(|i| contact(&format!("+9198{i}"))).collect(),
        }
    }

    #[test]
    fn valid_blood_request_defaults_user_name() {
        let sos = blood_request(2).validate().expect("valid");
        assert_eq!(sos.user_name, "Someone");
        assert_eq!(
            sos.need,
            EmergencyNeed::Blood {
                blood_group: BloodGroup::ONegative
            }
        );
        assert_eq!(sos.contacts.len(), 2);
    }

    #[test]
    fn six_contacts_are_rejected() {
        assert_eq!(
            blood_request(6).validate(),
            Err(ValidationError::TooManyContacts {
                max: 5,
                received: 6
            })
        );
        assert!(blood_request(5).validate().is_ok());
    }

    #[test]
    fn zero_contacts_are_rejected() {
        assert_eq!(
            blood_request(0).validate(),
            Err(ValidationError::MissingField("emergency_contacts"))
        );
    }

    #[test]
    fn unknown_emergency_type_is_rejected() {
        let mut request = blood_request(1);
        request.emergency_type = Some("fire".to_string());
        assert!(matches!(
            request.validate(),
            Err(ValidationError::InvalidValue {
                field: "emergency_type",
                ..
            })
        ));
    }

    #[test]
    fn organ_request_needs_organ_type() {
        let mut request = blood_request(1);
        request.emergency_type = Some("organ".to_string());
        assert_eq!(
            request.clone().validate(),
            Err(ValidationError::MissingField("organ_type"))
        );

        request.organ_type = Some("kidney".to_string());
        let sos = request.validate().expect("valid organ request");
        assert_eq!(sos.need.describe(), "a Kidney transplant");
    }

    #[test]
    fn missing_location_is_rejected() {
        let mut request = blood_request(1);
        request.user_location = None;
        assert_eq!(
            request.validate(),
            Err(ValidationError::MissingField("user_location"))
        );
    }
}
