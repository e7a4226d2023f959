use serde::{Deserialize, Serialize};

use crate::workflows::registry::domain::{BloodGroup, DonorId};

pub const DEFAULT_URGENCY: u8 = 5;
pub const MAX_URGENCY: u8 = 10;

const OPT_OUT: &str = "Reply STOP to opt out.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UrgencyTier {
    Standard,
    Urgent,
    Critical,
}

impl UrgencyTier {
    pub fn from_level(level: u8) -> Self {
        match level {
            8.. => Self::Critical,
            6..=7 => Self::Urgent,
            _ => Self::Standard,
        }
    }
}

/// Donation request text for one donor.
pub fn donation_request(
    blood_group: BloodGroup,
    donor_id: &DonorId,
    urgency_level: u8,
    note: Option<&str>,
) -> String {
    let mut body = match UrgencyTier::from_level(urgency_level) {
        UrgencyTier::Critical => format!(
            "CRITICAL: {blood_group} blood is needed immediately. Donor {donor_id}, \
             please reply YES if you can donate within the next hour."
        ),
        UrgencyTier::Urgent => format!(
            "URGENT: {blood_group} blood is running low. Donor {donor_id}, \
             please reply YES if you can donate today."
        ),
        UrgencyTier::Standard => format!(
            "Hello donor {donor_id}, a patient needs {blood_group} blood. \
             Reply YES if you are available to donate."
        ),
    };

    if let Some(note) = note.map(str::trim).filter(|note| !note.is_empty()) {
        body.push(' ');
        body.push_str(note);
    }
    body.push(' ');
    body.push_str(OPT_OUT);
    body
}

/// Alert text for an SOS emergency contact.
pub fn sos_contact_alert(user_name: &str, need: &str, address: Option<&str>) -> String {
    let mut body = format!("MEDICAL EMERGENCY: {user_name} has an urgent medical situation and requires {need}.");
    if let Some(address) = address.map(str::trim).filter(|address| !address.is_empty()) {
        body.push_str(" Location: ");
        body.push_str(address);
        body.push('.');
    }
    body.push_str(" This is an automated alert. Please contact them immediately.");
    body
}

/// Alert text for the nearest hospital's emergency line.
pub fn hospital_alert(sos_id: &str, need: &str, distance_km: f64) -> String {
    format!(
        "SOS {sos_id}: patient requires {need}, approximately {distance_km:.1} km from your facility. \
         Please prepare to receive."
    )
}
