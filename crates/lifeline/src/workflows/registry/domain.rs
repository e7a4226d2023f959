use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identifier wrapper for donors in the registry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DonorId(pub String);

impl fmt::Display for DonorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Latitude/longitude pair in degrees. Ranges are not enforced.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum BloodGroup {
    OPositive,
    ONegative,
    APositive,
    ANegative,
    BPositive,
    BNegative,
    AbPositive,
    AbNegative,
}

impl BloodGroup {
    pub const fn ordered() -> [Self; 8] {
        [
            Self::OPositive,
            Self::ONegative,
            Self::APositive,
            Self::ANegative,
            Self::BPositive,
            Self::BNegative,
            Self::AbPositive,
            Self::AbNegative,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::OPositive => "O+",
            Self::ONegative => "O-",
            Self::APositive => "A+",
            Self::ANegative => "A-",
            Self::BPositive => "B+",
            Self::BNegative => "B-",
            Self::AbPositive => "AB+",
            Self::AbNegative => "AB-",
        }
    }
}

impl fmt::Display for BloodGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown blood group '{0}' (expected one of O+, O-, A+, A-, B+, B-, AB+, AB-)")]
pub struct UnknownBloodGroup(pub String);

impl FromStr for BloodGroup {
    type Err = UnknownBloodGroup;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let normalized = raw.trim().to_ascii_uppercase();
        Self::ordered()
            .into_iter()
            .find(|group| group.label() == normalized)
            .ok_or_else(|| UnknownBloodGroup(raw.to_string()))
    }
}

impl TryFrom<String> for BloodGroup {
    type Error = UnknownBloodGroup;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<BloodGroup> for String {
    fn from(value: BloodGroup) -> Self {
        value.label().to_string()
    }
}

/// Organ types with a known viability ceiling, plus any other organ named by a dataset.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum OrganType {
    Kidney,
    Heart,
    Liver,
    Lung,
    Other(String),
}

const DEFAULT_VIABILITY_HOURS: f64 = 12.0;

impl OrganType {
    /// Hours after availability at which an offer stops being viable.
    pub fn max_viability_hours(&self) -> f64 {
        match self {
            Self::Kidney => 12.0,
            Self::Heart => 4.0,
            Self::Liver => 10.0,
            Self::Lung => 6.0,
            Self::Other(_) => DEFAULT_VIABILITY_HOURS,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Self::Kidney => "Kidney",
            Self::Heart => "Heart",
            Self::Liver => "Liver",
            Self::Lung => "Lung",
            Self::Other(name) => name,
        }
    }
}

impl fmt::Display for OrganType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl From<String> for OrganType {
    fn from(value: String) -> Self {
        let trimmed = value.trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "kidney" => Self::Kidney,
            "heart" => Self::Heart,
            "liver" => Self::Liver,
            "lung" | "lungs" => Self::Lung,
            _ => Self::Other(trimmed.to_string()),
        }
    }
}

impl From<&str> for OrganType {
    fn from(value: &str) -> Self {
        Self::from(value.to_string())
    }
}

impl From<OrganType> for String {
    fn from(value: OrganType) -> Self {
        value.label().to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DonorCategory {
    Deceased,
    Living,
}

impl FromStr for DonorCategory {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "deceased" => Ok(Self::Deceased),
            "living" => Ok(Self::Living),
            other => Err(format!("unknown donor category '{other}'")),
        }
    }
}

/// Long-lived blood donor profile. History fields only grow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DonorRecord {
    pub donor_id: DonorId,
    pub name: String,
    pub blood_group: BloodGroup,
    pub location: Coordinates,
    pub contact_number: String,
    pub city: String,
    pub months_since_first_donation: u32,
    pub donation_count: u32,
    pub volume_donated: u32,
    pub last_donation: Option<NaiveDate>,
}

impl DonorRecord {
    /// Apply one confirmed donation. The last-donation date never moves backwards.
    pub fn record_donation(&mut self, volume: u32, donated_on: NaiveDate) {
        self.donation_count = self.donation_count.saturating_add(1);
        self.volume_donated = self.volume_donated.saturating_add(volume);
        self.last_donation = Some(match self.last_donation {
            Some(previous) if previous > donated_on => previous,
            _ => donated_on,
        });
    }
}

/// Organ made available by a donor, matched against transplant requests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrganOfferRecord {
    pub offer_id: String,
    pub name: String,
    pub organ: OrganType,
    pub donor_category: DonorCategory,
    pub location: Coordinates,
    pub contact_number: String,
    pub hla_match_score: f64,
    pub tissue_size_factor: f64,
    pub available_at: DateTime<Utc>,
}

/// Hospital reachable by the emergency workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hospital {
    pub name: String,
    pub location: Coordinates,
    pub emergency_contact_number: String,
}
