use serde::{Deserialize, Serialize};

use super::engine::{RankedDonor, RankedOrganMatch};

/// Public projection of a ranked blood donor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DonorMatchView {
    pub donor_id: String,
    pub name: String,
    pub blood_group: String,
    pub latitude: f64,
    pub longitude: f64,
    pub contact_number: String,
    pub city: String,
    pub distance_km: f64,
    pub likelihood: f64,
    pub suitability_score: f64,
}

impl From<&RankedDonor> for DonorMatchView {
    fn from(ranked: &RankedDonor) -> Self {
        let donor = &ranked.donor;
        Self {
            donor_id: donor.donor_id.0.clone(),
            name: donor.name.clone(),
            blood_group: donor.blood_group.label().to_string(),
            latitude: donor.location.latitude,
            longitude: donor.location.longitude,
            contact_number: donor.contact_number.clone(),
            city: donor.city.clone(),
            distance_km: ranked.distance_km,
            likelihood: ranked.likelihood,
            suitability_score: ranked.suitability_score,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrganMatchView {
    pub offer_id: String,
    pub name: String,
    pub organ: String,
    pub latitude: f64,
    pub longitude: f64,
    pub contact_number: String,
    pub hla_match_score: f64,
    pub tissue_size_factor: f64,
    pub hours_elapsed: f64,
    pub distance_km: f64,
    pub suitability_score: f64,
}

impl From<&RankedOrganMatch> for OrganMatchView {
    fn from(ranked: &RankedOrganMatch) -> Self {
        let offer = &ranked.offer;
        Self {
            offer_id: offer.offer_id.clone(),
            name: offer.name.clone(),
            organ: offer.organ.label().to_string(),
            latitude: offer.location.latitude,
            longitude: offer.location.longitude,
            contact_number: offer.contact_number.clone(),
            hla_match_score: offer.hla_match_score,
            tissue_size_factor: offer.tissue_size_factor,
            hours_elapsed: ranked.hours_elapsed,
            distance_km: ranked.distance_km,
            suitability_score: ranked.suitability_score,
        }
    }
}

/// Ranking payload; `message` explains an empty result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankingResponse<T> {
    pub matches: Vec<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> RankingResponse<T> {
    pub fn new(matches: Vec<T>, empty_message: impl FnOnce() -> String) -> Self {
        let message = matches.is_empty().then(empty_message);
        Self { matches, message }
    }
}
