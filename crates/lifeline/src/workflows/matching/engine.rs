use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::eligibility::{is_past_cooldown, time_penalty_factor, viable_hours};
use super::geo::{distances_from, haversine_km};
use super::ranker::select_top;
use super::scoring::{
    blood_donor_score, organ_offer_score, sanitize_probability, DonorFeatures, LikelihoodModel,
};
use crate::workflows::registry::domain::{
    BloodGroup, Coordinates, DonorRecord, OrganOfferRecord, OrganType,
};
use crate::workflows::registry::repository::{
    DonorRepository, OrganOfferRepository, RepositoryError,
};

#[derive(Debug, Clone, PartialEq)]
pub struct BloodRequest {
    pub blood_group: BloodGroup,
    pub location: Coordinates,
    pub request_date: NaiveDate,
    pub top_n: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrganRequest {
    pub organ: OrganType,
    pub location: Coordinates,
    pub now: DateTime<Utc>,
    pub top_n: usize,
}

/// Eligible donor with the signals that placed it in the ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedDonor {
    pub donor: DonorRecord,
    pub distance_km: f64,
    pub likelihood: f64,
    pub suitability_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedOrganMatch {
    pub offer: OrganOfferRecord,
    pub hours_elapsed: f64,
    pub time_penalty_factor: f64,
    pub distance_km: f64,
    pub suitability_score: f64,
}

/// Rank a donor pool for a blood request. Pure; an empty result is a normal outcome.
pub fn rank_blood_donors(
    pool: &[DonorRecord],
    request: &BloodRequest,
    model: &dyn LikelihoodModel,
) -> Vec<RankedDonor> {
    let eligible: Vec<&DonorRecord> = pool
        .iter()
        .filter(|donor| donor.blood_group == request.blood_group)
        .filter(|donor| is_past_cooldown(donor.last_donation, request.request_date))
        .collect();

    let distances = distances_from(
        request.location,
        eligible.iter().map(|donor| donor.location),
    );

    let scored = eligible
        .into_iter()
        .zip(distances)
        .map(|(donor, distance_km)| {
            let likelihood = sanitize_probability(model.predict(&DonorFeatures::from(donor)));
            RankedDonor {
                donor: donor.clone(),
                distance_km,
                likelihood,
                suitability_score: blood_donor_score(likelihood, distance_km),
            }
        })
        .collect::<Vec<_>>();

    debug!(
        blood_group = %request.blood_group,
        pool = pool.len(),
        eligible = scored.len(),
        "blood donors scored"
    );

    select_top(scored, request.top_n, |candidate| candidate.suitability_score)
}

/// Rank organ offers for a transplant request. Only deceased, still-viable offers qualify.
pub fn rank_organ_matches(pool: &[OrganOfferRecord], request: &OrganRequest) -> Vec<RankedOrganMatch> {
    let scored = pool
        .iter()
        .filter(|offer| offer.organ == request.organ)
        .filter_map(|offer| {
            let hours_elapsed = viable_hours(offer, request.now)?;
            let distance_km = haversine_km(offer.location, request.location);
            let penalty = time_penalty_factor(&offer.organ, hours_elapsed);
            Some(RankedOrganMatch {
                offer: offer.clone(),
                hours_elapsed,
                time_penalty_factor: penalty,
                distance_km,
                suitability_score: organ_offer_score(
                    offer.hla_match_score,
                    offer.tissue_size_factor,
                    penalty,
                    distance_km,
                ),
            })
        })
        .collect::<Vec<_>>();

    debug!(
        organ = %request.organ,
        pool = pool.len(),
        eligible = scored.len(),
        "organ offers scored"
    );

    select_top(scored, request.top_n, |candidate| candidate.suitability_score)
}

#[derive(Debug, thiserror::Error)]
pub enum MatchingError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Ranking facade over the dataset stores and the injected likelihood model.
pub struct MatchingEngine {
    donors: Arc<dyn DonorRepository>,
    organs: Arc<dyn OrganOfferRepository>,
    model: Arc<dyn LikelihoodModel>,
}

impl MatchingEngine {
    pub fn new(
        donors: Arc<dyn DonorRepository>,
        organs: Arc<dyn OrganOfferRepository>,
        model: Arc<dyn LikelihoodModel>,
    ) -> Self {
        Self {
            donors,
            organs,
            model,
        }
    }

    pub fn blood_donors(&self, request: &BloodRequest) -> Result<Vec<RankedDonor>, MatchingError> {
        let pool = self.donors.all()?;
        Ok(rank_blood_donors(&pool, request, self.model.as_ref()))
    }

    pub fn organ_matches(
        &self,
        request: &OrganRequest,
    ) -> Result<Vec<RankedOrganMatch>, MatchingError> {
        let pool = self.organs.all()?;
        Ok(rank_organ_matches(&pool, request))
    }
}
