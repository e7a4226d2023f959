mod model;

pub use model::{FeatureSchema, LogisticLikelihoodModel, ModelError};

use serde::{Deserialize, Serialize};

use crate::workflows::registry::domain::DonorRecord;

/// Profile signals handed to a likelihood model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DonorFeatures {
    pub months_since_first_donation: f64,
    pub donation_count: f64,
    pub volume_donated: f64,
    pub latitude: f64,
    pub longitude: f64,
    pub city: String,
}

impl From<&DonorRecord> for DonorFeatures {
    fn from(record: &DonorRecord) -> Self {
        Self {
            months_since_first_donation: f64::from(record.months_since_first_donation),
            donation_count: f64::from(record.donation_count),
            volume_donated: f64::from(record.volume_donated),
            latitude: record.location.latitude,
            longitude: record.location.longitude,
            city: record.city.clone(),
        }
    }
}

/// Opaque predictor of P(donor responds and is available).
pub trait LikelihoodModel: Send + Sync {
    fn predict(&self, features: &DonorFeatures) -> f64;
}

/// Clamp model output into a probability; non-finite output counts as zero.
pub fn sanitize_probability(raw: f64) -> f64 {
    if raw.is_finite() {
        raw.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// `likelihood / (distance + 1)`; the `+1` smooths very near candidates.
pub fn blood_donor_score(likelihood: f64, distance_km: f64) -> f64 {
    likelihood / (distance_km + 1.0)
}

pub fn organ_offer_score(
    hla_match_score: f64,
    tissue_size_factor: f64,
    time_penalty_factor: f64,
    distance_km: f64,
) -> f64 {
    (hla_match_score * tissue_size_factor * time_penalty_factor) / (distance_km + 1.0)
}
