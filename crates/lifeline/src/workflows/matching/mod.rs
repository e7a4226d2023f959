//! Donor and organ ranking: geodistance, eligibility windows, suitability scoring and
//! top-N selection.

pub mod eligibility;
pub mod engine;
pub mod geo;
pub mod ranker;
pub mod router;
pub mod scoring;
pub mod views;

#[cfg(test)]
mod tests;

pub use engine::{
    rank_blood_donors, rank_organ_matches, BloodRequest, MatchingEngine, MatchingError,
    OrganRequest, RankedDonor, RankedOrganMatch,
};
pub use ranker::DEFAULT_TOP_N;
pub use router::{matching_router, MatchingState};
pub use scoring::{DonorFeatures, LikelihoodModel, LogisticLikelihoodModel};
pub use views::{DonorMatchView, OrganMatchView, RankingResponse};
