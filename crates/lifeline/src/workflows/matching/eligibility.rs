use chrono::{DateTime, NaiveDate, Utc};

use crate::workflows::registry::domain::{DonorCategory, OrganOfferRecord, OrganType};

/// Days a donor must wait after a donation before being asked again.
pub const COOLDOWN_PERIOD_DAYS: i64 = 30;

const MILLIS_PER_HOUR: f64 = 3_600_000.0;

/// True once strictly more than the cooldown has passed. Never-donated donors are eligible.
pub fn is_past_cooldown(last_donation: Option<NaiveDate>, request_date: NaiveDate) -> bool {
    match last_donation {
        Some(last) => (request_date - last).num_days() > COOLDOWN_PERIOD_DAYS,
        None => true,
    }
}

/// Hours since the offer became available. Offers dated in the future count as fresh.
pub fn hours_elapsed(available_at: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    let millis = (now - available_at).num_milliseconds();
    (millis.max(0) as f64) / MILLIS_PER_HOUR
}

/// Viability check for an offer that already matches the requested organ.
///
/// Returns the elapsed hours when the offer is eligible.
pub fn viable_hours(offer: &OrganOfferRecord, now: DateTime<Utc>) -> Option<f64> {
    if offer.donor_category != DonorCategory::Deceased {
        return None;
    }
    let elapsed = hours_elapsed(offer.available_at, now);
    (elapsed < offer.organ.max_viability_hours()).then_some(elapsed)
}

/// Linear decay from 1 at availability to 0 at the viability deadline.
pub fn time_penalty_factor(organ: &OrganType, hours_elapsed: f64) -> f64 {
    1.0 - hours_elapsed / organ.max_viability_hours()
}
