//! Shared builders and fakes for the workflow test modules.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::response::Response;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde_json::Value;

use crate::workflows::matching::{LikelihoodModel, MatchingEngine};
use crate::workflows::matching::scoring::DonorFeatures;
use crate::workflows::outreach::clock::ManualClock;
use crate::workflows::outreach::messaging::{MessageReceipt, MessagingError, Messenger};
use crate::workflows::registry::domain::{
    BloodGroup, Coordinates, DonorCategory, DonorId, DonorRecord, Hospital, OrganOfferRecord,
    OrganType,
};
use crate::workflows::registry::memory::{InMemoryDonorRepository, InMemoryOrganOfferRepository};

pub(crate) const MUMBAI: Coordinates = Coordinates::new(19.0760, 72.8777);

pub(crate) fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0)
        .single()
        .expect("valid timestamp")
}

pub(crate) fn today() -> NaiveDate {
    now().date_naive()
}

pub(crate) fn clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::new(now()))
}

pub(crate) fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}

/// Donor `id` in Mumbai offset by `offset_deg` of latitude, reachable at `+91<id>`.
pub(crate) fn donor(id: &str, group: BloodGroup, offset_deg: f64) -> DonorRecord {
    DonorRecord {
        donor_id: DonorId(id.to_string()),
        name: format!("Donor {id}"),
        blood_group: group,
        location: Coordinates::new(MUMBAI.latitude + offset_deg, MUMBAI.longitude),
        contact_number: format!("+91{id}"),
        city: "Mumbai".to_string(),
        months_since_first_donation: 24,
        donation_count: 4,
        volume_donated: 4,
        last_donation: Some(date(2024, 1, 10)),
    }
}

pub(crate) fn organ_offer(id: &str, organ: OrganType, hours_ago: i64) -> OrganOfferRecord {
    OrganOfferRecord {
        offer_id: id.to_string(),
        name: format!("Offer {id}"),
        organ,
        donor_category: DonorCategory::Deceased,
        location: Coordinates::new(MUMBAI.latitude + 0.1, MUMBAI.longitude),
        contact_number: "+912200000000".to_string(),
        hla_match_score: 0.8,
        tissue_size_factor: 0.9,
        available_at: now() - chrono::Duration::hours(hours_ago),
    }
}

pub(crate) fn hospital(name: &str, offset_deg: f64, contact: &str) -> Hospital {
    Hospital {
        name: name.to_string(),
        location: Coordinates::new(MUMBAI.latitude + offset_deg, MUMBAI.longitude),
        emergency_contact_number: contact.to_string(),
    }
}

/// Model returning the same probability for every donor.
pub(crate) struct FixedModel(pub f64);

impl LikelihoodModel for FixedModel {
    fn predict(&self, _features: &DonorFeatures) -> f64 {
        self.0
    }
}

pub(crate) fn engine(donors: Vec<DonorRecord>, offers: Vec<OrganOfferRecord>) -> Arc<MatchingEngine> {
    Arc::new(MatchingEngine::new(
        Arc::new(InMemoryDonorRepository::new(donors)),
        Arc::new(InMemoryOrganOfferRepository::new(offers)),
        Arc::new(FixedModel(0.8)),
    ))
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum Script {
    Accept,
    Reject,
    Fail,
    Hang,
    /// Accepts after the given delay.
    Slow(Duration),
}

/// Messenger whose behaviour is scripted per recipient; unscripted recipients accept.
#[derive(Default)]
pub(crate) struct ScriptedMessenger {
    scripts: HashMap<String, Script>,
    sent: Mutex<Vec<(String, String)>>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

/// Decrements the in-flight count even when the send is cancelled by a timeout.
struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl ScriptedMessenger {
    pub(crate) fn with(mut self, to: &str, script: Script) -> Self {
        self.scripts.insert(to.to_string(), script);
        self
    }

    pub(crate) fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().expect("sent log").clone()
    }

    pub(crate) fn recipients(&self) -> Vec<String> {
        self.sent().into_iter().map(|(to, _)| to).collect()
    }

    /// Highest number of sends that were running at the same moment.
    pub(crate) fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Messenger for ScriptedMessenger {
    async fn send(&self, to: &str, body: &str) -> Result<MessageReceipt, MessagingError> {
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        let _in_flight = InFlight(&self.in_flight);
        self.peak_in_flight.fetch_max(running, Ordering::SeqCst);

        self.sent
            .lock()
            .expect("sent log")
            .push((to.to_string(), body.to_string()));

        match self.scripts.get(to).copied().unwrap_or(Script::Accept) {
            Script::Accept => Ok(MessageReceipt::accepted(format!("SM-{to}"))),
            Script::Reject => Ok(MessageReceipt::rejected("undelivered")),
            Script::Fail => Err(MessagingError::Transport("connection reset".to_string())),
            Script::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(MessageReceipt::accepted("late"))
            }
            Script::Slow(delay) => {
                tokio::time::sleep(delay).await;
                Ok(MessageReceipt::accepted(format!("SM-{to}")))
            }
        }
    }
}

pub(crate) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("body bytes");
    serde_json::from_slice(&body).expect("json body")
}
