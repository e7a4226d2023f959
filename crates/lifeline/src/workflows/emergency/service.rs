use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use super::domain::{EmergencyNeed, SosRequest, ValidatedSos};
use super::ledger::SosLedger;
use crate::workflows::matching::geo::haversine_km;
use crate::workflows::matching::{BloodRequest, MatchingEngine, OrganRequest, DEFAULT_TOP_N};
use crate::workflows::outreach::broadcast::BroadcastDispatcher;
use crate::workflows::outreach::clock::Clock;
use crate::workflows::outreach::failover::{deliver, OutreachAttempt, OutreachTarget};
use crate::workflows::outreach::messaging::Messenger;
use crate::workflows::outreach::templates::{hospital_alert, sos_contact_alert};
use crate::workflows::registry::domain::{Coordinates, Hospital};
use crate::workflows::registry::repository::HospitalDirectory;
use crate::workflows::validation::ValidationError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactAlerts {
    pub total_contacts: usize,
    pub successful_alerts: usize,
    pub message: String,
    pub attempts: Vec<OutreachAttempt>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HospitalAlert {
    pub hospital_name: String,
    pub distance_km: f64,
    pub attempt: OutreachAttempt,
}

impl HospitalAlert {
    pub fn succeeded(&self) -> bool {
        self.attempt.succeeded()
    }
}

/// Candidates found by the ranking run that accompanies every SOS.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AutonomousSearch {
    pub candidate_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AutonomousSearch {
    pub fn found(&self) -> usize {
        self.candidate_ids.len()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SosReport {
    pub sos_id: String,
    pub user_id: String,
    pub need: EmergencyNeed,
    pub triggered_at: DateTime<Utc>,
    pub contact_alerts: ContactAlerts,
    /// Absent when the hospital directory is empty or unreadable.
    pub hospital_alert: Option<HospitalAlert>,
    pub autonomous_search: AutonomousSearch,
    pub success: bool,
}

impl SosReport {
    fn compute_success(&self) -> bool {
        self.contact_alerts.successful_alerts > 0
            || self.hospital_alert.as_ref().is_some_and(HospitalAlert::succeeded)
            || self.autonomous_search.found() > 0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SosStatus {
    pub sos_id: String,
    pub status: String,
    pub started_at: DateTime<Utc>,
    pub elapsed_seconds: i64,
    pub results: SosReport,
}

#[derive(Debug, thiserror::Error)]
pub enum SosError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

pub(crate) fn nearest_hospital(hospitals: &[Hospital], from: Coordinates) -> Option<(&Hospital, f64)> {
    hospitals
        .iter()
        .map(|hospital| (hospital, haversine_km(from, hospital.location)))
        .min_by(|a, b| a.1.total_cmp(&b.1))
}

/// Executes SOS requests: contact broadcast, nearest-hospital alert and autonomous
/// donor search run concurrently, then the combined report is kept in the ledger.
pub struct SosService {
    engine: Arc<MatchingEngine>,
    hospitals: Arc<dyn HospitalDirectory>,
    messenger: Arc<dyn Messenger>,
    broadcast: BroadcastDispatcher,
    clock: Arc<dyn Clock>,
    attempt_timeout: Duration,
    ledger: SosLedger,
}

impl SosService {
    pub fn new(
        engine: Arc<MatchingEngine>,
        hospitals: Arc<dyn HospitalDirectory>,
        messenger: Arc<dyn Messenger>,
        clock: Arc<dyn Clock>,
        max_concurrency: usize,
        attempt_timeout: Duration,
    ) -> Self {
        Self {
            broadcast: BroadcastDispatcher::new(
                Arc::clone(&messenger),
                Arc::clone(&clock),
                max_concurrency,
                attempt_timeout,
            ),
            engine,
            hospitals,
            messenger,
            clock,
            attempt_timeout,
            ledger: SosLedger::default(),
        }
    }

    pub async fn trigger(&self, request: SosRequest) -> Result<SosReport, SosError> {
        let sos = request.validate()?;
        let triggered_at = self.clock.now();
        let sos_id = format!("sos_{}_{}", sos.user_id, triggered_at.timestamp());
        info!(%sos_id, need = %sos.need.describe(), contacts = sos.contacts.len(), "executing sos request");

        let (contact_alerts, hospital_alert, autonomous_search) = tokio::join!(
            self.alert_contacts(&sos),
            self.alert_nearest_hospital(&sos_id, &sos),
            self.search(&sos, triggered_at),
        );

        let mut report = SosReport {
            sos_id,
            user_id: sos.user_id,
            need: sos.need,
            triggered_at,
            contact_alerts,
            hospital_alert,
            autonomous_search,
            success: false,
        };
        report.success = report.compute_success();

        if report.success {
            info!(sos_id = %report.sos_id, "sos request handled");
        } else {
            error!(sos_id = %report.sos_id, "sos request reached nobody");
        }
        self.ledger.record(report.clone());
        Ok(report)
    }

    pub fn status(&self, sos_id: &str) -> Option<SosStatus> {
        let report = self.ledger.get(sos_id)?;
        Some(SosStatus {
            sos_id: report.sos_id.clone(),
            status: if report.success { "success" } else { "failed" }.to_string(),
            started_at: report.triggered_at,
            elapsed_seconds: (self.clock.now() - report.triggered_at).num_seconds(),
            results: report,
        })
    }

    async fn alert_contacts(&self, sos: &ValidatedSos) -> ContactAlerts {
        let message = sos_contact_alert(&sos.user_name, &sos.need.describe(), sos.address.as_deref());
        let recipients = sos
            .contacts
            .iter()
            .enumerate()
            .map(|(index, contact)| OutreachTarget {
                rank: index + 1,
                candidate_id: contact
                    .name
                    .clone()
                    .unwrap_or_else(|| format!("contact-{}", index + 1)),
                name: contact.name.clone().unwrap_or_default(),
                channel: contact.phone_number.trim().to_string(),
            })
            .collect::<Vec<_>>();

        let attempts = self.broadcast.dispatch(recipients, &message).await;
        ContactAlerts {
            total_contacts: attempts.len(),
            successful_alerts: attempts.iter().filter(|attempt| attempt.succeeded()).count(),
            message,
            attempts,
        }
    }

    async fn alert_nearest_hospital(&self, sos_id: &str, sos: &ValidatedSos) -> Option<HospitalAlert> {
        let hospitals = match self.hospitals.hospitals() {
            Ok(hospitals) => hospitals,
            Err(err) => {
                error!(error = %err, "hospital directory unavailable");
                return None;
            }
        };
        let Some((hospital, distance_km)) = nearest_hospital(&hospitals, sos.location) else {
            warn!("no hospitals configured, skipping hospital alert");
            return None;
        };

        let target = OutreachTarget {
            rank: 1,
            candidate_id: hospital.name.clone(),
            name: hospital.name.clone(),
            channel: hospital.emergency_contact_number.clone(),
        };
        let body = hospital_alert(sos_id, &sos.need.describe(), distance_km);
        let attempt = deliver(
            self.messenger.as_ref(),
            self.attempt_timeout,
            &target,
            &body,
            self.clock.now(),
        )
        .await;

        Some(HospitalAlert {
            hospital_name: hospital.name.clone(),
            distance_km,
            attempt,
        })
    }

    async fn search(&self, sos: &ValidatedSos, now: DateTime<Utc>) -> AutonomousSearch {
        let result = match &sos.need {
            EmergencyNeed::Blood { blood_group } => self
                .engine
                .blood_donors(&BloodRequest {
                    blood_group: *blood_group,
                    location: sos.location,
                    request_date: now.date_naive(),
                    top_n: DEFAULT_TOP_N,
                })
                .map(|ranked| {
                    ranked
                        .into_iter()
                        .map(|candidate| candidate.donor.donor_id.0)
                        .collect::<Vec<_>>()
                }),
            EmergencyNeed::Organ { organ_type } => self
                .engine
                .organ_matches(&OrganRequest {
                    organ: organ_type.clone(),
                    location: sos.location,
                    now,
                    top_n: DEFAULT_TOP_N,
                })
                .map(|ranked| {
                    ranked
                        .into_iter()
                        .map(|candidate| candidate.offer.offer_id)
                        .collect::<Vec<_>>()
                }),
        };

        match result {
            Ok(candidate_ids) => AutonomousSearch {
                candidate_ids,
                error: None,
            },
            Err(err) => {
                error!(error = %err, "autonomous search failed");
                AutonomousSearch {
                    candidate_ids: Vec::new(),
                    error: Some(err.to_string()),
                }
            }
        }
    }
}
