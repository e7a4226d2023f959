use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::workflows::outreach::clock::Clock;
use crate::workflows::outreach::service::{OutreachOutcome, OutreachRequest, OutreachService};
use crate::workflows::registry::domain::{BloodGroup, Coordinates};

const CRITICAL_URGENCY: u8 = 8;
const ELEVATED_URGENCY: u8 = 6;
const CRITICAL_SEVERITY: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryLevel {
    pub blood_group: BloodGroup,
    pub units: u32,
}

/// Minimum units per blood group before a group counts as short.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShortageThresholds(BTreeMap<BloodGroup, u32>);

impl ShortageThresholds {
    pub fn new(thresholds: BTreeMap<BloodGroup, u32>) -> Self {
        Self(thresholds)
    }

    pub fn get(&self, group: BloodGroup) -> Option<u32> {
        self.0.get(&group).copied()
    }
}

impl Default for ShortageThresholds {
    fn default() -> Self {
        Self(BTreeMap::from([
            (BloodGroup::OPositive, 20),
            (BloodGroup::ONegative, 15),
            (BloodGroup::APositive, 25),
            (BloodGroup::ANegative, 12),
            (BloodGroup::BPositive, 20),
            (BloodGroup::BNegative, 10),
            (BloodGroup::AbPositive, 15),
            (BloodGroup::AbNegative, 8),
        ]))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shortage {
    pub blood_group: BloodGroup,
    pub units: u32,
    pub threshold: u32,
    /// `(threshold - units) / threshold`, in (0, 1].
    pub severity: f64,
    pub urgency_level: u8,
}

/// Groups strictly below their threshold, in input order.
pub fn assess(levels: &[InventoryLevel], thresholds: &ShortageThresholds) -> Vec<Shortage> {
    levels
        .iter()
        .filter_map(|level| {
            let threshold = thresholds.get(level.blood_group)?;
            if threshold == 0 || level.units >= threshold {
                return None;
            }
            let severity = f64::from(threshold - level.units) / f64::from(threshold);
            Some(Shortage {
                blood_group: level.blood_group,
                units: level.units,
                threshold,
                severity,
                urgency_level: if severity > CRITICAL_SEVERITY {
                    CRITICAL_URGENCY
                } else {
                    ELEVATED_URGENCY
                },
            })
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShortageOutreach {
    pub blood_group: BloodGroup,
    pub outcome: OutreachOutcome,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorCycleReport {
    pub checked_at: DateTime<Utc>,
    pub shortages: Vec<Shortage>,
    pub outreach: Vec<ShortageOutreach>,
    /// Groups whose outreach was suppressed by the cooldown.
    pub skipped: Vec<BloodGroup>,
    pub failed: Vec<String>,
    pub total_attempts: usize,
    pub successful_contacts: usize,
}

/// One inventory check: every short group triggers an outreach episode at the site.
pub struct ShortageMonitor {
    outreach: Arc<OutreachService>,
    clock: Arc<dyn Clock>,
    thresholds: ShortageThresholds,
    site: Coordinates,
}

impl ShortageMonitor {
    pub fn new(
        outreach: Arc<OutreachService>,
        clock: Arc<dyn Clock>,
        thresholds: ShortageThresholds,
        site: Coordinates,
    ) -> Self {
        Self {
            outreach,
            clock,
            thresholds,
            site,
        }
    }

    pub async fn run_cycle(&self, levels: &[InventoryLevel]) -> MonitorCycleReport {
        let checked_at = self.clock.now();
        let shortages = assess(levels, &self.thresholds);
        let mut report = MonitorCycleReport {
            checked_at,
            shortages: shortages.clone(),
            outreach: Vec::new(),
            skipped: Vec::new(),
            failed: Vec::new(),
            total_attempts: 0,
            successful_contacts: 0,
        };

        for shortage in shortages {
            warn!(
                blood_group = %shortage.blood_group,
                units = shortage.units,
                threshold = shortage.threshold,
                urgency = shortage.urgency_level,
                "critical blood shortage"
            );
            let request = OutreachRequest {
                blood_group: shortage.blood_group,
                location: self.site,
                urgency_level: shortage.urgency_level,
                note: None,
            };

            match self.outreach.initiate(request).await {
                Ok(OutreachOutcome::Throttled { .. }) => report.skipped.push(shortage.blood_group),
                Ok(outcome) => {
                    report.total_attempts += outcome.attempts().len();
                    if outcome.is_contacted() {
                        report.successful_contacts += 1;
                    }
                    report.outreach.push(ShortageOutreach {
                        blood_group: shortage.blood_group,
                        outcome,
                    });
                }
                Err(err) => {
                    error!(blood_group = %shortage.blood_group, error = %err, "shortage outreach failed");
                    report.failed.push(format!("{}: {err}", shortage.blood_group));
                }
            }
        }

        info!(
            shortages = report.shortages.len(),
            skipped = report.skipped.len(),
            attempts = report.total_attempts,
            contacted = report.successful_contacts,
            "monitor cycle complete"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::fixtures::{clock, donor, engine, ScriptedMessenger, MUMBAI};
    use crate::workflows::outreach::OutreachSettings;

    fn level(blood_group: BloodGroup, units: u32) -> InventoryLevel {
        InventoryLevel { blood_group, units }
    }

    #[test]
    fn severity_and_urgency_follow_threshold_distance() {
        let shortages = assess(
            &[
                level(BloodGroup::OPositive, 5),
                level(BloodGroup::ANegative, 10),
                level(BloodGroup::BPositive, 20),
                level(BloodGroup::AbNegative, 4),
            ],
            &ShortageThresholds::default(),
        );

        assert_eq!(shortages.len(), 3, "units equal to threshold are adequate");
        assert_eq!(shortages[0].blood_group, BloodGroup::OPositive);
        assert!((shortages[0].severity - 0.75).abs() < 1e-9);
        assert_eq!(shortages[0].urgency_level, 8);
        assert_eq!(shortages[1].urgency_level, 6);
        assert!((shortages[2].severity - 0.5).abs() < 1e-9);
        assert_eq!(shortages[2].urgency_level, 6, "exactly half is not critical");
    }

    #[tokio::test]
    async fn cycle_triggers_outreach_and_skips_throttled_groups() {
        let messenger = Arc::new(ScriptedMessenger::default());
        let clock = clock();
        let outreach = Arc::new(OutreachService::new(
            engine(
                vec![
                    donor("201", BloodGroup::OPositive, 0.01),
                    donor("202", BloodGroup::BNegative, 0.01),
                ],
                Vec::new(),
            ),
            messenger.clone(),
            clock.clone(),
            OutreachSettings::default(),
        ));
        let monitor = ShortageMonitor::new(outreach, clock, ShortageThresholds::default(), MUMBAI);
        let levels = [
            level(BloodGroup::OPositive, 2),
            level(BloodGroup::BNegative, 9),
            level(BloodGroup::APositive, 3),
            level(BloodGroup::AbPositive, 40),
        ];

        let first = monitor.run_cycle(&levels).await;
        assert_eq!(first.shortages.len(), 3);
        assert_eq!(first.outreach.len(), 3);
        assert_eq!(first.successful_contacts, 2);
        assert_eq!(first.total_attempts, 2);
        assert!(first.skipped.is_empty());
        assert!(matches!(
            first.outreach[2].outcome,
            OutreachOutcome::NoEligibleDonors { .. }
        ));
        assert!(messenger.sent()[0].1.starts_with("CRITICAL"));
        assert!(messenger.sent()[1].1.starts_with("URGENT"));

        let second = monitor.run_cycle(&levels).await;
        assert_eq!(
            second.skipped,
            vec![BloodGroup::OPositive, BloodGroup::BNegative, BloodGroup::APositive]
        );
        assert!(second.outreach.is_empty());
        assert_eq!(messenger.sent().len(), 2);
    }
}
