use std::collections::{HashMap, VecDeque};
use std::sync::RwLock;

use super::service::SosReport;

/// Reports kept before the oldest SOS is forgotten.
pub const SOS_LEDGER_CAPACITY: usize = 1_000;

#[derive(Debug, Default)]
struct Entries {
    reports: HashMap<String, SosReport>,
    order: VecDeque<String>,
}

/// In-process record of executed SOS requests, keyed by SOS id.
#[derive(Debug)]
pub struct SosLedger {
    capacity: usize,
    entries: RwLock<Entries>,
}

impl Default for SosLedger {
    fn default() -> Self {
        Self::with_capacity(SOS_LEDGER_CAPACITY)
    }
}

impl SosLedger {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: RwLock::new(Entries::default()),
        }
    }

    /// Stores `report`; a report with the same id replaces the earlier one.
    /// Once full, the oldest report is evicted.
    pub fn record(&self, report: SosReport) {
        let mut entries = self
            .entries
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let sos_id = report.sos_id.clone();
        if entries.reports.insert(sos_id.clone(), report).is_some() {
            return;
        }
        entries.order.push_back(sos_id);
        while entries.order.len() > self.capacity {
            if let Some(oldest) = entries.order.pop_front() {
                entries.reports.remove(&oldest);
            }
        }
    }

    pub fn get(&self, sos_id: &str) -> Option<SosReport> {
        self.entries
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .reports
            .get(sos_id)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .reports
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
