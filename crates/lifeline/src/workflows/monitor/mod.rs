//! Inventory shortage monitoring that feeds donor outreach.

pub mod router;
pub mod service;

pub use router::monitor_router;
pub use service::{
    assess, InventoryLevel, MonitorCycleReport, Shortage, ShortageMonitor, ShortageOutreach,
    ShortageThresholds,
};
