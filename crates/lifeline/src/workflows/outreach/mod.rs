//! Donor outreach: sequential failover down a ranked list, concurrent broadcast,
//! a per-blood-group cooldown and the messaging providers they send through.

pub mod broadcast;
pub mod clock;
pub mod cooldown;
pub mod failover;
pub mod messaging;
pub mod router;
pub mod service;
pub mod templates;
pub mod twilio;

#[cfg(test)]
mod tests;

pub use broadcast::{BroadcastDispatcher, DEFAULT_BROADCAST_CONCURRENCY};
pub use clock::{Clock, ManualClock, SystemClock};
pub use cooldown::OutreachCooldown;
pub use failover::{
    AttemptOutcome, EpisodeState, FailoverController, OutreachAttempt, OutreachEpisode,
    OutreachTarget, DEFAULT_ATTEMPT_TIMEOUT,
};
pub use messaging::{DryRunMessenger, MessageReceipt, MessagingError, Messenger};
pub use router::outreach_router;
pub use service::{
    OutreachError, OutreachOutcome, OutreachRequest, OutreachService, OutreachSettings,
};
pub use twilio::TwilioMessenger;
