use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};

pub const DEFAULT_COOLDOWN_MINUTES: i64 = 30;

/// Last-trigger table guarding against repeated episodes for the same key.
///
/// Checking and marking happen under one lock, so two concurrent triggers for the
/// same key cannot both pass. The previous episode's outcome is irrelevant.
#[derive(Debug)]
pub struct OutreachCooldown<K> {
    window: Duration,
    last_triggered: Mutex<HashMap<K, DateTime<Utc>>>,
}

impl<K> OutreachCooldown<K>
where
    K: Eq + Hash + Clone,
{
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_triggered: Mutex::new(HashMap::new()),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Marks `key` as triggered at `now` unless it fired within the window.
    /// On rejection returns the remaining wait.
    pub fn try_acquire(&self, key: &K, now: DateTime<Utc>) -> Result<(), Duration> {
        let mut table = self
            .last_triggered
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if let Some(previous) = table.get(key) {
            let elapsed = now - *previous;
            if elapsed < self.window {
                return Err(self.window - elapsed);
            }
        }

        table.insert(key.clone(), now);
        Ok(())
    }

    /// Clears the mark placed by `try_acquire` at `marked_at`, for episodes that
    /// never reached a donor. A newer mark is left alone.
    pub fn release(&self, key: &K, marked_at: DateTime<Utc>) {
        let mut table = self
            .last_triggered
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if table.get(key) == Some(&marked_at) {
            table.remove(key);
        }
    }

    pub fn last_triggered(&self, key: &K) -> Option<DateTime<Utc>> {
        self.last_triggered
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(key)
            .copied()
    }
}

impl<K> Default for OutreachCooldown<K>
where
    K: Eq + Hash + Clone,
{
    fn default() -> Self {
        Self::new(Duration::minutes(DEFAULT_COOLDOWN_MINUTES))
    }
}
