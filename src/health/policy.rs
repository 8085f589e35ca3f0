use crate::config::HealthConfig;

use super::HealthRecord;

/// Pure availability and transition rules for [`HealthRecord`]s.
///
/// A key becomes unavailable after `failure_threshold` failures and stays so
/// until `cooldown_secs` have elapsed since the most recent failure. Only a
/// recorded success clears the state; time alone never does.
#[derive(Debug, Clone, Copy)]
pub struct HealthPolicy {
    cooldown_secs: u64,
    failure_threshold: u32,
}

impl Default for HealthPolicy {
    fn default() -> Self {
        Self {
            cooldown_secs: 60,
            failure_threshold: 3,
        }
    }
}

impl HealthPolicy {
    #[must_use]
    pub fn new(cooldown_secs: u64, failure_threshold: u32) -> Self {
        Self {
            cooldown_secs,
            failure_threshold,
        }
    }

    #[must_use]
    pub fn from_config(config: &HealthConfig) -> Self {
        Self::new(config.cooldown_secs, config.failure_threshold)
    }

    /// Whether a key with this record may be offered traffic at `now`.
    ///
    /// Once the cooldown window has elapsed the record is offered probation
    /// traffic without being mutated; `in_cooldown` stays set so a failed
    /// probe re-arms the window from the new failure time.
    #[must_use]
    pub fn is_available(&self, record: &HealthRecord, now: u64) -> bool {
        if !record.in_cooldown {
            return true;
        }
        now.saturating_sub(record.last_failure_unix) >= self.cooldown_secs
    }

    /// Apply one failure at `now`.
    #[must_use]
    pub fn record_failure(&self, mut record: HealthRecord, now: u64) -> HealthRecord {
        record.failures = record.failures.saturating_add(1);
        record.last_failure_unix = now;
        if record.failures >= self.failure_threshold {
            record.in_cooldown = true;
        }
        record
    }

    /// Apply one success. Returns the reset record, or `None` when the record
    /// is already zero and no write is needed.
    #[must_use]
    pub fn record_success(&self, record: &HealthRecord) -> Option<HealthRecord> {
        (record.failures > 0 || record.in_cooldown).then(HealthRecord::default)
    }
}
